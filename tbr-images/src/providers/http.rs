//! Shared HTTP plumbing for provider adapters
//!
//! Every adapter owns a `ProviderHttp`: a clone of the shared reqwest
//! client, its own base URL, and its own `governor` rate limiter. The
//! limiter is awaited inside the caller's per-call timeout, so a saturated
//! provider degrades to an empty result instead of queueing.

use crate::types::ProviderError;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::debug;

/// User-Agent sent to every provider (Reddit and Nominatim require one)
pub const USER_AGENT: &str = "TravelBlogr/0.1 (image acquisition; +https://travelblogr.com)";

/// Longest error body echoed into logs
const MAX_ERROR_BODY: usize = 200;

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Build the HTTP client shared by all adapters
pub fn build_http_client(timeout: Duration) -> Result<Client, ProviderError> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(|e| ProviderError::Network(format!("Failed to build HTTP client: {}", e)))
}

/// Quota of `n` requests per second (at least one)
pub fn per_second(n: u32) -> Quota {
    Quota::per_second(NonZeroU32::new(n).unwrap_or(NonZeroU32::MIN))
}

/// Quota of one request per `period`
pub fn one_per(period: Duration) -> Quota {
    Quota::with_period(period).unwrap_or_else(|| per_second(1))
}

pub struct ProviderHttp {
    client: Client,
    base_url: String,
    rate_limiter: DirectRateLimiter,
}

impl ProviderHttp {
    pub fn new(client: Client, base_url: impl Into<String>, quota: Quota) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            rate_limiter: RateLimiter::direct(quota),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Point the adapter at another host (used by tests)
    pub fn set_base_url(&mut self, base_url: impl Into<String>) {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
    }

    /// GET `<base_url><path>`
    pub fn get(&self, path: &str) -> RequestBuilder {
        self.client.get(format!("{}{}", self.base_url, path))
    }

    /// Wait for the rate limiter, send, check status, decode JSON
    pub async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, ProviderError> {
        self.rate_limiter.until_ready().await;

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            if body.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !body.is_char_boundary(cut) {
                    cut -= 1;
                }
                body.truncate(cut);
            }
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let bytes = response.bytes().await?;
        debug!(bytes = bytes.len(), "Provider response received");

        serde_json::from_slice(&bytes).map_err(|e| ProviderError::Parse(e.to_string()))
    }
}

/// Read a dimension/count that providers send as either number or string
pub fn lenient_u64(value: &serde_json::Value) -> Option<u64> {
    match value {
        serde_json::Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub fn lenient_u32(value: &serde_json::Value) -> Option<u32> {
    lenient_u64(value).and_then(|v| u32::try_from(v).ok())
}
