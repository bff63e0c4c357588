//! Instrumented provider for pipeline tests

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tbr_images::types::{ImageCandidate, ImageProvider, ProviderError, ProviderKind, SearchQuery};

/// Provider returning canned URLs and counting its calls
pub struct CountingProvider {
    kind: ProviderKind,
    enabled: bool,
    delay: Duration,
    urls: Vec<String>,
    fail: bool,
    calls: AtomicUsize,
    terms: std::sync::Mutex<Vec<String>>,
}

impl CountingProvider {
    pub fn new(kind: ProviderKind, urls: &[&str]) -> Self {
        Self {
            kind,
            enabled: true,
            delay: Duration::ZERO,
            urls: urls.iter().map(|u| u.to_string()).collect(),
            fail: false,
            calls: AtomicUsize::new(0),
            terms: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn empty(kind: ProviderKind) -> Self {
        Self::new(kind, &[])
    }

    pub fn failing(kind: ProviderKind) -> Self {
        Self {
            fail: true,
            ..Self::new(kind, &[])
        }
    }

    pub fn disabled(kind: ProviderKind, urls: &[&str]) -> Self {
        Self {
            enabled: false,
            ..Self::new(kind, urls)
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Search terms seen, in call order
    pub fn terms(&self) -> Vec<String> {
        self.terms.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageProvider for CountingProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<ImageCandidate>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.terms.lock().unwrap().push(query.term.clone());

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail {
            return Err(ProviderError::Api {
                status: 503,
                message: "Service unavailable".to_string(),
            });
        }

        Ok(self
            .urls
            .iter()
            .map(|url| {
                ImageCandidate::new(url.clone(), self.kind).with_dimensions(Some(2400), Some(1600))
            })
            .collect())
    }
}
