//! # TravelBlogr Common Library
//!
//! Shared code for TravelBlogr services:
//! - Error type
//! - TOML configuration loading and atomic write-back
//! - Root folder resolution
//! - Logging initialisation

pub mod config;
pub mod error;
pub mod logging;

pub use error::{Error, Result};
