//! Test Helper Utilities
//!
//! Shared utilities for testing tbr-images

#![allow(dead_code)]

pub mod fixtures;
pub mod log_capture;
pub mod mock_provider;
pub mod mock_server;

pub use fixtures::{setup_pipeline, setup_pipeline_with, test_config, TestPipeline};
pub use log_capture::{capture_logs, LogCapture};
pub use mock_provider::CountingProvider;
pub use mock_server::spawn_mock_server;
