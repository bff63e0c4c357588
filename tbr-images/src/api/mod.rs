//! HTTP API handlers for tbr-images
//!
//! Thin layer over `ImagePipeline`: handlers validate caller input (the
//! one class of error this service reports) and delegate.

pub mod admin;
pub mod health;
pub mod images;

pub use admin::admin_routes;
pub use health::health_routes;
pub use images::image_routes;
