//! # api-adapters
//!
//! The HTTP surface of Thoughtboard. Request shapes, error mapping and
//! metrics are framework-neutral; the axum router lives behind the
//! `web-axum` feature.

pub mod dto;
pub mod error;
pub mod metrics;

#[cfg(feature = "web-axum")]
pub mod web;

pub use error::ApiError;
pub use metrics::Metrics;
