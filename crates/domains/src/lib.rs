//! thoughtboard/crates/domains/src/lib.rs
//!
//! The central domain model and port definitions for Thoughtboard.
//! Nothing in this crate performs I/O; adapters implement the ports.

pub mod errors;
pub mod models;
pub mod ports;
pub mod validation;

// Re-exporting for easier access in other crates
pub use errors::*;
pub use models::*;
pub use ports::*;
