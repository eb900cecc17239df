//! Engine configuration
//!
//! The template root may carry an optional `ticketsmith.yaml` (or `.yml`,
//! `.json`) tuning discovery, caching and render policy. Without one the
//! defaults below apply.
//! - `loader`: Configuration file loading, parsing and validation

pub mod loader;


pub use loader::{Config, EngineConfig};
