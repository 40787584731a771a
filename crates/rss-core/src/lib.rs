//! rss-core - Shared functionality for the resource status tools
//!
//! Paths, the hierarchical configuration registry (with its `Operations`
//! and `/Registry` views) and logging bootstrap used by `rss-query` and
//! `rss-registry`.

pub mod config;
pub mod logging;
pub mod paths;
pub mod registry;

pub use config::{ConfigError, ConfigRegistry, Operations};
pub use logging::LogLevel;
pub use paths::Paths;
pub use registry::Registry;
