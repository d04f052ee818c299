//! Configuration loading for threadcat.
//!
//! Resolves [`Config`] from an explicit file, inline JSON, well-known files
//! or defaults, and sets up the tracing subscriber used by the binaries.

#![allow(missing_docs)]

pub mod models;
pub mod telemetry;

pub use models::{BatchConfig, Config, ConfigLoad, ConfigSource, StorageConfig};
pub use telemetry::{DEFAULT_LOG_FILTER, init_tracing};
