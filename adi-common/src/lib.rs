//! # ADI Common Library
//!
//! Shared code for the ADI enrichment tools:
//! - Configuration loading (TOML + CLI overrides)
//! - Geocoding API key resolution
//! - First-run scaffolding of the work directory
//! - Tracing setup

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod logging;
pub mod secrets;

pub use config::{CensusYear, RunConfig};
pub use error::{Error, Result};
