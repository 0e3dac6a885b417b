//! adi-enrich library interface
//!
//! Address → coordinate → census block group → ADI ranking enrichment.
//! Exposes the building blocks for the binary and for integration testing.

pub mod models;
pub mod services;
pub mod workflow;

pub use crate::models::{Address, Coordinate, EnrichedRecord, GeoIdentifier, TableMatch};
pub use crate::workflow::{EnrichmentPipeline, PipelineConfig, RunOutcome, RunSummary};
