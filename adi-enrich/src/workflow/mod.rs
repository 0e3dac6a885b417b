//! Per-address enrichment workflow

pub mod pipeline;

pub use pipeline::{EnrichmentPipeline, PipelineConfig, RunOutcome, RunSummary};
