//! Data models for the enrichment pipeline

pub mod address;
pub mod geo;
pub mod record;

pub use address::{Address, Ineligibility};
pub use geo::{Coordinate, GeoIdentifier, InvalidGeoIdentifier};
pub use record::{EnrichedRecord, ScoreSet, TableMatch, TableResult};
