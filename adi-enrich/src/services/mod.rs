//! Service modules for the enrichment workflow
//!
//! Remote clients (geocoder, FCC block lookup), the ADI table loader, and the
//! address/result file adapters.

pub mod address_source;
pub mod fcc_client;
pub mod geocoding_client;
pub mod rate_limiter;
pub mod result_writer;
pub mod score_tables;

pub use address_source::{load_addresses, read_addresses};
pub use fcc_client::{FccBlockClient, GeographyResolver, ResolveError};
pub use geocoding_client::{GeocodeError, Geocoded, Geocoder, GoogleGeocodingClient};
pub use rate_limiter::RateLimiter;
pub use result_writer::{write_output_file, TableColumns};
pub use score_tables::{LoadReport, ScoreLookup, ScoreTable, ScoreTables, TableLoadError};

/// Leading part of a response body, for logs and error messages
pub(crate) fn excerpt(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}
