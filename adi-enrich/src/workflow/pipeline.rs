//! Enrichment pipeline
//!
//! Drives each address through geocode → block lookup → ADI table join and
//! emits exactly one [`EnrichedRecord`] per input address, in input order.
//!
//! # Error Handling
//! - Per-address isolation: a failed step leaves its field absent and the
//!   address moves on; nothing aborts the run
//! - No retries: each remote step is attempted once per address
//! - Without an identifier every table reports "not found"
//!
//! # Example
//! ```rust,ignore
//! let pipeline = EnrichmentPipeline::new(config, geocoder, resolver, tables);
//! let outcome = pipeline.run(&addresses).await;
//! ```

use crate::models::{Address, Coordinate, EnrichedRecord, GeoIdentifier};
use crate::services::{GeocodeError, Geocoder, GeographyResolver, ScoreLookup};
use adi_common::{CensusYear, RunConfig};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn, Instrument};

/// Pipeline configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Census vintage requested for every address of the run
    pub census_year: CensusYear,
}

impl From<&RunConfig> for PipelineConfig {
    fn from(config: &RunConfig) -> Self {
        Self {
            census_year: config.census_year,
        }
    }
}

/// Counters for one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub geocoded: usize,
    /// Geocodes where the service offered more than one candidate
    pub ambiguous: usize,
    pub resolved: usize,
    pub geocode_failures: BTreeMap<&'static str, usize>,
    pub resolve_failures: BTreeMap<&'static str, usize>,
    /// Matched addresses per table, in load order
    pub table_matches: Vec<(String, usize)>,
}

impl RunSummary {
    fn new(total: usize, table_names: Vec<String>) -> Self {
        Self {
            total,
            table_matches: table_names.into_iter().map(|name| (name, 0)).collect(),
            ..Self::default()
        }
    }
}

/// Records of a run plus its summary
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub records: Vec<EnrichedRecord>,
    pub summary: RunSummary,
}

/// What happened to one address, for the summary
struct AddressTrace {
    record: EnrichedRecord,
    ambiguous: bool,
    geocode_error: Option<&'static str>,
    resolve_error: Option<&'static str>,
}

/// Pipeline orchestrator
///
/// Depends only on the three lookup capabilities so tests can substitute
/// deterministic fakes for the remote services.
pub struct EnrichmentPipeline {
    config: PipelineConfig,
    geocoder: Arc<dyn Geocoder>,
    resolver: Arc<dyn GeographyResolver>,
    tables: Arc<dyn ScoreLookup>,
}

impl EnrichmentPipeline {
    pub fn new(
        config: PipelineConfig,
        geocoder: Arc<dyn Geocoder>,
        resolver: Arc<dyn GeographyResolver>,
        tables: Arc<dyn ScoreLookup>,
    ) -> Self {
        Self {
            config,
            geocoder,
            resolver,
            tables,
        }
    }

    /// Process every address sequentially
    pub async fn run(&self, addresses: &[Address]) -> RunOutcome {
        let total = addresses.len();
        let mut summary = RunSummary::new(total, self.tables.table_names());
        let mut records = Vec::with_capacity(total);

        info!(
            addresses = total,
            census_year = self.config.census_year.get(),
            "Starting enrichment run"
        );

        for (i, address) in addresses.iter().enumerate() {
            let index = i + 1;
            let span = tracing::info_span!("address", index = index, total = total);
            let trace = self.process(address).instrument(span).await;

            if trace.record.coordinate.is_some() {
                summary.geocoded += 1;
            }
            if trace.ambiguous {
                summary.ambiguous += 1;
            }
            if trace.record.geo_id.is_some() {
                summary.resolved += 1;
            }
            if let Some(kind) = trace.geocode_error {
                *summary.geocode_failures.entry(kind).or_default() += 1;
            }
            if let Some(kind) = trace.resolve_error {
                *summary.resolve_failures.entry(kind).or_default() += 1;
            }
            for (slot, result) in summary.table_matches.iter_mut().zip(&trace.record.tables) {
                if result.result.is_found() {
                    slot.1 += 1;
                }
            }

            records.push(trace.record);
        }

        info!(
            total = summary.total,
            geocoded = summary.geocoded,
            resolved = summary.resolved,
            "Enrichment run finished"
        );

        RunOutcome { records, summary }
    }

    /// Enrich a single address
    pub async fn enrich(&self, address: &Address) -> EnrichedRecord {
        self.process(address).await.record
    }

    async fn process(&self, address: &Address) -> AddressTrace {
        let mut ambiguous = false;
        let mut geocode_error = None;
        let mut resolve_error = None;

        // Step 1: geocode
        info!("Getting latitude/longitude coordinates");
        let coordinate: Option<Coordinate> = match self.geocoder.geocode(address).await {
            Ok(geocoded) => {
                ambiguous = geocoded.is_ambiguous();
                debug!(coordinate = %geocoded.coordinate, "Geocoded address");
                Some(geocoded.coordinate)
            }
            Err(e) => {
                log_geocode_failure(&e);
                geocode_error = Some(e.kind());
                None
            }
        };

        // Step 2: block lookup
        let geo_id: Option<GeoIdentifier> = match coordinate {
            Some(coordinate) => {
                info!("Getting FIPS code");
                match self
                    .resolver
                    .resolve(coordinate, self.config.census_year)
                    .await
                {
                    Ok(id) => {
                        debug!(fips = %id, "Resolved FIPS code");
                        Some(id)
                    }
                    Err(e) => {
                        warn!(error = %e, kind = e.kind(), "FIPS lookup failed");
                        resolve_error = Some(e.kind());
                        None
                    }
                }
            }
            None => {
                debug!("No coordinates, skipping FIPS lookup");
                None
            }
        };

        // Step 3: table join
        info!("Looking up ADI rankings");
        let tables = self.tables.lookup(geo_id.as_ref());
        let matched = tables.iter().filter(|t| t.result.is_found()).count();
        debug!(matched = matched, tables = tables.len(), "ADI lookup complete");

        // Step 4: emit
        AddressTrace {
            record: EnrichedRecord {
                address: address.clone(),
                coordinate,
                geo_id,
                tables,
            },
            ambiguous,
            geocode_error,
            resolve_error,
        }
    }
}

fn log_geocode_failure(e: &GeocodeError) {
    match e {
        GeocodeError::InvalidApiKey(_) | GeocodeError::QuotaExceeded(_) => {
            error!(error = %e, kind = e.kind(), "Geocoding failed")
        }
        GeocodeError::Ineligible(_) => {
            warn!(error = %e, kind = e.kind(), "Skipping geocoding")
        }
        _ => warn!(error = %e, kind = e.kind(), "Geocoding failed"),
    }
}
