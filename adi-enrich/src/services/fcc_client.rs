//! FCC Area API client (Census block lookup)
//!
//! Resolves a [`Coordinate`] to the 12-digit block-group [`GeoIdentifier`] for
//! a census vintage. The service is free and keyless.

use super::excerpt;
use super::rate_limiter::RateLimiter;
use crate::models::{Coordinate, GeoIdentifier, InvalidGeoIdentifier};
use adi_common::config::HttpConfig;
use adi_common::CensusYear;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub const FCC_BLOCK_URL: &str = "https://geo.fcc.gov/api/census/block/find";
const USER_AGENT: &str = concat!("adi-enrich/", env!("CARGO_PKG_VERSION"));

/// FCC client errors
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("No census block found for coordinate")]
    NoBlock,

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("API error {0}: {1}")]
    ApiError(String, String),

    #[error(transparent)]
    InvalidFips(#[from] InvalidGeoIdentifier),
}

impl ResolveError {
    pub fn kind(&self) -> &'static str {
        match self {
            ResolveError::NetworkError(_) => "network",
            ResolveError::NoBlock => "no_block",
            ResolveError::UnexpectedResponse(_) => "unexpected_response",
            ResolveError::ApiError(_, _) => "api",
            ResolveError::InvalidFips(_) => "invalid_fips",
        }
    }
}

/// Capability: resolve Coordinate → GeoIdentifier
#[async_trait]
pub trait GeographyResolver: Send + Sync {
    async fn resolve(
        &self,
        coordinate: Coordinate,
        census_year: CensusYear,
    ) -> Result<GeoIdentifier, ResolveError>;
}

/// Block lookup response
#[derive(Debug, Clone, Deserialize)]
pub struct BlockResponse {
    #[serde(rename = "Block", default)]
    pub block: Option<BlockInfo>,
    #[serde(rename = "County", default)]
    pub county: Option<AreaInfo>,
    #[serde(rename = "State", default)]
    pub state: Option<AreaInfo>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(rename = "statusMessage", default)]
    pub status_message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlockInfo {
    #[serde(rename = "FIPS", default)]
    pub fips: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AreaInfo {
    #[serde(rename = "FIPS", default)]
    pub fips: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// FCC Area API client
pub struct FccBlockClient {
    http_client: reqwest::Client,
    rate_limiter: Arc<RateLimiter>,
    base_url: String,
}

impl FccBlockClient {
    pub fn new(http: &HttpConfig) -> Result<Self, ResolveError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(http.request_timeout_secs))
            .build()
            .map_err(|e| ResolveError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            rate_limiter: Arc::new(RateLimiter::new(
                http.request_interval_ms,
                http.request_jitter_ms,
            )),
            base_url: FCC_BLOCK_URL.to_string(),
        })
    }

    /// Point the client at another endpoint (local test servers)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Fetch the raw block record for a coordinate
    pub async fn find_block(
        &self,
        coordinate: Coordinate,
        census_year: CensusYear,
    ) -> Result<BlockResponse, ResolveError> {
        self.rate_limiter.wait().await;

        let params = [
            ("latitude", coordinate.latitude.to_string()),
            ("longitude", coordinate.longitude.to_string()),
            ("censusYear", census_year.to_string()),
            ("format", "json".to_string()),
        ];

        tracing::debug!(
            latitude = coordinate.latitude,
            longitude = coordinate.longitude,
            census_year = census_year.get(),
            "Querying FCC block API"
        );

        let response = self
            .http_client
            .get(&self.base_url)
            .query(&params)
            .send()
            .await
            .map_err(|e| ResolveError::NetworkError(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ResolveError::NetworkError(e.to_string()))?;

        tracing::debug!(
            status_code = status.as_u16(),
            body = %excerpt(&body, 500),
            "FCC block API response"
        );

        if !status.is_success() {
            return Err(ResolveError::ApiError(
                format!("HTTP {}", status.as_u16()),
                excerpt(&body, 200),
            ));
        }

        serde_json::from_str(&body)
            .map_err(|_| ResolveError::UnexpectedResponse(excerpt(&body, 200)))
    }
}

#[async_trait]
impl GeographyResolver for FccBlockClient {
    async fn resolve(
        &self,
        coordinate: Coordinate,
        census_year: CensusYear,
    ) -> Result<GeoIdentifier, ResolveError> {
        let response = self.find_block(coordinate, census_year).await?;
        interpret_response(response)
    }
}

/// Extract the block-group identifier from a block record
pub fn interpret_response(response: BlockResponse) -> Result<GeoIdentifier, ResolveError> {
    if let Some(status) = response.status.as_deref() {
        if !status.eq_ignore_ascii_case("OK") {
            return Err(ResolveError::ApiError(
                status.to_string(),
                response.status_message.unwrap_or_default(),
            ));
        }
    }

    let block = response.block.ok_or_else(|| {
        ResolveError::UnexpectedResponse("response has no Block record".to_string())
    })?;

    match block.fips.as_deref().map(str::trim) {
        Some(fips) if !fips.is_empty() => Ok(GeoIdentifier::from_block_fips(fips)?),
        _ => Err(ResolveError::NoBlock),
    }
}
