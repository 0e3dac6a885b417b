//! Google Geocoding API client
//!
//! Converts an [`Address`] into a [`Coordinate`]. One request per address,
//! never retried inside a run; each call spends one unit of the API quota.

use super::excerpt;
use super::rate_limiter::RateLimiter;
use crate::models::{Address, Coordinate, Ineligibility};
use adi_common::config::HttpConfig;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub const GOOGLE_GEOCODE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";
const USER_AGENT: &str = concat!("adi-enrich/", env!("CARGO_PKG_VERSION"));

/// Geocoding client errors
#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("Address not eligible for geocoding: {0}")]
    Ineligible(Ineligibility),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Invalid API key: {0}")]
    InvalidApiKey(String),

    #[error("No results found for address")]
    NoResults,

    #[error("Query quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("API error {0}: {1}")]
    ApiError(String, String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

impl GeocodeError {
    /// Short stable label used in logs and the run summary
    pub fn kind(&self) -> &'static str {
        match self {
            GeocodeError::Ineligible(_) => "ineligible",
            GeocodeError::NetworkError(_) => "network",
            GeocodeError::InvalidApiKey(_) => "invalid_api_key",
            GeocodeError::NoResults => "no_results",
            GeocodeError::QuotaExceeded(_) => "quota_exceeded",
            GeocodeError::ApiError(_, _) => "api",
            GeocodeError::ParseError(_) => "parse",
        }
    }
}

/// Successful geocode of one address
#[derive(Debug, Clone, PartialEq)]
pub struct Geocoded {
    pub coordinate: Coordinate,
    /// Address string the service resolved to
    pub formatted_address: Option<String>,
    /// Number of candidates returned; the first one is used
    pub candidates: usize,
    pub partial_match: bool,
}

impl Geocoded {
    pub fn is_ambiguous(&self) -> bool {
        self.candidates > 1
    }
}

/// Capability: resolve Address → Coordinate
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, address: &Address) -> Result<Geocoded, GeocodeError>;
}

/// Geocoding API response
#[derive(Debug, Clone, Deserialize)]
pub struct GeocodeResponse {
    pub status: String,
    #[serde(default)]
    pub results: Vec<GeocodeResult>,
    #[serde(default)]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeocodeResult {
    #[serde(default)]
    pub formatted_address: Option<String>,
    pub geometry: GeocodeGeometry,
    #[serde(default)]
    pub partial_match: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeocodeGeometry {
    pub location: GeocodeLocation,
    #[serde(default)]
    pub location_type: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct GeocodeLocation {
    pub lat: f64,
    pub lng: f64,
}

/// Google Geocoding API client
pub struct GoogleGeocodingClient {
    http_client: reqwest::Client,
    rate_limiter: Arc<RateLimiter>,
    api_key: String,
    base_url: String,
}

impl GoogleGeocodingClient {
    pub fn new(api_key: String, http: &HttpConfig) -> Result<Self, GeocodeError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(http.request_timeout_secs))
            .build()
            .map_err(|e| GeocodeError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            rate_limiter: Arc::new(RateLimiter::new(
                http.request_interval_ms,
                http.request_jitter_ms,
            )),
            api_key,
            base_url: GOOGLE_GEOCODE_URL.to_string(),
        })
    }

    /// Point the client at another endpoint (local test servers)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Query the geocoder with a formatted address string
    pub async fn lookup(&self, query: &str) -> Result<GeocodeResponse, GeocodeError> {
        self.rate_limiter.wait().await;

        tracing::debug!(query = %query, "Querying geocoding API");

        let response = self
            .http_client
            .get(&self.base_url)
            .query(&[("address", query), ("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| GeocodeError::NetworkError(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GeocodeError::NetworkError(e.to_string()))?;

        tracing::debug!(
            status_code = status.as_u16(),
            body = %excerpt(&body, 500),
            "Geocoding API response"
        );

        if status == 401 || status == 403 {
            return Err(GeocodeError::InvalidApiKey(excerpt(&body, 200)));
        }

        if !status.is_success() {
            return Err(GeocodeError::ApiError(
                format!("HTTP {}", status.as_u16()),
                excerpt(&body, 200),
            ));
        }

        serde_json::from_str(&body)
            .map_err(|e| GeocodeError::ParseError(format!("{}: {}", e, excerpt(&body, 200))))
    }
}

#[async_trait]
impl Geocoder for GoogleGeocodingClient {
    async fn geocode(&self, address: &Address) -> Result<Geocoded, GeocodeError> {
        address.eligibility().map_err(GeocodeError::Ineligible)?;
        let response = self.lookup(&address.full_address()).await?;
        interpret_response(response)
    }
}

/// Map a decoded response to a coordinate or a classified failure
pub fn interpret_response(response: GeocodeResponse) -> Result<Geocoded, GeocodeError> {
    let message = response.error_message.clone().unwrap_or_default();

    match response.status.as_str() {
        "OK" => {}
        "ZERO_RESULTS" => return Err(GeocodeError::NoResults),
        "REQUEST_DENIED" => return Err(GeocodeError::InvalidApiKey(message)),
        "OVER_QUERY_LIMIT" | "OVER_DAILY_LIMIT" => {
            return Err(GeocodeError::QuotaExceeded(message))
        }
        other => return Err(GeocodeError::ApiError(other.to_string(), message)),
    }

    let candidates = response.results.len();
    let first = response
        .results
        .into_iter()
        .next()
        .ok_or(GeocodeError::NoResults)?;

    if candidates > 1 {
        tracing::warn!(
            candidates = candidates,
            chosen = first.formatted_address.as_deref().unwrap_or(""),
            "Geocoder returned multiple candidates, using the first"
        );
    }

    if first.partial_match {
        tracing::warn!(
            chosen = first.formatted_address.as_deref().unwrap_or(""),
            "Geocoder returned a partial match"
        );
    }

    let location = first.geometry.location;
    Ok(Geocoded {
        coordinate: Coordinate::new(location.lat, location.lng),
        formatted_address: first.formatted_address,
        candidates,
        partial_match: first.partial_match,
    })
}
