//! Geocoding API key resolution
//!
//! **Priority:** ENV → secrets file
//!
//! The secrets file is a JSON object with a single `google_cloud_api_key`
//! field. A missing file is created by bootstrap with a placeholder value.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

/// Environment variable overriding the secrets file
pub const API_KEY_ENV_VAR: &str = "ADI_GOOGLE_API_KEY";

/// Value written into a freshly created secrets file
pub const API_KEY_PLACEHOLDER: &str = "YOUR_API_KEY_HERE";

/// Contents of `secrets.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretsFile {
    #[serde(default)]
    pub google_cloud_api_key: Option<String>,
}

impl SecretsFile {
    pub fn placeholder() -> Self {
        Self {
            google_cloud_api_key: Some(API_KEY_PLACEHOLDER.to_string()),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Validate API key (non-empty, non-whitespace, not the placeholder)
pub fn is_valid_key(key: &str) -> bool {
    let key = key.trim();
    !key.is_empty() && key != API_KEY_PLACEHOLDER
}

/// Resolve the geocoding API key from the environment or the secrets file
pub fn resolve_api_key(secrets_path: &Path) -> Result<String> {
    let env_key = std::env::var(API_KEY_ENV_VAR).ok();

    let file_key = if secrets_path.is_file() {
        SecretsFile::load(secrets_path)?.google_cloud_api_key
    } else {
        None
    };

    let env_valid = env_key.as_deref().filter(|k| is_valid_key(k));
    let file_valid = file_key.as_deref().filter(|k| is_valid_key(k));

    if env_valid.is_some() && file_valid.is_some() {
        warn!(
            "Geocoding API key found in both {} and {}. Using environment (highest priority).",
            API_KEY_ENV_VAR,
            secrets_path.display()
        );
    }

    if let Some(key) = env_valid {
        info!("Geocoding API key loaded from environment variable");
        return Ok(key.trim().to_string());
    }

    if let Some(key) = file_valid {
        info!("Geocoding API key loaded from {}", secrets_path.display());
        return Ok(key.trim().to_string());
    }

    Err(Error::Config(format!(
        "Google geocoding API key not configured. Please configure using one of:\n\
         1. Secrets file: {} (\"google_cloud_api_key\": \"your-key\")\n\
         2. Environment: {}=your-key-here",
        secrets_path.display(),
        API_KEY_ENV_VAR
    )))
}
