//! Configuration loading and run settings resolution
//!
//! Settings are resolved in priority order:
//! 1. Command-line arguments (highest priority)
//! 2. Environment variables (`ADI_CONFIG` for the config file location)
//! 3. TOML config file (`--config`, `ADI_CONFIG`, `<work_dir>/adi-enrich.toml`,
//!    then `~/.config/adi-enrich/config.toml`)
//! 4. Built-in defaults (fallback)
//!
//! The resolved [`RunConfig`] is an explicit value handed to the pipeline and
//! clients; nothing reads configuration from ambient state after startup.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Config file name looked up inside the work directory
pub const DEFAULT_CONFIG_FILE_NAME: &str = "adi-enrich.toml";

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "ADI_CONFIG";

pub const DEFAULT_ADDRESSES_FILE: &str = "addresses.csv";
pub const DEFAULT_SECRETS_FILE: &str = "secrets.json";
pub const DEFAULT_REFERENCE_DIR: &str = "adi-data";

/// US Census vintage used for FIPS lookups
///
/// The FCC block API serves the 2010 and 2020 census geographies only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct CensusYear(u16);

impl CensusYear {
    pub const SUPPORTED: [u16; 2] = [2010, 2020];

    pub fn new(year: u16) -> Result<Self> {
        if Self::SUPPORTED.contains(&year) {
            Ok(Self(year))
        } else {
            Err(Error::Config(format!(
                "Unsupported census year {} (supported: 2010, 2020)",
                year
            )))
        }
    }

    pub fn get(self) -> u16 {
        self.0
    }
}

impl Default for CensusYear {
    fn default() -> Self {
        Self(2020)
    }
}

impl fmt::Display for CensusYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u16> for CensusYear {
    type Error = Error;

    fn try_from(year: u16) -> Result<Self> {
        Self::new(year)
    }
}

impl From<CensusYear> for u16 {
    fn from(year: CensusYear) -> u16 {
        year.0
    }
}

/// Settings file loaded from TOML
///
/// Every field is optional; missing values fall back to built-in defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Folder holding the address file, secrets and reference data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_dir: Option<PathBuf>,

    /// Census vintage requested from the FCC block API
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub census_year: Option<CensusYear>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub addresses_file: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secrets_file: Option<PathBuf>,

    /// Folder of downloaded ADI spreadsheets
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_dir: Option<PathBuf>,

    /// Folder receiving the timestamped output file (defaults to work_dir)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,

    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Request pacing and timeouts for the remote services
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Minimum delay between two requests to the same service
    #[serde(default = "default_request_interval_ms")]
    pub request_interval_ms: u64,

    /// Upper bound of the random delay added on top of the interval
    #[serde(default = "default_request_jitter_ms")]
    pub request_jitter_ms: u64,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_interval_ms: default_request_interval_ms(),
            request_jitter_ms: default_request_jitter_ms(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, console only if not specified)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_request_interval_ms() -> u64 {
    500
}

fn default_request_jitter_ms() -> u64 {
    1000
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub work_dir: Option<PathBuf>,
    pub config_file: Option<PathBuf>,
    pub census_year: Option<CensusYear>,
    pub output_dir: Option<PathBuf>,
    pub log_level: Option<String>,
}

/// Fully resolved settings for one run
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub work_dir: PathBuf,
    pub census_year: CensusYear,
    pub addresses_file: PathBuf,
    pub secrets_file: PathBuf,
    pub reference_dir: PathBuf,
    pub output_dir: PathBuf,
    pub http: HttpConfig,
    pub logging: LoggingConfig,
    /// Config file the settings were read from, if any
    pub source: Option<PathBuf>,
}

impl RunConfig {
    /// Resolve run settings from CLI overrides, the discovered TOML file and defaults
    pub fn resolve(overrides: ConfigOverrides) -> Result<Self> {
        let cli_work_dir = match &overrides.work_dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir()?,
        };

        let source = locate_config_file(overrides.config_file.as_deref(), &cli_work_dir)?;
        let toml_config = match &source {
            Some(path) => load_toml_config(path)?,
            None => {
                debug!("No config file found, using built-in defaults");
                TomlConfig::default()
            }
        };

        Self::from_parts(overrides, toml_config, cli_work_dir, source)
    }

    /// Merge overrides over a loaded TOML config
    pub fn from_parts(
        overrides: ConfigOverrides,
        toml_config: TomlConfig,
        cli_work_dir: PathBuf,
        source: Option<PathBuf>,
    ) -> Result<Self> {
        let work_dir = match (overrides.work_dir, toml_config.work_dir) {
            (Some(dir), _) => dir,
            (None, Some(dir)) => resolve_path(&cli_work_dir, &dir),
            (None, None) => cli_work_dir,
        };

        let census_year = overrides
            .census_year
            .or(toml_config.census_year)
            .unwrap_or_default();

        let addresses_file = resolve_path(
            &work_dir,
            toml_config
                .addresses_file
                .as_deref()
                .unwrap_or_else(|| Path::new(DEFAULT_ADDRESSES_FILE)),
        );
        let secrets_file = resolve_path(
            &work_dir,
            toml_config
                .secrets_file
                .as_deref()
                .unwrap_or_else(|| Path::new(DEFAULT_SECRETS_FILE)),
        );
        let reference_dir = resolve_path(
            &work_dir,
            toml_config
                .reference_dir
                .as_deref()
                .unwrap_or_else(|| Path::new(DEFAULT_REFERENCE_DIR)),
        );
        let output_dir = match overrides.output_dir.or(toml_config.output_dir) {
            Some(dir) => resolve_path(&work_dir, &dir),
            None => work_dir.clone(),
        };

        let mut logging = toml_config.logging;
        if let Some(level) = overrides.log_level {
            logging.level = level;
        }
        if let Some(file) = logging.file.take() {
            logging.file = Some(resolve_path(&work_dir, &file));
        }

        if toml_config.http.request_timeout_secs == 0 {
            return Err(Error::Config(
                "http.request_timeout_secs must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            work_dir,
            census_year,
            addresses_file,
            secrets_file,
            reference_dir,
            output_dir,
            http: toml_config.http,
            logging,
            source,
        })
    }
}

/// Find the config file to load
///
/// An explicitly named file (argument or `ADI_CONFIG`) must exist; the
/// implicit locations are optional.
pub fn locate_config_file(explicit: Option<&Path>, work_dir: &Path) -> Result<Option<PathBuf>> {
    if let Some(path) = explicit {
        return require_file(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return require_file(PathBuf::from(path));
        }
    }

    let local = work_dir.join(DEFAULT_CONFIG_FILE_NAME);
    if local.is_file() {
        return Ok(Some(local));
    }

    if let Some(user) = dirs::config_dir().map(|d| d.join("adi-enrich").join("config.toml")) {
        if user.is_file() {
            return Ok(Some(user));
        }
    }

    Ok(None)
}

fn require_file(path: PathBuf) -> Result<Option<PathBuf>> {
    if path.is_file() {
        Ok(Some(path))
    } else {
        Err(Error::Config(format!(
            "Config file not found: {}",
            path.display()
        )))
    }
}

/// Load and parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML {} failed: {}", path.display(), e)))?;
    let config = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML {} failed: {}", path.display(), e)))?;
    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Write a TOML config atomically (temp file + rename)
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;
    write_atomic(path, &content)
}

/// Default config file with every setting spelled out
pub fn default_config_template() -> Result<String> {
    let config = TomlConfig {
        work_dir: None,
        census_year: Some(CensusYear::default()),
        addresses_file: Some(PathBuf::from(DEFAULT_ADDRESSES_FILE)),
        secrets_file: Some(PathBuf::from(DEFAULT_SECRETS_FILE)),
        reference_dir: Some(PathBuf::from(DEFAULT_REFERENCE_DIR)),
        output_dir: None,
        http: HttpConfig::default(),
        logging: LoggingConfig::default(),
    };
    let body = toml::to_string_pretty(&config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;
    Ok(format!(
        "# adi-enrich configuration\n\
         # Relative paths are resolved against the work directory.\n\
         # census_year must be 2010 or 2020.\n\n{}",
        body
    ))
}

/// Write text to `path` via a sibling temp file and rename
pub fn write_atomic(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);
    std::fs::write(&tmp_path, content)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

fn resolve_path(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_census_year_rejects_unsupported_vintage() {
        assert!(CensusYear::new(2020).is_ok());
        assert!(CensusYear::new(2010).is_ok());
        assert!(matches!(CensusYear::new(2015), Err(Error::Config(_))));
    }

    #[test]
    fn test_census_year_in_toml() {
        let config: TomlConfig = toml::from_str("census_year = 2010").unwrap();
        assert_eq!(config.census_year, Some(CensusYear::new(2010).unwrap()));

        assert!(toml::from_str::<TomlConfig>("census_year = 2000").is_err());
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config: TomlConfig = toml::from_str("").unwrap();
        assert_eq!(config, TomlConfig::default());
        assert_eq!(config.http.request_interval_ms, 500);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_default_template_parses_back() {
        let template = default_config_template().unwrap();
        let config: TomlConfig = toml::from_str(&template).unwrap();
        assert_eq!(config.census_year, Some(CensusYear::default()));
        assert_eq!(config.reference_dir, Some(PathBuf::from("adi-data")));
    }
}
