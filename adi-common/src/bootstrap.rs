//! First-run scaffolding
//!
//! Creates the address file, secrets file and reference-data folder when they
//! are missing. Running it again on a populated work directory changes nothing.

use crate::config::RunConfig;
use crate::secrets::SecretsFile;
use crate::Result;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Header of the address input file, in column order
pub const ADDRESS_COLUMNS: [&str; 5] = ["street", "apt_num", "city", "state", "zip"];

/// A scaffolding item created by [`Bootstrapper::ensure`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scaffold {
    AddressFile(PathBuf),
    SecretsFile(PathBuf),
    ReferenceDir(PathBuf),
}

impl fmt::Display for Scaffold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scaffold::AddressFile(path) => write!(
                f,
                "Address file created at {}. Add one address per row (street,apt_num,city,state,zip).",
                path.display()
            ),
            Scaffold::SecretsFile(path) => write!(
                f,
                "Secrets file created at {}. Replace the placeholder with your Google Cloud API key.",
                path.display()
            ),
            Scaffold::ReferenceDir(path) => write!(
                f,
                "Reference data folder created at {}. Download ADI CSV files from the Neighborhood Atlas into it.",
                path.display()
            ),
        }
    }
}

/// Items created during bootstrap
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootstrapReport {
    pub created: Vec<Scaffold>,
}

impl BootstrapReport {
    pub fn is_empty(&self) -> bool {
        self.created.is_empty()
    }

    pub fn created_address_file(&self) -> bool {
        self.created
            .iter()
            .any(|s| matches!(s, Scaffold::AddressFile(_)))
    }

    pub fn created_secrets_file(&self) -> bool {
        self.created
            .iter()
            .any(|s| matches!(s, Scaffold::SecretsFile(_)))
    }
}

/// Idempotent initializer for the work directory layout
pub struct Bootstrapper {
    addresses_file: PathBuf,
    secrets_file: PathBuf,
    reference_dir: PathBuf,
}

impl Bootstrapper {
    pub fn new(addresses_file: PathBuf, secrets_file: PathBuf, reference_dir: PathBuf) -> Self {
        Self {
            addresses_file,
            secrets_file,
            reference_dir,
        }
    }

    pub fn from_config(config: &RunConfig) -> Self {
        Self::new(
            config.addresses_file.clone(),
            config.secrets_file.clone(),
            config.reference_dir.clone(),
        )
    }

    /// Create whatever is missing and report it
    pub fn ensure(&self) -> Result<BootstrapReport> {
        let mut report = BootstrapReport::default();

        if !self.addresses_file.is_file() {
            write_address_template(&self.addresses_file)?;
            info!("Address file not found, created template: {}", self.addresses_file.display());
            report
                .created
                .push(Scaffold::AddressFile(self.addresses_file.clone()));
        }

        if !self.secrets_file.is_file() {
            ensure_parent(&self.secrets_file)?;
            let text = serde_json::to_string_pretty(&SecretsFile::placeholder())?;
            std::fs::write(&self.secrets_file, text)?;
            info!("Secrets file not found, created template: {}", self.secrets_file.display());
            report
                .created
                .push(Scaffold::SecretsFile(self.secrets_file.clone()));
        }

        if !self.reference_dir.is_dir() {
            std::fs::create_dir_all(&self.reference_dir)?;
            info!("Reference data folder not found, created: {}", self.reference_dir.display());
            report
                .created
                .push(Scaffold::ReferenceDir(self.reference_dir.clone()));
        }

        debug!(created = report.created.len(), "Bootstrap complete");
        Ok(report)
    }
}

fn write_address_template(path: &Path) -> Result<()> {
    ensure_parent(path)?;
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(ADDRESS_COLUMNS)?;
    writer.flush()?;
    Ok(())
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
