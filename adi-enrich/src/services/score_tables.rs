//! ADI reference tables
//!
//! Each CSV file downloaded from the Neighborhood Atlas becomes one
//! independent [`ScoreTable`] named after the file stem. Tables are never
//! merged: vintages differ and a block group may appear in several of them.
//!
//! # Key column
//! `FIPS` when present, otherwise `GISJOIN` converted to FIPS. Every other
//! named column becomes a score field, values kept verbatim so suppression
//! codes (`GQ`, `PH`, `QDI`, ...) survive.
//!
//! # Failure policy
//! A missing or empty folder yields zero tables. A file that cannot be parsed
//! is skipped with a warning; the remaining files still load.

use super::result_writer::TableColumns;
use crate::models::{GeoIdentifier, InvalidGeoIdentifier, ScoreSet, TableMatch, TableResult};
use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

pub const FIPS_COLUMN: &str = "FIPS";
pub const GISJOIN_COLUMN: &str = "GISJOIN";

/// Reference table loading errors
#[derive(Debug, Error)]
pub enum TableLoadError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Table has neither a FIPS nor a GISJOIN column")]
    MissingKeyColumn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyColumn {
    Fips(usize),
    Gisjoin(usize),
}

/// One loaded ADI spreadsheet
#[derive(Debug, Clone)]
pub struct ScoreTable {
    name: String,
    fields: Vec<String>,
    rows: HashMap<GeoIdentifier, Vec<String>>,
}

impl ScoreTable {
    pub fn new(name: impl Into<String>, fields: Vec<String>) -> Self {
        Self {
            name: name.into(),
            fields,
            rows: HashMap::new(),
        }
    }

    /// Add or replace the scores for an identifier
    ///
    /// `values` must follow the order of [`ScoreTable::fields`].
    pub fn insert(&mut self, id: GeoIdentifier, values: Vec<String>) -> Option<Vec<String>> {
        self.rows.insert(id, values)
    }

    /// Parse a table from CSV text
    pub fn from_reader<R: Read>(name: impl Into<String>, reader: R) -> Result<Self, TableLoadError> {
        let name = name.into();
        let mut csv_reader = csv::ReaderBuilder::new().from_reader(reader);

        let headers: Vec<String> = csv_reader
            .headers()?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
            .collect();

        let key = key_column(&headers).ok_or(TableLoadError::MissingKeyColumn)?;
        let score_columns: Vec<usize> = headers
            .iter()
            .enumerate()
            .filter(|(_, h)| !h.is_empty() && !is_key_header(h))
            .map(|(i, _)| i)
            .collect();
        let fields = score_columns.iter().map(|&i| headers[i].clone()).collect();

        let mut table = Self::new(name, fields);
        let mut invalid_keys = 0usize;
        let mut duplicates = 0usize;

        for record in csv_reader.records() {
            let record = record?;
            let raw_key = match key {
                KeyColumn::Fips(i) | KeyColumn::Gisjoin(i) => record.get(i).unwrap_or(""),
            };
            let id = match parse_key(key, raw_key) {
                Ok(id) => id,
                Err(e) => {
                    debug!(table = %table.name, error = %e, "Skipping row with invalid key");
                    invalid_keys += 1;
                    continue;
                }
            };
            let values = score_columns
                .iter()
                .map(|&i| record.get(i).unwrap_or("").trim().to_string())
                .collect();
            if table.insert(id, values).is_some() {
                duplicates += 1;
            }
        }

        if invalid_keys > 0 {
            warn!(table = %table.name, rows = invalid_keys, "Skipped rows without a valid FIPS key");
        }
        if duplicates > 0 {
            warn!(table = %table.name, rows = duplicates, "Duplicate FIPS keys, later rows win");
        }

        Ok(table)
    }

    /// Load a table from a CSV file, named after the file stem
    pub fn from_path(path: &Path) -> Result<Self, TableLoadError> {
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let file = std::fs::File::open(path).map_err(|source| TableLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(name, file)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Score field names in column order
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Exact match on the full 12-digit identifier
    pub fn lookup(&self, id: &GeoIdentifier) -> TableMatch {
        match self.rows.get(id) {
            Some(values) => TableMatch::Found(ScoreSet::new(
                self.fields
                    .iter()
                    .cloned()
                    .zip(values.iter().cloned())
                    .collect(),
            )),
            None => TableMatch::NotFound,
        }
    }
}

fn is_key_header(header: &str) -> bool {
    header.eq_ignore_ascii_case(FIPS_COLUMN) || header.eq_ignore_ascii_case(GISJOIN_COLUMN)
}

fn key_column(headers: &[String]) -> Option<KeyColumn> {
    let position = |name: &str| headers.iter().position(|h| h.eq_ignore_ascii_case(name));
    position(FIPS_COLUMN)
        .map(KeyColumn::Fips)
        .or_else(|| position(GISJOIN_COLUMN).map(KeyColumn::Gisjoin))
}

fn parse_key(key: KeyColumn, raw: &str) -> Result<GeoIdentifier, InvalidGeoIdentifier> {
    match key {
        KeyColumn::Fips(_) => {
            let raw = raw.trim();
            // Spreadsheet tools drop the leading zero of states 01-09
            if raw.len() == GeoIdentifier::LEN - 1 && raw.bytes().all(|b| b.is_ascii_digit()) {
                GeoIdentifier::parse(&format!("0{}", raw))
            } else {
                GeoIdentifier::parse(raw)
            }
        }
        KeyColumn::Gisjoin(_) => GeoIdentifier::from_gisjoin(raw),
    }
}

/// A reference file that was not loaded
#[derive(Debug)]
pub struct SkippedTable {
    pub path: PathBuf,
    pub error: TableLoadError,
}

/// Outcome of loading a reference folder
#[derive(Debug, Default)]
pub struct LoadReport {
    pub loaded: Vec<PathBuf>,
    pub skipped: Vec<SkippedTable>,
}

/// Capability: resolve GeoIdentifier → per-table scores
pub trait ScoreLookup: Send + Sync {
    /// Table names in load order
    fn table_names(&self) -> Vec<String>;

    /// One result per table; an absent identifier is "not found" everywhere
    fn lookup(&self, id: Option<&GeoIdentifier>) -> Vec<TableResult>;
}

/// All tables loaded for a run (read-only after load)
#[derive(Debug, Clone, Default)]
pub struct ScoreTables {
    tables: Vec<ScoreTable>,
}

impl ScoreTables {
    pub fn new(tables: Vec<ScoreTable>) -> Self {
        Self { tables }
    }

    /// Load every `.csv` file in `dir`, ordered by file name
    pub fn load_dir(dir: &Path) -> Result<(Self, LoadReport), TableLoadError> {
        let mut report = LoadReport::default();

        if !dir.is_dir() {
            warn!("Reference data folder not found: {}", dir.display());
            return Ok((Self::default(), report));
        }

        let io_err = |source| TableLoadError::Io {
            path: dir.to_path_buf(),
            source,
        };
        let mut paths: Vec<PathBuf> = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            let is_csv = path
                .extension()
                .map(|ext| ext.eq_ignore_ascii_case("csv"))
                .unwrap_or(false);
            if path.is_file() && is_csv {
                paths.push(path);
            }
        }
        paths.sort();

        if paths.is_empty() {
            warn!("No ADI CSV files found in {}", dir.display());
        }

        let mut tables: Vec<ScoreTable> = Vec::with_capacity(paths.len());
        for path in paths {
            match ScoreTable::from_path(&path) {
                Ok(mut table) => {
                    // `US.csv` and `US.CSV` share a stem; keep column names distinct
                    if tables.iter().any(|t| t.name == table.name) {
                        if let Some(file_name) = path.file_name() {
                            table.name = file_name.to_string_lossy().into_owned();
                        }
                        warn!(table = %table.name, "Table name already in use, using the file name");
                    }
                    info!(
                        table = %table.name(),
                        rows = table.len(),
                        fields = table.fields().len(),
                        "Loaded ADI table"
                    );
                    tables.push(table);
                    report.loaded.push(path);
                }
                Err(error) => {
                    warn!(
                        file = %path.display(),
                        error = %error,
                        "Skipping ADI file that failed to parse"
                    );
                    report.skipped.push(SkippedTable { path, error });
                }
            }
        }

        Ok((Self::new(tables), report))
    }

    pub fn tables(&self) -> &[ScoreTable] {
        &self.tables
    }

    /// Output column layout, one entry per table
    pub fn columns(&self) -> Vec<TableColumns> {
        self.tables
            .iter()
            .map(|t| TableColumns {
                name: t.name().to_string(),
                fields: t.fields().to_vec(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl ScoreLookup for ScoreTables {
    fn table_names(&self) -> Vec<String> {
        self.tables.iter().map(|t| t.name().to_string()).collect()
    }

    fn lookup(&self, id: Option<&GeoIdentifier>) -> Vec<TableResult> {
        self.tables
            .iter()
            .map(|table| TableResult {
                table: table.name().to_string(),
                result: match id {
                    Some(id) => table.lookup(id),
                    None => TableMatch::NotFound,
                },
            })
            .collect()
    }
}
