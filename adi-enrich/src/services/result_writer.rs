//! Output CSV writer
//!
//! Written once at the end of a run into a new timestamped file. One row per
//! record: address fields, census year, coordinate and FIPS, then for each
//! table a `<table>:status` column followed by its score columns.

use crate::models::{EnrichedRecord, TableMatch};
use adi_common::{CensusYear, Result};
use chrono::{DateTime, Local};
use std::io::Write;
use std::path::{Path, PathBuf};

pub const OUTPUT_PREFIX: &str = "addresses-output";
pub const STATUS_FOUND: &str = "found";
pub const STATUS_NOT_FOUND: &str = "not_found";

const BASE_COLUMNS: [&str; 9] = [
    "street",
    "apt_num",
    "city",
    "state",
    "zip",
    "census_year",
    "latitude",
    "longitude",
    "fips",
];

/// Column layout of one reference table in the output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableColumns {
    pub name: String,
    pub fields: Vec<String>,
}

/// Output header for the given tables
pub fn header(tables: &[TableColumns]) -> Vec<String> {
    let mut columns: Vec<String> = BASE_COLUMNS.iter().map(|c| c.to_string()).collect();
    for table in tables {
        columns.push(format!("{}:status", table.name));
        columns.extend(table.fields.iter().map(|f| format!("{}:{}", table.name, f)));
    }
    columns
}

fn row(record: &EnrichedRecord, tables: &[TableColumns], census_year: CensusYear) -> Vec<String> {
    let address = &record.address;
    let mut cells = vec![
        address.street.clone(),
        address.apt_num.clone(),
        address.city.clone(),
        address.state.clone(),
        address.zip.clone(),
        census_year.to_string(),
        record
            .coordinate
            .map(|c| c.latitude.to_string())
            .unwrap_or_default(),
        record
            .coordinate
            .map(|c| c.longitude.to_string())
            .unwrap_or_default(),
        record
            .geo_id
            .as_ref()
            .map(|id| id.to_string())
            .unwrap_or_default(),
    ];

    // `record.tables` follows the same load order as `tables`
    for (i, table) in tables.iter().enumerate() {
        let result = record
            .tables
            .get(i)
            .filter(|t| t.table == table.name)
            .map(|t| &t.result);
        match result {
            Some(TableMatch::Found(scores)) => {
                cells.push(STATUS_FOUND.to_string());
                cells.extend(
                    table
                        .fields
                        .iter()
                        .map(|f| scores.get(f).unwrap_or("").to_string()),
                );
            }
            Some(TableMatch::NotFound) | None => {
                cells.push(STATUS_NOT_FOUND.to_string());
                cells.extend(table.fields.iter().map(|_| String::new()));
            }
        }
    }

    cells
}

/// Write header and one row per record
pub fn write_records<W: Write>(
    writer: W,
    records: &[EnrichedRecord],
    tables: &[TableColumns],
    census_year: CensusYear,
) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(header(tables))?;
    for record in records {
        csv_writer.write_record(row(record, tables, census_year))?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// `addresses-output-YYYYMMDD_HHMMSS.csv`
pub fn output_file_name(timestamp: DateTime<Local>) -> String {
    format!("{}-{}.csv", OUTPUT_PREFIX, timestamp.format("%Y%m%d_%H%M%S"))
}

/// Output path that does not exist yet; never overwrites an earlier run
pub fn unique_output_path(dir: &Path, timestamp: DateTime<Local>) -> PathBuf {
    let candidate = dir.join(output_file_name(timestamp));
    if !candidate.exists() {
        return candidate;
    }
    let stem = format!("{}-{}", OUTPUT_PREFIX, timestamp.format("%Y%m%d_%H%M%S"));
    (1..)
        .map(|n| dir.join(format!("{}-{}.csv", stem, n)))
        .find(|p| !p.exists())
        .unwrap_or(candidate)
}

/// Write the whole run to a new file in `dir` and return its path
///
/// Rows go to a temporary sibling first; the final name only appears once the
/// file is complete.
pub fn write_output_file(
    dir: &Path,
    records: &[EnrichedRecord],
    tables: &[TableColumns],
    census_year: CensusYear,
    timestamp: DateTime<Local>,
) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = unique_output_path(dir, timestamp);
    let tmp_path = path.with_extension("csv.partial");

    let file = std::fs::File::create(&tmp_path)?;
    if let Err(e) = write_records(file, records, tables, census_year) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(e);
    }
    std::fs::rename(&tmp_path, &path)?;

    tracing::info!(rows = records.len(), path = %path.display(), "Wrote output file");
    Ok(path)
}
