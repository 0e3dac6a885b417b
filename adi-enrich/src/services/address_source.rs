//! Address file reader

use crate::models::Address;
use adi_common::bootstrap::ADDRESS_COLUMNS;
use adi_common::{Error, Result};
use std::io::Read;
use std::path::Path;

/// Read all addresses from a CSV file, in file order
pub fn load_addresses(path: &Path) -> Result<Vec<Address>> {
    let file = std::fs::File::open(path)?;
    read_addresses(file)
}

/// Read addresses from CSV text with a `street,apt_num,city,state,zip` header
///
/// Column order does not matter and extra columns are ignored; a missing
/// required column is an input error. Cells are kept as written, short rows
/// read as empty strings, and rows with nothing but blank cells are skipped.
pub fn read_addresses<R: Read>(reader: R) -> Result<Vec<Address>> {
    let mut csv_reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);

    let headers: Vec<String> = csv_reader
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_ascii_lowercase())
        .collect();

    let mut positions = [0usize; 5];
    let mut missing = Vec::new();
    for (slot, column) in positions.iter_mut().zip(ADDRESS_COLUMNS) {
        match headers.iter().position(|h| h == column) {
            Some(i) => *slot = i,
            None => missing.push(column),
        }
    }
    if !missing.is_empty() {
        return Err(Error::InvalidInput(format!(
            "Address file is missing column(s): {}",
            missing.join(", ")
        )));
    }

    let mut addresses = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        let field = |i: usize| record.get(positions[i]).unwrap_or("").to_string();
        addresses.push(Address {
            street: field(0),
            apt_num: field(1),
            city: field(2),
            state: field(3),
            zip: field(4),
        });
    }

    tracing::debug!(count = addresses.len(), "Read addresses");
    Ok(addresses)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_rows_in_order() {
        let csv = "street,apt_num,city,state,zip\n\
                   1600 Amphitheatre Pkwy,,Mountain View,CA,94043\n\
                   1 Main St,Apt 2,Springfield,IL,62701\n";
        let addresses = read_addresses(csv.as_bytes()).unwrap();
        assert_eq!(addresses.len(), 2);
        assert_eq!(addresses[0].city, "Mountain View");
        assert_eq!(addresses[0].apt_num, "");
        assert_eq!(addresses[1].apt_num, "Apt 2");
    }

    #[test]
    fn test_header_only_file_is_empty() {
        let addresses = read_addresses("street,apt_num,city,state,zip\n".as_bytes()).unwrap();
        assert!(addresses.is_empty());
    }

    #[test]
    fn test_missing_columns_are_reported() {
        let err = read_addresses("street,city,state\n1 Main St,X,IL\n".as_bytes()).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("apt_num"));
        assert!(message.contains("zip"));
    }

    #[test]
    fn test_short_rows_and_reordered_columns() {
        let csv = "zip,state,city,apt_num,street\n62701,IL,Springfield\n";
        let addresses = read_addresses(csv.as_bytes()).unwrap();
        assert_eq!(addresses[0].zip, "62701");
        assert_eq!(addresses[0].street, "");
    }

    #[test]
    fn test_duplicates_are_kept() {
        let csv = "street,apt_num,city,state,zip\n1 Main St,,X,IL,1\n1 Main St,,X,IL,1\n";
        assert_eq!(read_addresses(csv.as_bytes()).unwrap().len(), 2);
    }
}
