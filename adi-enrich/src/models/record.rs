//! Output records of the enrichment pipeline

use super::{Address, Coordinate, GeoIdentifier};
use serde::Serialize;

/// Score fields of one matched row, in the table's column order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScoreSet {
    pub fields: Vec<(String, String)>,
}

impl ScoreSet {
    pub fn new(fields: Vec<(String, String)>) -> Self {
        Self { fields }
    }

    /// Value of a named score field
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Result of looking up one identifier in one table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "scores", rename_all = "snake_case")]
pub enum TableMatch {
    Found(ScoreSet),
    NotFound,
}

impl TableMatch {
    pub fn is_found(&self) -> bool {
        matches!(self, TableMatch::Found(_))
    }

    pub fn scores(&self) -> Option<&ScoreSet> {
        match self {
            TableMatch::Found(scores) => Some(scores),
            TableMatch::NotFound => None,
        }
    }
}

/// Per-table lookup result, tagged with the table (file) name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableResult {
    pub table: String,
    pub result: TableMatch,
}

/// One enriched output unit per input address
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedRecord {
    /// Address fields exactly as read
    pub address: Address,
    pub coordinate: Option<Coordinate>,
    pub geo_id: Option<GeoIdentifier>,
    /// One entry per loaded table, in load order
    pub tables: Vec<TableResult>,
}

impl EnrichedRecord {
    /// Lookup result for a table by name
    pub fn table(&self, name: &str) -> Option<&TableMatch> {
        self.tables
            .iter()
            .find(|t| t.table == name)
            .map(|t| &t.result)
    }

    pub fn matched_tables(&self) -> usize {
        self.tables.iter().filter(|t| t.result.is_found()).count()
    }
}
