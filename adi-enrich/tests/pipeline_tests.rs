//! End-to-end pipeline tests
//!
//! Reference tables come from real CSV files in a temp folder; the remote
//! services are replaced by deterministic fakes.

use adi_common::CensusYear;
use adi_enrich::services::{
    load_addresses, write_output_file, GeocodeError, Geocoded, Geocoder, GeographyResolver,
    ResolveError, ScoreTables,
};
use adi_enrich::{Address, Coordinate, EnrichmentPipeline, GeoIdentifier, PipelineConfig};
use async_trait::async_trait;
use chrono::TimeZone;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

/// Geocoder: street → latitude (longitude fixed)
struct StreetGeocoder(HashMap<&'static str, f64>);

#[async_trait]
impl Geocoder for StreetGeocoder {
    async fn geocode(&self, address: &Address) -> Result<Geocoded, GeocodeError> {
        address.eligibility().map_err(GeocodeError::Ineligible)?;
        let latitude = self
            .0
            .get(address.street.as_str())
            .ok_or(GeocodeError::NoResults)?;
        Ok(Geocoded {
            coordinate: Coordinate::new(*latitude, -80.0),
            formatted_address: Some(address.full_address()),
            candidates: 1,
            partial_match: false,
        })
    }
}

/// Resolver: latitude → 15-digit block FIPS
struct LatitudeResolver(Vec<(f64, &'static str)>);

#[async_trait]
impl GeographyResolver for LatitudeResolver {
    async fn resolve(
        &self,
        coordinate: Coordinate,
        _census_year: CensusYear,
    ) -> Result<GeoIdentifier, ResolveError> {
        let fips = self
            .0
            .iter()
            .find(|(lat, _)| *lat == coordinate.latitude)
            .map(|(_, fips)| *fips)
            .ok_or(ResolveError::NoBlock)?;
        Ok(GeoIdentifier::from_block_fips(fips)?)
    }
}

fn write(dir: &Path, name: &str, content: &str) {
    fs::write(dir.join(name), content).unwrap();
}

fn reference_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    // FIPS-keyed table with an unnamed index column
    write(
        dir.path(),
        "SC_2021_ADI_Census_Block_Group.csv",
        ",GISJOIN,FIPS,ADI_NATRANK,ADI_STATERNK\n\
         1,G45000100950100,450010950100,81,7\n\
         2,G45000100950200,450010950200,64,4\n",
    );
    // GISJOIN-only table
    write(
        dir.path(),
        "US_2015_ADI_Census_Block_Group.csv",
        "GISJOIN,ADI_NATRANK\n\
         G45000100950200,70\n",
    );
    dir
}

fn pipeline(tables: ScoreTables) -> EnrichmentPipeline {
    let geocoder = StreetGeocoder(HashMap::from([
        ("10 Oak St", 34.1),
        ("20 Elm St", 34.2),
        ("30 Pine St", 34.3),
    ]));
    let resolver = LatitudeResolver(vec![
        (34.1, "450010950100001"),
        (34.2, "450010950200002"),
    ]);
    EnrichmentPipeline::new(
        PipelineConfig::default(),
        Arc::new(geocoder),
        Arc::new(resolver),
        Arc::new(tables),
    )
}

fn addr(street: &str) -> Address {
    Address::new(street, "", "Abbeville", "SC", "29620")
}

#[tokio::test]
async fn test_two_tables_one_match_each_way() {
    let dir = reference_dir();
    let (tables, report) = ScoreTables::load_dir(dir.path()).unwrap();
    assert_eq!(report.loaded.len(), 2);
    assert!(report.skipped.is_empty());

    let outcome = pipeline(tables).run(&[addr("10 Oak St"), addr("20 Elm St")]).await;

    let first = &outcome.records[0];
    let sc = first.table("SC_2021_ADI_Census_Block_Group").unwrap();
    assert_eq!(sc.scores().unwrap().get("ADI_NATRANK"), Some("81"));
    assert_eq!(sc.scores().unwrap().get("ADI_STATERNK"), Some("7"));
    assert!(!first
        .table("US_2015_ADI_Census_Block_Group")
        .unwrap()
        .is_found());

    let second = &outcome.records[1];
    assert_eq!(second.matched_tables(), 2);
    assert_eq!(
        second
            .table("US_2015_ADI_Census_Block_Group")
            .unwrap()
            .scores()
            .unwrap()
            .get("ADI_NATRANK"),
        Some("70")
    );
}

#[tokio::test]
async fn test_geocode_and_resolve_failures_degrade() {
    let dir = reference_dir();
    let (tables, _) = ScoreTables::load_dir(dir.path()).unwrap();
    let original = addr("99 Unknown Rd");

    let outcome = pipeline(tables)
        .run(&[original.clone(), addr("30 Pine St")])
        .await;

    let failed_geocode = &outcome.records[0];
    assert_eq!(failed_geocode.address, original);
    assert!(failed_geocode.coordinate.is_none());
    assert!(failed_geocode.geo_id.is_none());
    assert_eq!(failed_geocode.matched_tables(), 0);
    assert_eq!(failed_geocode.tables.len(), 2);

    let failed_resolve = &outcome.records[1];
    assert!(failed_resolve.coordinate.is_some());
    assert!(failed_resolve.geo_id.is_none());
    assert_eq!(failed_resolve.matched_tables(), 0);

    assert_eq!(outcome.summary.geocoded, 1);
    assert_eq!(outcome.summary.resolved, 0);
}

#[tokio::test]
async fn test_unparsable_table_is_excluded() {
    let dir = reference_dir();
    write(dir.path(), "broken.csv", "TRACT,ADI_NATRANK\n1,2\n");

    let (tables, report) = ScoreTables::load_dir(dir.path()).unwrap();

    assert_eq!(tables.len(), 2);
    assert_eq!(report.skipped.len(), 1);
    assert!(report.skipped[0].path.ends_with("broken.csv"));

    let outcome = pipeline(tables).run(&[addr("10 Oak St")]).await;
    assert!(outcome.records[0].table("broken").is_none());
}

#[tokio::test]
async fn test_zero_tables_output_has_no_score_columns() {
    let empty = TempDir::new().unwrap();
    let (tables, _) = ScoreTables::load_dir(empty.path()).unwrap();
    let columns = tables.columns();

    let outcome = pipeline(tables).run(&[addr("10 Oak St")]).await;
    assert!(outcome.records[0].tables.is_empty());

    let out_dir = TempDir::new().unwrap();
    let ts = chrono::Local.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
    let path = write_output_file(
        out_dir.path(),
        &outcome.records,
        &columns,
        CensusYear::default(),
        ts,
    )
    .unwrap();

    let text = fs::read_to_string(path).unwrap();
    let header = text.lines().next().unwrap();
    assert_eq!(
        header,
        "street,apt_num,city,state,zip,census_year,latitude,longitude,fips"
    );
}

#[tokio::test]
async fn test_full_run_from_files_to_output() {
    let work = TempDir::new().unwrap();
    write(
        work.path(),
        "addresses.csv",
        "street,apt_num,city,state,zip\n\
         10 Oak St,Apt 2,Abbeville,SC,29620\n\
         PO Box 7,,Abbeville,SC,29620\n\
         20 Elm St,,Abbeville,SC,29620\n",
    );
    let addresses = load_addresses(&work.path().join("addresses.csv")).unwrap();
    let refs = reference_dir();
    let (tables, _) = ScoreTables::load_dir(refs.path()).unwrap();
    let columns = tables.columns();

    let outcome = pipeline(tables).run(&addresses).await;
    assert_eq!(outcome.records.len(), 3);
    assert_eq!(outcome.summary.geocode_failures.get("ineligible"), Some(&1));

    let ts = chrono::Local.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
    let first = write_output_file(
        work.path(),
        &outcome.records,
        &columns,
        CensusYear::default(),
        ts,
    )
    .unwrap();
    let second = write_output_file(
        work.path(),
        &outcome.records,
        &columns,
        CensusYear::default(),
        ts,
    )
    .unwrap();

    assert!(first.ends_with("addresses-output-20240102_030405.csv"));
    assert_ne!(first, second);

    let mut reader = csv::Reader::from_path(&first).unwrap();
    let headers = reader.headers().unwrap().clone();
    assert_eq!(
        headers.iter().skip(9).collect::<Vec<_>>(),
        [
            "SC_2021_ADI_Census_Block_Group:status",
            "SC_2021_ADI_Census_Block_Group:ADI_NATRANK",
            "SC_2021_ADI_Census_Block_Group:ADI_STATERNK",
            "US_2015_ADI_Census_Block_Group:status",
            "US_2015_ADI_Census_Block_Group:ADI_NATRANK",
        ]
    );

    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 3);
    assert_eq!(&rows[0][1], "Apt 2");
    assert_eq!(&rows[0][8], "450010950100");
    assert_eq!(&rows[0][9], "found");
    assert_eq!(&rows[0][10], "81");
    assert_eq!(&rows[0][12], "not_found");
    assert_eq!(&rows[1][0], "PO Box 7");
    assert_eq!(&rows[1][6], "");
    assert_eq!(&rows[1][9], "not_found");
    assert_eq!(&rows[2][13], "70");

    let leftovers: Vec<_> = fs::read_dir(work.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().ends_with(".partial"))
        .collect();
    assert!(leftovers.is_empty());
}
