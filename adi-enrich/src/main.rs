//! adi-enrich - Area Deprivation Index enrichment
//!
//! Reads a CSV of postal addresses, geocodes each one, resolves its census
//! block group and joins every ADI reference table found in the data folder.
//! The result is written once, to a new timestamped CSV.

use std::path::PathBuf;
use std::sync::Arc;

use adi_common::bootstrap::{BootstrapReport, Bootstrapper};
use adi_common::config::{self, ConfigOverrides, DEFAULT_CONFIG_FILE_NAME};
use adi_common::{logging, secrets, CensusYear, RunConfig};
use adi_enrich::services::{
    load_addresses, write_output_file, FccBlockClient, GoogleGeocodingClient, LoadReport,
    ScoreTables,
};
use adi_enrich::{EnrichmentPipeline, PipelineConfig, RunSummary};
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

/// Command-line arguments for adi-enrich
#[derive(Parser, Debug)]
#[command(name = "adi-enrich")]
#[command(about = "Enrich addresses with Area Deprivation Index rankings")]
#[command(version)]
struct Cli {
    /// Work directory holding the address file, secrets and reference data
    #[arg(short, long, global = true, env = "ADI_WORK_DIR")]
    work_dir: Option<PathBuf>,

    /// Census vintage used for block lookups (2010 or 2020)
    #[arg(long, global = true, env = "ADI_CENSUS_YEAR", value_parser = parse_census_year)]
    census_year: Option<CensusYear>,

    /// Config file (default: <work dir>/adi-enrich.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory for the output CSV (default: work directory)
    #[arg(short, long, global = true)]
    output_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
enum Command {
    /// Enrich every address in the address file (default)
    Run,
    /// Create missing scaffolding files and exit
    Init,
    /// List the reference tables found in the data folder
    Tables,
    /// Write a default config file into the work directory
    InitConfig {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
}

fn parse_census_year(value: &str) -> std::result::Result<CensusYear, String> {
    let year: u16 = value
        .trim()
        .parse()
        .map_err(|_| format!("not a year: {}", value))?;
    CensusYear::new(year).map_err(|e| e.to_string())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command.clone().unwrap_or(Command::Run);

    if let Command::InitConfig { force } = command {
        return init_config(cli.work_dir, force);
    }

    let config = RunConfig::resolve(ConfigOverrides {
        work_dir: cli.work_dir,
        config_file: cli.config,
        census_year: cli.census_year,
        output_dir: cli.output_dir,
        log_level: cli.log_level,
    })
    .context("Failed to load configuration")?;

    logging::init_tracing(&config.logging).context("Failed to initialize logging")?;

    info!("Starting adi-enrich v{}", env!("CARGO_PKG_VERSION"));
    info!("Work directory: {}", config.work_dir.display());
    if let Some(source) = &config.source {
        info!("Config file: {}", source.display());
    }

    match command {
        Command::Run => run(&config).await,
        Command::Init => {
            let report = bootstrap(&config)?;
            if report.is_empty() {
                println!("Nothing to create; work directory is already set up.");
            }
            Ok(())
        }
        Command::Tables => list_tables(&config),
        Command::InitConfig { .. } => Ok(()),
    }
}

fn bootstrap(config: &RunConfig) -> Result<BootstrapReport> {
    let report = Bootstrapper::from_config(config)
        .ensure()
        .context("Failed to prepare work directory")?;
    for item in &report.created {
        println!("{}", item);
    }
    Ok(report)
}

async fn run(config: &RunConfig) -> Result<()> {
    // Step 1: scaffolding
    let report = bootstrap(config)?;
    if report.created_address_file() {
        println!("Populate the address file and run again.");
        return Ok(());
    }

    // Step 2: addresses
    let addresses = load_addresses(&config.addresses_file).with_context(|| {
        format!(
            "Failed to read addresses from {}",
            config.addresses_file.display()
        )
    })?;
    if addresses.is_empty() {
        println!(
            "No addresses found in {}. Add one address per row and run again.",
            config.addresses_file.display()
        );
        return Ok(());
    }
    info!("Loaded {} addresses", addresses.len());

    // Step 3: credentials, before any network call
    let api_key = secrets::resolve_api_key(&config.secrets_file)?;

    // Step 4: reference tables
    let (tables, load_report) = ScoreTables::load_dir(&config.reference_dir)
        .context("Failed to read reference data folder")?;
    print_skipped(&load_report);
    if tables.is_empty() {
        warn!(
            "No ADI tables loaded from {}; output will carry no scores",
            config.reference_dir.display()
        );
    }
    let columns = tables.columns();

    // Step 5: pipeline
    let geocoder = GoogleGeocodingClient::new(api_key, &config.http)
        .context("Failed to create geocoding client")?;
    let resolver =
        FccBlockClient::new(&config.http).context("Failed to create FCC block client")?;
    let pipeline = EnrichmentPipeline::new(
        PipelineConfig::from(config),
        Arc::new(geocoder),
        Arc::new(resolver),
        Arc::new(tables),
    );
    let outcome = pipeline.run(&addresses).await;

    // Step 6: output
    let path = write_output_file(
        &config.output_dir,
        &outcome.records,
        &columns,
        config.census_year,
        chrono::Local::now(),
    )
    .context("Failed to write output file")?;

    print_summary(&outcome.summary);
    println!("Output written to {}", path.display());
    Ok(())
}

fn list_tables(config: &RunConfig) -> Result<()> {
    let (tables, report) = ScoreTables::load_dir(&config.reference_dir)
        .context("Failed to read reference data folder")?;

    if tables.is_empty() {
        println!("No ADI tables in {}", config.reference_dir.display());
    }
    for table in tables.tables() {
        println!(
            "{}: {} rows, fields [{}]",
            table.name(),
            table.len(),
            table.fields().join(", ")
        );
    }
    print_skipped(&report);
    Ok(())
}

fn print_skipped(report: &LoadReport) {
    for skipped in &report.skipped {
        println!("Skipped {}: {}", skipped.path.display(), skipped.error);
    }
}

fn print_summary(summary: &RunSummary) {
    println!("Addresses:  {}", summary.total);
    println!("Geocoded:   {}/{}", summary.geocoded, summary.total);
    if summary.ambiguous > 0 {
        println!("  ambiguous (first candidate used): {}", summary.ambiguous);
    }
    for (kind, count) in &summary.geocode_failures {
        println!("  failed ({}): {}", kind, count);
    }
    println!("FIPS found: {}/{}", summary.resolved, summary.total);
    for (kind, count) in &summary.resolve_failures {
        println!("  failed ({}): {}", kind, count);
    }
    for (table, matched) in &summary.table_matches {
        println!("{}: {}/{} matched", table, matched, summary.total);
    }
}

fn init_config(work_dir: Option<PathBuf>, force: bool) -> Result<()> {
    let work_dir = match work_dir {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };
    let path = work_dir.join(DEFAULT_CONFIG_FILE_NAME);
    if path.exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }
    let template = config::default_config_template()?;
    config::write_atomic(&path, &template)?;
    println!("Config written to {}", path.display());
    Ok(())
}
