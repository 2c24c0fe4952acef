//! folio-ingest - catalog ingest and edition report CLI
//!
//! - `ingest <FILE>`: resolve a JSON array (or JSON Lines) of work records
//!   into the catalog, one transaction per work
//! - `editions <WORK_ID>`: print the edition grouping of one work as JSON

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use folio_common::config::{
    database_path, load_toml_config, locate_config_file, resolve_root_folder, TomlConfig,
    ROOT_FOLDER_ENV,
};
use folio_ingest::config::{build_authority_lookup, resolve_authority_api_key, EngineConfig};
use folio_ingest::{EditionClusterer, WorkIngester, WorkRecord};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

/// Command-line arguments for folio-ingest
#[derive(Parser, Debug)]
#[command(name = "folio-ingest")]
#[command(about = "Entity resolution and edition clustering for bibliographic records")]
#[command(version)]
struct Args {
    /// Root folder holding the catalog database
    #[arg(short, long, env = ROOT_FOLDER_ENV)]
    root_folder: Option<PathBuf>,

    /// TOML config file (defaults to the platform config location)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ingest work records from a JSON array or JSON Lines file
    Ingest {
        /// Input file
        file: PathBuf,
    },
    /// Print the edition groups of one work
    Editions {
        /// Work guid
        work_id: Uuid,
    },
}

/// Totals over one ingest run
#[derive(Debug, Default, Serialize)]
struct BatchSummary {
    works_ingested: usize,
    works_created: usize,
    works_failed: usize,
    agents_created: usize,
    agents_matched: usize,
    agents_skipped: usize,
    instances_created: usize,
    instances_merged: usize,
    instances_failed: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let toml_config = load_config(args.config.as_deref())?;

    // Initialize tracing
    let default_filter = format!("folio_ingest={}", toml_config.logging.level);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting folio-ingest {}", env!("CARGO_PKG_VERSION"));

    let root_folder = resolve_root_folder(args.root_folder.as_deref(), ROOT_FOLDER_ENV, true);
    let db_path = database_path(&root_folder);
    info!("Database: {}", db_path.display());

    let pool = folio_common::db::init_database(&db_path)
        .await
        .context("Failed to open catalog database")?;
    let engine_config = EngineConfig::from_toml(&toml_config)?;

    match args.command {
        Command::Ingest { file } => {
            let api_key = resolve_authority_api_key(&pool, &toml_config).await?;
            let authority = build_authority_lookup(&toml_config, api_key);
            let ingester = WorkIngester::new(pool.clone(), authority, engine_config);

            let summary = ingest_file(&ingester, &file).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::Editions { work_id } => {
            let clusterer = EditionClusterer::new(engine_config.clustering);
            let mut conn = pool.acquire().await?;
            let groups = clusterer.editions_for_work(&mut conn, work_id).await?;
            println!("{}", serde_json::to_string_pretty(&groups)?);
        }
    }

    pool.close().await;
    Ok(())
}

/// Explicit `--config` must load; the platform default is optional
fn load_config(explicit: Option<&Path>) -> Result<TomlConfig> {
    if let Some(path) = explicit {
        return load_toml_config(path)
            .with_context(|| format!("Failed to load config {}", path.display()));
    }

    Ok(locate_config_file()
        .ok()
        .and_then(|path| load_toml_config(&path).ok())
        .unwrap_or_default())
}

/// Parse a JSON array, or one record per line; unparseable lines are skipped
fn parse_records(content: &str) -> Result<Vec<Result<WorkRecord, serde_json::Error>>> {
    if content.trim_start().starts_with('[') {
        // Decode elements one by one so a malformed record only fails itself
        let values: Vec<serde_json::Value> =
            serde_json::from_str(content).context("Input is not a JSON array")?;
        return Ok(values
            .into_iter()
            .map(serde_json::from_value::<WorkRecord>)
            .collect());
    }

    Ok(content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str::<WorkRecord>(line))
        .collect())
}

async fn ingest_file(ingester: &WorkIngester, file: &Path) -> Result<BatchSummary> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let mut summary = BatchSummary::default();
    for (position, parsed) in parse_records(&content)?.into_iter().enumerate() {
        let record = match parsed {
            Ok(record) => record,
            Err(e) => {
                warn!(record = position, error = %e, "Skipping unparseable work record");
                summary.works_failed += 1;
                continue;
            }
        };

        let title = record.title.clone();
        match ingester.ingest(record).await {
            Ok(report) => {
                summary.works_ingested += 1;
                summary.works_created += usize::from(report.work_created);
                summary.agents_created += report.agents_created;
                summary.agents_matched += report.agents_matched;
                summary.agents_skipped += report.agents_skipped;
                summary.instances_created += report.instances_created;
                summary.instances_merged += report.instances_merged;
                summary.instances_failed += report.instances_failed;
            }
            Err(e) => {
                warn!(record = position, title = %title, error = %e, "Work ingest failed, continuing");
                summary.works_failed += 1;
            }
        }
    }

    info!(
        ingested = summary.works_ingested,
        failed = summary.works_failed,
        "Ingest run complete"
    );

    Ok(summary)
}
