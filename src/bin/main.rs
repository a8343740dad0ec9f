//! Atoll CLI - validate uploads, generate templates, aggregate trees
//!
//! Usage:
//!   atoll validate <upload.json> --schema <schema.json> [--geojson]
//!   atoll template --hierarchy <h.json> --relationships <r.json> [--schema <s.json>] [--split-by <level>]
//!   atoll aggregate --hierarchy <h.json> <upload.json>...
//!
//! Examples:
//!   atoll validate uploads/facilities.json --schema schemas/facility.json
//!   atoll template --hierarchy fixtures/levels.json --relationships fixtures/boundaries.json --split-by District
//!   atoll aggregate --hierarchy fixtures/levels.json uploads/population.json

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use atoll::boundary::{BoundaryProvider, FileBoundaryProvider};
use atoll::config::Settings;
use atoll::ingest;
use atoll::schema::{validate_record_set, Schema, ValidationReport};
use atoll::template::{self, TemplateOptions};
use atoll::tree::{aggregate, build};

#[derive(Parser)]
#[command(name = "atoll")]
#[command(about = "Atoll - hierarchical boundary data reconciliation and aggregation")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate an upload against a schema
    Validate {
        /// Path to the upload (JSON workbook, or GeoJSON with --geojson)
        file: PathBuf,

        /// Path to the schema descriptor
        #[arg(short, long)]
        schema: PathBuf,

        /// Treat the upload as a GeoJSON FeatureCollection
        #[arg(long)]
        geojson: bool,
    },

    /// Generate data-collection template sheets
    Template {
        /// Path to the hierarchy definition
        #[arg(long)]
        hierarchy: PathBuf,

        /// Path to the boundary relationships forest
        #[arg(long)]
        relationships: PathBuf,

        /// Optional schema supplying collection columns
        #[arg(short, long)]
        schema: Option<PathBuf>,

        /// Split rows into one sheet per value at this level
        #[arg(long)]
        split_by: Option<String>,
    },

    /// Build and aggregate the reconciled tree from uploads
    Aggregate {
        /// Path to the hierarchy definition
        #[arg(long)]
        hierarchy: PathBuf,

        /// Upload files (JSON workbooks)
        files: Vec<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let settings = Settings::load_or_default()?;

    match cli.command {
        Commands::Validate {
            file,
            schema,
            geojson,
        } => {
            let schema = Schema::from_json(&std::fs::read_to_string(&schema)?)?;

            let mut all_valid = true;
            if geojson {
                let name = file
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "upload".to_string());
                let set = ingest::read_geojson(&name, &file).await?;
                let report = validate_record_set(&set, &schema)?;
                all_valid &= print_report(&set.name, &report);
            } else {
                for set in ingest::read_workbook(&file).await? {
                    let report = validate_record_set(&set, &schema)?;
                    all_valid &= print_report(&set.name, &report);
                }
            }

            Ok(if all_valid {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }

        Commands::Template {
            hierarchy,
            relationships,
            schema,
            split_by,
        } => {
            let provider = FileBoundaryProvider::new(&hierarchy, &relationships);
            let definition = provider.fetch_hierarchy().await?;
            let forest = provider.fetch_relationships().await?;
            let roots: Vec<_> = {
                let flagged: Vec<_> = forest.iter().filter(|n| n.is_root).cloned().collect();
                if flagged.is_empty() {
                    forest
                } else {
                    flagged
                }
            };

            let schema = match schema {
                Some(path) => Some(Schema::from_json(&std::fs::read_to_string(&path)?)?),
                None => None,
            };

            let options = TemplateOptions {
                split_by_level: split_by,
                facility_master: None,
            };
            let sheets =
                template::generate(&definition, &roots, schema.as_ref(), &settings, &options)?;
            println!("{}", serde_json::to_string_pretty(&sheets)?);
            Ok(ExitCode::SUCCESS)
        }

        Commands::Aggregate { hierarchy, files } => {
            let levels: Vec<atoll::model::HierarchyLevel> =
                serde_json::from_str(&std::fs::read_to_string(&hierarchy)?)?;
            let definition = atoll::model::BoundaryHierarchyDefinition::load(levels)?;

            let mut datasets = Vec::new();
            for file in &files {
                datasets.extend(ingest::read_workbook(file).await?);
            }
            let refs: Vec<_> = datasets.iter().collect();
            let tree = aggregate(&build(&definition, &refs));
            println!("{}", serde_json::to_string_pretty(&tree)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn print_report(sheet: &str, report: &ValidationReport) -> bool {
    if report.valid {
        println!("{}: ok", sheet);
        return true;
    }

    for message in &report.messages {
        println!("{}: {}", sheet, message);
    }
    for (name, rows) in report.errors.sheets() {
        for (row, columns) in rows {
            for (column, issues) in columns {
                for issue in issues {
                    println!("{}: row {}, column '{}': {}", name, row + 1, column, issue);
                }
            }
        }
    }
    false
}
