/*!
Tablesweep CLI - maintenance operations for DynamoDB-style table stores.

Exposes the two engine operations: `purge` (back up each table, then delete
every row matching an attribute predicate) and `reconcile` (copy rows
present in a reference table but missing from a target table).
*/

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tabled::{Table, Tabled};
use tracing::warn;

use tablesweep_core::{
    DynamoStore, PurgeEngine, PurgeReport, PurgeRequest, ReconcileEngine, ReconcileReport,
    ReconcileRequest, RunStatus,
};

#[derive(Parser)]
#[command(name = "tablesweep")]
#[command(about = "Backup-then-purge and reconcile maintenance for DynamoDB tables")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print the structured JSON report instead of a table
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Back up each table, then delete every row matching the predicate
    Purge {
        /// Comma-separated table names
        #[arg(short, long)]
        tables: Option<String>,

        /// Comma-separated attribute names, aligned with types and values
        #[arg(long)]
        attribute_names: Option<String>,

        /// Comma-separated attribute type tags (S, N, B, BOOL)
        #[arg(long)]
        attribute_types: Option<String>,

        /// Comma-separated attribute literals
        #[arg(long)]
        attribute_values: Option<String>,

        /// Read the request from a JSON file (tableNames, attributeNames, ...)
        #[arg(
            long,
            conflicts_with_all = ["tables", "attribute_names", "attribute_types", "attribute_values"]
        )]
        body_file: Option<PathBuf>,
    },
    /// Copy rows present in TABLE2 but missing (by key) from TABLE1
    Reconcile {
        /// Table that receives the rows it is missing
        table1: String,

        /// Reference table the rows are copied from
        table2: String,

        /// Attribute used as row identity
        #[arg(short, long)]
        key: String,
    },
}

#[derive(Tabled)]
struct PurgeTableRow {
    #[tabled(rename = "Table")]
    table: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Backup")]
    backup: String,
    #[tabled(rename = "Scanned")]
    scanned: u64,
    #[tabled(rename = "Deleted")]
    deleted: u64,
    #[tabled(rename = "Row failures")]
    row_failures: usize,
    #[tabled(rename = "Error")]
    error: String,
}

#[derive(Tabled)]
struct ReconcileRow {
    #[tabled(rename = "Source")]
    source: String,
    #[tabled(rename = "Target")]
    target: String,
    #[tabled(rename = "Source rows")]
    source_rows: u64,
    #[tabled(rename = "Target rows")]
    target_rows: u64,
    #[tabled(rename = "Copied")]
    copied: u64,
    #[tabled(rename = "Row failures")]
    row_failures: usize,
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let store = DynamoStore::from_env().await?;

    match cli.command {
        Commands::Purge {
            tables,
            attribute_names,
            attribute_types,
            attribute_values,
            body_file,
        } => {
            let request = build_purge_request(
                tables,
                attribute_names,
                attribute_types,
                attribute_values,
                body_file,
            )?;
            run_purge(store, request, cli.json).await
        }
        Commands::Reconcile {
            table1,
            table2,
            key,
        } => {
            run_reconcile(
                store,
                ReconcileRequest {
                    table1,
                    table2,
                    key,
                },
                cli.json,
            )
            .await
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug"))
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn build_purge_request(
    tables: Option<String>,
    attribute_names: Option<String>,
    attribute_types: Option<String>,
    attribute_values: Option<String>,
    body_file: Option<PathBuf>,
) -> Result<PurgeRequest, anyhow::Error> {
    if let Some(path) = body_file {
        let body = std::fs::read_to_string(&path)?;
        return Ok(PurgeRequest::from_json(&body)?);
    }

    let (Some(table_names), Some(attribute_names), Some(attribute_types), Some(attribute_values)) =
        (tables, attribute_names, attribute_types, attribute_values)
    else {
        anyhow::bail!(
            "either --body-file or all of --tables, --attribute-names, --attribute-types, \
             and --attribute-values are required"
        );
    };

    Ok(PurgeRequest {
        table_names,
        attribute_names,
        attribute_types,
        attribute_values,
    })
}

async fn run_purge(
    store: DynamoStore,
    request: PurgeRequest,
    json: bool,
) -> Result<(), anyhow::Error> {
    let plan = request.into_plan()?;
    let engine = PurgeEngine::new(store);
    let report = engine.purge(&plan.tables, &plan.predicate).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_purge_table(&report);
        println!("{}", report.summary());
    }

    match report.status() {
        RunStatus::Failed => Err(anyhow::anyhow!(report.summary())),
        RunStatus::PartiallySucceeded => {
            warn!("Some tables or rows failed; see the report for details");
            Ok(())
        }
        RunStatus::Succeeded => Ok(()),
    }
}

async fn run_reconcile(
    store: DynamoStore,
    request: ReconcileRequest,
    json: bool,
) -> Result<(), anyhow::Error> {
    let plan = request.into_plan()?;
    let engine = ReconcileEngine::new(store);
    let report = engine
        .reconcile(&plan.source, &plan.target, &plan.key_attribute)
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_reconcile_table(&report);
        println!("{}", report.summary());
    }

    if report.status() == RunStatus::PartiallySucceeded {
        warn!("Some rows failed to copy; see the report for details");
    }
    Ok(())
}

fn print_purge_table(report: &PurgeReport) {
    let rows: Vec<PurgeTableRow> = report
        .tables
        .iter()
        .map(|t| PurgeTableRow {
            table: t.table.clone(),
            status: t.status.to_string(),
            backup: t
                .backup
                .as_ref()
                .map(|b| b.name.clone())
                .unwrap_or_else(|| "-".to_string()),
            scanned: t.rows_scanned,
            deleted: t.rows_deleted,
            row_failures: t.row_failures.len(),
            error: t.error.clone().unwrap_or_else(|| "-".to_string()),
        })
        .collect();

    println!("{}", Table::new(rows));
}

fn print_reconcile_table(report: &ReconcileReport) {
    let row = ReconcileRow {
        source: report.source.clone(),
        target: report.target.clone(),
        source_rows: report.source_rows,
        target_rows: report.target_rows,
        copied: report.rows_copied,
        row_failures: report.row_failures.len(),
    };
    println!("{}", Table::new([row]));
}
