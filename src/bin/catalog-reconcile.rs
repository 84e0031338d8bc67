//! catalog-reconcile CLI: run reconciliation against a JSON fixture.
//!
//! Usage:
//!   catalog-reconcile run --fixture F [--config C] [--resource ID] [--dry-run] [--write] [--json]
//!   catalog-reconcile config [--config C]

use catalog_reconcile::{
    FixtureDocument, FixtureSource, FixtureTarget, ReconciliationRun, ResourceId, RunConfig,
    RunOptions, RunSummary,
};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::Level;

#[derive(Parser)]
#[command(
    name = "catalog-reconcile",
    version,
    about = "Relation closure and field reconciliation for mirrored catalog records"
)]
struct Cli {
    /// Log every field mismatch
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile the resources of a fixture with its records
    Run {
        /// JSON fixture holding records and resources
        #[arg(long)]
        fixture: PathBuf,
        /// YAML configuration file
        #[arg(long)]
        config: Option<PathBuf>,
        /// Only seed the run from this resource
        #[arg(long)]
        resource: Option<String>,
        /// Plan updates without applying them
        #[arg(long)]
        dry_run: bool,
        /// Save applied updates back into the fixture
        #[arg(long, conflicts_with = "dry_run")]
        write: bool,
        /// Print the run summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the effective configuration
    Config {
        /// YAML configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn load_config(path: Option<&Path>) -> Result<RunConfig, String> {
    RunConfig::load_or_default(path).map_err(|e| format!("Failed to load configuration: {}", e))
}

async fn cmd_run(
    fixture: &Path,
    config: Option<&Path>,
    resource: Option<String>,
    dry_run: bool,
    write: bool,
    json: bool,
) -> i32 {
    let config = match load_config(config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    let mut document = match FixtureDocument::load(fixture) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("Error: cannot read fixture '{}': {}", fixture.display(), e);
            return 1;
        }
    };

    let source = FixtureSource::new(document.records.clone()).with_field_table(config.field_table());
    let target = Arc::new(FixtureTarget::new(
        document.resources.clone(),
        config.identifier_field.clone(),
        config.record_id_prefix.clone(),
    ));
    let run = ReconciliationRun::new(Arc::new(source), target.clone(), target.clone(), config);

    let cancel = run.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Cancelling run...");
            cancel.cancel();
        }
    });

    let mut options = RunOptions::new().dry_run(dry_run);
    if let Some(resource) = resource {
        options.only_resource = Some(ResourceId::new(resource));
    }

    let summary = match run.execute(&options).await {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    if json {
        match serde_json::to_string_pretty(&summary) {
            Ok(out) => println!("{}", out),
            Err(e) => {
                eprintln!("Error: {}", e);
                return 1;
            }
        }
    } else {
        print_summary(&summary);
    }

    if write && summary.fields_updated > 0 {
        document.resources = target.resources();
        if let Err(e) = document.save(fixture) {
            eprintln!("Error: cannot write fixture '{}': {}", fixture.display(), e);
            return 1;
        }
        if !json {
            println!("Wrote {} update(s) to '{}'", summary.fields_updated, fixture.display());
        }
    }

    if summary.fields_failed > 0 || summary.cancelled {
        2
    } else {
        0
    }
}

fn print_summary(summary: &RunSummary) {
    let mode = if summary.dry_run { " (dry run)" } else { "" };
    println!("Run {}{}", summary.run_id, mode);
    println!("  records processed:   {}", summary.records_processed);
    println!("  skipped (unmapped):  {}", summary.skipped_unmapped.len());
    println!("  skipped (no target): {}", summary.skipped_no_snapshot.len());
    println!("  fetch errors:        {}", summary.fetch_errors.len());
    println!("  malformed records:   {}", summary.malformed.len());
    println!("  edges inferred:      {}", summary.edges_inferred);
    if !summary.expansion.stable {
        println!(
            "  warning: expansion stopped at its round cap; {} record(s) left unfetched",
            summary.unexpanded.len()
        );
    }
    if summary.cancelled {
        println!("  warning: run cancelled before all updates were submitted");
    }

    let pending: Vec<_> = summary.resources.iter().filter(|r| !r.is_in_sync()).collect();
    if pending.is_empty() {
        println!("All {} resource(s) in sync.", summary.resources.len());
        return;
    }
    println!();
    println!("{:<16}  {:<24}  {:>7}  {:>7}  {:>6}", "RESOURCE", "RECORD", "PLANNED", "UPDATED", "FAILED");
    println!("{}", "-".repeat(68));
    for report in pending {
        println!(
            "{:<16}  {:<24}  {:>7}  {:>7}  {:>6}",
            report.resource.as_str(),
            report.record.as_str(),
            report.planned.len(),
            report.applied_count(),
            report.failed.len()
        );
        for failed in &report.failed {
            println!("    {}: {}", failed.field, failed.message);
        }
    }
    println!("{}", "-".repeat(68));
    println!(
        "{} field(s) planned, {} updated, {} failed",
        summary.fields_planned(),
        summary.fields_updated,
        summary.fields_failed
    );
}

fn cmd_config(config: Option<&Path>) -> i32 {
    let source = match config {
        Some(path) => Some(path.to_path_buf()),
        None => RunConfig::default_path(),
    };
    let config = match load_config(config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    match source {
        Some(path) if path.exists() => println!("# {}", path.display()),
        _ => println!("# defaults"),
    }
    match config.to_yaml() {
        Ok(yaml) => {
            print!("{}", yaml);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let code = match cli.command {
        Commands::Run {
            fixture,
            config,
            resource,
            dry_run,
            write,
            json,
        } => cmd_run(&fixture, config.as_deref(), resource, dry_run, write, json).await,
        Commands::Config { config } => cmd_config(config.as_deref()),
    };
    std::process::exit(code);
}
