use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

mod aggregate;
mod chart;
mod config;
mod dashboard;
mod dataset;
mod db;
mod error;
mod models;
mod pipeline;
mod report;
mod search;
mod store;

use dashboard::{Outcome, Request, DEFAULT_COMPARE_YEARS};
use dataset::DatasetKind;

#[derive(Parser)]
#[command(name = "edu-dashboard")]
#[command(about = "Reporting over yearly grades and finals datasets", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Where to write an outcome besides the terminal.
#[derive(clap::Args)]
struct Output {
    /// Write a markdown report
    #[arg(long)]
    out: Option<PathBuf>,
    /// Export the result table as CSV
    #[arg(long)]
    csv: Option<PathBuf>,
    /// Write the chart specification as JSON
    #[arg(long)]
    chart: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List supported datasets and the source holding each
    Datasets,
    /// Create or upgrade the dataset tables on every source
    InitDb,
    /// Import one dataset from a CSV export
    Import {
        #[arg(long, value_enum)]
        kind: DatasetKind,
        #[arg(long)]
        year: u16,
        #[arg(long)]
        csv: PathBuf,
        /// Clear the dataset before loading
        #[arg(long)]
        replace: bool,
    },
    /// Show the records of a dataset, optionally filtered by school or code
    Browse {
        #[arg(long, value_enum)]
        kind: DatasetKind,
        #[arg(long)]
        year: u16,
        #[arg(long, default_value = "")]
        search: String,
        #[command(flatten)]
        output: Output,
    },
    /// Rank the top 10 schools of a finals year
    TopSchools {
        #[arg(long)]
        year: u16,
        #[command(flatten)]
        output: Output,
    },
    /// Compare the top 10 schools of two finals years
    Compare {
        #[arg(long, default_value_t = DEFAULT_COMPARE_YEARS.0)]
        year_a: u16,
        #[arg(long, default_value_t = DEFAULT_COMPARE_YEARS.1)]
        year_b: u16,
        #[command(flatten)]
        output: Output,
    },
    /// Average score by nationality
    Nationality {
        #[arg(long, value_enum)]
        kind: DatasetKind,
        #[arg(long)]
        year: u16,
        #[command(flatten)]
        output: Output,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let (request, output) = match cli.command {
        Commands::Datasets => {
            for dataset in dataset::all_datasets() {
                println!("- {dataset}");
            }
            return Ok(());
        }
        Commands::InitDb => {
            let store = connect().await?;
            db::init_db(&store).await?;
            println!("Schema ready.");
            return Ok(());
        }
        Commands::Import {
            kind,
            year,
            csv,
            replace,
        } => {
            let target = dataset::resolve(kind, year)?;
            let store = connect().await?;
            let inserted = db::import_csv(&store, &target, &csv, replace).await?;
            println!("Inserted {inserted} records into {target} from {}.", csv.display());
            return Ok(());
        }
        Commands::Browse {
            kind,
            year,
            search,
            output,
        } => (
            Request::Browse {
                kind,
                year,
                search_text: search,
            },
            output,
        ),
        Commands::TopSchools { year, output } => (Request::TopSchools { year }, output),
        Commands::Compare {
            year_a,
            year_b,
            output,
        } => (Request::CompareFinals { year_a, year_b }, output),
        Commands::Nationality { kind, year, output } => {
            (Request::Nationality { kind, year }, output)
        }
    };

    let store = connect().await?;
    let outcome = dashboard::run(&store, &request).await?;
    print!("{}", report::render(&outcome));
    write_outputs(&outcome, &output)?;

    Ok(())
}

async fn connect() -> anyhow::Result<db::PgStore> {
    let config = config::Config::from_env()?;
    db::PgStore::connect(&config).await
}

fn write_outputs(outcome: &Outcome, output: &Output) -> anyhow::Result<()> {
    if let Some(path) = &output.out {
        std::fs::write(path, report::build_report(outcome, chrono::Utc::now()))
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("Report written to {}.", path.display());
    }

    if let Some(path) = &output.csv {
        report::write_csv(outcome, path)?;
        println!("Table exported to {}.", path.display());
    }

    if let Some(path) = &output.chart {
        match outcome.chart() {
            Some(chart) => {
                std::fs::write(path, chart.to_json()?)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                println!("Chart written to {}.", path.display());
            }
            None => log::warn!("this view has no chart; skipping {}", path.display()),
        }
    }

    Ok(())
}
