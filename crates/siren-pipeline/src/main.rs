//! SIREN - one-shot pipeline tool

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use siren_common::logging::{init_logging, LogConfig, LogLevel};
use tracing::info;

use siren_pipeline::export::ChunkedExporter;
use siren_pipeline::migrate::Migrator;
use siren_pipeline::partition::PartitionBuilder;
use siren_pipeline::report::ReportJob;
use siren_pipeline::source::SourceStore;

#[derive(Parser, Debug)]
#[command(name = "siren")]
#[command(author, version, about = "SIREN alarm migration and reporting tool")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Source (MySQL) connection string
    #[arg(long, env = "SOURCE_DATABASE_URL")]
    source_url: String,

    /// Destination (PostgreSQL) connection string; required for `migrate`
    #[arg(long, env = "DATABASE_URL")]
    dest_url: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Migrate one table from the source store to the destination store
    Migrate {
        /// Table to migrate
        table: String,

        /// Rows per bulk-insert chunk
        #[arg(long, default_value_t = 1000)]
        chunk_size: usize,

        /// Concurrent destination workers
        #[arg(long, default_value_t = 4)]
        workers: usize,
    },

    /// Materialize per-date partition tables and ledger rows
    Partition {
        /// Source table holding the alarm events
        #[arg(long, default_value = "backalerts")]
        table: String,

        /// Event timestamp column partitioned on
        #[arg(long, default_value = "receivedtime")]
        date_column: String,

        /// Partition every event date at or after this date
        #[arg(long)]
        since: NaiveDate,

        /// Concurrent partition workers
        #[arg(long, default_value_t = 4)]
        workers: usize,
    },

    /// Export the oldest pending partition as a zipped CSV report
    Report {
        /// Directory receiving CSV files and the archive
        #[arg(long, default_value = "./reports")]
        out_dir: String,

        /// Maximum data rows per CSV file
        #[arg(long, default_value_t = 800_000)]
        max_rows_per_file: usize,

        /// Site registry table joined against each partition
        #[arg(long, default_value = "sites")]
        sites_table: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("siren".to_string())
        .build();

    // Environment variables take precedence over the defaults above
    let log_config = LogConfig::from_env().unwrap_or(log_config);
    init_logging(&log_config)?;

    let source = SourceStore::connect(&cli.source_url)
        .await
        .context("Failed to connect to source store")?;

    match cli.command {
        Command::Migrate {
            table,
            chunk_size,
            workers,
        } => {
            let dest_url = cli
                .dest_url
                .context("DATABASE_URL is required for migrate")?;
            let dest = sqlx::PgPool::connect(&dest_url)
                .await
                .context("Failed to connect to destination store")?;

            let migrator = Migrator::with_load_settings(
                source,
                dest,
                dest_url.as_str(),
                chunk_size,
                workers,
            );
            let report = migrator.migrate_table(&table).await?;
            info!(
                table = %report.table,
                rows = report.rows_read,
                inserted = report.inserted,
                "migration finished"
            );
        },
        Command::Partition {
            table,
            date_column,
            since,
            workers,
        } => {
            let builder =
                PartitionBuilder::new(source.pool().clone(), table, date_column, workers);
            let run = builder.partition_by_date(since).await?;
            info!(
                completed = run.completed.len(),
                failed = run.failed.len(),
                "partitioning finished"
            );
            for (date, error) in &run.failed {
                tracing::error!(date = %date, error = %error, "partition date failed");
            }
        },
        Command::Report {
            out_dir,
            max_rows_per_file,
            sites_table,
        } => {
            let job = ReportJob::new(
                source.pool().clone(),
                ChunkedExporter::new(max_rows_per_file),
                out_dir,
                sites_table,
            );
            match job.run().await? {
                Some(summary) => info!(
                    date = %summary.date,
                    rows = summary.rows,
                    archive = %summary.archive.display(),
                    "report finished"
                ),
                None => info!("nothing pending to report"),
            }
        },
    }

    Ok(())
}
