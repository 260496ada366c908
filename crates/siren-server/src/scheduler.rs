//! Background partition-and-report scheduler
//!
//! A tokio interval loop standing in for the original deployment's external
//! job queue: every tick it partitions the recent event dates, then drains
//! pending ledger entries through the report job. Errors are logged and the
//! loop keeps ticking; a failed date or export stays pending and is retried
//! on the next tick.

use chrono::{Days, Utc};
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{error, info};

use siren_pipeline::export::ChunkedExporter;
use siren_pipeline::partition::PartitionBuilder;
use siren_pipeline::report::ReportJob;

use crate::routes::AppState;

/// Start the scheduler loop; the handle runs for the process lifetime
pub fn start(state: AppState) -> JoinHandle<()> {
    let pipeline = state.config.pipeline.clone();

    tokio::spawn(async move {
        let mut ticker = interval(Duration::from_secs(pipeline.schedule_interval_secs));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            interval_secs = pipeline.schedule_interval_secs,
            lookback_days = pipeline.schedule_lookback_days,
            "scheduler started"
        );

        loop {
            ticker.tick().await;

            let since = Utc::now()
                .date_naive()
                .checked_sub_days(Days::new(pipeline.schedule_lookback_days as u64))
                .unwrap_or_else(|| Utc::now().date_naive());

            let builder = PartitionBuilder::new(
                state.source.clone(),
                pipeline.source_table.clone(),
                pipeline.date_column.clone(),
                pipeline.max_workers,
            );
            match builder.partition_by_date(since).await {
                Ok(run) => {
                    info!(
                        completed = run.completed.len(),
                        failed = run.failed.len(),
                        "scheduled partitioning finished"
                    );
                    for (date, e) in &run.failed {
                        error!(date = %date, error = %e, "scheduled partition date failed");
                    }
                },
                Err(e) => {
                    error!(error = %e, "scheduled partitioning failed");
                    continue;
                },
            }

            let job = ReportJob::new(
                state.source.clone(),
                ChunkedExporter::new(pipeline.max_rows_per_file),
                pipeline.export_dir.clone(),
                pipeline.sites_table.clone(),
            );

            // Drain every pending partition so a backlog clears in one tick
            loop {
                match job.run().await {
                    Ok(Some(summary)) => {
                        info!(
                            date = %summary.date,
                            rows = summary.rows,
                            archive = %summary.archive.display(),
                            "scheduled report finished"
                        );
                    },
                    Ok(None) => break,
                    Err(e) => {
                        error!(error = %e, "scheduled report failed");
                        break;
                    },
                }
            }
        }
    })
}
