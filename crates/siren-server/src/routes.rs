//! HTTP routes
//!
//! Thin consumers of the pipeline: handlers validate primitive parameters,
//! delegate to `siren-pipeline` components built over the shared pools, and
//! render structured results as JSON. Missing required input maps to 400,
//! store failures to 500 (see [`crate::error::AppError`]).

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::{mysql::MySqlPool, postgres::PgPool, Row};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use siren_pipeline::export::ChunkedExporter;
use siren_pipeline::migrate::Migrator;
use siren_pipeline::naming::{partition_table_name, pg_ident};
use siren_pipeline::partition::PartitionBuilder;
use siren_pipeline::report::{ReportJob, ReportSummary};
use siren_pipeline::source::SourceStore;
use siren_pipeline::tracker::{PartitionLedgerEntry, ReportTracker};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::pagination::{PaginationMetadata, PaginationParams};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub source: MySqlPool,
    pub dest: PgPool,
    pub config: Arc<Config>,
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/migrate", post(migrate))
        .route("/api/v1/partitions", post(partitions))
        .route("/api/v1/ledger/latest", get(ledger_latest))
        .route("/api/v1/reports/run", post(run_report))
        .route("/api/v1/alerts", get(alerts_page))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// GET /health
async fn health(State(state): State<AppState>) -> AppResult<Json<serde_json::Value>> {
    sqlx::query("SELECT 1").execute(&state.source).await?;
    sqlx::query("SELECT 1").execute(&state.dest).await?;
    Ok(Json(json!({ "status": "ok" })))
}

#[derive(Debug, Deserialize)]
struct MigrateRequest {
    table: Option<String>,
}

#[derive(Debug, Serialize)]
struct MigrateResponse {
    table: String,
    columns: usize,
    rows_read: usize,
    inserted: u64,
    renamed: Vec<String>,
}

/// POST /api/v1/migrate
///
/// Triggers the one-shot migration path for a named table. Destructive to
/// any prior destination copy of that table.
async fn migrate(
    State(state): State<AppState>,
    Json(request): Json<MigrateRequest>,
) -> AppResult<Json<MigrateResponse>> {
    let table = request
        .table
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("Table name is required.".into()))?;

    let pipeline = &state.config.pipeline;
    let migrator = Migrator::with_load_settings(
        SourceStore::new(state.source.clone()),
        state.dest.clone(),
        state.config.destination_database.url.as_str(),
        pipeline.chunk_size,
        pipeline.max_workers,
    );

    let report = migrator.migrate_table(&table).await?;
    info!(table = %report.table, inserted = report.inserted, "migration triggered via API");

    Ok(Json(MigrateResponse {
        table: report.table,
        columns: report.columns,
        rows_read: report.rows_read,
        inserted: report.inserted,
        renamed: report.renamed,
    }))
}

#[derive(Debug, Deserialize)]
struct PartitionRequest {
    since: Option<String>,
}

#[derive(Debug, Serialize)]
struct PartitionResponse {
    completed: Vec<PartitionLedgerEntry>,
    failed: Vec<PartitionFailure>,
}

#[derive(Debug, Serialize)]
struct PartitionFailure {
    date: NaiveDate,
    error: String,
}

/// POST /api/v1/partitions
async fn partitions(
    State(state): State<AppState>,
    Json(request): Json<PartitionRequest>,
) -> AppResult<Json<PartitionResponse>> {
    let since = parse_since(request.since.as_deref())?;

    let pipeline = &state.config.pipeline;
    let builder = PartitionBuilder::new(
        state.source.clone(),
        pipeline.source_table.clone(),
        pipeline.date_column.clone(),
        pipeline.max_workers,
    );

    let run = builder.partition_by_date(since).await?;
    Ok(Json(PartitionResponse {
        completed: run.completed,
        failed: run
            .failed
            .into_iter()
            .map(|(date, error)| PartitionFailure {
                date,
                error: error.to_string(),
            })
            .collect(),
    }))
}

/// GET /api/v1/ledger/latest
async fn ledger_latest(
    State(state): State<AppState>,
) -> AppResult<Json<PartitionLedgerEntry>> {
    let tracker = ReportTracker::new(state.source.clone());
    tracker.ensure_ledger().await?;

    let entry = tracker
        .latest_entry()
        .await?
        .ok_or_else(|| AppError::NotFound("No ledger entries exist yet.".into()))?;
    Ok(Json(entry))
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum ReportResponse {
    Ran(ReportSummary),
    Idle { message: String },
}

/// POST /api/v1/reports/run
///
/// Runs one claim-export-mark cycle; idle when nothing is pending.
async fn run_report(State(state): State<AppState>) -> AppResult<Json<ReportResponse>> {
    let pipeline = &state.config.pipeline;
    let job = ReportJob::new(
        state.source.clone(),
        ChunkedExporter::new(pipeline.max_rows_per_file),
        pipeline.export_dir.clone(),
        pipeline.sites_table.clone(),
    );

    match job.run().await? {
        Some(summary) => Ok(Json(ReportResponse::Ran(summary))),
        None => Ok(Json(ReportResponse::Idle {
            message: "No pending partitions to report.".into(),
        })),
    }
}

#[derive(Debug, Deserialize)]
struct AlertsQuery {
    date: Option<String>,
    page: Option<i64>,
    per_page: Option<i64>,
}

/// One migrated alarm row as served to readers. Column names are the
/// normalized (lowercase) destination spellings.
#[derive(Debug, Serialize)]
struct AlertRow {
    id: Option<i32>,
    panelid: Option<String>,
    createtime: Option<NaiveDateTime>,
    receivedtime: Option<NaiveDateTime>,
    comment: Option<String>,
    zone: Option<String>,
    alarm: Option<String>,
    closedby: Option<String>,
    closedtime: Option<NaiveDateTime>,
    sendip: Option<String>,
}

#[derive(Debug, Serialize)]
struct AlertsPageResponse {
    table: String,
    alerts: Vec<AlertRow>,
    pagination: PaginationMetadata,
}

/// GET /api/v1/alerts?date=YYYY-MM-DD&page=1&per_page=100
///
/// Pages through a migrated partition table on the destination store. The
/// table name is derived from the date through the same naming function the
/// partition writer uses; client-supplied table names are never accepted.
async fn alerts_page(
    State(state): State<AppState>,
    Query(query): Query<AlertsQuery>,
) -> AppResult<Json<AlertsPageResponse>> {
    let date = parse_since(query.date.as_deref())?;
    let pagination = PaginationParams {
        page: query.page,
        per_page: query.per_page,
    };
    let table = partition_table_name(&state.config.pipeline.source_table, date);

    let exists: Option<String> = sqlx::query_scalar("SELECT to_regclass($1)::text")
        .bind(&table)
        .fetch_one(&state.dest)
        .await?;
    if exists.is_none() {
        return Err(AppError::NotFound(format!(
            "Partition table '{}' has not been migrated.",
            table
        )));
    }

    let quoted = pg_ident(&table);
    let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", quoted))
        .fetch_one(&state.dest)
        .await?;

    let sql = format!(
        "SELECT id, panelid, createtime, receivedtime, comment, zone, alarm, \
                closedby, closedtime, sendip \
         FROM {} ORDER BY receivedtime DESC LIMIT $1 OFFSET $2",
        quoted
    );
    let rows = sqlx::query(&sql)
        .bind(pagination.per_page())
        .bind(pagination.offset())
        .fetch_all(&state.dest)
        .await?;

    let mut alerts = Vec::with_capacity(rows.len());
    for row in &rows {
        alerts.push(AlertRow {
            id: row.try_get("id")?,
            panelid: row.try_get("panelid")?,
            createtime: row.try_get("createtime")?,
            receivedtime: row.try_get("receivedtime")?,
            comment: row.try_get("comment")?,
            zone: row.try_get("zone")?,
            alarm: row.try_get("alarm")?,
            closedby: row.try_get("closedby")?,
            closedtime: row.try_get("closedtime")?,
            sendip: row.try_get("sendip")?,
        });
    }

    let metadata =
        PaginationMetadata::new(pagination.page(), pagination.per_page(), total);

    Ok(Json(AlertsPageResponse {
        table,
        alerts,
        pagination: metadata,
    }))
}

/// Parse a required `YYYY-MM-DD` parameter
fn parse_since(value: Option<&str>) -> AppResult<NaiveDate> {
    let raw = value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("A date (YYYY-MM-DD) is required.".into()))?;

    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::BadRequest(format!("'{}' is not a valid YYYY-MM-DD date.", raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_since_valid() {
        let date = parse_since(Some("2025-03-22")).unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2025, 3, 22).unwrap());
    }

    #[test]
    fn test_parse_since_missing() {
        assert!(matches!(
            parse_since(None),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            parse_since(Some("  ")),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_parse_since_invalid_format() {
        assert!(matches!(
            parse_since(Some("22-03-2025")),
            Err(AppError::BadRequest(_))
        ));
    }
}
