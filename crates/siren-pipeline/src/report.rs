//! Report generation over partitioned alarms
//!
//! Claims the oldest pending ledger entry, reads that partition's rows
//! joined with the site registry, enriches each row with the panel-specific
//! sensor lookup, and hands the result to the chunked exporter. The ledger
//! entry is marked created only after the archive is on disk, so a failed
//! export leaves the partition claimable for the next run.

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{NaiveDate, NaiveDateTime};
use sqlx::mysql::MySqlPool;
use sqlx::Row;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{PipelineError, Result};
use crate::export::ChunkedExporter;
use crate::naming::mysql_ident;
use crate::tracker::{PartitionLedgerEntry, ReportTracker};

/// Sentinel for a missing sensor lookup
const UNKNOWN: &str = "N/A";

/// Panel-make to lookup-table mapping. Unrecognized makes fall back to the
/// RASS table, matching monitoring-station convention.
fn panel_lookup_table(panel_make: &str) -> &'static str {
    match panel_make {
        "SMART -I" => "smarti",
        "SMART-IN" => "smartinew",
        "SEC" => "securico",
        "sec_sbi" => "sec_sbi",
        "RASS" => "rass",
        "rass_cloud" => "rass_cloud",
        "rass_sbi" => "rass_sbi",
        "Raxx" => "raxx",
        "securico_gx4816" => "securico_gx4816",
        "smarti_hdfc32" => "smarti_hdfc32",
        "comfort_diebold" => "comfort_diebold",
        _ => "rass",
    }
}

fn format_datetime(value: NaiveDateTime) -> String {
    value.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// One partition row joined with its site registration
#[derive(Debug, Clone, Default)]
pub struct PartitionAlertRow {
    pub customer: Option<String>,
    pub bank: Option<String>,
    pub atm_id: Option<String>,
    pub site_address: Option<String>,
    pub dvr_ip: Option<String>,
    pub panel_make: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub region: Option<String>,
    pub incident_id: i64,
    pub panel_id: Option<String>,
    pub received_time: Option<NaiveDateTime>,
    pub comment: Option<String>,
    pub zone: Option<String>,
    pub alarm: Option<String>,
    pub closed_by: Option<String>,
    pub closed_time: Option<NaiveDateTime>,
    pub send_ip: Option<String>,
}

/// One enriched CSV row; field names are the report's column headers
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AlertRecord {
    #[serde(rename = "clientName")]
    pub client_name: String,
    #[serde(rename = "incidentNumber")]
    pub incident_number: i64,
    pub region: String,
    #[serde(rename = "ATMID")]
    pub atm_id: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zone: String,
    pub alarm: String,
    #[serde(rename = "incidentCategory")]
    pub incident_category: String,
    #[serde(rename = "alarmMessage")]
    pub alarm_message: String,
    #[serde(rename = "incidentDateTime")]
    pub incident_date_time: String,
    #[serde(rename = "alarmReceivedDateTime")]
    pub alarm_received_date_time: String,
    #[serde(rename = "closeDateTime")]
    pub close_date_time: Option<String>,
    #[serde(rename = "DVRIP")]
    pub dvr_ip: String,
    #[serde(rename = "panelMake")]
    pub panel_make: String,
    #[serde(rename = "panelID")]
    pub panel_id: String,
    pub bank: String,
    pub reactive: String,
    #[serde(rename = "closedBy")]
    pub closed_by: String,
    #[serde(rename = "closedDate")]
    pub closed_date: Option<String>,
    pub remark: String,
    #[serde(rename = "sendIp")]
    pub send_ip: String,
}

/// Build the enriched record for one row given its resolved sensor
/// description. Restoral codes (`...R`) append a suffix to the message and
/// classify the event non-reactive.
fn build_record(row: &PartitionAlertRow, description: &str) -> AlertRecord {
    let alarm = row.alarm.clone().unwrap_or_default();
    let is_restoral = alarm.ends_with('R');

    let alarm_message = if is_restoral {
        format!("{} Restoral", description)
    } else {
        description.to_string()
    };

    let received = row.received_time.map(format_datetime).unwrap_or_default();
    let closed = row.closed_time.map(format_datetime);

    let remark = format!(
        "{} * {} * {}",
        closed.clone().unwrap_or_default(),
        row.comment.clone().unwrap_or_default(),
        row.closed_by.clone().unwrap_or_default(),
    );

    AlertRecord {
        client_name: row.customer.clone().unwrap_or_default(),
        incident_number: row.incident_id,
        region: row.region.clone().unwrap_or_default(),
        atm_id: row.atm_id.clone().unwrap_or_default(),
        address: row.site_address.clone().unwrap_or_default(),
        city: row.city.clone().unwrap_or_default(),
        state: row.state.clone().unwrap_or_default(),
        zone: row.zone.clone().unwrap_or_default(),
        alarm: alarm.clone(),
        incident_category: description.to_string(),
        alarm_message,
        incident_date_time: received.clone(),
        alarm_received_date_time: received,
        close_date_time: closed.clone(),
        dvr_ip: row.dvr_ip.clone().unwrap_or_default(),
        panel_make: row.panel_make.clone().unwrap_or_default(),
        panel_id: row.panel_id.clone().unwrap_or_default(),
        bank: row.bank.clone().unwrap_or_default(),
        reactive: if is_restoral { "Non-Reactive" } else { "Reactive" }.to_string(),
        closed_by: row.closed_by.clone().unwrap_or_default(),
        closed_date: closed,
        remark,
        send_ip: row.send_ip.clone().unwrap_or_default(),
    }
}

/// Summary of one completed report run
#[derive(Debug, Clone, Serialize)]
pub struct ReportSummary {
    pub date: NaiveDate,
    pub table_name: String,
    pub rows: usize,
    pub files: usize,
    pub archive: PathBuf,
}

/// Claim-export-mark report job over the operational store
#[derive(Clone)]
pub struct ReportJob {
    pool: MySqlPool,
    tracker: ReportTracker,
    exporter: ChunkedExporter,
    out_dir: PathBuf,
    sites_table: String,
}

impl ReportJob {
    pub fn new(
        pool: MySqlPool,
        exporter: ChunkedExporter,
        out_dir: impl Into<PathBuf>,
        sites_table: impl Into<String>,
    ) -> Self {
        let tracker = ReportTracker::new(pool.clone());
        Self {
            pool,
            tracker,
            exporter,
            out_dir: out_dir.into(),
            sites_table: sites_table.into(),
        }
    }

    pub fn tracker(&self) -> &ReportTracker {
        &self.tracker
    }

    /// Run one report cycle. Returns `None` when no partition is pending.
    pub async fn run(&self) -> Result<Option<ReportSummary>> {
        let Some(entry) = self.tracker.claim_next_pending().await? else {
            info!("no pending partitions to report");
            return Ok(None);
        };

        info!(
            date = %entry.partition_date,
            table = %entry.table_name,
            "generating report"
        );

        let rows = self.fetch_partition_rows(&entry).await?;
        let records = self.enrich(rows).await?;

        let base_name = format!("alerts_{}", entry.partition_date);
        let manifest = self
            .exporter
            .export(&base_name, &records, &self.out_dir)?;
        let archive = self
            .exporter
            .archive(&manifest, &self.out_dir.join(format!("{}.zip", base_name)))?;

        self.tracker.mark_created(entry.id).await?;

        let summary = ReportSummary {
            date: entry.partition_date,
            table_name: entry.table_name.clone(),
            rows: records.len(),
            files: manifest.len(),
            archive,
        };
        info!(
            date = %summary.date,
            rows = summary.rows,
            files = summary.files,
            archive = %summary.archive.display(),
            "report complete"
        );
        Ok(Some(summary))
    }

    /// Read the claimed partition joined with the site registry, bounded to
    /// the partition's own day
    async fn fetch_partition_rows(
        &self,
        entry: &PartitionLedgerEntry,
    ) -> Result<Vec<PartitionAlertRow>> {
        let day_start = entry
            .partition_date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| PipelineError::schema("partition_ledger", "invalid partition date"))?;
        let day_end = entry
            .partition_date
            .and_hms_opt(23, 59, 59)
            .ok_or_else(|| PipelineError::schema("partition_ledger", "invalid partition date"))?;

        let sql = format!(
            "SELECT a.customer, a.bank, a.atmid, a.siteaddress, a.dvrip, \
                    a.panel_make, a.city, a.state, a.zone AS region, \
                    b.id, b.panelid, b.receivedtime, b.comment, b.zone, \
                    b.alarm, b.closedby, b.closedtime, b.sendip \
             FROM {sites} a \
             JOIN {partition} b \
               ON (a.oldpanelid = b.panelid OR a.newpanelid = b.panelid) \
             WHERE b.receivedtime BETWEEN ? AND ? \
             ORDER BY b.receivedtime DESC",
            sites = mysql_ident(&self.sites_table),
            partition = mysql_ident(&entry.table_name),
        );

        let raw = sqlx::query(&sql)
            .bind(day_start)
            .bind(day_end)
            .fetch_all(&self.pool)
            .await?;

        let mut rows = Vec::with_capacity(raw.len());
        for row in &raw {
            rows.push(PartitionAlertRow {
                customer: row.try_get("customer")?,
                bank: row.try_get("bank")?,
                atm_id: row.try_get("atmid")?,
                site_address: row.try_get("siteaddress")?,
                dvr_ip: row.try_get("dvrip")?,
                panel_make: row.try_get("panel_make")?,
                city: row.try_get("city")?,
                state: row.try_get("state")?,
                region: row.try_get("region")?,
                incident_id: row.try_get("id")?,
                panel_id: row.try_get("panelid")?,
                received_time: row.try_get("receivedtime")?,
                comment: row.try_get("comment")?,
                zone: row.try_get("zone")?,
                alarm: row.try_get("alarm")?,
                closed_by: row.try_get("closedby")?,
                closed_time: row.try_get("closedtime")?,
                send_ip: row.try_get("sendip")?,
            });
        }

        Ok(rows)
    }

    /// Resolve each row's sensor description through the panel lookup,
    /// caching results per (table, zone, code) for the run
    async fn enrich(&self, rows: Vec<PartitionAlertRow>) -> Result<Vec<AlertRecord>> {
        let mut cache: HashMap<(String, String, String), String> = HashMap::new();
        let mut records = Vec::with_capacity(rows.len());

        for row in &rows {
            let table = panel_lookup_table(row.panel_make.as_deref().unwrap_or_default());
            let zone = row.zone.clone().unwrap_or_default();
            let alarm = row.alarm.clone().unwrap_or_default();

            let key = (table.to_string(), zone.clone(), alarm.clone());
            let description = match cache.get(&key) {
                Some(found) => found.clone(),
                None => {
                    let resolved = self.lookup_sensor(table, &zone, &alarm).await?;
                    cache.insert(key, resolved.clone());
                    resolved
                },
            };

            records.push(build_record(row, &description));
        }

        Ok(records)
    }

    /// Sensor description for (zone, code); `N/A` when no lookup row matches
    async fn lookup_sensor(&self, table: &str, zone: &str, code: &str) -> Result<String> {
        let sql = format!(
            "SELECT sensorname FROM {} WHERE zone = ? AND scode = ?",
            mysql_ident(table),
        );

        let found: Option<Option<String>> = sqlx::query_scalar(&sql)
            .bind(zone)
            .bind(code)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                warn!(table = %table, zone = %zone, code = %code, error = %e, "sensor lookup failed");
                e
            })?;

        Ok(found.flatten().unwrap_or_else(|| UNKNOWN.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_row() -> PartitionAlertRow {
        PartitionAlertRow {
            customer: Some("First National".into()),
            bank: Some("FNB".into()),
            atm_id: Some("ATM-0042".into()),
            site_address: Some("12 High St".into()),
            dvr_ip: Some("10.1.2.3".into()),
            panel_make: Some("RASS".into()),
            city: Some("Pune".into()),
            state: Some("MH".into()),
            region: Some("West".into()),
            incident_id: 9001,
            panel_id: Some("P-77".into()),
            received_time: NaiveDate::from_ymd_opt(2025, 3, 22)
                .unwrap()
                .and_hms_opt(2, 30, 15),
            comment: Some("auto-closed".into()),
            zone: Some("3".into()),
            alarm: Some("BA".into()),
            closed_by: Some("operator1".into()),
            closed_time: NaiveDate::from_ymd_opt(2025, 3, 22)
                .unwrap()
                .and_hms_opt(2, 45, 0),
            send_ip: Some("10.9.9.9".into()),
        }
    }

    #[test]
    fn test_panel_lookup_table_mapping() {
        assert_eq!(panel_lookup_table("SMART -I"), "smarti");
        assert_eq!(panel_lookup_table("SEC"), "securico");
        assert_eq!(panel_lookup_table("rass_cloud"), "rass_cloud");
    }

    #[test]
    fn test_panel_lookup_table_default() {
        assert_eq!(panel_lookup_table("unknown-make"), "rass");
        assert_eq!(panel_lookup_table(""), "rass");
    }

    #[test]
    fn test_build_record_reactive() {
        let record = build_record(&sample_row(), "Burglary");
        assert_eq!(record.alarm_message, "Burglary");
        assert_eq!(record.reactive, "Reactive");
        assert_eq!(record.incident_category, "Burglary");
        assert_eq!(record.incident_date_time, "2025-03-22 02:30:15");
    }

    #[test]
    fn test_build_record_restoral() {
        let mut row = sample_row();
        row.alarm = Some("BAR".into());
        let record = build_record(&row, "Burglary");
        assert_eq!(record.alarm_message, "Burglary Restoral");
        assert_eq!(record.reactive, "Non-Reactive");
    }

    #[test]
    fn test_build_record_remark_composition() {
        let record = build_record(&sample_row(), "Burglary");
        assert_eq!(record.remark, "2025-03-22 02:45:00 * auto-closed * operator1");
    }

    #[test]
    fn test_build_record_handles_missing_fields() {
        let row = PartitionAlertRow {
            incident_id: 1,
            ..Default::default()
        };
        let record = build_record(&row, UNKNOWN);
        assert_eq!(record.client_name, "");
        assert_eq!(record.close_date_time, None);
        assert_eq!(record.remark, " *  * ");
        assert_eq!(record.incident_category, "N/A");
    }
}
