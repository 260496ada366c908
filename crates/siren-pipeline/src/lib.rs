//! SIREN Pipeline Library
//!
//! Cross-engine migration, date partitioning, and tracked export for
//! security-alarm event tables.
//!
//! # Overview
//!
//! Two independent paths over a MySQL (operational) source store and a
//! PostgreSQL (analytical) destination store:
//!
//! - **Migration**: introspect a source table, translate its schema,
//!   bulk-load its rows over parallel worker connections, then normalize
//!   destination column names ([`migrate::Migrator`]).
//! - **Reporting**: materialize per-date partition tables with a tracking
//!   ledger ([`partition::PartitionBuilder`]), claim the oldest pending
//!   partition ([`tracker::ReportTracker`]), and export its enriched rows
//!   as chunked CSV files bundled into a zip archive
//!   ([`report::ReportJob`], [`export::ChunkedExporter`]).
//!
//! # Example
//!
//! ```no_run
//! use siren_pipeline::migrate::Migrator;
//! use siren_pipeline::source::SourceStore;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let source = SourceStore::connect("mysql://root@localhost/esurv").await?;
//!     let dest = sqlx::PgPool::connect("postgresql://localhost/siren").await?;
//!     let migrator = Migrator::new(source, dest, "postgresql://localhost/siren");
//!     let report = migrator.migrate_table("backalerts").await?;
//!     println!("migrated {} rows", report.inserted);
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod export;
pub mod loader;
pub mod migrate;
pub mod naming;
pub mod normalize;
pub mod partition;
pub mod report;
pub mod schema;
pub mod source;
pub mod tracker;
pub mod typemap;
pub mod value;

// Re-export commonly used types
pub use error::{PipelineError, Result};
pub use typemap::{map_source_type, ColumnDescriptor, ColumnType};
