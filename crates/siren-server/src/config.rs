//! Configuration management

use serde::{Deserialize, Serialize};

// ============================================================================
// Server Configuration Constants
// ============================================================================

/// Default server host binding.
pub const DEFAULT_SERVER_HOST: &str = "127.0.0.1";

/// Default server port.
pub const DEFAULT_SERVER_PORT: u16 = 8000;

/// Default source (MySQL) URL for local development.
pub const DEFAULT_SOURCE_DATABASE_URL: &str = "mysql://root@localhost:3306/esurv";

/// Default destination (PostgreSQL) URL for local development.
pub const DEFAULT_DATABASE_URL: &str = "postgresql://localhost/siren";

/// Default maximum connections per database pool.
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 10;

/// Default database connection timeout in seconds.
pub const DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default rows per bulk-insert chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Default bounded worker count for loads and partitioning.
pub const DEFAULT_MAX_WORKERS: usize = 4;

/// Default maximum data rows per exported CSV file.
pub const DEFAULT_MAX_ROWS_PER_FILE: usize = 800_000;

/// Default directory receiving export files and archives.
pub const DEFAULT_EXPORT_DIR: &str = "./reports";

/// Default alarm event table on the source store.
pub const DEFAULT_SOURCE_TABLE: &str = "backalerts";

/// Default event timestamp column partitioned on.
pub const DEFAULT_DATE_COLUMN: &str = "receivedtime";

/// Default site registry table.
pub const DEFAULT_SITES_TABLE: &str = "sites";

/// Default scheduler interval in seconds (hourly).
pub const DEFAULT_SCHEDULE_INTERVAL_SECS: u64 = 3600;

/// Default lookback window for scheduled partitioning, in days.
pub const DEFAULT_SCHEDULE_LOOKBACK_DAYS: u32 = 1;

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub source_database: DatabaseConfig,
    pub destination_database: DatabaseConfig,
    pub pipeline: PipelineConfig,
}

/// Server-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// One database pool's configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connect_timeout_secs: u64,
}

/// Pipeline knobs shared by handlers and the scheduler
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub source_table: String,
    pub date_column: String,
    pub sites_table: String,
    pub chunk_size: usize,
    pub max_workers: usize,
    pub max_rows_per_file: usize,
    pub export_dir: String,
    pub schedule_enabled: bool,
    pub schedule_interval_secs: u64,
    pub schedule_lookback_days: u32,
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config {
            server: ServerConfig {
                host: std::env::var("SIREN_HOST")
                    .unwrap_or_else(|_| DEFAULT_SERVER_HOST.to_string()),
                port: std::env::var("SIREN_PORT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_SERVER_PORT),
            },
            source_database: DatabaseConfig {
                url: std::env::var("SOURCE_DATABASE_URL")
                    .unwrap_or_else(|_| DEFAULT_SOURCE_DATABASE_URL.to_string()),
                max_connections: env_parse("SOURCE_DATABASE_MAX_CONNECTIONS")
                    .unwrap_or(DEFAULT_DATABASE_MAX_CONNECTIONS),
                connect_timeout_secs: env_parse("SOURCE_DATABASE_CONNECT_TIMEOUT")
                    .unwrap_or(DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS),
            },
            destination_database: DatabaseConfig {
                url: std::env::var("DATABASE_URL")
                    .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
                max_connections: env_parse("DATABASE_MAX_CONNECTIONS")
                    .unwrap_or(DEFAULT_DATABASE_MAX_CONNECTIONS),
                connect_timeout_secs: env_parse("DATABASE_CONNECT_TIMEOUT")
                    .unwrap_or(DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS),
            },
            pipeline: PipelineConfig {
                source_table: std::env::var("SIREN_SOURCE_TABLE")
                    .unwrap_or_else(|_| DEFAULT_SOURCE_TABLE.to_string()),
                date_column: std::env::var("SIREN_DATE_COLUMN")
                    .unwrap_or_else(|_| DEFAULT_DATE_COLUMN.to_string()),
                sites_table: std::env::var("SIREN_SITES_TABLE")
                    .unwrap_or_else(|_| DEFAULT_SITES_TABLE.to_string()),
                chunk_size: env_parse("SIREN_CHUNK_SIZE").unwrap_or(DEFAULT_CHUNK_SIZE),
                max_workers: env_parse("SIREN_MAX_WORKERS").unwrap_or(DEFAULT_MAX_WORKERS),
                max_rows_per_file: env_parse("SIREN_MAX_ROWS_PER_FILE")
                    .unwrap_or(DEFAULT_MAX_ROWS_PER_FILE),
                export_dir: std::env::var("SIREN_EXPORT_DIR")
                    .unwrap_or_else(|_| DEFAULT_EXPORT_DIR.to_string()),
                schedule_enabled: env_parse("SIREN_SCHEDULE_ENABLED").unwrap_or(false),
                schedule_interval_secs: env_parse("SIREN_SCHEDULE_INTERVAL")
                    .unwrap_or(DEFAULT_SCHEDULE_INTERVAL_SECS),
                schedule_lookback_days: env_parse("SIREN_SCHEDULE_LOOKBACK_DAYS")
                    .unwrap_or(DEFAULT_SCHEDULE_LOOKBACK_DAYS),
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.pipeline.chunk_size == 0 {
            anyhow::bail!("SIREN_CHUNK_SIZE must be greater than 0");
        }
        if self.pipeline.max_workers == 0 {
            anyhow::bail!("SIREN_MAX_WORKERS must be greater than 0");
        }
        if self.pipeline.max_rows_per_file == 0 {
            anyhow::bail!("SIREN_MAX_ROWS_PER_FILE must be greater than 0");
        }
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config {
            server: ServerConfig {
                host: DEFAULT_SERVER_HOST.into(),
                port: DEFAULT_SERVER_PORT,
            },
            source_database: DatabaseConfig {
                url: DEFAULT_SOURCE_DATABASE_URL.into(),
                max_connections: DEFAULT_DATABASE_MAX_CONNECTIONS,
                connect_timeout_secs: DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
            },
            destination_database: DatabaseConfig {
                url: DEFAULT_DATABASE_URL.into(),
                max_connections: DEFAULT_DATABASE_MAX_CONNECTIONS,
                connect_timeout_secs: DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
            },
            pipeline: PipelineConfig {
                source_table: DEFAULT_SOURCE_TABLE.into(),
                date_column: DEFAULT_DATE_COLUMN.into(),
                sites_table: DEFAULT_SITES_TABLE.into(),
                chunk_size: DEFAULT_CHUNK_SIZE,
                max_workers: DEFAULT_MAX_WORKERS,
                max_rows_per_file: DEFAULT_MAX_ROWS_PER_FILE,
                export_dir: DEFAULT_EXPORT_DIR.into(),
                schedule_enabled: false,
                schedule_interval_secs: DEFAULT_SCHEDULE_INTERVAL_SECS,
                schedule_lookback_days: DEFAULT_SCHEDULE_LOOKBACK_DAYS,
            },
        };

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        let mut config = Config {
            server: ServerConfig {
                host: DEFAULT_SERVER_HOST.into(),
                port: DEFAULT_SERVER_PORT,
            },
            source_database: DatabaseConfig {
                url: DEFAULT_SOURCE_DATABASE_URL.into(),
                max_connections: DEFAULT_DATABASE_MAX_CONNECTIONS,
                connect_timeout_secs: DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
            },
            destination_database: DatabaseConfig {
                url: DEFAULT_DATABASE_URL.into(),
                max_connections: DEFAULT_DATABASE_MAX_CONNECTIONS,
                connect_timeout_secs: DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
            },
            pipeline: PipelineConfig {
                source_table: DEFAULT_SOURCE_TABLE.into(),
                date_column: DEFAULT_DATE_COLUMN.into(),
                sites_table: DEFAULT_SITES_TABLE.into(),
                chunk_size: DEFAULT_CHUNK_SIZE,
                max_workers: DEFAULT_MAX_WORKERS,
                max_rows_per_file: DEFAULT_MAX_ROWS_PER_FILE,
                export_dir: DEFAULT_EXPORT_DIR.into(),
                schedule_enabled: false,
                schedule_interval_secs: DEFAULT_SCHEDULE_INTERVAL_SECS,
                schedule_lookback_days: DEFAULT_SCHEDULE_LOOKBACK_DAYS,
            },
        };
        config.pipeline.chunk_size = 0;
        assert!(config.validate().is_err());
    }
}
