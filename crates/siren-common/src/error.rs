//! Error types shared across SIREN crates

use thiserror::Error;

/// Result type alias for SIREN operations
pub type Result<T> = std::result::Result<T, SirenError>;

/// Cross-crate error type
#[derive(Error, Debug)]
pub enum SirenError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Store error: {0}")]
    Store(String),
}

impl SirenError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a parse error
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = SirenError::config("SOURCE_DATABASE_URL not set");
        assert_eq!(
            err.to_string(),
            "Configuration error: SOURCE_DATABASE_URL not set"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: SirenError = io.into();
        assert!(matches!(err, SirenError::Io(_)));
    }
}
