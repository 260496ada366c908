//! SIREN Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared error handling and logging for the SIREN workspace members.
//!
//! # Overview
//!
//! - **Error Handling**: the [`SirenError`] type and [`Result`] alias used
//!   at crate boundaries
//! - **Logging**: [`logging::LogConfig`] and [`logging::init_logging`] for
//!   structured tracing output (console/file, text/json)

pub mod error;
pub mod logging;

// Re-export commonly used types
pub use error::{Result, SirenError};
