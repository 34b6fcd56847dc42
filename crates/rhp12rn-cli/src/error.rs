//! CLI error type.

use rhp12rn_connector::ConnectorError;
use rhp12rn_control_table::ControlTableError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors reported by the `rhp12rn` binary.
#[derive(Error, Debug)]
pub enum CliError {
    /// A file named on the command line could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Field table could not be loaded.
    #[error("field table: {0}")]
    FieldTable(#[from] ControlTableError),

    /// The connection failed.
    #[error(transparent)]
    Connector(#[from] ConnectorError),

    /// Invalid argument combination.
    #[error("{0}")]
    Usage(String),
}

/// Result type for CLI commands.
pub type Result<T> = std::result::Result<T, CliError>;
