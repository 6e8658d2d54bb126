//! Error types for the CLI

use core_types::CompileError;
use metric_store::StoreError;
use std::path::PathBuf;
use thiserror::Error;

/// CLI-specific errors
#[derive(Debug, Error)]
pub enum CliError {
    /// A program or input file could not be read
    #[error("{}: {source}", path.display())]
    Io {
        /// The file being read
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// A program failed to compile
    #[error("{program}:{source}")]
    Compile {
        /// Program name
        program: String,
        /// Compiler diagnostic
        source: CompileError,
    },

    /// A program declares a metric that clashes with another program's
    #[error("{program}: {source}")]
    Load {
        /// Program name
        program: String,
        /// Store diagnostic
        source: StoreError,
    },

    /// The export could not be serialized
    #[error("export failed: {0}")]
    Export(#[from] serde_json::Error),

    /// The expiry worker thread could not be started
    #[error("cannot start expiry worker: {0}")]
    Worker(#[source] std::io::Error),
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;
