//! logtally command-line front end
//!
//! Provides the [`Runtime`] that loads programs, feeds inputs through them
//! and exports the resulting metrics.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cli;
pub mod error;
pub mod runtime;

pub use cli::{Cli, ExportFormat};
pub use error::{CliError, CliResult};
pub use runtime::{InputStats, Runtime};
