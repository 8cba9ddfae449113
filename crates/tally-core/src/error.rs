//! Error types for tally-core

use thiserror::Error;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in tally-core
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid cell position format
    #[error("Invalid cell position: {0}")]
    InvalidPosition(String),

    /// Formula rejected by the parser
    #[error("Formula error: {0}")]
    Formula(#[from] tally_formula::FormulaError),

    /// IO error while reading or writing a sheet stream
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The sheet stream is structurally damaged
    #[error("Corrupted sheet data: {0}")]
    Corrupted(String),
}
