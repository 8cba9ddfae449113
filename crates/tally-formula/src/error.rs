//! Formula error types

use thiserror::Error;

/// Result type for formula parsing
pub type FormulaResult<T> = std::result::Result<T, FormulaError>;

/// Errors reported by the formula parser
#[derive(Debug, Error)]
pub enum FormulaError {
    /// The input is not a well-formed formula
    #[error("Parse error: {0}")]
    Parse(String),
}
