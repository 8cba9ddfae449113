//! Prelude module — common imports for tally users
//!
//! ```rust
//! use tally::prelude::*;
//! ```

pub use crate::{
    // Error types
    Error,
    FormulaError,
    // Core types
    Position,
    Result,
    Sheet,
    // Extension traits
    SheetExt,
    Value,
    // Capability flags
    CAP_CYCLIC_DEPS,
    CAP_FILE_IO,
    CAP_FUNCTIONS,
    CAP_SPEED,
};
