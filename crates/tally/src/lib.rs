//! # tally
//!
//! A spreadsheet evaluation engine. A [`Sheet`] is a sparse grid of cells
//! whose values derive from formulas referencing other cells; values are
//! computed on demand, cyclic dependencies resolve to
//! [`Value::Undefined`], rectangle copies translate relative references,
//! and sheets round-trip through a stable binary format.
//!
//! ## Example
//!
//! ```rust
//! use tally::prelude::*;
//!
//! let mut sheet = Sheet::new();
//! let a1: Position = "A1".parse()?;
//! let b1: Position = "B1".parse()?;
//! let b2: Position = "B2".parse()?;
//!
//! sheet.set_cell(a1, "3")?;
//! sheet.set_cell(b1, "=A1*A1")?;
//! assert_eq!(sheet.get_value(b1), Value::Number(9.0));
//!
//! // Copying B1 one row down rebinds the relative reference to A2.
//! sheet.copy_rect(b2, b1, 1, 1);
//! assert_eq!(sheet.get_value(b2), Value::Undefined); // A2 is empty
//!
//! sheet.set_cell("A2".parse()?, "5")?;
//! assert_eq!(sheet.get_value(b2), Value::Number(25.0));
//! # Ok::<(), tally::Error>(())
//! ```
//!
//! Formulas support arithmetic (`+ - * / ^`, unary `-`), comparisons
//! (`= <> < <= > >=` producing 1.0/0.0), string literals with doubled-quote
//! escapes, and `$`-anchored references (`=$A$1`). `+` concatenates when
//! both operands are text. Range and function-call syntax is accepted and
//! persisted but evaluates to `Undefined`; see
//! [`Sheet::capabilities`] for the advertised feature set.

pub mod prelude;

// Re-export core types
pub use tally_core::{
    Cell,
    CellMap,
    Error,
    Op,
    Position,
    Program,
    ProgramBuilder,
    Result,
    Sheet,
    Value,
    CAP_CYCLIC_DEPS,
    CAP_FILE_IO,
    CAP_FUNCTIONS,
    CAP_SPEED,
};

// Re-export the formula front end
pub use tally_formula::{parse, ExprBuilder, FormulaError, FormulaResult};

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Extension trait adding path-based persistence to [`Sheet`]
///
/// The core engine only speaks `Read`/`Write`; this wraps it in buffered
/// file handles for the common case.
pub trait SheetExt: Sized {
    /// Read a sheet from a file written by [`save_to`](SheetExt::save_to)
    fn open<P: AsRef<Path>>(path: P) -> Result<Self>;

    /// Write the sheet to a file, creating or truncating it
    fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<()>;
}

impl SheetExt for Sheet {
    fn open<P: AsRef<Path>>(path: P) -> Result<Sheet> {
        let file = File::open(path)?;
        let mut sheet = Sheet::new();
        sheet.load(BufReader::new(file))?;
        Ok(sheet)
    }

    fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        self.save(&mut writer)?;
        writer.flush()?;
        Ok(())
    }
}
