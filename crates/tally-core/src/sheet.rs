//! The sheet: a sparse grid of cells

use crate::builder::ProgramBuilder;
use crate::cell::Cell;
use crate::codec;
use crate::error::Result;
use crate::op::{CellMap, Op};
use crate::position::Position;
use crate::value::Value;
use std::collections::BTreeMap;
use std::io::{Read, Write};

/// Capability flag: cyclic dependencies resolve to `Undefined` instead of
/// diverging.
pub const CAP_CYCLIC_DEPS: u32 = 0x01;
/// Capability flag: function-call syntax is accepted in formulas.
pub const CAP_FUNCTIONS: u32 = 0x02;
/// Capability flag: sheets can be saved and loaded.
pub const CAP_FILE_IO: u32 = 0x04;
/// Capability flag: evaluation cost is bounded per query.
pub const CAP_SPEED: u32 = 0x08;

/// A sparse spreadsheet: an ordered map from [`Position`] to [`Cell`]
///
/// Positions that were never written conceptually hold
/// [`Value::Undefined`]. The sheet owns its cells outright; references
/// between cells are positions, never pointers, so any mutation is visible
/// to the next evaluation with nothing to invalidate.
///
/// The engine is single-threaded by design: evaluation uses per-cell
/// interior state for cycle detection, so a sheet shared between threads
/// must live behind external synchronization (the type is `!Sync`).
///
/// # Example
/// ```
/// use tally_core::{Position, Sheet, Value};
///
/// let mut sheet = Sheet::new();
/// let a1 = Position::parse("A1").unwrap();
/// let b1 = Position::parse("B1").unwrap();
///
/// sheet.set_cell(a1, "4").unwrap();
/// sheet.set_cell(b1, "=A1*10+2").unwrap();
/// assert_eq!(sheet.get_value(b1), Value::Number(42.0));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Sheet {
    cells: CellMap,
}

impl Sheet {
    /// Create an empty sheet
    pub fn new() -> Self {
        Self::default()
    }

    /// Advertised feature bitmask (`CAP_*` constants). Advisory.
    pub fn capabilities() -> u32 {
        CAP_CYCLIC_DEPS | CAP_FUNCTIONS | CAP_FILE_IO | CAP_SPEED
    }

    /// Number of occupied cells
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// True when no cell is occupied
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Set the contents of a cell, replacing whatever was there.
    ///
    /// Contents starting with `=` are parsed as a formula; on a parse
    /// error the sheet is left untouched and the error is returned. Other
    /// contents become a number when the whole string parses as one, and
    /// text otherwise — `"12abc"` is text, and so is `""` (a cell set to
    /// the empty string holds `Text("")`, it is not missing).
    pub fn set_cell(&mut self, pos: Position, contents: &str) -> Result<()> {
        let program = if contents.starts_with('=') {
            let mut builder = ProgramBuilder::new();
            if let Err(error) = tally_formula::parse(contents, &mut builder) {
                log::debug!("rejecting formula at {pos}: {error}");
                return Err(error.into());
            }
            builder.finish()?
        } else if let Ok(number) = contents.parse::<f64>() {
            vec![Op::Num(number)]
        } else {
            vec![Op::Str(contents.to_string())]
        };

        self.cells.insert(pos, Cell::with_program(program));
        Ok(())
    }

    /// Evaluate a cell. Missing and empty cells are `Undefined`; so is
    /// everything the value policy maps there (type mismatches, division
    /// by zero, cycles). Never fails, never mutates.
    pub fn get_value(&self, pos: Position) -> Value {
        match self.cells.get(&pos) {
            Some(cell) if !cell.is_empty() => cell.evaluate(&self.cells),
            _ => Value::Undefined,
        }
    }

    /// Copy a `width` × `height` rectangle of cells from `src` to `dst`.
    ///
    /// Programs are deep-cloned; every reference in a clone is shifted by
    /// the rectangle offset on its non-absolute axes. Destination slots
    /// whose source slot is empty are cleared. The copy reads the
    /// pre-copy sheet and commits all writes at once, so overlapping
    /// rectangles behave as if the source had been snapshotted first.
    pub fn copy_rect(&mut self, dst: Position, src: Position, width: u32, height: u32) {
        let row_offset = dst.row - src.row;
        let col_offset = dst.col - src.col;

        // Stage every write, then merge: reads must not observe writes.
        let mut staged: BTreeMap<Position, Option<Cell>> = BTreeMap::new();
        for dx in 0..width as i32 {
            for dy in 0..height as i32 {
                let from = Position::new(src.row + dy, src.col + dx);
                let to = Position::new(dst.row + dy, dst.col + dx);

                match self.cells.get(&from) {
                    Some(cell) if !cell.is_empty() => {
                        let mut copy = cell.clone();
                        copy.translate_refs(row_offset, col_offset);
                        staged.insert(to, Some(copy));
                    }
                    _ => {
                        staged.insert(to, None);
                    }
                }
            }
        }

        for (pos, slot) in staged {
            match slot {
                Some(cell) => {
                    self.cells.insert(pos, cell);
                }
                None => {
                    self.cells.remove(&pos);
                }
            }
        }
    }

    /// Serialize the sheet to `sink` in the binary format of
    /// [`codec`](crate::codec).
    pub fn save<W: Write>(&self, mut sink: W) -> Result<()> {
        codec::write_sheet(&mut sink, &self.cells)
    }

    /// Replace this sheet with one read from `source`.
    ///
    /// The stream is staged completely before anything is replaced: on any
    /// error (short read, unknown node id, damaged payload) the sheet
    /// keeps its previous contents.
    pub fn load<R: Read>(&mut self, mut source: R) -> Result<()> {
        let staged = codec::read_sheet(&mut source)?;
        self.cells = staged;
        Ok(())
    }
}
