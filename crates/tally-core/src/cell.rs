//! Cell type and the cycle boundary

use crate::op::{self, CellMap, Op, Program};
use crate::value::Value;
use std::cell::Cell as Flag;

/// One sheet slot: a postfix program plus the evaluation re-entry flag
///
/// The flag is interior-mutable so that evaluating a sheet is a `&self`
/// operation; it also makes `Cell` (and anything holding it) `!Sync`,
/// which is the honest signature for an engine with no internal locking.
/// The flag is false whenever no evaluation is in flight.
#[derive(Debug, Clone, Default)]
pub struct Cell {
    program: Program,
    in_eval: Flag<bool>,
}

/// Clears the re-entry flag on every exit path, panics included.
struct EvalGuard<'a>(&'a Flag<bool>);

impl<'a> EvalGuard<'a> {
    fn enter(flag: &'a Flag<bool>) -> Self {
        flag.set(true);
        EvalGuard(flag)
    }
}

impl Drop for EvalGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl Cell {
    /// Create a cell holding `program`
    pub fn with_program(program: Program) -> Self {
        Self {
            program,
            in_eval: Flag::new(false),
        }
    }

    /// The cell's postfix program
    pub fn program(&self) -> &[Op] {
        &self.program
    }

    /// True when the cell holds no program
    pub fn is_empty(&self) -> bool {
        self.program.is_empty()
    }

    /// Evaluate this cell against a sheet's cell map.
    ///
    /// Re-entering a cell mid-evaluation means the dependency path looped
    /// back: the back edge resolves to [`Value::Undefined`] and the rest of
    /// the expression carries on. A cell may be *left and entered again*
    /// within one outer evaluation (diamond dependencies); only true
    /// re-entry is cut off.
    pub fn evaluate(&self, cells: &CellMap) -> Value {
        if self.in_eval.get() {
            return Value::Undefined;
        }
        if self.program.is_empty() {
            return Value::Undefined;
        }

        let _guard = EvalGuard::enter(&self.in_eval);
        op::eval_program(&self.program, cells)
    }

    /// Shift every reference in the program by a copy offset; absolute
    /// axes stay pinned.
    pub(crate) fn translate_refs(&mut self, row_offset: i32, col_offset: i32) {
        for node in &mut self.program {
            if let Op::Ref(pos) = node {
                pos.translate(row_offset, col_offset);
            }
        }
    }
}
