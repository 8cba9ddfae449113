//! Program builder — the engine's side of the parser seam

use crate::error::{Error, Result};
use crate::op::{Op, Program};
use crate::position::Position;
use tally_formula::ExprBuilder;

/// Accumulates a postfix [`Program`] from parser callbacks.
///
/// The callback contract is infallible, so a reference whose position text
/// cannot be represented (for example a column wider than `i32`) is
/// recorded here and reported by [`finish`](ProgramBuilder::finish); the
/// partially built program is discarded by the caller.
#[derive(Debug, Default)]
pub struct ProgramBuilder {
    program: Program,
    error: Option<Error>,
}

impl ProgramBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Yield the accumulated program, or the first error recorded while
    /// building it.
    pub fn finish(self) -> Result<Program> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.program),
        }
    }
}

impl ExprBuilder for ProgramBuilder {
    fn op_add(&mut self) {
        self.program.push(Op::Add);
    }

    fn op_sub(&mut self) {
        self.program.push(Op::Sub);
    }

    fn op_mul(&mut self) {
        self.program.push(Op::Mul);
    }

    fn op_div(&mut self) {
        self.program.push(Op::Div);
    }

    fn op_pow(&mut self) {
        self.program.push(Op::Pow);
    }

    fn op_neg(&mut self) {
        self.program.push(Op::Neg);
    }

    fn op_eq(&mut self) {
        self.program.push(Op::Eq);
    }

    fn op_ne(&mut self) {
        self.program.push(Op::Ne);
    }

    fn op_lt(&mut self) {
        self.program.push(Op::Lt);
    }

    fn op_le(&mut self) {
        self.program.push(Op::Le);
    }

    fn op_gt(&mut self) {
        self.program.push(Op::Gt);
    }

    fn op_ge(&mut self) {
        self.program.push(Op::Ge);
    }

    fn val_number(&mut self, value: f64) {
        self.program.push(Op::Num(value));
    }

    fn val_string(&mut self, value: &str) {
        self.program.push(Op::Str(value.to_string()));
    }

    fn val_reference(&mut self, reference: &str) {
        match Position::parse(reference) {
            Ok(pos) => self.program.push(Op::Ref(pos)),
            Err(error) => {
                if self.error.is_none() {
                    self.error = Some(error);
                }
            }
        }
    }

    fn val_range(&mut self, _range: &str) {
        self.program.push(Op::Range);
    }

    fn func_call(&mut self, _name: &str, _arg_count: usize) {
        self.program.push(Op::Func);
    }
}
