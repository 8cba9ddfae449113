//! The parser/consumer seam
//!
//! [`parse`](crate::parse) walks a formula and reports it to an
//! [`ExprBuilder`] in postfix order: both operands of a binary operator are
//! emitted before the operator callback fires. A builder that appends one
//! node per callback therefore ends up holding a complete postfix program
//! whose last node is the expression root.

/// Receiver for parsed formula elements.
///
/// Every callback corresponds to exactly one expression node. Callbacks are
/// infallible by contract; a builder that can reject input (for example on
/// an out-of-range cell reference) records the problem and reports it when
/// the caller collects the finished program.
pub trait ExprBuilder {
    /// Binary `+` — numeric addition or text concatenation.
    fn op_add(&mut self);
    /// Binary `-`.
    fn op_sub(&mut self);
    /// Binary `*`.
    fn op_mul(&mut self);
    /// Binary `/`.
    fn op_div(&mut self);
    /// Binary `^`.
    fn op_pow(&mut self);
    /// Unary `-`.
    fn op_neg(&mut self);
    /// Binary `=`.
    fn op_eq(&mut self);
    /// Binary `<>`.
    fn op_ne(&mut self);
    /// Binary `<`.
    fn op_lt(&mut self);
    /// Binary `<=`.
    fn op_le(&mut self);
    /// Binary `>`.
    fn op_gt(&mut self);
    /// Binary `>=`.
    fn op_ge(&mut self);

    /// Numeric literal.
    fn val_number(&mut self, value: f64);
    /// String literal; doubled-quote escapes have already been resolved.
    fn val_string(&mut self, value: &str);
    /// Cell reference text, `$` markers included (e.g. `$B$7`).
    fn val_reference(&mut self, reference: &str);
    /// Range text (e.g. `A1:B5`), forwarded opaquely.
    fn val_range(&mut self, range: &str);
    /// Function call; `arg_count` argument expressions have already been
    /// emitted.
    fn func_call(&mut self, name: &str, arg_count: usize);
}
