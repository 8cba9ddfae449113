//! # tally-formula
//!
//! The formula language front end for the tally spreadsheet engine.
//!
//! This crate deliberately knows nothing about cells, sheets, or values. It
//! exposes two things:
//!
//! - [`ExprBuilder`] — the callback contract between the parser and whatever
//!   consumes parsed formulas. The parser drives the builder in postfix
//!   order: operands are emitted before the operator that combines them.
//! - [`parse`] — a recursive descent parser for the formula language
//!   (`=A1+B2*3`, `=-A1^2`, `="text"`, `=SUM(A1:B5, 7)`, ...).
//!
//! Keeping the seam string-based means the engine can be driven by any
//! parser honoring the contract, and this parser can feed any backend.

pub mod builder;
pub mod error;
pub mod parser;

pub use builder::ExprBuilder;
pub use error::{FormulaError, FormulaResult};
pub use parser::parse;
