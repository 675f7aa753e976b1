//! # terminus-ecl
//!
//! Parser and evaluator for SNOMED CT's Expression Constraint Language
//! (ECL), the query language for concept sets.
//!
//! An expression parses into an AST ([`Constraint`]) and evaluates,
//! against any [`TerminologyProvider`], to a set of concept ids:
//!
//! ```
//! use terminus_ecl::parse;
//!
//! let constraint = parse("<< 73211009 AND ^ 900000000000509007")?;
//! # let _ = constraint;
//! # Ok::<(), terminus_ecl::EclError>(())
//! ```
//!
//! Supported grammar: focus concepts (with optional `|term|`
//! annotations), `*`, the hierarchy operators `<`, `<<`, `>`, `>>`,
//! `<!`, `>!`, refset membership `^`, refinements `: attr = value` with
//! attribute groups `{ ... }`, the set operators `AND`, `OR`, `MINUS`,
//! and parenthesised subexpressions.
//!
//! The evaluator depends only on the [`TerminologyProvider`] trait, so
//! this crate never touches storage directly; the engine supplies a
//! store-backed implementation.

#![warn(missing_docs)]

mod ast;
mod eval;
mod lexer;
mod parser;

use thiserror::Error;

pub use ast::{AttributeName, Constraint, Operator, Refinement, RefinementItem, SetOp};
pub use eval::{evaluate, AttributeEdge, TerminologyProvider};
pub use parser::parse;

/// Errors raised while parsing or evaluating an expression constraint.
#[derive(Error, Debug)]
pub enum EclError {
    /// The expression text does not parse; the position is a byte offset
    /// into the input.
    #[error("ECL parse error at position {position}: {message}")]
    Parse {
        /// Byte offset of the failure.
        position: usize,
        /// What was expected or found.
        message: String,
    },

    /// The terminology provider failed while answering the evaluator.
    #[error("terminology lookup failed during ECL evaluation: {0}")]
    Provider(String),
}
