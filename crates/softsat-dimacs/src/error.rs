//! Error types for DIMACS CNF input.

use thiserror::Error;

/// Errors that can occur while reading a DIMACS CNF file.
///
/// Line numbers are 1-based.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DimacsError {
    /// A literal appeared before the `p cnf` header.
    #[error("line {0}: clause data before 'p cnf' header")]
    MissingHeader(usize),

    /// Header is not of the form `p cnf <variables> <clauses>`.
    #[error("line {line}: invalid header '{text}'")]
    InvalidHeader { line: usize, text: String },

    /// Token is not a signed integer.
    #[error("line {line}: invalid literal '{token}'")]
    InvalidLiteral { line: usize, token: String },

    /// Literal names a variable beyond the header's count.
    #[error("line {line}: literal {literal} out of range for {variables} variables")]
    LiteralOutOfRange {
        line: usize,
        literal: i64,
        variables: usize,
    },

    /// A clause with no literals; it can never be satisfied.
    #[error("line {0}: empty clause")]
    EmptyClause(usize),

    /// Input ended in the middle of a clause (missing `0`).
    #[error("last clause is not terminated by 0")]
    UnterminatedClause,
}
