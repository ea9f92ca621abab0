//! Error types for circuit wiring, clause parsing and graph evaluation.

use thiserror::Error;

use crate::node::NodeKind;

/// Errors raised by the node propagation protocol.
///
/// These signal a wiring bug or a misuse of the protocol, never bad user
/// input. Node numbers are the diagnostic serials assigned at construction.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NodeError {
    /// Operand slot was already wired.
    #[error("operand of node {0} already defined")]
    OperandAlreadySet(u32),

    /// Single consumer slot was already wired.
    #[error("consumer of node {0} already defined")]
    ConsumerAlreadySet(u32),

    /// Propagation needed a consumer that was never wired.
    #[error("consumer of node {0} not defined")]
    MissingConsumer(u32),

    /// Evaluation needed an operand that was never wired.
    #[error("operand of node {0} not defined")]
    MissingOperand(u32),

    /// This kind of node takes no further operands.
    #[error("{kind} node {serial} does not accept operands")]
    InputNotAccepted { serial: u32, kind: NodeKind },

    /// This kind of node cannot feed another node.
    #[error("{kind} node {serial} does not accept consumers")]
    ConsumerNotAccepted { serial: u32, kind: NodeKind },

    /// The upstream gradient of a cost node is fixed at one.
    #[error("cannot modify gradient of cost node {0}")]
    ImmutableGradient(u32),

    /// Backward propagation has no direction from this node.
    #[error("cannot call backward from {kind} node {serial}")]
    BackwardUnsupported { serial: u32, kind: NodeKind },

    /// Handle does not belong to this circuit.
    #[error("unknown node handle {0}")]
    UnknownNode(usize),
}

/// Errors that can occur while parsing a single clause.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Variable reference outside the declared range.
    #[error("variable ${index} out of bounds for {count} variables")]
    InvalidVariable { index: usize, count: usize },

    /// `$` not followed by a decimal index.
    #[error("missing variable index after '$' at column {0}")]
    MissingVariableIndex(usize),

    /// Binary operator with nothing on its left.
    #[error("operator at column {0} has no left operand")]
    MissingLeftOperand(usize),

    /// `)` without a matching `(`.
    #[error("unbalanced ')' at column {0}")]
    UnbalancedParen(usize),

    /// `(` never closed before the end of the clause.
    #[error("unclosed '(' in clause")]
    UnclosedParen,

    /// Operator still waiting for an operand at the end of the clause.
    #[error("operator left without operand at end of clause")]
    DanglingOperator,

    /// Clause contained no variable reference.
    #[error("clause has no operands")]
    EmptyClause,

    /// More than one completed value left at the end of the clause.
    #[error("clause leaves {0} unconnected operands")]
    TrailingOperand(usize),

    /// Gates nested deeper than the configured limit.
    #[error("maximum clause depth exceeded ({0})")]
    MaxDepthExceeded(usize),

    /// Wiring failed while assembling the clause.
    #[error(transparent)]
    Node(#[from] NodeError),
}

/// Errors that can occur when building or evaluating a [`ComputationGraph`].
///
/// [`ComputationGraph`]: crate::graph::ComputationGraph
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// A clause line failed to parse.
    #[error("line {line}: {source}")]
    Clause {
        line: usize,
        #[source]
        source: ParseError,
    },

    /// Number of values does not match the declared variable count.
    #[error("expected {expected} values, got {got}")]
    ValueCount { expected: usize, got: usize },

    /// Program text has no variable count.
    #[error("missing variable count")]
    MissingVariableCount,

    /// Variable count is not a non-negative integer.
    #[error("invalid variable count '{0}'")]
    InvalidVariableCount(String),

    /// Propagation failed inside the circuit.
    #[error(transparent)]
    Node(#[from] NodeError),
}
