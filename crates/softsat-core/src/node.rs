//! Node representation for soft-logic circuits.

use std::fmt;

/// Stable handle of a node inside a [`Circuit`](crate::circuit::Circuit).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Create a handle from an arena index.
    pub fn new(index: usize) -> Self {
        NodeId(index)
    }

    /// Arena index of this handle.
    pub fn index(self) -> usize {
        self.0
    }
}

/// The closed set of node variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Real-valued variable.
    Input,
    /// Squashes a variable into `(0, 1)`.
    Sigmoid,
    /// Soft negation: `1 - a`.
    Not,
    /// Soft conjunction: `a * b`.
    And,
    /// Soft disjunction: `a + b - a * b`.
    Or,
    /// Cross-entropy of a clause: `-ln(a)`.
    Cost,
}

impl NodeKind {
    /// Gradient a node of this kind starts every cycle with.
    pub fn baseline_grad(self) -> f64 {
        match self {
            NodeKind::Cost => 1.0,
            _ => 0.0,
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::Input => "input",
            NodeKind::Sigmoid => "sigmoid",
            NodeKind::Not => "not",
            NodeKind::And => "and",
            NodeKind::Or => "or",
            NodeKind::Cost => "cost",
        };
        f.write_str(name)
    }
}

/// Binary soft-logic operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    /// Soft AND: `a * b`
    And,
    /// Soft OR: `a + b - a * b`
    Or,
}

impl BinaryOp {
    /// Evaluate this operation on two truth values.
    #[inline]
    pub fn eval(self, a: f64, b: f64) -> f64 {
        match self {
            BinaryOp::And => a * b,
            BinaryOp::Or => a + b - a * b,
        }
    }

    /// Partial derivatives of [`eval`](Self::eval) with respect to `a` and `b`.
    #[inline]
    pub fn partials(self, a: f64, b: f64) -> (f64, f64) {
        match self {
            BinaryOp::And => (b, a),
            BinaryOp::Or => (1.0 - b, 1.0 - a),
        }
    }

    /// Clause-language symbol for this operator.
    pub fn symbol(self) -> char {
        match self {
            BinaryOp::And => '^',
            BinaryOp::Or => 'v',
        }
    }

    /// Node kind of a gate performing this operation.
    pub fn kind(self) -> NodeKind {
        match self {
            BinaryOp::And => NodeKind::And,
            BinaryOp::Or => NodeKind::Or,
        }
    }
}

/// Logistic squashing function.
#[inline]
pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Cross-entropy cost of a clause truth value.
#[inline]
pub fn cross_entropy(x: f64) -> f64 {
    -x.ln()
}

/// Operand and consumer links of a node.
///
/// Only [`Links::Sigmoid`] may feed more than one consumer; every other
/// variant holds at most one. Operand slots that are filled after
/// construction are `Option`s.
#[derive(Debug, Clone, PartialEq)]
pub enum Links {
    Input {
        value: f64,
        consumer: Option<NodeId>,
    },
    Sigmoid {
        input: NodeId,
        consumers: Vec<NodeId>,
    },
    Not {
        input: Option<NodeId>,
        consumer: Option<NodeId>,
    },
    Binary {
        op: BinaryOp,
        first: NodeId,
        second: Option<NodeId>,
        consumer: Option<NodeId>,
    },
    Cost {
        input: NodeId,
    },
}

impl Links {
    /// Variant tag of these links.
    pub fn kind(&self) -> NodeKind {
        match self {
            Links::Input { .. } => NodeKind::Input,
            Links::Sigmoid { .. } => NodeKind::Sigmoid,
            Links::Not { .. } => NodeKind::Not,
            Links::Binary { op, .. } => op.kind(),
            Links::Cost { .. } => NodeKind::Cost,
        }
    }

    /// Consumers in registration order.
    pub fn consumers(&self) -> &[NodeId] {
        match self {
            Links::Input { consumer, .. }
            | Links::Not { consumer, .. }
            | Links::Binary { consumer, .. } => consumer.as_slice(),
            Links::Sigmoid { consumers, .. } => consumers,
            Links::Cost { .. } => &[],
        }
    }
}

/// A node in the circuit.
///
/// Holds the per-cycle state of the propagation protocol: the memoized
/// forward output, the accumulated upstream gradient, and whether the
/// node's backward pull has already completed.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub(crate) serial: u32,
    pub(crate) links: Links,
    pub(crate) output: Option<f64>,
    pub(crate) grad: f64,
    pub(crate) pulled: bool,
}

impl Node {
    pub(crate) fn new(serial: u32, links: Links) -> Self {
        let grad = links.kind().baseline_grad();
        Self {
            serial,
            links,
            output: None,
            grad,
            pulled: false,
        }
    }

    /// Diagnostic serial number assigned at construction.
    pub fn serial(&self) -> u32 {
        self.serial
    }

    /// Variant of this node.
    pub fn kind(&self) -> NodeKind {
        self.links.kind()
    }

    /// Operand and consumer links.
    pub fn links(&self) -> &Links {
        &self.links
    }

    /// Cached forward result, if computed in the current cycle.
    pub fn output(&self) -> Option<f64> {
        self.output
    }

    /// Accumulated upstream gradient.
    pub fn grad(&self) -> f64 {
        self.grad
    }

    /// Restore the start-of-cycle state.
    pub(crate) fn clear(&mut self) {
        self.output = None;
        self.grad = self.kind().baseline_grad();
        self.pulled = false;
    }
}
