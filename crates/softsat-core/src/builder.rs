//! Two-stack state machine that assembles a clause into the circuit.
//!
//! The parser consumes tokens one-by-one. It has no precedence levels:
//! a pending operator is folded as soon as an operand is available, so
//! `$0 ^ $1 v $2` becomes `($0 ^ $1) v $2` and `$0 v $1 ^ $2` becomes
//! `($0 v $1) ^ $2`.

use log::{debug, trace};

use crate::circuit::Circuit;
use crate::error::ParseError;
use crate::node::{BinaryOp, NodeId};
use crate::token::{tokenize, Spanned, Token};

/// Default bound on how deeply gates may nest inside one clause.
///
/// Propagation recurses once per nesting level, so this also bounds
/// stack use during forward, backward and reset.
pub const DEFAULT_MAX_DEPTH: usize = 512;

/// Entry on the pending-operator stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    /// Gate still waiting for its last operand, with the depth of the
    /// operand it already has (zero for NOT).
    Gate { gate: NodeId, depth: usize },
    /// Parser-only marker for `(`; never becomes a circuit node.
    Open { serial: u32 },
}

/// Completed value on the operand stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Operand {
    node: NodeId,
    /// Gates on the longest path down to a variable.
    depth: usize,
}

/// Clause parser over a shared circuit.
///
/// `variables[i]` is the node read by `$i` (the sigmoid of variable `i`).
#[derive(Debug)]
pub struct ClauseParser<'a> {
    circuit: &'a mut Circuit,
    variables: &'a [NodeId],
    max_depth: usize,
    operators: Vec<Pending>,
    operands: Vec<Operand>,
}

impl<'a> ClauseParser<'a> {
    /// Create a parser that wires new gates into `circuit`.
    pub fn new(circuit: &'a mut Circuit, variables: &'a [NodeId]) -> Self {
        Self::with_max_depth(circuit, variables, DEFAULT_MAX_DEPTH)
    }

    /// Create a parser with a custom nesting limit.
    pub fn with_max_depth(
        circuit: &'a mut Circuit,
        variables: &'a [NodeId],
        max_depth: usize,
    ) -> Self {
        Self {
            circuit,
            variables,
            max_depth,
            operators: Vec::new(),
            operands: Vec::new(),
        }
    }

    /// Feed a single token to the parser.
    pub fn push(&mut self, spanned: Spanned) -> Result<(), ParseError> {
        let Spanned { token, column } = spanned;
        match token {
            Token::Var(index) => {
                let node = *self
                    .variables
                    .get(index)
                    .ok_or(ParseError::InvalidVariable {
                        index,
                        count: self.variables.len(),
                    })?;
                let operand = Operand { node, depth: 0 };
                match self.operators.last().copied() {
                    None | Some(Pending::Open { .. }) => {
                        // Start of a new sub-expression
                        self.operands.push(operand);
                    }
                    Some(Pending::Gate { gate, depth }) => {
                        self.operators.pop();
                        self.complete(gate, depth, operand)?;
                        self.fold()?;
                    }
                }
                Ok(())
            }
            Token::And => self.push_binary(BinaryOp::And, column),
            Token::Or => self.push_binary(BinaryOp::Or, column),
            Token::Not => {
                let gate = self.circuit.add_not();
                self.operators.push(Pending::Gate { gate, depth: 0 });
                Ok(())
            }
            Token::Open => {
                let serial = self.circuit.next_serial();
                self.operators.push(Pending::Open { serial });
                Ok(())
            }
            Token::Close => match self.operators.pop() {
                Some(Pending::Open { serial }) => {
                    trace!("closed group {}", serial);
                    self.fold()
                }
                _ => Err(ParseError::UnbalancedParen(column)),
            },
        }
    }

    /// Start a binary gate whose first operand is the latest completed value.
    fn push_binary(&mut self, op: BinaryOp, column: usize) -> Result<(), ParseError> {
        let first = self
            .operands
            .pop()
            .ok_or(ParseError::MissingLeftOperand(column))?;
        let gate = self.circuit.add_binary(op, first.node)?;
        self.operators.push(Pending::Gate {
            gate,
            depth: first.depth,
        });
        Ok(())
    }

    /// Finish the clause and wrap its value in a new cost node.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - A group is still open
    /// - An operator never received its operand
    /// - The clause produced no value, or more than one
    pub fn finish(mut self) -> Result<NodeId, ParseError> {
        self.fold()?;
        match self.operators.last() {
            Some(Pending::Open { .. }) => return Err(ParseError::UnclosedParen),
            Some(Pending::Gate { .. }) => return Err(ParseError::DanglingOperator),
            None => {}
        }

        let root = match self.operands.as_slice() {
            [] => return Err(ParseError::EmptyClause),
            [root] => root.node,
            rest => return Err(ParseError::TrailingOperand(rest.len())),
        };
        Ok(self.circuit.add_cost(root)?)
    }

    /// Connect completed operands into pending gates, innermost first,
    /// stopping at the nearest open group.
    fn fold(&mut self) -> Result<(), ParseError> {
        while let Some(&Pending::Gate { gate, depth }) = self.operators.last() {
            let operand = self.operands.pop().ok_or(ParseError::DanglingOperator)?;
            self.operators.pop();
            self.complete(gate, depth, operand)?;
        }
        Ok(())
    }

    /// Wire the last operand of `gate` and push the gate as a completed value.
    fn complete(&mut self, gate: NodeId, depth: usize, operand: Operand) -> Result<(), ParseError> {
        let depth = depth.max(operand.depth) + 1;
        if depth > self.max_depth {
            return Err(ParseError::MaxDepthExceeded(self.max_depth));
        }
        self.circuit.add_operand(gate, operand.node)?;
        trace!("connected {} into {}", operand.node.index(), gate.index());
        self.operands.push(Operand { node: gate, depth });
        Ok(())
    }
}

/// Parse one clause into `circuit` and return its cost node.
///
/// On error every node and link created for the clause is rolled back,
/// leaving `circuit` exactly as it was.
pub fn parse_clause(
    circuit: &mut Circuit,
    variables: &[NodeId],
    clause: &str,
) -> Result<NodeId, ParseError> {
    parse_clause_with_max_depth(circuit, variables, clause, DEFAULT_MAX_DEPTH)
}

/// [`parse_clause`] with a custom nesting limit.
pub fn parse_clause_with_max_depth(
    circuit: &mut Circuit,
    variables: &[NodeId],
    clause: &str,
    max_depth: usize,
) -> Result<NodeId, ParseError> {
    let checkpoint = circuit.checkpoint();
    let result = build_clause(circuit, variables, clause, max_depth);
    match &result {
        Ok(cost) => debug!(
            "parsed clause '{}' into cost node {} ({} nodes total)",
            clause.trim(),
            cost.index(),
            circuit.len()
        ),
        Err(_) => circuit.rollback(checkpoint),
    }
    result
}

fn build_clause(
    circuit: &mut Circuit,
    variables: &[NodeId],
    clause: &str,
    max_depth: usize,
) -> Result<NodeId, ParseError> {
    let tokens = tokenize(clause)?;
    let mut parser = ClauseParser::with_max_depth(circuit, variables, max_depth);
    for token in tokens {
        parser.push(token)?;
    }
    parser.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Links, NodeKind};

    /// Circuit with `n` input -> sigmoid variables.
    fn setup(n: usize) -> (Circuit, Vec<NodeId>) {
        let mut circuit = Circuit::new();
        let inputs: Vec<NodeId> = (0..n).map(|_| circuit.add_input(0.0)).collect();
        let sigmoids = inputs
            .iter()
            .map(|&i| circuit.add_sigmoid(i).unwrap())
            .collect();
        (circuit, sigmoids)
    }

    fn links(circuit: &Circuit, id: NodeId) -> Links {
        circuit.node(id).unwrap().links().clone()
    }

    fn cost_input(circuit: &Circuit, cost: NodeId) -> NodeId {
        match links(circuit, cost) {
            Links::Cost { input } => input,
            other => panic!("expected cost node, got {:?}", other),
        }
    }

    fn binary(circuit: &Circuit, id: NodeId) -> (BinaryOp, NodeId, NodeId) {
        match links(circuit, id) {
            Links::Binary {
                op,
                first,
                second: Some(second),
                ..
            } => (op, first, second),
            other => panic!("expected complete binary gate, got {:?}", other),
        }
    }

    #[test]
    fn test_single_variable() {
        let (mut circuit, vars) = setup(1);
        let cost = parse_clause(&mut circuit, &vars, "$0").unwrap();
        assert_eq!(cost_input(&circuit, cost), vars[0]);
        assert_eq!(circuit.node(cost).unwrap().kind(), NodeKind::Cost);
    }

    #[test]
    fn test_left_to_right_fold() {
        let (mut circuit, vars) = setup(3);
        let cost = parse_clause(&mut circuit, &vars, "$0 ^ $1 v $2").unwrap();

        let (op, first, second) = binary(&circuit, cost_input(&circuit, cost));
        assert_eq!(op, BinaryOp::Or);
        assert_eq!(second, vars[2]);
        assert_eq!(binary(&circuit, first), (BinaryOp::And, vars[0], vars[1]));
    }

    #[test]
    fn test_swapped_operators_fold_symmetrically() {
        let (mut circuit, vars) = setup(3);
        let cost = parse_clause(&mut circuit, &vars, "$0 v $1 ^ $2").unwrap();

        let (op, first, second) = binary(&circuit, cost_input(&circuit, cost));
        assert_eq!(op, BinaryOp::And);
        assert_eq!(second, vars[2]);
        assert_eq!(binary(&circuit, first), (BinaryOp::Or, vars[0], vars[1]));
    }

    #[test]
    fn test_grouping_and_negation() {
        // $1 v ~($0 ^ ~$2)
        let (mut circuit, vars) = setup(3);
        let cost = parse_clause(&mut circuit, &vars, "$1 v ~($0 ^ ~$2)").unwrap();

        let (op, first, negated) = binary(&circuit, cost_input(&circuit, cost));
        assert_eq!((op, first), (BinaryOp::Or, vars[1]));

        let Links::Not {
            input: Some(group), ..
        } = links(&circuit, negated)
        else {
            panic!("expected not gate");
        };
        let (op, first, inner_not) = binary(&circuit, group);
        assert_eq!((op, first), (BinaryOp::And, vars[0]));
        assert!(matches!(
            links(&circuit, inner_not),
            Links::Not { input: Some(v), .. } if v == vars[2]
        ));
    }

    #[test]
    fn test_double_negation() {
        let (mut circuit, vars) = setup(1);
        let cost = parse_clause(&mut circuit, &vars, "~~$0").unwrap();
        let outer = cost_input(&circuit, cost);
        let Links::Not {
            input: Some(inner), ..
        } = links(&circuit, outer)
        else {
            panic!("expected not gate");
        };
        assert!(matches!(
            links(&circuit, inner),
            Links::Not { input: Some(v), .. } if v == vars[0]
        ));
    }

    #[test]
    fn test_paren_markers_take_serials() {
        let (mut circuit, vars) = setup(1);
        // setup uses serials 0 and 1, the marker takes 2
        let cost = parse_clause(&mut circuit, &vars, "($0)").unwrap();
        assert_eq!(circuit.node(cost).unwrap().serial(), 3);
        assert_eq!(circuit.len(), 3);
    }

    #[test]
    fn test_invalid_variable() {
        let (mut circuit, vars) = setup(3);
        assert_eq!(
            parse_clause(&mut circuit, &vars, "$5"),
            Err(ParseError::InvalidVariable { index: 5, count: 3 })
        );
        assert_eq!(circuit.len(), 6);
    }

    #[test]
    fn test_failed_clause_leaves_no_partial_graph() {
        let (mut circuit, vars) = setup(3);
        let before = circuit.clone();
        let result = parse_clause(&mut circuit, &vars, "$0 ^ ~$1 v $7");
        assert_eq!(
            result,
            Err(ParseError::InvalidVariable { index: 7, count: 3 })
        );
        assert_eq!(circuit.len(), before.len());
        for &v in &vars {
            assert!(circuit.node(v).unwrap().links().consumers().is_empty());
        }
    }

    #[test]
    fn test_malformed_clauses() {
        let (mut circuit, vars) = setup(2);
        let cases = [
            ("", ParseError::EmptyClause),
            ("^ $0", ParseError::MissingLeftOperand(1)),
            ("$0 ^", ParseError::DanglingOperator),
            ("~", ParseError::DanglingOperator),
            ("($0", ParseError::UnclosedParen),
            ("$0)", ParseError::UnbalancedParen(3)),
            ("($0 ^)", ParseError::UnbalancedParen(6)),
            ("$0 $1", ParseError::TrailingOperand(2)),
        ];
        for (clause, expected) in cases {
            assert_eq!(
                parse_clause(&mut circuit, &vars, clause),
                Err(expected),
                "clause {:?}",
                clause
            );
            assert_eq!(circuit.len(), 4, "clause {:?} left nodes behind", clause);
        }
    }

    #[test]
    fn test_shared_variable_fans_out() {
        let (mut circuit, vars) = setup(2);
        parse_clause(&mut circuit, &vars, "$0 ^ $1").unwrap();
        parse_clause(&mut circuit, &vars, "~$0").unwrap();
        assert_eq!(circuit.node(vars[0]).unwrap().links().consumers().len(), 2);
        assert_eq!(circuit.node(vars[1]).unwrap().links().consumers().len(), 1);
    }

    #[test]
    fn test_depth_limit() {
        let (mut circuit, vars) = setup(3);
        let len = circuit.len();
        // (($0 ^ $1) v $2) nests two gates
        assert_eq!(
            parse_clause_with_max_depth(&mut circuit, &vars, "$0 ^ $1 v $2", 1),
            Err(ParseError::MaxDepthExceeded(1))
        );
        assert_eq!(circuit.len(), len);
        parse_clause_with_max_depth(&mut circuit, &vars, "$0 ^ $1 v $2", 2).unwrap();

        // Grouping does not add depth, negation does
        parse_clause_with_max_depth(&mut circuit, &vars, "((($0)))", 0).unwrap();
        assert_eq!(
            parse_clause_with_max_depth(&mut circuit, &vars, "~~$0", 1),
            Err(ParseError::MaxDepthExceeded(1))
        );
    }

    #[test]
    fn test_depth_takes_deepest_operand() {
        let (mut circuit, vars) = setup(4);
        // ($0 v ~(~$1 ^ $2)): or -> not -> and -> not
        assert_eq!(
            parse_clause_with_max_depth(&mut circuit, &vars, "$0 v ~(~$1 ^ $2)", 3),
            Err(ParseError::MaxDepthExceeded(3))
        );
        parse_clause_with_max_depth(&mut circuit, &vars, "$0 v ~(~$1 ^ $2)", 4).unwrap();
    }
}
