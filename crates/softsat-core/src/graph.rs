//! Computation graph facade over a set of clauses.

use log::debug;

use crate::builder::{parse_clause_with_max_depth, DEFAULT_MAX_DEPTH};
use crate::circuit::Circuit;
use crate::error::{GraphError, ParseError};
use crate::node::{Links, NodeId};

/// Incremental builder for a [`ComputationGraph`].
///
/// Creates one input and one sigmoid node per variable up front, then
/// accepts clauses one at a time. Clauses whose gates nest deeper than
/// the builder's limit are rejected.
#[derive(Debug, Clone)]
pub struct GraphBuilder {
    circuit: Circuit,
    inputs: Vec<NodeId>,
    sigmoids: Vec<NodeId>,
    costs: Vec<NodeId>,
    max_depth: usize,
}

impl GraphBuilder {
    /// Create a builder for `variables` variables.
    pub fn new(variables: usize) -> Self {
        Self::with_max_depth(variables, DEFAULT_MAX_DEPTH)
    }

    /// Create a builder with a custom clause nesting limit.
    pub fn with_max_depth(variables: usize, max_depth: usize) -> Self {
        let mut circuit = Circuit::new();
        let (inputs, sigmoids): (Vec<_>, Vec<_>) = (0..variables)
            .map(|_| circuit.add_variable(0.0))
            .unzip();

        Self {
            circuit,
            inputs,
            sigmoids,
            costs: Vec::new(),
            max_depth,
        }
    }

    /// Number of declared variables.
    pub fn variable_count(&self) -> usize {
        self.inputs.len()
    }

    /// Clause nesting limit.
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Parse a clause and append its cost node.
    ///
    /// A clause that fails leaves the builder unchanged.
    pub fn push_clause(&mut self, clause: &str) -> Result<NodeId, ParseError> {
        let cost =
            parse_clause_with_max_depth(&mut self.circuit, &self.sigmoids, clause, self.max_depth)?;
        self.costs.push(cost);
        Ok(cost)
    }

    /// Finalize and return the graph.
    pub fn finish(self) -> ComputationGraph {
        debug!(
            "built graph: {} variables, {} clauses, {} nodes",
            self.inputs.len(),
            self.costs.len(),
            self.circuit.len()
        );
        ComputationGraph {
            circuit: self.circuit,
            inputs: self.inputs,
            sigmoids: self.sigmoids,
            costs: self.costs,
        }
    }
}

/// Differentiable soft-logic circuit for a set of clauses.
///
/// The graph consists of:
/// - One input node per variable, holding a real value
/// - One sigmoid node per variable, shared by every clause that reads it
/// - One cost node per clause, at the root of that clause's gates
///
/// [`forward`](Self::forward) returns the total cross-entropy of all
/// clauses; [`backward`](Self::backward) returns its gradient with respect
/// to each variable and then clears the circuit for the next cycle.
#[derive(Debug, Clone)]
pub struct ComputationGraph {
    circuit: Circuit,
    inputs: Vec<NodeId>,
    sigmoids: Vec<NodeId>,
    costs: Vec<NodeId>,
}

impl ComputationGraph {
    /// Build a graph over `variables` variables from clause lines.
    ///
    /// Blank lines are ignored. Errors report the 1-based position of the
    /// failing line.
    pub fn new<I, S>(variables: usize, clauses: I) -> Result<Self, GraphError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::with_max_depth(variables, clauses, DEFAULT_MAX_DEPTH)
    }

    /// [`new`](Self::new) with a custom clause nesting limit.
    pub fn with_max_depth<I, S>(
        variables: usize,
        clauses: I,
        max_depth: usize,
    ) -> Result<Self, GraphError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut builder = GraphBuilder::with_max_depth(variables, max_depth);
        for (i, clause) in clauses.into_iter().enumerate() {
            push_line(&mut builder, clause.as_ref(), i + 1)?;
        }
        Ok(builder.finish())
    }

    /// Build a graph from program text.
    ///
    /// The first token is the variable count; the rest of that line is
    /// ignored. Every following non-blank line is a clause.
    pub fn from_program(text: &str) -> Result<Self, GraphError> {
        Self::from_program_with_max_depth(text, DEFAULT_MAX_DEPTH)
    }

    /// [`from_program`](Self::from_program) with a custom clause nesting limit.
    pub fn from_program_with_max_depth(text: &str, max_depth: usize) -> Result<Self, GraphError> {
        let mut lines = text.lines().enumerate();

        let count = lines
            .by_ref()
            .find_map(|(_, line)| line.split_whitespace().next())
            .ok_or(GraphError::MissingVariableCount)?;
        let variables: usize = count
            .parse()
            .map_err(|_| GraphError::InvalidVariableCount(count.to_string()))?;

        let mut builder = GraphBuilder::with_max_depth(variables, max_depth);
        for (i, line) in lines {
            push_line(&mut builder, line, i + 1)?;
        }
        Ok(builder.finish())
    }

    /// Number of declared variables.
    pub fn variable_count(&self) -> usize {
        self.inputs.len()
    }

    /// Number of parsed clauses.
    pub fn clause_count(&self) -> usize {
        self.costs.len()
    }

    /// The underlying node arena.
    pub fn circuit(&self) -> &Circuit {
        &self.circuit
    }

    /// Input node of each variable.
    pub fn inputs(&self) -> &[NodeId] {
        &self.inputs
    }

    /// Sigmoid node of each variable.
    pub fn sigmoids(&self) -> &[NodeId] {
        &self.sigmoids
    }

    /// Cost node of each clause.
    pub fn costs(&self) -> &[NodeId] {
        &self.costs
    }

    /// Total cost of all clauses for the given variable values.
    ///
    /// Cached outputs from an earlier call are reused until the graph is
    /// reset, which [`backward`](Self::backward) does on completion.
    pub fn forward(&mut self, values: &[f64]) -> Result<f64, GraphError> {
        if values.len() != self.inputs.len() {
            return Err(GraphError::ValueCount {
                expected: self.inputs.len(),
                got: values.len(),
            });
        }

        for (&input, &value) in self.inputs.iter().zip(values) {
            self.circuit.set_value(input, value)?;
        }

        let mut cost = 0.0;
        for &node in &self.costs {
            cost += self.circuit.forward(node)?;
        }
        Ok(cost)
    }

    /// Gradient of the total cost from the last [`forward`](Self::forward)
    /// with respect to each variable value.
    ///
    /// Resets the circuit afterwards.
    pub fn backward(&mut self) -> Result<Vec<f64>, GraphError> {
        let grads = self
            .inputs
            .iter()
            .map(|&input| self.circuit.pull(input))
            .collect::<Result<Vec<_>, _>>()?;
        self.reset()?;
        Ok(grads)
    }

    /// Clear every cached output and gradient reachable from the inputs.
    pub fn reset(&mut self) -> Result<(), GraphError> {
        for &input in &self.inputs {
            self.circuit.reset(input)?;
        }
        Ok(())
    }

    /// Fully parenthesized text of clause `index`, as the parser grouped it.
    pub fn clause_expression(&self, index: usize) -> Option<String> {
        let cost = *self.costs.get(index)?;
        let Links::Cost { input } = self.circuit.node(cost)?.links() else {
            return None;
        };
        self.render(*input)
    }

    fn render(&self, id: NodeId) -> Option<String> {
        let text = match self.circuit.node(id)?.links() {
            Links::Sigmoid { .. } => {
                let var = self.sigmoids.iter().position(|&s| s == id)?;
                format!("${}", var)
            }
            Links::Not { input, .. } => format!("~{}", self.render((*input)?)?),
            Links::Binary {
                op, first, second, ..
            } => format!(
                "({} {} {})",
                self.render(*first)?,
                op.symbol(),
                self.render((*second)?)?
            ),
            Links::Input { .. } | Links::Cost { .. } => return None,
        };
        Some(text)
    }
}

fn push_line(builder: &mut GraphBuilder, line: &str, number: usize) -> Result<(), GraphError> {
    if line.trim().is_empty() {
        return Ok(());
    }
    builder
        .push_clause(line)
        .map(|_| ())
        .map_err(|source| GraphError::Clause {
            line: number,
            source,
        })
}
