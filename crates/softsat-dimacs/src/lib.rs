//! DIMACS CNF reader for softsat.
//!
//! Converts a CNF file into the clause language understood by
//! [`softsat_core`]: each clause becomes one disjunction of literals.
//! DIMACS variables are numbered from 1, clause variables from 0, so
//! literal `k` becomes `$(k-1)` and `-k` becomes `~$(k-1)`.
//!
//! ```
//! use softsat_dimacs::Cnf;
//!
//! let cnf = Cnf::parse("c example\np cnf 3 2\n1 -3 0\n2 3 -1 0\n").unwrap();
//! assert_eq!(cnf.to_expressions(), vec!["$0 v ~$2", "$1 v $2 v ~$0"]);
//!
//! let graph = cnf.to_graph().unwrap();
//! assert_eq!(graph.variable_count(), 3);
//! assert_eq!(graph.clause_count(), 2);
//! ```

pub mod error;

use log::{debug, warn};
use softsat_core::{ComputationGraph, GraphError, DEFAULT_MAX_DEPTH};

pub use error::DimacsError;

/// A formula in conjunctive normal form.
///
/// Only [`Cnf::parse`] creates values, so every clause is non-empty and
/// every literal is non-zero and within the declared variable count:
///
/// ```compile_fail
/// let cnf = softsat_dimacs::Cnf { variables: 1, clauses: vec![vec![0]] };
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cnf {
    variables: usize,
    clauses: Vec<Vec<i64>>,
}

impl Cnf {
    /// Parse DIMACS CNF text.
    ///
    /// Lines starting with `c` are comments. A line starting with `%`
    /// ends the formula. Clauses may span several lines and several
    /// clauses may share one line; each ends with `0`.
    pub fn parse(text: &str) -> Result<Self, DimacsError> {
        let mut header: Option<(usize, usize)> = None;
        let mut clauses = Vec::new();
        let mut current = Vec::new();

        for (i, raw) in text.lines().enumerate() {
            let number = i + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('c') {
                continue;
            }
            if line.starts_with('%') {
                break;
            }
            if line.starts_with('p') {
                if header.is_some() {
                    return Err(invalid_header(number, line));
                }
                let parsed = parse_header(number, line)?;
                debug!(
                    "cnf header: {} variables, {} clauses",
                    parsed.0, parsed.1
                );
                header = Some(parsed);
                continue;
            }

            let (variables, _) = header.ok_or(DimacsError::MissingHeader(number))?;
            for token in line.split_whitespace() {
                let literal: i64 = token.parse().map_err(|_| DimacsError::InvalidLiteral {
                    line: number,
                    token: token.to_string(),
                })?;
                if literal == 0 {
                    if current.is_empty() {
                        return Err(DimacsError::EmptyClause(number));
                    }
                    clauses.push(std::mem::take(&mut current));
                    continue;
                }
                if literal.unsigned_abs() > variables as u64 {
                    return Err(DimacsError::LiteralOutOfRange {
                        line: number,
                        literal,
                        variables,
                    });
                }
                current.push(literal);
            }
        }

        if !current.is_empty() {
            return Err(DimacsError::UnterminatedClause);
        }
        let (variables, declared) = header.ok_or(DimacsError::MissingHeader(0))?;
        if declared != clauses.len() {
            warn!(
                "cnf header declares {} clauses, found {}",
                declared,
                clauses.len()
            );
        }

        Ok(Self { variables, clauses })
    }

    /// Number of variables declared by the header.
    pub fn variables(&self) -> usize {
        self.variables
    }

    /// Clauses as signed 1-based DIMACS literals, without the trailing `0`.
    pub fn clauses(&self) -> &[Vec<i64>] {
        &self.clauses
    }

    /// Clause-language text of every clause, in file order.
    pub fn to_expressions(&self) -> Vec<String> {
        self.clauses.iter().map(|c| clause_expression(c)).collect()
    }

    /// Program text: the variable count followed by one clause per line.
    pub fn to_program(&self) -> String {
        let mut program = format!("{}\n", self.variables);
        for expression in self.to_expressions() {
            program.push_str(&expression);
            program.push('\n');
        }
        program
    }

    /// Build the computation graph for this formula.
    pub fn to_graph(&self) -> Result<ComputationGraph, GraphError> {
        self.to_graph_with_max_depth(DEFAULT_MAX_DEPTH)
    }

    /// Build the computation graph with a custom clause nesting limit.
    ///
    /// A clause of `k` literals nests `k - 1` OR gates, plus one NOT for a
    /// negated first literal.
    pub fn to_graph_with_max_depth(&self, max_depth: usize) -> Result<ComputationGraph, GraphError> {
        ComputationGraph::with_max_depth(self.variables, self.to_expressions(), max_depth)
    }
}

/// Render one clause of non-zero DIMACS literals as a disjunction.
fn clause_expression(literals: &[i64]) -> String {
    literals
        .iter()
        .map(|&literal| {
            let index = literal.unsigned_abs() - 1;
            if literal < 0 {
                format!("~${}", index)
            } else {
                format!("${}", index)
            }
        })
        .collect::<Vec<_>>()
        .join(" v ")
}

fn parse_header(line: usize, text: &str) -> Result<(usize, usize), DimacsError> {
    let mut fields = text.split_whitespace();
    let (Some("p"), Some("cnf"), Some(variables), Some(clauses), None) = (
        fields.next(),
        fields.next(),
        fields.next(),
        fields.next(),
        fields.next(),
    ) else {
        return Err(invalid_header(line, text));
    };

    match (variables.parse::<usize>(), clauses.parse::<usize>()) {
        (Ok(variables), Ok(clauses)) => Ok((variables, clauses)),
        _ => Err(invalid_header(line, text)),
    }
}

fn invalid_header(line: usize, text: &str) -> DimacsError {
    DimacsError::InvalidHeader {
        line,
        text: text.to_string(),
    }
}
