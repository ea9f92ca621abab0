//! softsat: differentiable soft-logic circuits
//!
//! Turns propositional clauses into a computation graph whose total cost
//! can be minimized by gradient descent.
//!
//! # Overview
//!
//! Every variable is a real number squashed through a sigmoid into a
//! truth value in `(0, 1)`. Clauses are written in a small language:
//!
//! - `$n` reads variable `n`
//! - `^` is soft AND (`a * b`), `v` is soft OR (`a + b - a * b`)
//! - `~` is soft NOT (`1 - a`)
//! - `(` and `)` group
//!
//! There is no operator precedence: binary operators fold left to right
//! as soon as their right operand is complete. Each clause ends in a cost
//! node computing `-ln(truth)`, and the graph cost is the sum over all
//! clauses.
//!
//! # Example
//!
//! ```
//! use softsat_core::{ComputationGraph, DescentConfig, assignment, minimize};
//!
//! // $0 must hold, and $0 implies $1
//! let mut graph = ComputationGraph::new(2, ["$0", "~$0 v $1"]).unwrap();
//!
//! let mut values = vec![0.0, 0.0];
//! let cost = graph.forward(&values).unwrap();
//! let grads = graph.backward().unwrap();
//! assert!(cost > 0.0);
//! assert!(grads.iter().all(|&g| g < 0.0));
//!
//! let descent = minimize(&mut graph, &mut values, &DescentConfig::default()).unwrap();
//! assert!(descent.cost < cost);
//! assert_eq!(assignment(&values), vec![true, true]);
//! ```
//!
//! # Programs
//!
//! A program is a variable count on the first line followed by one
//! clause per line:
//!
//! ```
//! use softsat_core::ComputationGraph;
//!
//! let graph = ComputationGraph::from_program("3\n$0 v ~$1\n$1 ^ $2\n").unwrap();
//! assert_eq!(graph.clause_count(), 2);
//! assert_eq!(graph.clause_expression(0).unwrap(), "($0 v ~$1)");
//! ```

pub mod builder;
pub mod circuit;
pub mod config;
pub mod error;
pub mod graph;
pub mod node;
pub mod optimize;
pub mod token;

pub use builder::{parse_clause, parse_clause_with_max_depth, ClauseParser, DEFAULT_MAX_DEPTH};
pub use circuit::{Checkpoint, Circuit};
pub use config::DescentConfig;
pub use error::{GraphError, NodeError, ParseError};
pub use graph::{ComputationGraph, GraphBuilder};
pub use node::{BinaryOp, Links, Node, NodeId, NodeKind};
pub use optimize::{assignment, minimize, seed_values, step, truth_values, Descent};
pub use token::{tokenize, Spanned, Token};
