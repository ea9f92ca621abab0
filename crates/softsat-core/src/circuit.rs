//! Node arena and the forward/backward propagation protocol.
//!
//! Nodes live in a single `Vec` and refer to each other by [`NodeId`].
//! Operand links point towards the inputs, consumer links point towards
//! the cost nodes. Backward propagation is pull-based: a node first asks
//! every consumer to finish its own backward step (which accumulates into
//! this node's gradient), then pushes its contribution into its operands.

use log::trace;

use crate::error::NodeError;
use crate::node::{cross_entropy, sigmoid, BinaryOp, Links, Node, NodeId, NodeKind};

/// Arena position to roll back to after a failed construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    len: usize,
    serial: u32,
}

/// Arena of soft-logic nodes.
#[derive(Debug, Clone, Default)]
pub struct Circuit {
    nodes: Vec<Node>,
    next_serial: u32,
}

impl Circuit {
    /// Create an empty circuit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the circuit has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Get a node by handle.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    /// Iterate over all nodes in construction order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (NodeId::new(i), node))
    }

    /// Reserve the next diagnostic serial without creating a node.
    ///
    /// The clause parser uses this for parenthesis markers.
    pub fn next_serial(&mut self) -> u32 {
        let serial = self.next_serial;
        self.next_serial += 1;
        serial
    }

    fn get(&self, id: NodeId) -> Result<&Node, NodeError> {
        self.nodes
            .get(id.index())
            .ok_or(NodeError::UnknownNode(id.index()))
    }

    fn get_mut(&mut self, id: NodeId) -> Result<&mut Node, NodeError> {
        self.nodes
            .get_mut(id.index())
            .ok_or(NodeError::UnknownNode(id.index()))
    }

    fn insert(&mut self, links: Links) -> NodeId {
        let id = NodeId::new(self.nodes.len());
        let serial = self.next_serial();
        self.nodes.push(Node::new(serial, links));
        id
    }

    /// Add an input node holding `value`.
    pub fn add_input(&mut self, value: f64) -> NodeId {
        self.insert(Links::Input {
            value,
            consumer: None,
        })
    }

    /// Add an input node together with the sigmoid node that reads it.
    ///
    /// Returns `(input, sigmoid)`.
    pub fn add_variable(&mut self, value: f64) -> (NodeId, NodeId) {
        let input = NodeId::new(self.nodes.len());
        let sigmoid = NodeId::new(self.nodes.len() + 1);
        self.insert(Links::Input {
            value,
            consumer: Some(sigmoid),
        });
        self.insert(Links::Sigmoid {
            input,
            consumers: Vec::new(),
        });
        (input, sigmoid)
    }

    /// Add a sigmoid node fed by `input`.
    pub fn add_sigmoid(&mut self, input: NodeId) -> Result<NodeId, NodeError> {
        self.get(input)?;
        let id = self.insert(Links::Sigmoid {
            input,
            consumers: Vec::new(),
        });
        self.link_consumer(input, id)?;
        Ok(id)
    }

    /// Add a NOT gate whose operand is wired later with [`add_operand`](Self::add_operand).
    pub fn add_not(&mut self) -> NodeId {
        self.insert(Links::Not {
            input: None,
            consumer: None,
        })
    }

    /// Add a binary gate with its first operand.
    ///
    /// The second operand is wired later with [`add_operand`](Self::add_operand).
    pub fn add_binary(&mut self, op: BinaryOp, first: NodeId) -> Result<NodeId, NodeError> {
        self.get(first)?;
        let id = self.insert(Links::Binary {
            op,
            first,
            second: None,
            consumer: None,
        });
        self.link_consumer(first, id)?;
        Ok(id)
    }

    /// Add a cost node at the root of a clause.
    pub fn add_cost(&mut self, input: NodeId) -> Result<NodeId, NodeError> {
        self.get(input)?;
        let id = self.insert(Links::Cost { input });
        self.link_consumer(input, id)?;
        Ok(id)
    }

    /// Wire `operand` into the empty operand slot of `node`.
    ///
    /// Also registers `node` as a consumer of `operand`.
    pub fn add_operand(&mut self, node: NodeId, operand: NodeId) -> Result<(), NodeError> {
        self.get(operand)?;
        let target = self.get(node)?;
        let serial = target.serial;
        match &target.links {
            Links::Not { input: None, .. } | Links::Binary { second: None, .. } => {}
            Links::Not { .. } | Links::Binary { .. } => {
                return Err(NodeError::OperandAlreadySet(serial));
            }
            links => {
                return Err(NodeError::InputNotAccepted {
                    serial,
                    kind: links.kind(),
                })
            }
        }

        self.link_consumer(operand, node)?;
        match &mut self.get_mut(node)?.links {
            Links::Not { input, .. } => *input = Some(operand),
            Links::Binary { second, .. } => *second = Some(operand),
            _ => {}
        }
        Ok(())
    }

    /// Register `consumer` as a reader of `node`'s output.
    ///
    /// Cost nodes are clause roots and accept no consumer at all.
    pub fn set_consumer(&mut self, node: NodeId, consumer: NodeId) -> Result<(), NodeError> {
        self.get(consumer)?;
        self.link_consumer(node, consumer)
    }

    fn link_consumer(&mut self, node: NodeId, consumer: NodeId) -> Result<(), NodeError> {
        let consumer_serial = self.get(consumer)?.serial;
        let target = self.get_mut(node)?;
        let serial = target.serial;
        match &mut target.links {
            Links::Sigmoid { consumers, .. } => consumers.push(consumer),
            Links::Input { consumer: slot, .. }
            | Links::Not { consumer: slot, .. }
            | Links::Binary { consumer: slot, .. } => {
                if slot.is_some() {
                    return Err(NodeError::ConsumerAlreadySet(serial));
                }
                *slot = Some(consumer);
            }
            Links::Cost { .. } => {
                return Err(NodeError::ConsumerNotAccepted {
                    serial,
                    kind: NodeKind::Cost,
                })
            }
        }
        trace!("linked node {} -> node {}", serial, consumer_serial);
        Ok(())
    }

    /// Overwrite the value held by an input node.
    ///
    /// Does not invalidate cached outputs downstream; see [`reset`](Self::reset).
    pub fn set_value(&mut self, id: NodeId, new_value: f64) -> Result<(), NodeError> {
        let node = self.get_mut(id)?;
        let serial = node.serial;
        match &mut node.links {
            Links::Input { value, .. } => {
                *value = new_value;
                Ok(())
            }
            links => Err(NodeError::InputNotAccepted {
                serial,
                kind: links.kind(),
            }),
        }
    }

    /// Compute (or return the cached) output of `id`.
    pub fn forward(&mut self, id: NodeId) -> Result<f64, NodeError> {
        let node = self.get(id)?;
        if let Some(output) = node.output {
            return Ok(output);
        }
        let serial = node.serial;

        let output = match node.links {
            Links::Input { value, .. } => return Ok(value),
            Links::Sigmoid { input, .. } => sigmoid(self.forward(input)?),
            Links::Not { input, .. } => {
                let input = input.ok_or(NodeError::MissingOperand(serial))?;
                1.0 - self.forward(input)?
            }
            Links::Binary {
                op, first, second, ..
            } => {
                let second = second.ok_or(NodeError::MissingOperand(serial))?;
                let a = self.forward(first)?;
                let b = self.forward(second)?;
                op.eval(a, b)
            }
            Links::Cost { input } => cross_entropy(self.forward(input)?),
        };

        self.get_mut(id)?.output = Some(output);
        Ok(output)
    }

    /// Run the backward step of `id`.
    ///
    /// Pulls every consumer first, then pushes this node's gradient into
    /// its operands. Operands are not pulled; that is driven from the
    /// inputs by [`pull`](Self::pull). A node's backward step runs at most
    /// once per cycle.
    pub fn backward(&mut self, id: NodeId) -> Result<(), NodeError> {
        let node = self.get(id)?;
        if node.pulled {
            return Ok(());
        }
        let serial = node.serial;
        match &node.links {
            Links::Input { .. } => {
                return Err(NodeError::BackwardUnsupported {
                    serial,
                    kind: NodeKind::Input,
                });
            }
            Links::Not { input: None, .. } | Links::Binary { second: None, .. } => {
                return Err(NodeError::MissingOperand(serial));
            }
            Links::Not { consumer: None, .. } | Links::Binary { consumer: None, .. } => {
                return Err(NodeError::MissingConsumer(serial));
            }
            Links::Sigmoid { .. } | Links::Not { .. } | Links::Binary { .. } | Links::Cost { .. } => {}
        }

        for i in 0.. {
            let next = self.get(id)?.links.consumers().get(i).copied();
            let Some(consumer) = next else { break };
            self.backward(consumer)?;
        }

        let node = self.get(id)?;
        let grad = node.grad;
        match node.links {
            Links::Input { .. } => {}
            Links::Sigmoid { input, .. } => {
                let f = self.forward(id)?;
                self.set_grad(input, grad * f * (1.0 - f))?;
            }
            Links::Not { input, .. } => {
                let input = input.ok_or(NodeError::MissingOperand(serial))?;
                self.set_grad(input, -grad)?;
            }
            Links::Binary {
                op, first, second, ..
            } => {
                let second = second.ok_or(NodeError::MissingOperand(serial))?;
                let a = self.forward(first)?;
                let b = self.forward(second)?;
                let (da, db) = op.partials(a, b);
                self.set_grad(first, grad * da)?;
                self.set_grad(second, grad * db)?;
            }
            Links::Cost { input } => {
                let a = self.forward(input)?;
                self.set_grad(input, grad * (-1.0 / a))?;
            }
        }

        self.get_mut(id)?.pulled = true;
        Ok(())
    }

    /// Accumulate `delta` into the gradient of `id`.
    pub fn set_grad(&mut self, id: NodeId, delta: f64) -> Result<(), NodeError> {
        let node = self.get_mut(id)?;
        if node.kind() == NodeKind::Cost {
            return Err(NodeError::ImmutableGradient(node.serial));
        }
        node.grad += delta;
        Ok(())
    }

    /// Pull the gradient of the total cost back to input node `id`.
    pub fn pull(&mut self, id: NodeId) -> Result<f64, NodeError> {
        let node = self.get(id)?;
        let serial = node.serial;
        let Links::Input { consumer, .. } = node.links else {
            return Err(NodeError::BackwardUnsupported {
                serial,
                kind: node.kind(),
            });
        };
        self.backward(consumer.ok_or(NodeError::MissingConsumer(serial))?)?;
        Ok(self.get(id)?.grad)
    }

    /// Clear cached output and gradient of `id` and everything downstream of it.
    ///
    /// Idempotent; nodes reached along several paths are simply cleared again.
    pub fn reset(&mut self, id: NodeId) -> Result<(), NodeError> {
        self.get_mut(id)?.clear();
        for i in 0.. {
            let next = self.get(id)?.links.consumers().get(i).copied();
            let Some(consumer) = next else { break };
            self.reset(consumer)?;
        }
        Ok(())
    }

    /// Mark the current arena position.
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            len: self.nodes.len(),
            serial: self.next_serial,
        }
    }

    /// Drop every node created after `checkpoint` along with any link to it.
    pub fn rollback(&mut self, checkpoint: Checkpoint) {
        self.nodes.truncate(checkpoint.len);
        self.next_serial = checkpoint.serial;

        let len = checkpoint.len;
        for node in &mut self.nodes {
            match &mut node.links {
                Links::Sigmoid { consumers, .. } => consumers.retain(|c| c.index() < len),
                Links::Input { consumer, .. } => unlink(consumer, len),
                Links::Not { input, consumer } => {
                    unlink(input, len);
                    unlink(consumer, len);
                }
                Links::Binary {
                    second, consumer, ..
                } => {
                    unlink(second, len);
                    unlink(consumer, len);
                }
                Links::Cost { .. } => {}
            }
        }
    }
}

/// Clear `slot` if it points past the end of a truncated arena.
fn unlink(slot: &mut Option<NodeId>, len: usize) {
    if slot.is_some_and(|id| id.index() >= len) {
        *slot = None;
    }
}
