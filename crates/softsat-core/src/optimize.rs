//! Gradient-descent driver over a [`ComputationGraph`].

use log::{debug, trace};
use rand::Rng;

use crate::config::DescentConfig;
use crate::error::GraphError;
use crate::graph::ComputationGraph;
use crate::node::sigmoid;

/// Outcome of a descent run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Descent {
    /// Total cost at the final values.
    pub cost: f64,
    /// Number of update steps taken.
    pub iterations: usize,
}

/// Draw `count` initial values uniformly from `[0, scale)`.
pub fn seed_values<R: Rng + ?Sized>(count: usize, scale: f64, rng: &mut R) -> Vec<f64> {
    (0..count).map(|_| rng.gen::<f64>() * scale).collect()
}

/// Run one forward/backward cycle and move `values` against the gradient.
///
/// Returns the total cost before the update.
pub fn step(
    graph: &mut ComputationGraph,
    values: &mut [f64],
    learning_rate: f64,
) -> Result<f64, GraphError> {
    let cost = graph.forward(values)?;
    let grads = graph.backward()?;
    for (value, grad) in values.iter_mut().zip(grads) {
        *value -= learning_rate * grad;
    }
    Ok(cost)
}

/// Minimize the total clause cost by fixed-step gradient descent.
///
/// `values` holds the starting point and is updated in place.
pub fn minimize(
    graph: &mut ComputationGraph,
    values: &mut [f64],
    config: &DescentConfig,
) -> Result<Descent, GraphError> {
    debug!(
        "descent: {} variables, {} clauses, {} iterations at rate {}",
        graph.variable_count(),
        graph.clause_count(),
        config.iterations,
        config.learning_rate
    );

    for iteration in 0..config.iterations {
        let cost = step(graph, values, config.learning_rate)?;
        trace!("iteration {}: cost {}", iteration, cost);
    }

    let cost = graph.forward(values)?;
    graph.reset()?;
    debug!("descent finished with cost {}", cost);

    Ok(Descent {
        cost,
        iterations: config.iterations,
    })
}

/// Continuous truth value of each variable.
pub fn truth_values(values: &[f64]) -> Vec<f64> {
    values.iter().map(|&v| sigmoid(v)).collect()
}

/// Boolean assignment obtained by thresholding truth values at one half.
pub fn assignment(values: &[f64]) -> Vec<bool> {
    truth_values(values).into_iter().map(|t| t >= 0.5).collect()
}
