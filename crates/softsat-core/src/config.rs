//! Gradient-descent settings.

/// Settings for the descent driver.
///
/// The defaults reproduce the classic setup: a fixed step of 0.1 for
/// 4000 iterations, starting from values drawn in `[0, 0.1)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DescentConfig {
    /// Step size applied to each gradient.
    pub learning_rate: f64,
    /// Number of forward/backward/update cycles.
    pub iterations: usize,
    /// Initial values are drawn uniformly from `[0, init_scale)`.
    pub init_scale: f64,
}

impl Default for DescentConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            iterations: 4000,
            init_scale: 0.1,
        }
    }
}

impl DescentConfig {
    /// Create a config with custom values.
    pub fn new(learning_rate: f64, iterations: usize, init_scale: f64) -> Self {
        Self {
            learning_rate,
            iterations,
            init_scale,
        }
    }

    /// Short run for small formulas and tests.
    pub fn quick() -> Self {
        Self {
            learning_rate: 0.5,
            iterations: 500,
            init_scale: 0.1,
        }
    }

    /// Long run with a smaller step for larger formulas.
    pub fn thorough() -> Self {
        Self {
            learning_rate: 0.05,
            iterations: 20_000,
            init_scale: 0.1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_classic_setup() {
        let config = DescentConfig::default();
        assert_eq!(config.learning_rate, 0.1);
        assert_eq!(config.iterations, 4000);
        assert_eq!(config.init_scale, 0.1);
    }

    #[test]
    fn test_presets_differ() {
        assert!(DescentConfig::quick().iterations < DescentConfig::default().iterations);
        assert!(DescentConfig::thorough().iterations > DescentConfig::default().iterations);
        assert_eq!(
            DescentConfig::new(0.2, 10, 1.0),
            DescentConfig {
                learning_rate: 0.2,
                iterations: 10,
                init_scale: 1.0
            }
        );
    }
}
