//! Isolation forest outlier detection
//!
//! Builds random partitioning trees over one-dimensional values. Points that
//! are isolated after few splits receive high anomaly scores; the
//! `contamination` fraction of the training data with the highest scores
//! marks the decision boundary.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{ensure_finite, DetectorError};
use crate::analyzer::stats::percentile;

/// Number of trees in the ensemble
const DEFAULT_TREES: usize = 100;

/// Upper bound on the per-tree subsample size
const MAX_SUBSAMPLE: usize = 256;

/// Fixed seed so repeated runs flag the same points
pub const DEFAULT_SEED: u64 = 42;

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Isolation forest configuration
#[derive(Debug, Clone)]
pub struct IsolationForest {
    /// Expected fraction of outliers in the data
    pub contamination: f64,
    /// Number of isolation trees
    pub n_trees: usize,
    /// Seed for subsampling and split selection
    pub seed: u64,
}

enum Node {
    Leaf {
        size: usize,
    },
    Split {
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl IsolationForest {
    pub fn new(contamination: f64) -> Self {
        Self {
            contamination,
            n_trees: DEFAULT_TREES,
            seed: DEFAULT_SEED,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_trees(mut self, n_trees: usize) -> Self {
        self.n_trees = n_trees.max(1);
        self
    }

    /// Fit on `values` and label each of them; `true` marks an outlier.
    pub fn fit_predict(&self, values: &[f64]) -> Result<Vec<bool>, DetectorError> {
        if values.len() < 2 {
            return Err(DetectorError::TooFewSamples {
                required: 2,
                actual: values.len(),
            });
        }
        ensure_finite(values)?;

        let subsample = values.len().min(MAX_SUBSAMPLE);
        let height_limit = (subsample as f64).log2().ceil() as usize;
        let mut rng = StdRng::seed_from_u64(self.seed);

        let trees: Vec<Node> = (0..self.n_trees)
            .map(|_| {
                let picked: Vec<f64> =
                    rand::seq::index::sample(&mut rng, values.len(), subsample)
                        .into_iter()
                        .map(|i| values[i])
                        .collect();
                grow(picked, 0, height_limit, &mut rng)
            })
            .collect();

        let normalizer = average_path_length(subsample);

        // Negated so that lower means more anomalous
        let scores: Vec<f64> = values
            .iter()
            .map(|&x| {
                let mean_depth = trees
                    .iter()
                    .map(|tree| path_length(tree, x, 0))
                    .sum::<f64>()
                    / trees.len() as f64;
                -(2f64).powf(-mean_depth / normalizer)
            })
            .collect();

        if scores.iter().any(|s| !s.is_finite()) {
            return Err(DetectorError::NonFiniteScore);
        }

        let offset = percentile(&scores, 100.0 * self.contamination);
        Ok(scores.iter().map(|s| *s < offset).collect())
    }

    /// Whether any value is labelled an outlier
    pub fn has_outliers(&self, values: &[f64]) -> Result<bool, DetectorError> {
        Ok(self.fit_predict(values)?.into_iter().any(|outlier| outlier))
    }
}

fn grow(values: Vec<f64>, depth: usize, height_limit: usize, rng: &mut StdRng) -> Node {
    let size = values.len();
    if depth >= height_limit || size <= 1 {
        return Node::Leaf { size };
    }

    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    if max <= min {
        return Node::Leaf { size };
    }

    // Interpolate rather than subtract so wide ranges cannot overflow
    let u: f64 = rng.gen();
    let threshold = min * (1.0 - u) + max * u;
    let (left, right): (Vec<f64>, Vec<f64>) = values.into_iter().partition(|&v| v <= threshold);

    Node::Split {
        threshold,
        left: Box::new(grow(left, depth + 1, height_limit, rng)),
        right: Box::new(grow(right, depth + 1, height_limit, rng)),
    }
}

fn path_length(node: &Node, x: f64, depth: usize) -> f64 {
    match node {
        Node::Leaf { size } => depth as f64 + average_path_length(*size),
        Node::Split {
            threshold,
            left,
            right,
        } => {
            if x <= *threshold {
                path_length(left, x, depth + 1)
            } else {
                path_length(right, x, depth + 1)
            }
        }
    }
}

/// Average path length of an unsuccessful search in a binary search tree of `n` nodes
fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spiky_series(len: usize) -> Vec<f64> {
        let mut values: Vec<f64> = (0..len).map(|i| 10.0 + (i % 5) as f64).collect();
        values[len / 2] = 1000.0;
        values
    }

    #[test]
    fn test_spike_is_flagged() {
        let values = spiky_series(25);
        let labels = IsolationForest::new(0.1).fit_predict(&values).unwrap();
        assert!(labels[12], "spike should be labelled an outlier");
    }

    #[test]
    fn test_constant_values_have_no_outliers() {
        let values = vec![42.0; 10];
        let forest = IsolationForest::new(0.1);
        assert_eq!(forest.has_outliers(&values), Ok(false));
    }

    #[test]
    fn test_same_seed_is_reproducible() {
        let values: Vec<f64> = (0..40).map(|i| ((i * 37) % 17) as f64).collect();
        let forest = IsolationForest::new(0.1);
        assert_eq!(
            forest.fit_predict(&values).unwrap(),
            forest.fit_predict(&values).unwrap()
        );
    }

    #[test]
    fn test_contamination_bounds_flag_count() {
        let values: Vec<f64> = (0..100).map(|i| i as f64).collect();
        let flagged = IsolationForest::new(0.1)
            .fit_predict(&values)
            .unwrap()
            .into_iter()
            .filter(|o| *o)
            .count();
        assert!(flagged <= 10, "flagged {} points", flagged);
    }

    #[test]
    fn test_rejects_bad_input() {
        let forest = IsolationForest::new(0.1);
        assert_eq!(
            forest.fit_predict(&[1.0]),
            Err(DetectorError::TooFewSamples {
                required: 2,
                actual: 1
            })
        );
        assert_eq!(
            forest.fit_predict(&[1.0, f64::NAN, 2.0]),
            Err(DetectorError::NonFiniteInput)
        );
    }

    #[test]
    fn test_average_path_length() {
        assert_eq!(average_path_length(1), 0.0);
        assert_eq!(average_path_length(2), 1.0);
        assert!(average_path_length(256) > average_path_length(16));
    }
}
