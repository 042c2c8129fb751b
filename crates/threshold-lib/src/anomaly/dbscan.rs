//! Density-based clustering (DBSCAN) over one-dimensional values
//!
//! Values are first standardized so that `eps` is expressed in standard
//! deviations. Points that are neither core points nor within `eps` of a core
//! point are noise.

use std::cmp::Ordering;

use super::{ensure_finite, DetectorError};
use crate::analyzer::stats;

/// DBSCAN parameters
#[derive(Debug, Clone)]
pub struct Dbscan {
    /// Neighbourhood radius (inclusive)
    pub eps: f64,
    /// Neighbours, including the point itself, required for a core point
    pub min_samples: usize,
}

impl Dbscan {
    pub fn new(eps: f64, min_samples: usize) -> Self {
        Self { eps, min_samples }
    }

    /// Cluster the values; `None` marks noise, `Some(id)` the cluster id.
    ///
    /// Cluster ids are assigned in ascending value order.
    pub fn fit_predict(&self, values: &[f64]) -> Result<Vec<Option<usize>>, DetectorError> {
        ensure_finite(values)?;
        let n = values.len();
        if n == 0 {
            return Ok(Vec::new());
        }

        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| values[a].partial_cmp(&values[b]).unwrap_or(Ordering::Equal));
        let sorted: Vec<f64> = order.iter().map(|&i| values[i]).collect();

        // Neighbourhood sizes via binary search on the sorted values
        let is_core: Vec<bool> = sorted
            .iter()
            .map(|&v| {
                let lo = sorted.partition_point(|&x| x < v - self.eps);
                let hi = sorted.partition_point(|&x| x <= v + self.eps);
                hi - lo >= self.min_samples
            })
            .collect();

        // In one dimension, core points chain into a cluster while consecutive
        // cores are no further than eps apart.
        let mut core_cluster: Vec<Option<usize>> = vec![None; n];
        let mut next_id = 0usize;
        let mut last_core: Option<usize> = None;
        for pos in 0..n {
            if !is_core[pos] {
                continue;
            }
            let id = match last_core {
                Some(prev) if sorted[pos] - sorted[prev] <= self.eps => {
                    core_cluster[prev].unwrap_or(next_id)
                }
                _ => {
                    next_id += 1;
                    next_id - 1
                }
            };
            core_cluster[pos] = Some(id);
            last_core = Some(pos);
        }

        // Border points join the nearest core point within reach
        let mut labels = vec![None; n];
        for pos in 0..n {
            let label = if is_core[pos] {
                core_cluster[pos]
            } else {
                nearest_core(&sorted, &is_core, pos)
                    .filter(|&core| (sorted[core] - sorted[pos]).abs() <= self.eps)
                    .and_then(|core| core_cluster[core])
            };
            labels[order[pos]] = label;
        }

        Ok(labels)
    }

    /// Whether any value is classified as noise
    pub fn has_noise(&self, values: &[f64]) -> Result<bool, DetectorError> {
        Ok(self.fit_predict(values)?.iter().any(Option::is_none))
    }
}

fn nearest_core(sorted: &[f64], is_core: &[bool], pos: usize) -> Option<usize> {
    let below = (0..pos).rev().find(|&i| is_core[i]);
    let above = (pos + 1..sorted.len()).find(|&i| is_core[i]);
    match (below, above) {
        (Some(b), Some(a)) => {
            if sorted[pos] - sorted[b] <= sorted[a] - sorted[pos] {
                Some(b)
            } else {
                Some(a)
            }
        }
        (b, a) => b.or(a),
    }
}

/// Rescale to zero mean and unit (population) variance.
///
/// Constant input has no spread to divide by and is only centred.
pub fn standardize(values: &[f64]) -> Result<Vec<f64>, DetectorError> {
    ensure_finite(values)?;
    let mean = stats::mean(values);
    let std = stats::std_dev(values);
    let scale = if std > 0.0 { std } else { 1.0 };
    let scaled: Vec<f64> = values.iter().map(|v| (v - mean) / scale).collect();
    if scaled.iter().any(|v| !v.is_finite()) {
        return Err(DetectorError::NonFiniteScore);
    }
    Ok(scaled)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dense_cluster_without_noise() {
        let values = vec![1.0, 1.1, 1.2, 1.3, 1.4, 1.5];
        let labels = Dbscan::new(0.5, 5).fit_predict(&values).unwrap();
        assert!(labels.iter().all(|l| *l == Some(0)));
    }

    #[test]
    fn test_isolated_point_is_noise() {
        let values = vec![0.0, 0.1, 0.2, 0.3, 0.4, 9.0];
        let labels = Dbscan::new(0.5, 5).fit_predict(&values).unwrap();
        assert_eq!(labels[5], None);
        assert!(labels[..5].iter().all(|l| l.is_some()));
    }

    #[test]
    fn test_border_point_joins_cluster() {
        // 0.0..0.4 are core; 0.8 reaches only 0.4 and 0.3, so it is a border point
        let values = vec![0.0, 0.1, 0.2, 0.3, 0.4, 0.8];
        let labels = Dbscan::new(0.5, 5).fit_predict(&values).unwrap();
        assert_eq!(labels[5], Some(0));
    }

    #[test]
    fn test_separate_clusters() {
        let mut values: Vec<f64> = (0..5).map(|i| i as f64 * 0.1).collect();
        values.extend((0..5).map(|i| 10.0 + i as f64 * 0.1));
        let labels = Dbscan::new(0.5, 5).fit_predict(&values).unwrap();
        assert_eq!(labels[0], Some(0));
        assert_eq!(labels[9], Some(1));
        assert!(!Dbscan::new(0.5, 5).has_noise(&values).unwrap());
    }

    #[test]
    fn test_sparse_points_are_all_noise() {
        let values = vec![0.0, 1.0, 2.0, 3.0];
        assert!(Dbscan::new(0.5, 5)
            .fit_predict(&values)
            .unwrap()
            .iter()
            .all(Option::is_none));
    }

    #[test]
    fn test_standardize() {
        let scaled = standardize(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert!((scaled[0] + 1.5).abs() < 1e-12);
        assert!((stats::mean(&scaled)).abs() < 1e-12);
        assert!((stats::std_dev(&scaled) - 1.0).abs() < 1e-12);

        let constant = standardize(&[3.0; 6]).unwrap();
        assert!(constant.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_rejects_non_finite() {
        assert_eq!(
            standardize(&[1.0, f64::INFINITY]),
            Err(DetectorError::NonFiniteInput)
        );
    }
}
