//! Density-based clustering under L1 distance.

use std::collections::VecDeque;

use crate::distance::manhattan;

/// Label assigned to rows that belong to no cluster.
pub const NOISE: i32 = -1;

/// DBSCAN with Manhattan distance.
///
/// A row is a core point when at least `min_samples` rows (itself included)
/// lie within `eps`. Clusters are numbered in order of their first core point.
#[derive(Debug, Clone, Copy)]
pub struct Dbscan {
    pub eps: f64,
    pub min_samples: usize,
}

impl Dbscan {
    /// Create a new estimator.
    pub fn new(eps: f64, min_samples: usize) -> Self {
        Self { eps, min_samples }
    }

    fn neighbours(&self, data: &[Vec<f64>], i: usize) -> Vec<usize> {
        (0..data.len())
            .filter(|&j| manhattan(&data[i], &data[j]) <= self.eps)
            .collect()
    }

    /// Label every row; noise gets [`NOISE`].
    pub fn fit(&self, data: &[Vec<f64>]) -> Vec<i32> {
        let n = data.len();
        let neighbourhoods: Vec<Vec<usize>> = (0..n).map(|i| self.neighbours(data, i)).collect();
        let is_core: Vec<bool> = neighbourhoods
            .iter()
            .map(|nb| nb.len() >= self.min_samples)
            .collect();

        let mut labels = vec![NOISE; n];
        let mut next_label = 0;

        for start in 0..n {
            if labels[start] != NOISE || !is_core[start] {
                continue;
            }

            labels[start] = next_label;
            let mut queue: VecDeque<usize> = VecDeque::from([start]);
            while let Some(p) = queue.pop_front() {
                if !is_core[p] {
                    continue;
                }
                for &q in &neighbourhoods[p] {
                    if labels[q] == NOISE {
                        labels[q] = next_label;
                        queue.push_back(q);
                    }
                }
            }

            next_label += 1;
        }

        labels
    }
}
