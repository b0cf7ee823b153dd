//! Seeded k-means over a pluggable distance and barycenter.
//!
//! k-means++ seeding, Lloyd iterations, several restarts keeping the lowest
//! inertia. All randomness comes from the caller's RNG.

use ordered_float::OrderedFloat;
use rand::rngs::StdRng;
use rand::Rng;
use tracing::debug;

use crate::barycenter::{dba, euclidean_barycenter};
use crate::distance::{dtw, euclidean};

/// Distance and averaging used by [`KMeans`].
pub trait CentroidMetric {
    /// Distance between a series and a centre.
    fn distance(&self, a: &[f64], b: &[f64]) -> f64;

    /// New centre for a set of members, starting from the previous one.
    fn barycenter(&self, members: &[&[f64]], previous: &[f64]) -> Vec<f64>;
}

/// Straight Euclidean distance with pointwise-mean centres.
#[derive(Debug, Clone, Copy, Default)]
pub struct Euclidean;

impl CentroidMetric for Euclidean {
    fn distance(&self, a: &[f64], b: &[f64]) -> f64 {
        euclidean(a, b)
    }

    fn barycenter(&self, members: &[&[f64]], _previous: &[f64]) -> Vec<f64> {
        euclidean_barycenter(members)
    }
}

/// DTW distance with DBA centres.
#[derive(Debug, Clone, Copy)]
pub struct Dtw {
    pub max_iter_barycenter: usize,
    pub tol: f64,
}

impl CentroidMetric for Dtw {
    fn distance(&self, a: &[f64], b: &[f64]) -> f64 {
        dtw(a, b)
    }

    fn barycenter(&self, members: &[&[f64]], previous: &[f64]) -> Vec<f64> {
        dba(members, previous, self.max_iter_barycenter, self.tol)
    }
}

/// Result of a k-means fit.
#[derive(Debug, Clone)]
pub struct KMeansFit {
    /// Cluster index per input row.
    pub labels: Vec<usize>,
    /// Cluster centres.
    pub centroids: Vec<Vec<f64>>,
    /// Sum of squared distances to assigned centres.
    pub inertia: f64,
    /// Lloyd iterations run by the kept restart.
    pub iterations: usize,
}

/// k-means estimator.
#[derive(Debug, Clone)]
pub struct KMeans<M> {
    metric: M,
    k: usize,
    n_init: usize,
    max_iter: usize,
    tol: f64,
}

impl<M: CentroidMetric> KMeans<M> {
    /// Create an estimator. `k`, `n_init` and `max_iter` must be positive.
    pub fn new(metric: M, k: usize, n_init: usize, max_iter: usize, tol: f64) -> Self {
        Self {
            metric,
            k,
            n_init: n_init.max(1),
            max_iter: max_iter.max(1),
            tol,
        }
    }

    /// Fit on `data` (requires `1 <= k <= data.len()`).
    pub fn fit(&self, data: &[Vec<f64>], rng: &mut StdRng) -> KMeansFit {
        let mut best: Option<KMeansFit> = None;

        for restart in 0..self.n_init {
            let fit = self.fit_once(data, rng);
            debug!(restart, inertia = fit.inertia, iterations = fit.iterations, "k-means restart");
            if best.as_ref().map_or(true, |b| fit.inertia < b.inertia) {
                best = Some(fit);
            }
        }

        best.unwrap_or_else(|| KMeansFit {
            labels: Vec::new(),
            centroids: Vec::new(),
            inertia: 0.0,
            iterations: 0,
        })
    }

    fn fit_once(&self, data: &[Vec<f64>], rng: &mut StdRng) -> KMeansFit {
        let mut centroids = self.init_plus_plus(data, rng);
        let mut labels = vec![usize::MAX; data.len()];
        let mut inertia = f64::INFINITY;
        let mut iterations = 0;

        for iter in 0..self.max_iter {
            iterations = iter + 1;

            let (new_labels, distances) = self.assign(data, &centroids);
            let changed = new_labels != labels;
            labels = new_labels;
            self.repair_empty(&mut labels, &distances);

            let new_inertia: f64 = distances.iter().map(|d| d * d).sum();
            let converged = !changed || (inertia - new_inertia).abs() < self.tol;
            inertia = new_inertia;
            if converged {
                break;
            }

            centroids = (0..self.k)
                .map(|c| {
                    let members: Vec<&[f64]> = labels
                        .iter()
                        .zip(data)
                        .filter(|(&l, _)| l == c)
                        .map(|(_, row)| row.as_slice())
                        .collect();
                    self.metric.barycenter(&members, &centroids[c])
                })
                .collect();
        }

        // Final assignment against the last centres.
        let (mut labels, distances) = self.assign(data, &centroids);
        self.repair_empty(&mut labels, &distances);
        let inertia = labels
            .iter()
            .zip(data)
            .map(|(&l, row)| self.metric.distance(row, &centroids[l]).powi(2))
            .sum();

        KMeansFit {
            labels,
            centroids,
            inertia,
            iterations,
        }
    }

    /// k-means++ seeding: first centre uniform, then proportional to D(x)^2.
    fn init_plus_plus(&self, data: &[Vec<f64>], rng: &mut StdRng) -> Vec<Vec<f64>> {
        let n = data.len();
        let mut centroids = Vec::with_capacity(self.k);
        centroids.push(data[rng.gen_range(0..n)].clone());

        let mut closest: Vec<f64> = data
            .iter()
            .map(|row| self.metric.distance(row, &centroids[0]).powi(2))
            .collect();

        while centroids.len() < self.k {
            let total: f64 = closest.iter().sum();
            let pick = if total > 0.0 && total.is_finite() {
                let mut target = rng.gen::<f64>() * total;
                let mut chosen = n - 1;
                for (i, d) in closest.iter().enumerate() {
                    if target < *d {
                        chosen = i;
                        break;
                    }
                    target -= d;
                }
                chosen
            } else {
                rng.gen_range(0..n)
            };

            let centre = data[pick].clone();
            for (row, c) in data.iter().zip(closest.iter_mut()) {
                *c = c.min(self.metric.distance(row, &centre).powi(2));
            }
            centroids.push(centre);
        }

        centroids
    }

    /// Nearest centre per row; ties go to the lowest index.
    fn assign(&self, data: &[Vec<f64>], centroids: &[Vec<f64>]) -> (Vec<usize>, Vec<f64>) {
        data.iter()
            .map(|row| {
                centroids
                    .iter()
                    .enumerate()
                    .map(|(c, centre)| (c, self.metric.distance(row, centre)))
                    .min_by_key(|&(_, d)| OrderedFloat(d))
                    .unwrap_or((0, f64::INFINITY))
            })
            .unzip()
    }

    /// Give every empty cluster the row farthest from its centre, taken from
    /// a cluster that keeps at least one member.
    fn repair_empty(&self, labels: &mut [usize], distances: &[f64]) {
        let mut sizes = vec![0usize; self.k];
        for &l in labels.iter() {
            sizes[l] += 1;
        }

        for empty in 0..self.k {
            if sizes[empty] > 0 {
                continue;
            }
            let donor = (0..labels.len())
                .filter(|&i| sizes[labels[i]] > 1)
                .max_by_key(|&i| OrderedFloat(distances[i]));
            if let Some(i) = donor {
                sizes[labels[i]] -= 1;
                labels[i] = empty;
                sizes[empty] = 1;
            }
        }
    }
}
