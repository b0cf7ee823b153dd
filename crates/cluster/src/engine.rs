//! Clustering engine.
//!
//! Normalizes session series and dispatches to the algorithm selected by the
//! [`Metric`] variant.

use rand::rngs::StdRng;
use rand::SeedableRng;
use session_core::{ClusterConfig, Error, Metric, Result};
use tracing::{info, warn};

use crate::dbscan::{Dbscan, NOISE};
use crate::kmeans::{Dtw, Euclidean, KMeans, KMeansFit};
use crate::normalize::{is_flat, l2_normalize_rows, z_normalize_rows};

/// Output of a clustering run.
#[derive(Debug, Clone)]
pub struct Clustering {
    /// One label per input series; [`NOISE`] for unclustered rows.
    pub labels: Vec<i32>,
    /// Z-normalized input series, in input order.
    pub normalized: Vec<Vec<f64>>,
    /// k-means inertia, when the algorithm has one.
    pub inertia: Option<f64>,
}

impl Clustering {
    /// Number of distinct non-noise labels.
    pub fn cluster_count(&self) -> usize {
        let mut labels: Vec<i32> = self.labels.iter().copied().filter(|&l| l != NOISE).collect();
        labels.sort_unstable();
        labels.dedup();
        labels.len()
    }
}

/// Clustering engine bound to one metric, cluster count and seed.
#[derive(Debug, Clone)]
pub struct ClusterEngine {
    metric: Metric,
    num_clusters: usize,
    seed: u64,
}

impl ClusterEngine {
    /// Create a new engine.
    pub fn new(metric: Metric, num_clusters: usize, seed: u64) -> Self {
        Self {
            metric,
            num_clusters,
            seed,
        }
    }

    /// Create an engine from configuration.
    pub fn from_config(config: &ClusterConfig) -> Self {
        Self::new(config.metric.clone(), config.num_clusters, config.seed)
    }

    /// The configured metric.
    pub fn metric(&self) -> &Metric {
        &self.metric
    }

    /// Check parameters and input shape before any computation.
    fn validate(&self, rows: &[Vec<f64>]) -> Result<()> {
        ClusterConfig {
            metric: self.metric.clone(),
            num_clusters: self.num_clusters,
            seed: self.seed,
        }
        .validate()?;

        if let Some(first) = rows.first() {
            let width = first.len();
            if width == 0 {
                return Err(Error::data("series must not be empty"));
            }
            if let Some(i) = rows.iter().position(|r| r.len() != width) {
                return Err(Error::data(format!(
                    "series {} has length {}, expected {}",
                    i,
                    rows[i].len(),
                    width
                )));
            }
        }
        if let Some(i) = rows.iter().position(|r| r.iter().any(|v| !v.is_finite())) {
            return Err(Error::data(format!("series {} contains non-finite values", i)));
        }

        if self.metric.uses_num_clusters() && self.num_clusters > rows.len() {
            return Err(Error::insufficient_data(format!(
                "{} clusters requested for {} series",
                self.num_clusters,
                rows.len()
            )));
        }
        Ok(())
    }

    /// Normalize and cluster `rows`.
    pub fn fit(&self, rows: &[Vec<f64>]) -> Result<Clustering> {
        self.validate(rows)?;

        let flat = rows.iter().filter(|r| is_flat(r)).count();
        if flat > 0 {
            warn!(flat, "flat series normalized to zeros");
        }
        let normalized = z_normalize_rows(rows);
        let mut rng = StdRng::seed_from_u64(self.seed);

        let (labels, inertia) = match &self.metric {
            Metric::Dtw {
                n_init,
                max_iter,
                max_iter_barycenter,
                tol,
            } => {
                let metric = Dtw {
                    max_iter_barycenter: *max_iter_barycenter,
                    tol: *tol,
                };
                let fit = KMeans::new(metric, self.num_clusters, *n_init, *max_iter, *tol)
                    .fit(&normalized, &mut rng);
                kmeans_labels(fit)
            }
            Metric::Mae { eps, min_samples } => {
                let labels = Dbscan::new(*eps, *min_samples).fit(&normalized);
                if !labels.is_empty() && labels.iter().all(|&l| l == NOISE) {
                    warn!(eps, min_samples, "every series classified as noise");
                }
                (labels, None)
            }
            Metric::Cosine { n_init, max_iter, tol } => {
                let unit = l2_normalize_rows(&normalized);
                let fit = KMeans::new(Euclidean, self.num_clusters, *n_init, *max_iter, *tol)
                    .fit(&unit, &mut rng);
                kmeans_labels(fit)
            }
            Metric::L2 { n_init, max_iter, tol } => {
                let fit = KMeans::new(Euclidean, self.num_clusters, *n_init, *max_iter, *tol)
                    .fit(&normalized, &mut rng);
                kmeans_labels(fit)
            }
        };

        let clustering = Clustering {
            labels,
            normalized,
            inertia,
        };
        info!(
            metric = self.metric.name(),
            series = rows.len(),
            clusters = clustering.cluster_count(),
            inertia = clustering.inertia,
            "clustered session series"
        );
        Ok(clustering)
    }
}

fn kmeans_labels(fit: KMeansFit) -> (Vec<i32>, Option<f64>) {
    let labels = fit.labels.into_iter().map(|l| l as i32).collect();
    (labels, Some(fit.inertia))
}

/// Cluster session series and return one label per series.
pub fn cluster(rows: &[Vec<f64>], metric: &Metric, num_clusters: usize, seed: u64) -> Result<Vec<i32>> {
    ClusterEngine::new(metric.clone(), num_clusters, seed)
        .fit(rows)
        .map(|c| c.labels)
}

/// Cluster with the metric given by name (`"dtw"`, `"MAE"`, `"cosine"`, `"l2"`).
pub fn cluster_by_name(rows: &[Vec<f64>], metric: &str, num_clusters: usize, seed: u64) -> Result<Vec<i32>> {
    let metric: Metric = metric.parse()?;
    cluster(rows, &metric, num_clusters, seed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    /// Rise, fall and one full sine wave; three noisy copies each.
    fn triplets() -> Vec<Vec<f64>> {
        let mut rng = StdRng::seed_from_u64(1234);
        let shapes: [fn(f64) -> f64; 3] = [
            |t| t,
            |t| 1.0 - t,
            |t| (t * std::f64::consts::PI * 2.0).sin(),
        ];

        let mut rows = Vec::new();
        for shape in shapes.iter() {
            for _ in 0..3 {
                let row: Vec<f64> = (0..60)
                    .map(|i| 100.0 + 5.0 * shape(i as f64 / 59.0) + rng.gen_range(-0.05..0.05))
                    .collect();
                rows.push(row);
            }
        }
        rows
    }

    fn assert_triplets_grouped(labels: &[i32]) {
        for g in 0..3 {
            assert_eq!(labels[g * 3], labels[g * 3 + 1]);
            assert_eq!(labels[g * 3], labels[g * 3 + 2]);
        }
        assert_ne!(labels[0], labels[3]);
        assert_ne!(labels[0], labels[6]);
        assert_ne!(labels[3], labels[6]);
    }

    #[test]
    fn test_dtw_groups_triplets() {
        let labels = cluster(&triplets(), &Metric::dtw(), 3, 0).unwrap();
        assert_eq!(labels.len(), 9);
        assert_triplets_grouped(&labels);
    }

    #[test]
    fn test_l2_groups_triplets() {
        let labels = cluster(&triplets(), &Metric::l2(), 3, 0).unwrap();
        assert_triplets_grouped(&labels);
    }

    #[test]
    fn test_cosine_groups_triplets() {
        let labels = cluster(&triplets(), &Metric::cosine(), 3, 0).unwrap();
        assert_triplets_grouped(&labels);
    }

    #[test]
    fn test_deterministic_for_seed() {
        let rows = triplets();
        for metric in [Metric::l2(), Metric::dtw()] {
            let a = cluster(&rows, &metric, 3, 0).unwrap();
            let b = cluster(&rows, &metric, 3, 0).unwrap();
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_unsupported_metric_name() {
        let err = cluster_by_name(&triplets(), "bogus", 3, 0).unwrap_err();
        assert!(matches!(err, Error::UnsupportedMetric(_)));
        assert!(err.is_config());
    }

    #[test]
    fn test_zero_clusters_rejected() {
        let err = cluster(&triplets(), &Metric::l2(), 0, 0).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_too_many_clusters() {
        let err = cluster(&triplets(), &Metric::dtw(), 10, 0).unwrap_err();
        assert!(matches!(err, Error::InsufficientData(_)));
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let rows = vec![vec![1.0, 2.0, 3.0], vec![1.0, 2.0]];
        let err = cluster(&rows, &Metric::l2(), 1, 0).unwrap_err();
        assert!(matches!(err, Error::Data(_)));
    }

    #[test]
    fn test_nan_rejected() {
        let rows = vec![vec![1.0, f64::NAN, 3.0], vec![1.0, 2.0, 3.0]];
        let err = cluster(&rows, &Metric::l2(), 1, 0).unwrap_err();
        assert!(matches!(err, Error::Data(_)));
    }

    #[test]
    fn test_mae_ignores_num_clusters() {
        // Identical shapes collapse to one dense group under a generous radius.
        let rows: Vec<Vec<f64>> = (0..6)
            .map(|k| (0..60).map(|i| i as f64 + k as f64 * 100.0).collect())
            .collect();

        let labels = cluster(&rows, &Metric::mae(), 0, 0).unwrap();
        assert_eq!(labels, vec![0; 6]);
    }

    #[test]
    fn test_mae_noise_with_default_radius() {
        // Fewer series than min_samples: nothing can be a core point.
        let labels = cluster(&triplets()[..4], &Metric::mae(), 3, 0).unwrap();
        assert!(labels.iter().all(|&l| l == NOISE));
    }

    #[test]
    fn test_flat_series_clusters_without_nan() {
        let mut rows = triplets();
        rows.push(vec![100.0; 60]);

        let clustering = ClusterEngine::new(Metric::l2(), 3, 0).fit(&rows).unwrap();

        assert_eq!(clustering.labels.len(), 10);
        assert!(clustering.normalized[9].iter().all(|v| *v == 0.0));
        assert!(clustering.inertia.unwrap().is_finite());
    }

    #[test]
    fn test_empty_input_for_dbscan() {
        let labels = cluster(&[], &Metric::mae(), 1, 0).unwrap();
        assert!(labels.is_empty());
    }
}
