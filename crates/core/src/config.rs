//! Configuration structures for the session pattern pipeline.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};
use crate::types::{CorrectionTable, Metric};

/// Main configuration for a pipeline run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Trade source configuration.
    #[serde(default)]
    pub source: SourceConfig,
    /// Session builder configuration.
    #[serde(default)]
    pub builder: BuilderConfig,
    /// Clustering configuration.
    #[serde(default)]
    pub cluster: ClusterConfig,
}

impl Config {
    /// Parse a configuration from JSON text.
    ///
    /// An unknown `cluster.metric.kind` is reported as
    /// [`Error::UnsupportedMetric`] rather than a JSON error.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        if let Some(kind) = value.pointer("/cluster/metric/kind").and_then(|k| k.as_str()) {
            kind.parse::<Metric>()?;
        }
        let config: Config = serde_json::from_value(value)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Check parameter ranges.
    pub fn validate(&self) -> Result<()> {
        self.builder.corrections.validate()?;
        self.cluster.validate()
    }
}

/// Trade source configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Path to the SQLite trade database.
    pub db_path: String,
    /// Trading type of the sessions to load.
    pub trading_type: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            db_path: "data/trade_info.sqlite3".to_string(),
            trading_type: "monthly".to_string(),
        }
    }
}

/// Session builder configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuilderConfig {
    /// Boundary corrections, applied in order.
    #[serde(default)]
    pub corrections: CorrectionTable,
}

/// Clustering configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Distance metric and its parameters.
    pub metric: Metric,
    /// Number of clusters (ignored by density-based metrics).
    pub num_clusters: usize,
    /// Seed for every stochastic step.
    pub seed: u64,
}

impl ClusterConfig {
    /// Check parameter ranges.
    pub fn validate(&self) -> Result<()> {
        if self.metric.uses_num_clusters() && self.num_clusters == 0 {
            return Err(Error::config("num_clusters must be at least 1"));
        }
        match &self.metric {
            Metric::Dtw { n_init, max_iter, .. }
            | Metric::Cosine { n_init, max_iter, .. }
            | Metric::L2 { n_init, max_iter, .. } => {
                if *n_init == 0 || *max_iter == 0 {
                    return Err(Error::config("n_init and max_iter must be at least 1"));
                }
            }
            Metric::Mae { eps, min_samples } => {
                if eps.is_nan() || *eps <= 0.0 || *min_samples == 0 {
                    return Err(Error::config("eps must be positive and min_samples at least 1"));
                }
            }
        }
        Ok(())
    }
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            metric: Metric::default(),
            num_clusters: 5,
            seed: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.source.trading_type, "monthly");
        assert_eq!(config.cluster.num_clusters, 5);
        assert_eq!(config.cluster.seed, 0);
        assert_eq!(config.cluster.metric.name(), "dtw");
        assert_eq!(config.builder.corrections.rules.len(), 3);
    }

    #[test]
    fn test_partial_json() {
        let config = Config::from_json_str(
            r#"{"cluster": {"metric": {"kind": "l2", "n_init": 1, "max_iter": 50, "tol": 1e-6},
                            "num_clusters": 3, "seed": 7}}"#,
        )
        .unwrap();
        assert_eq!(config.cluster.num_clusters, 3);
        assert_eq!(config.cluster.seed, 7);
        assert_eq!(config.source.db_path, "data/trade_info.sqlite3");
        assert_eq!(config.builder.corrections.rules.len(), 3);
    }

    #[test]
    fn test_zero_clusters_rejected() {
        let mut config = ClusterConfig::default();
        config.num_clusters = 0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        config.metric = Metric::mae();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_metric_kind_rejected() {
        let err = Config::from_json_str(r#"{"cluster": {"metric": {"kind": "bogus"}, "num_clusters": 3, "seed": 0}}"#)
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedMetric(ref m) if m == "bogus"));
        assert!(err.is_config());
    }

    #[test]
    fn test_metric_kind_only() {
        let config = Config::from_json_str(r#"{"cluster": {"metric": {"kind": "dtw"}, "num_clusters": 4, "seed": 1}}"#)
            .unwrap();
        assert_eq!(config.cluster.metric, Metric::dtw());
        assert_eq!(config.cluster.num_clusters, 4);
    }

    #[test]
    fn test_malformed_json_is_json_error() {
        assert!(matches!(Config::from_json_str("{"), Err(Error::Json(_))));
    }
}
