//! Clustering of session price series.
//!
//! This crate turns a sessions x 60 matrix into one label per session:
//! - Z-score normalization (flat series become zeros)
//! - k-means with DTW barycenter averaging, Euclidean or cosine geometry
//! - DBSCAN under L1 distance, with `-1` marking noise
//! - Grouping of series by label for plotting

pub mod barycenter;
pub mod dbscan;
pub mod distance;
pub mod engine;
pub mod groups;
pub mod kmeans;
pub mod normalize;

pub use dbscan::{Dbscan, NOISE};
pub use engine::{cluster, cluster_by_name, ClusterEngine, Clustering};
pub use groups::{ClusterGroup, ClusterGroups, MEMBER_ALPHA, Y_RANGE};
pub use kmeans::{CentroidMetric, KMeans, KMeansFit};
pub use normalize::{z_normalize, z_normalize_rows};
