//! PyO3 bindings for the session pattern pipeline.
//!
//! Exposes the Rust implementation to Python so plotting can stay in
//! matplotlib:
//! - Session reconstruction
//! - Clustering under dtw / MAE / cosine / l2
//! - Cluster grouping for per-cluster panels
//! - One-call SQLite pipeline

use pyo3::exceptions::{PyIOError, PyRuntimeError, PyValueError};
use pyo3::prelude::*;

use session_builder::{BuildStats as RustBuildStats, SessionBuilder, SessionTable as RustSessionTable};
use session_cluster::{ClusterGroup as RustClusterGroup, ClusterGroups, MEMBER_ALPHA, Y_RANGE};
use session_core::{ClusterConfig, Config, Error, Metric, Trade as RustTrade};
use session_pipeline::{parse_date, parse_timestamp, PipelineRun as RustPipelineRun, SqliteTradeSource};

fn to_py_err(err: Error) -> PyErr {
    match err {
        Error::Io(e) => PyIOError::new_err(e.to_string()),
        Error::Database(msg) => PyRuntimeError::new_err(msg),
        Error::Other(msg) => PyRuntimeError::new_err(msg),
        other => PyValueError::new_err(other.to_string()),
    }
}

fn parse_metric(name: &str) -> PyResult<Metric> {
    name.parse::<Metric>().map_err(to_py_err)
}

// ============================================================================
// Python-exposed Types
// ============================================================================

/// A single executed deal.
#[pyclass]
#[derive(Clone)]
pub struct Trade {
    #[pyo3(get, set)]
    pub deal_id: i64,
    #[pyo3(get, set)]
    pub session_id: i64,
    #[pyo3(get, set)]
    pub platform_id: i64,
    /// `YYYY-MM-DD HH:MM:SS[.f]`, or a bare time of day when `date` is set.
    #[pyo3(get, set)]
    pub time: String,
    #[pyo3(get, set)]
    pub date: Option<String>,
    #[pyo3(get, set)]
    pub lot_size: f64,
    #[pyo3(get, set)]
    pub price: f64,
}

#[pymethods]
impl Trade {
    #[new]
    #[pyo3(signature = (deal_id, session_id, platform_id, time, lot_size, price, date=None))]
    fn new(
        deal_id: i64,
        session_id: i64,
        platform_id: i64,
        time: String,
        lot_size: f64,
        price: f64,
        date: Option<String>,
    ) -> Self {
        Trade {
            deal_id,
            session_id,
            platform_id,
            time,
            date,
            lot_size,
            price,
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "Trade(deal_id={}, session_id={}, time={}, price={}, lot_size={})",
            self.deal_id, self.session_id, self.time, self.price, self.lot_size
        )
    }
}

impl TryFrom<&Trade> for RustTrade {
    type Error = Error;

    fn try_from(t: &Trade) -> Result<Self, Error> {
        let date = t.date.as_deref().map(parse_date).transpose()?;
        Ok(RustTrade {
            deal_id: t.deal_id,
            session_id: t.session_id,
            platform_id: t.platform_id,
            time: parse_timestamp(&t.time, date)?,
            date,
            lot_size: t.lot_size,
            price: t.price,
        })
    }
}

/// Counters from one session build.
#[pyclass]
#[derive(Clone)]
pub struct BuildStats {
    #[pyo3(get)]
    pub raw_trades: usize,
    #[pyo3(get)]
    pub duplicates_dropped: usize,
    #[pyo3(get)]
    pub corrected_trades: usize,
    #[pyo3(get)]
    pub sessions: usize,
    #[pyo3(get)]
    pub blocks: usize,
    #[pyo3(get)]
    pub filled_baseline: usize,
    #[pyo3(get)]
    pub filled_zero: usize,
    #[pyo3(get)]
    pub forward_filled: usize,
}

#[pymethods]
impl BuildStats {
    fn __repr__(&self) -> String {
        format!(
            "BuildStats(raw_trades={}, duplicates_dropped={}, sessions={}, blocks={})",
            self.raw_trades, self.duplicates_dropped, self.sessions, self.blocks
        )
    }
}

impl From<&RustBuildStats> for BuildStats {
    fn from(s: &RustBuildStats) -> Self {
        BuildStats {
            raw_trades: s.raw_trades,
            duplicates_dropped: s.duplicates_dropped,
            corrected_trades: s.corrected_trades,
            sessions: s.sessions,
            blocks: s.blocks,
            filled_baseline: s.filled_baseline,
            filled_zero: s.filled_zero,
            forward_filled: s.forward_filled,
        }
    }
}

/// Rebuilt sessions as a matrix, one row per (session, hour) block.
#[pyclass]
#[derive(Clone)]
pub struct SessionTable {
    /// `(session_id, hour)` per row.
    #[pyo3(get)]
    pub keys: Vec<(i64, u32)>,
    /// 60 weighted prices per row.
    #[pyo3(get)]
    pub rows: Vec<Vec<f64>>,
    #[pyo3(get)]
    pub stats: BuildStats,
}

#[pymethods]
impl SessionTable {
    fn __len__(&self) -> usize {
        self.rows.len()
    }

    fn __repr__(&self) -> String {
        format!("SessionTable(rows={})", self.rows.len())
    }
}

impl From<&RustSessionTable> for SessionTable {
    fn from(table: &RustSessionTable) -> Self {
        let matrix = table.to_matrix();
        SessionTable {
            keys: matrix.keys().iter().map(|k| (k.session_id, k.hour)).collect(),
            rows: matrix.into_rows(),
            stats: table.stats().into(),
        }
    }
}

/// Members of one cluster.
#[pyclass]
#[derive(Clone)]
pub struct ClusterGroup {
    #[pyo3(get)]
    pub label: i32,
    /// Row indices of member series.
    #[pyo3(get)]
    pub members: Vec<usize>,
    /// Mean of the member series.
    #[pyo3(get)]
    pub mean: Vec<f64>,
    #[pyo3(get)]
    pub annotation: String,
}

#[pymethods]
impl ClusterGroup {
    fn __len__(&self) -> usize {
        self.members.len()
    }

    fn __repr__(&self) -> String {
        format!("ClusterGroup(label={}, members={})", self.label, self.members.len())
    }
}

impl From<RustClusterGroup> for ClusterGroup {
    fn from(g: RustClusterGroup) -> Self {
        ClusterGroup {
            annotation: g.annotation(),
            label: g.label,
            members: g.members,
            mean: g.mean,
        }
    }
}

fn groups_to_py(groups: ClusterGroups) -> Vec<ClusterGroup> {
    groups.into_vec().into_iter().map(|g| g.into()).collect()
}

/// Result of a full pipeline run.
#[pyclass]
pub struct PipelineRun {
    #[pyo3(get)]
    pub table: SessionTable,
    #[pyo3(get)]
    pub labels: Vec<i32>,
    /// Z-normalized series, aligned with `table.rows`.
    #[pyo3(get)]
    pub normalized: Vec<Vec<f64>>,
    #[pyo3(get)]
    pub groups: Vec<ClusterGroup>,
}

#[pymethods]
impl PipelineRun {
    fn __repr__(&self) -> String {
        format!(
            "PipelineRun(rows={}, clusters={})",
            self.labels.len(),
            self.groups.len()
        )
    }
}

impl From<RustPipelineRun> for PipelineRun {
    fn from(run: RustPipelineRun) -> Self {
        PipelineRun {
            table: (&run.table).into(),
            labels: run.clustering.labels,
            normalized: run.clustering.normalized,
            groups: groups_to_py(run.groups),
        }
    }
}

// ============================================================================
// Python-exposed Engine Classes
// ============================================================================

/// Session builder with the default boundary corrections.
#[pyclass(name = "SessionBuilder")]
pub struct PySessionBuilder {
    inner: SessionBuilder,
}

#[pymethods]
impl PySessionBuilder {
    #[new]
    fn new() -> Self {
        PySessionBuilder {
            inner: SessionBuilder::default(),
        }
    }

    /// Build sessions from a list of trades.
    fn build(&self, trades: Vec<Trade>) -> PyResult<SessionTable> {
        let trades = trades
            .iter()
            .map(RustTrade::try_from)
            .collect::<Result<Vec<_>, _>>()
            .map_err(to_py_err)?;
        Ok((&self.inner.build(trades)).into())
    }

    /// Number of configured correction rules.
    fn correction_count(&self) -> usize {
        self.inner.corrections().rules.len()
    }
}

// ============================================================================
// Functions
// ============================================================================

/// Cluster equal-length series; returns one label per row (`-1` is noise).
#[pyfunction]
#[pyo3(signature = (rows, metric, num_clusters, seed=0))]
fn cluster(rows: Vec<Vec<f64>>, metric: &str, num_clusters: usize, seed: u64) -> PyResult<Vec<i32>> {
    let metric = parse_metric(metric)?;
    session_cluster::cluster(&rows, &metric, num_clusters, seed).map_err(to_py_err)
}

/// Z-normalize every row.
#[pyfunction]
fn normalize(rows: Vec<Vec<f64>>) -> Vec<Vec<f64>> {
    session_cluster::z_normalize_rows(&rows)
}

/// Group rows by label, ordered by label.
#[pyfunction]
fn cluster_groups(labels: Vec<i32>, rows: Vec<Vec<f64>>) -> Vec<ClusterGroup> {
    groups_to_py(ClusterGroups::new(&labels, &rows))
}

/// Load trades from SQLite, rebuild sessions and cluster them.
#[pyfunction]
#[pyo3(signature = (db_path, metric="dtw", num_clusters=5, seed=0, trading_type="monthly"))]
fn run_pipeline(
    db_path: &str,
    metric: &str,
    num_clusters: usize,
    seed: u64,
    trading_type: &str,
) -> PyResult<PipelineRun> {
    let config = Config {
        cluster: ClusterConfig {
            metric: parse_metric(metric)?,
            num_clusters,
            seed,
        },
        ..Config::default()
    };
    let source = SqliteTradeSource::open(db_path, trading_type).map_err(to_py_err)?;
    let run = session_pipeline::run_pipeline(&source, &config).map_err(to_py_err)?;
    Ok(run.into())
}

// ============================================================================
// Module Definition
// ============================================================================

/// Session Patterns - trading session reconstruction and clustering.
#[pymodule]
fn session_patterns(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // Types
    m.add_class::<Trade>()?;
    m.add_class::<BuildStats>()?;
    m.add_class::<SessionTable>()?;
    m.add_class::<ClusterGroup>()?;
    m.add_class::<PipelineRun>()?;

    // Engine classes
    m.add_class::<PySessionBuilder>()?;

    // Functions
    m.add_function(wrap_pyfunction!(cluster, m)?)?;
    m.add_function(wrap_pyfunction!(normalize, m)?)?;
    m.add_function(wrap_pyfunction!(cluster_groups, m)?)?;
    m.add_function(wrap_pyfunction!(run_pipeline, m)?)?;

    // Plot constants
    m.add("Y_RANGE", Y_RANGE)?;
    m.add("MEMBER_ALPHA", MEMBER_ALPHA)?;

    Ok(())
}
