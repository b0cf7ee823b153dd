//! One-call pipeline run: load, build, cluster, group.

use session_builder::{SessionBuilder, SessionTable};
use session_cluster::{ClusterEngine, ClusterGroups, Clustering};
use session_core::{Config, Result, SessionMatrix};
use tracing::info;

use crate::source::{SqliteTradeSource, TradeSource};

/// Everything produced by one run.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    /// Reconstructed minute grid with build statistics.
    pub table: SessionTable,
    /// Price matrix, one row per session block.
    pub matrix: SessionMatrix,
    /// Labels and normalized series.
    pub clustering: Clustering,
    /// Normalized series grouped by label.
    pub groups: ClusterGroups,
}

impl PipelineRun {
    /// One label per matrix row.
    pub fn labels(&self) -> &[i32] {
        &self.clustering.labels
    }
}

/// Run the pipeline over trades from `source`.
pub fn run_pipeline<S: TradeSource + ?Sized>(source: &S, config: &Config) -> Result<PipelineRun> {
    config.validate()?;

    let builder = SessionBuilder::from_config(&config.builder)?;
    let engine = ClusterEngine::from_config(&config.cluster);

    let trades = source.load_trades()?;
    let table = builder.build(trades);
    let matrix = table.to_matrix();

    let clustering = engine.fit(matrix.rows())?;
    let groups = ClusterGroups::new(&clustering.labels, &clustering.normalized);

    info!(
        sessions = table.stats().sessions,
        blocks = matrix.len(),
        clusters = groups.len(),
        "pipeline finished"
    );

    Ok(PipelineRun {
        table,
        matrix,
        clustering,
        groups,
    })
}

/// Run the pipeline against the SQLite database named in `config.source`.
pub fn run_from_config(config: &Config) -> Result<PipelineRun> {
    let source = SqliteTradeSource::open(&config.source.db_path, config.source.trading_type.clone())?;
    run_pipeline(&source, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::tests::schema;
    use chrono::NaiveDate;
    use rusqlite::{params, Connection};
    use session_core::{ClusterConfig, Error, Metric, Trade, MINUTES_PER_SESSION};

    /// Six sessions at 11:00. Odd sessions trend up, even sessions trend down.
    fn trades() -> Vec<Trade> {
        let day = NaiveDate::from_ymd_opt(2023, 5, 2).unwrap();
        let mut out = Vec::new();
        let mut deal_id = 0;
        for session_id in 1..=6i64 {
            for minute in (0..60).step_by(5) {
                deal_id += 1;
                let drift = if session_id % 2 == 1 { minute as f64 } else { -(minute as f64) };
                out.push(Trade {
                    deal_id,
                    session_id,
                    platform_id: 2,
                    time: day.and_hms_opt(11, minute, 0).unwrap(),
                    date: Some(day),
                    lot_size: 1.0,
                    price: 100.0 + drift + session_id as f64 * 0.01,
                });
            }
        }
        out
    }

    fn config(metric: Metric, num_clusters: usize) -> Config {
        Config {
            cluster: ClusterConfig {
                metric,
                num_clusters,
                seed: 0,
            },
            ..Config::default()
        }
    }

    #[test]
    fn test_in_memory_run() {
        let run = run_pipeline(&trades(), &config(Metric::l2(), 2)).unwrap();

        assert_eq!(run.matrix.len(), 6);
        assert!(run.matrix.rows().iter().all(|r| r.len() == MINUTES_PER_SESSION));
        assert_eq!(run.labels().len(), 6);

        let up = run.labels()[0];
        let down = run.labels()[1];
        assert_ne!(up, down);
        for (i, &label) in run.labels().iter().enumerate() {
            assert_eq!(label, if i % 2 == 0 { up } else { down });
        }
        assert_eq!(run.groups.len(), 2);
        assert_eq!(run.table.stats().sessions, 6);
    }

    #[test]
    fn test_dtw_run_is_deterministic() {
        let cfg = config(Metric::dtw(), 2);
        let a = run_pipeline(&trades(), &cfg).unwrap();
        let b = run_pipeline(&trades(), &cfg).unwrap();
        assert_eq!(a.labels(), b.labels());
    }

    #[test]
    fn test_empty_source() {
        let err = run_pipeline(&Vec::<Trade>::new(), &config(Metric::l2(), 2)).unwrap_err();
        assert!(matches!(err, Error::InsufficientData(_)));
    }

    #[test]
    fn test_invalid_config_fails_before_loading() {
        let err = run_pipeline(&trades(), &config(Metric::l2(), 0)).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_sqlite_run() {
        let conn = Connection::open_in_memory().unwrap();
        schema(&conn);
        for session_id in 1..=6i64 {
            conn.execute(
                "INSERT INTO Trading_session VALUES (?1, 'monthly', 2, '2023-05-02')",
                params![session_id],
            )
            .unwrap();
        }
        for (i, t) in trades().iter().enumerate() {
            conn.execute(
                "INSERT INTO Chart_data VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    i as i64,
                    t.session_id,
                    t.deal_id,
                    t.lot_size,
                    t.price,
                    t.time.format("%H:%M:%S").to_string()
                ],
            )
            .unwrap();
        }

        let source = SqliteTradeSource::from_connection(conn, "monthly");
        let from_db = run_pipeline(&source, &config(Metric::l2(), 2)).unwrap();
        let in_memory = run_pipeline(&trades(), &config(Metric::l2(), 2)).unwrap();

        assert_eq!(from_db.matrix.rows(), in_memory.matrix.rows());
        assert_eq!(from_db.labels(), in_memory.labels());
    }
}
