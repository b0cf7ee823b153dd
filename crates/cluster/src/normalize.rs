//! Series normalization.
//!
//! Z-score scaling per series, and unit-length row scaling for the cosine
//! variant.

use statrs::statistics::Statistics;

/// Standard deviations below this are treated as a flat series.
const FLAT_STD: f64 = 1e-12;

/// Z-score a single series using the population standard deviation.
///
/// A flat series is only mean-centred, so it normalizes to all zeros.
pub fn z_normalize(series: &[f64]) -> Vec<f64> {
    if series.is_empty() {
        return Vec::new();
    }

    let mean = series.iter().mean();
    let std = series.iter().population_std_dev();
    let scale = if std.is_finite() && std > FLAT_STD { std } else { 1.0 };

    series.iter().map(|v| (v - mean) / scale).collect()
}

/// Z-score every row independently.
pub fn z_normalize_rows(rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
    rows.iter().map(|row| z_normalize(row)).collect()
}

/// Whether a series would be treated as flat by [`z_normalize`].
pub fn is_flat(series: &[f64]) -> bool {
    series.len() < 2 || series.iter().population_std_dev() <= FLAT_STD
}

/// Scale each row to unit L2 norm. Zero rows are left unchanged.
pub fn l2_normalize_rows(rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
    rows.iter()
        .map(|row| {
            let norm = row.iter().map(|v| v * v).sum::<f64>().sqrt();
            if norm > 0.0 {
                row.iter().map(|v| v / norm).collect()
            } else {
                row.clone()
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_zero_mean_unit_variance() {
        let series: Vec<f64> = (0..60).map(|i| 100.0 + (i as f64 * 0.3).sin() * 5.0).collect();
        let z = z_normalize(&series);

        let mean = z.iter().mean();
        let std = z.iter().population_std_dev();
        assert_relative_eq!(mean, 0.0, epsilon = 1e-10);
        assert_relative_eq!(std, 1.0, epsilon = 1e-10);
    }

    #[test]
    fn test_known_values() {
        // mean 2, population std sqrt(2/3)
        let z = z_normalize(&[1.0, 2.0, 3.0]);
        let s = (2.0f64 / 3.0).sqrt();
        assert_relative_eq!(z[0], -1.0 / s, epsilon = 1e-12);
        assert_relative_eq!(z[1], 0.0, epsilon = 1e-12);
        assert_relative_eq!(z[2], 1.0 / s, epsilon = 1e-12);
    }

    #[test]
    fn test_flat_series_becomes_zeros() {
        let flat = vec![42.0; 60];
        assert!(is_flat(&flat));

        let z = z_normalize(&flat);
        assert_eq!(z.len(), 60);
        assert!(z.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_scale_invariance() {
        let a: Vec<f64> = (0..60).map(|i| i as f64).collect();
        let b: Vec<f64> = a.iter().map(|v| v * 10.0 + 500.0).collect();

        for (x, y) in z_normalize(&a).iter().zip(z_normalize(&b).iter()) {
            assert_relative_eq!(x, y, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_l2_rows() {
        let rows = l2_normalize_rows(&[vec![3.0, 4.0], vec![0.0, 0.0]]);
        assert_relative_eq!(rows[0][0], 0.6);
        assert_relative_eq!(rows[0][1], 0.8);
        assert_eq!(rows[1], vec![0.0, 0.0]);
    }
}
