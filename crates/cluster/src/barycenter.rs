//! Cluster centres.
//!
//! Euclidean barycenters are the pointwise mean. DTW barycenters use DTW
//! barycenter averaging (DBA): align every member to the current centre, then
//! replace each centre point with the mean of the member points aligned to it.

use crate::distance::{dtw, dtw_path};

/// Pointwise mean of equal-length series.
pub fn euclidean_barycenter(members: &[&[f64]]) -> Vec<f64> {
    let Some(first) = members.first() else {
        return Vec::new();
    };

    let mut sums = vec![0.0; first.len()];
    for member in members {
        for (s, v) in sums.iter_mut().zip(member.iter()) {
            *s += v;
        }
    }
    let n = members.len() as f64;
    sums.into_iter().map(|s| s / n).collect()
}

/// Sum of squared DTW distances from members to a centre.
fn dtw_inertia(members: &[&[f64]], centre: &[f64]) -> f64 {
    members.iter().map(|m| dtw(centre, m).powi(2)).sum()
}

/// DTW barycenter averaging, refining `init` for at most `max_iter` rounds.
///
/// Stops early once a round no longer lowers the summed squared DTW cost.
pub fn dba(members: &[&[f64]], init: &[f64], max_iter: usize, tol: f64) -> Vec<f64> {
    if members.is_empty() {
        return init.to_vec();
    }

    let len = init.len();
    let mut centre = init.to_vec();
    let mut cost = dtw_inertia(members, &centre);

    for _ in 0..max_iter {
        let mut sums = vec![0.0; len];
        let mut counts = vec![0usize; len];

        for member in members {
            let (path, _) = dtw_path(&centre, member);
            for (i, j) in path {
                sums[i] += member[j];
                counts[i] += 1;
            }
        }

        let next: Vec<f64> = sums
            .iter()
            .zip(&counts)
            .zip(&centre)
            .map(|((s, &c), &old)| if c > 0 { s / c as f64 } else { old })
            .collect();

        let next_cost = dtw_inertia(members, &next);
        if next_cost > cost {
            break;
        }
        let improvement = cost - next_cost;
        centre = next;
        cost = next_cost;
        if improvement < tol {
            break;
        }
    }

    centre
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_euclidean_mean() {
        let a = [1.0, 2.0, 3.0];
        let b = [3.0, 2.0, 1.0];
        let members: [&[f64]; 2] = [&a, &b];
        let centre = euclidean_barycenter(&members);
        assert_eq!(centre, vec![2.0, 2.0, 2.0]);
    }

    #[test]
    fn test_euclidean_empty() {
        assert!(euclidean_barycenter(&[]).is_empty());
    }

    #[test]
    fn test_dba_of_identical_members() {
        let a = [0.0, 1.0, 2.0, 1.0, 0.0];
        let members: [&[f64]; 3] = [&a, &a, &a];
        let centre = dba(&members, &a, 10, 1e-9);
        for (c, v) in centre.iter().zip(a.iter()) {
            assert_relative_eq!(c, v);
        }
    }

    #[test]
    fn test_dba_not_worse_than_mean() {
        // Two shifted bumps: refinement starts from the arithmetic mean.
        let a = [0.0, 0.0, 1.0, 3.0, 1.0, 0.0, 0.0, 0.0];
        let b = [0.0, 0.0, 0.0, 1.0, 3.0, 1.0, 0.0, 0.0];
        let members: [&[f64]; 2] = [&a, &b];

        let mean = euclidean_barycenter(&members);
        let centre = dba(&members, &mean, 10, 1e-9);

        assert!(dtw_inertia(&members, &centre) <= dtw_inertia(&members, &mean) + 1e-12);
    }

    #[test]
    fn test_dba_keeps_length() {
        let a = [1.0, 2.0, 3.0, 4.0];
        let b = [2.0, 3.0, 4.0, 5.0];
        let members: [&[f64]; 2] = [&a, &b];
        let centre = dba(&members, &a, 5, 1e-9);
        assert_eq!(centre.len(), 4);
    }
}
