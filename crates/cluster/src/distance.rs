//! Distance functions between equal-rate series.

/// Sum of squared differences.
#[inline]
pub fn squared_euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Euclidean (L2) distance.
#[inline]
pub fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    squared_euclidean(a, b).sqrt()
}

/// Manhattan (L1) distance.
#[inline]
pub fn manhattan(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).abs()).sum()
}

/// Accumulated squared-cost matrix of dynamic time warping, row-major
/// `(a.len() + 1) x (b.len() + 1)` with an infinite border.
fn dtw_cost_matrix(a: &[f64], b: &[f64]) -> Vec<f64> {
    let (n, m) = (a.len(), b.len());
    let width = m + 1;
    let mut cost = vec![f64::INFINITY; (n + 1) * width];
    cost[0] = 0.0;

    for i in 1..=n {
        for j in 1..=m {
            let d = (a[i - 1] - b[j - 1]).powi(2);
            let best = cost[(i - 1) * width + (j - 1)]
                .min(cost[(i - 1) * width + j])
                .min(cost[i * width + (j - 1)]);
            cost[i * width + j] = d + best;
        }
    }
    cost
}

/// Dynamic time warping distance: square root of the cheapest accumulated
/// squared cost over all monotone alignments.
pub fn dtw(a: &[f64], b: &[f64]) -> f64 {
    if a.is_empty() || b.is_empty() {
        return if a.len() == b.len() { 0.0 } else { f64::INFINITY };
    }

    // Two rolling rows are enough when the path is not needed.
    let m = b.len();
    let mut prev = vec![f64::INFINITY; m + 1];
    let mut curr = vec![f64::INFINITY; m + 1];
    prev[0] = 0.0;

    for x in a {
        curr[0] = f64::INFINITY;
        for j in 1..=m {
            let d = (x - b[j - 1]).powi(2);
            curr[j] = d + prev[j - 1].min(prev[j]).min(curr[j - 1]);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[m].sqrt()
}

/// Optimal DTW alignment as `(index_in_a, index_in_b)` pairs, from (0, 0)
/// to the last elements, plus the distance.
pub fn dtw_path(a: &[f64], b: &[f64]) -> (Vec<(usize, usize)>, f64) {
    if a.is_empty() || b.is_empty() {
        return (Vec::new(), dtw(a, b));
    }

    let (n, m) = (a.len(), b.len());
    let width = m + 1;
    let cost = dtw_cost_matrix(a, b);

    let mut path = Vec::with_capacity(n + m);
    let (mut i, mut j) = (n, m);
    path.push((i - 1, j - 1));
    while i > 1 || j > 1 {
        // Diagonal first, then vertical, then horizontal on ties.
        let candidates = [
            (i - 1, j - 1, cost[(i - 1) * width + (j - 1)]),
            (i - 1, j, cost[(i - 1) * width + j]),
            (i, j - 1, cost[i * width + (j - 1)]),
        ];
        let mut next = candidates[0];
        for c in &candidates[1..] {
            if c.2 < next.2 {
                next = *c;
            }
        }
        i = next.0;
        j = next.1;
        path.push((i - 1, j - 1));
    }
    path.reverse();

    (path, cost[n * width + m].sqrt())
}
