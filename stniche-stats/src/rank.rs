//! Ranking of numeric data for rank-based tests.
//!
//! [`average_ranks`] assigns 1-based ranks where tied values share the mean
//! of the ranks they span, and records the size of every tie group so that
//! callers can apply a tie correction to rank-statistic variances.

/// Average ranks plus the tie structure of the ranked data.
#[derive(Debug, Clone, PartialEq)]
pub struct Ranking {
    /// Rank of each input element, in input order.
    pub ranks: Vec<f64>,
    /// Sizes of tie groups with more than one member, in ascending value order.
    pub ties: Vec<usize>,
}

impl Ranking {
    /// Whether any two input values were equal.
    pub fn has_ties(&self) -> bool {
        !self.ties.is_empty()
    }

    /// `Σ (t³ - t)` over tie groups, the term used by tie-corrected variances.
    pub fn tie_term(&self) -> f64 {
        self.ties
            .iter()
            .map(|&t| {
                let t = t as f64;
                t * t * t - t
            })
            .sum()
    }
}

/// Rank `data` with ties sharing the average of their would-be ranks.
///
/// Empty input produces an empty ranking. Values are ordered with
/// [`f64::total_cmp`], so NaNs sort last instead of poisoning the order.
pub fn average_ranks(data: &[f64]) -> Ranking {
    let n = data.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| data[a].total_cmp(&data[b]));

    let mut ranks = vec![0.0; n];
    let mut ties = Vec::new();

    let mut start = 0;
    while start < n {
        let mut end = start + 1;
        while end < n && data[order[end]].total_cmp(&data[order[start]]).is_eq() {
            end += 1;
        }
        // 1-based ranks start+1 ..= end share their midpoint.
        let shared = (start + 1 + end) as f64 / 2.0;
        for &idx in &order[start..end] {
            ranks[idx] = shared;
        }
        if end - start > 1 {
            ties.push(end - start);
        }
        start = end;
    }

    Ranking { ranks, ties }
}

// ── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_ties() {
        let r = average_ranks(&[3.0, 1.0, 2.0]);
        assert_eq!(r.ranks, vec![3.0, 1.0, 2.0]);
        assert!(!r.has_ties());
        assert_eq!(r.tie_term(), 0.0);
    }

    #[test]
    fn ties_share_midpoint() {
        // sorted: 1(1), 2(2), 2(3), 3(4) → ties at 2 get 2.5
        let r = average_ranks(&[3.0, 1.0, 2.0, 2.0]);
        assert_eq!(r.ranks, vec![4.0, 1.0, 2.5, 2.5]);
        assert_eq!(r.ties, vec![2]);
        assert_eq!(r.tie_term(), 6.0);
    }

    #[test]
    fn all_equal() {
        let r = average_ranks(&[0.0, 0.0, 0.0, 0.0]);
        assert_eq!(r.ranks, vec![2.5; 4]);
        assert_eq!(r.ties, vec![4]);
    }

    #[test]
    fn empty() {
        let r = average_ranks(&[]);
        assert!(r.ranks.is_empty());
        assert!(!r.has_ties());
    }

    #[test]
    fn rank_sum_is_triangular() {
        let data = [0.5, 0.0, 0.0, 2.0, 0.5, 7.0, 0.0];
        let r = average_ranks(&data);
        let n = data.len() as f64;
        let total: f64 = r.ranks.iter().sum();
        assert!((total - n * (n + 1.0) / 2.0).abs() < 1e-12);
    }
}
