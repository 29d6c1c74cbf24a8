//! Hypothesis testing.
//!
//! Provides the non-parametric Mann-Whitney U test ([`mann_whitney_u`],
//! [`mann_whitney_u_with`]) with exact small-sample p-values, a tie- and
//! continuity-corrected normal approximation, and one- or two-sided
//! alternatives.

use stniche_core::{NicheError, Result, Scored, Summarizable};

use crate::distribution::Normal;
use crate::rank::average_ranks;

/// Result of a hypothesis test.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TestResult {
    /// The test statistic (U of the first sample).
    pub statistic: f64,
    /// p-value under the requested alternative.
    pub p_value: f64,
    /// Alternative hypothesis the p-value refers to.
    pub alternative: Alternative,
    /// How the p-value was obtained.
    pub method: MwuMethod,
}

impl Scored for TestResult {
    fn score(&self) -> f64 {
        self.p_value
    }
}

impl Summarizable for TestResult {
    fn summary(&self) -> String {
        format!(
            "Mann-Whitney U test ({:?}, {:?}): statistic={:.4}, p={:.6}",
            self.method, self.alternative, self.statistic, self.p_value,
        )
    }
}

/// Alternative hypothesis, stated for the first sample relative to the second.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Alternative {
    /// The distributions differ.
    TwoSided,
    /// The first sample is stochastically greater.
    Greater,
    /// The first sample is stochastically smaller.
    Less,
}

/// p-value computation used for a Mann-Whitney test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MwuMethod {
    /// Exact null distribution of U (no ties, one sample of at most 8).
    Exact,
    /// Normal approximation with tie and continuity correction.
    Asymptotic,
    /// Every observation is identical; the test carries no information and p = 1.
    Degenerate,
}

/// Largest sample size for which the exact null distribution is used.
const EXACT_MAX_N: usize = 8;

// ── Mann-Whitney U test ────────────────────────────────────────────────────

/// Two-sided Mann-Whitney U test (Wilcoxon rank-sum test).
///
/// See [`mann_whitney_u_with`].
pub fn mann_whitney_u(x: &[f64], y: &[f64]) -> Result<TestResult> {
    mann_whitney_u_with(x, y, Alternative::TwoSided)
}

/// Mann-Whitney U test of `x` against `y` under `alternative`.
///
/// Non-parametric test for whether two independent samples come from the
/// same distribution. Without ties, and with at least one sample of at most
/// 8 observations, the exact null distribution of U is used; otherwise a
/// normal approximation with tie-corrected variance and a 0.5 continuity
/// correction.
///
/// If every pooled observation is identical the statistic has no variance;
/// the result is reported as [`MwuMethod::Degenerate`] with `p = 1`.
///
/// Each group needs at least 1 observation, and values must not be NaN.
pub fn mann_whitney_u_with(x: &[f64], y: &[f64], alternative: Alternative) -> Result<TestResult> {
    if x.is_empty() || y.is_empty() {
        return Err(NicheError::InvalidInput(
            "mann_whitney_u: each group must be non-empty".into(),
        ));
    }
    if x.iter().chain(y).any(|v| v.is_nan()) {
        return Err(NicheError::InvalidInput(
            "mann_whitney_u: observations must not be NaN".into(),
        ));
    }

    let nx = x.len();
    let ny = y.len();
    let n = nx + ny;

    let mut combined: Vec<f64> = Vec::with_capacity(n);
    combined.extend_from_slice(x);
    combined.extend_from_slice(y);
    let ranking = average_ranks(&combined);

    let r1: f64 = ranking.ranks[..nx].iter().sum();
    let u1 = r1 - (nx * (nx + 1)) as f64 / 2.0;

    if ranking.ties.first() == Some(&n) {
        return Ok(TestResult {
            statistic: u1,
            p_value: 1.0,
            alternative,
            method: MwuMethod::Degenerate,
        });
    }

    let (p, method) = if !ranking.has_ties() && nx.min(ny) <= EXACT_MAX_N {
        (exact_p(u1, nx, ny, alternative), MwuMethod::Exact)
    } else {
        let mu = (nx * ny) as f64 / 2.0;
        let n_f = n as f64;
        let var = (nx * ny) as f64 / 12.0
            * ((n_f + 1.0) - ranking.tie_term() / (n_f * (n_f - 1.0)));
        let sigma = var.max(0.0).sqrt();
        (asymptotic_p(u1, nx, ny, mu, sigma, alternative), MwuMethod::Asymptotic)
    };

    Ok(TestResult {
        statistic: u1,
        p_value: p.clamp(0.0, 1.0),
        alternative,
        method,
    })
}

fn asymptotic_p(u1: f64, nx: usize, ny: usize, mu: f64, sigma: f64, alt: Alternative) -> f64 {
    if sigma <= 0.0 {
        return 1.0;
    }
    let normal = Normal::standard();
    match alt {
        Alternative::Greater => normal.sf((u1 - mu - 0.5) / sigma),
        Alternative::Less => normal.cdf((u1 - mu + 0.5) / sigma),
        Alternative::TwoSided => {
            let u = u1.max((nx * ny) as f64 - u1);
            (2.0 * normal.sf((u - mu - 0.5) / sigma)).min(1.0)
        }
    }
}

fn exact_p(u1: f64, nx: usize, ny: usize, alt: Alternative) -> f64 {
    let pmf = exact_u_pmf(nx, ny);
    // Without ties U is integral.
    let k = u1.round() as usize;
    let upper = |k: usize| pmf[k.min(pmf.len())..].iter().sum::<f64>();
    let lower = |k: usize| pmf[..=k.min(pmf.len() - 1)].iter().sum::<f64>();
    match alt {
        Alternative::Greater => upper(k),
        Alternative::Less => lower(k),
        Alternative::TwoSided => {
            let u_max = k.max(nx * ny - k);
            (2.0 * upper(u_max)).min(1.0)
        }
    }
}

/// Null probability mass of U for sample sizes `m` and `n`, indexed by U.
///
/// Built from the recurrence on which sample holds the largest observation:
/// `c(i, j, k) = c(i - 1, j, k - j) + c(i, j - 1, k)`.
fn exact_u_pmf(m: usize, n: usize) -> Vec<f64> {
    // prev[j] holds the count vector for (i - 1, j).
    let mut prev: Vec<Vec<f64>> = vec![vec![1.0]; n + 1];
    for i in 1..=m {
        let mut cur: Vec<Vec<f64>> = Vec::with_capacity(n + 1);
        cur.push(vec![1.0]);
        for j in 1..=n {
            let mut counts = vec![0.0; i * j + 1];
            for (k, &c) in prev[j].iter().enumerate() {
                counts[k + j] += c;
            }
            for (k, &c) in cur[j - 1].iter().enumerate() {
                counts[k] += c;
            }
            cur.push(counts);
        }
        prev = cur;
    }
    let counts = prev.swap_remove(n);
    let total: f64 = counts.iter().sum();
    counts.into_iter().map(|c| c / total).collect()
}

// ── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-9;

    #[test]
    fn exact_pmf_small() {
        // m = n = 2: arrangements of xxyy give U = 0,1,2,2,3,4.
        let pmf = exact_u_pmf(2, 2);
        let expected = [1.0, 1.0, 2.0, 1.0, 1.0].map(|c| c / 6.0);
        assert_eq!(pmf.len(), 5);
        for (a, b) in pmf.iter().zip(expected) {
            assert!((a - b).abs() < TOL);
        }
    }

    #[test]
    fn exact_pmf_sums_to_one() {
        let pmf = exact_u_pmf(5, 11);
        assert_eq!(pmf.len(), 56);
        assert!((pmf.iter().sum::<f64>() - 1.0).abs() < TOL);
        // Symmetric about mn/2.
        for k in 0..pmf.len() {
            assert!((pmf[k] - pmf[pmf.len() - 1 - k]).abs() < TOL);
        }
    }

    #[test]
    fn exact_complete_separation() {
        let x = [10.0, 11.0, 12.0, 13.0];
        let y = [1.0, 2.0, 3.0, 4.0];
        let greater = mann_whitney_u_with(&x, &y, Alternative::Greater).unwrap();
        assert_eq!(greater.method, MwuMethod::Exact);
        assert!((greater.statistic - 16.0).abs() < TOL);
        // 1 / C(8, 4)
        assert!((greater.p_value - 1.0 / 70.0).abs() < TOL);

        let two = mann_whitney_u(&x, &y).unwrap();
        assert!((two.p_value - 2.0 / 70.0).abs() < TOL);

        let less = mann_whitney_u_with(&x, &y, Alternative::Less).unwrap();
        assert!((less.p_value - 1.0).abs() < TOL);
    }

    #[test]
    fn single_observations_are_not_significant() {
        let r = mann_whitney_u(&[5.0], &[1.0]).unwrap();
        assert_eq!(r.method, MwuMethod::Exact);
        assert!((r.p_value - 1.0).abs() < TOL);
    }

    #[test]
    fn asymptotic_with_ties() {
        let x = [0.0, 0.0, 1.0, 2.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0];
        let y = [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0];
        let r = mann_whitney_u_with(&x, &y, Alternative::Greater).unwrap();
        assert_eq!(r.method, MwuMethod::Asymptotic);
        assert!(r.p_value < 0.01, "p={}", r.p_value);
        let two = mann_whitney_u(&x, &y).unwrap();
        assert!(two.p_value > r.p_value);
    }

    #[test]
    fn large_samples_same_distribution() {
        let x: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let y: Vec<f64> = (0..20).map(|i| i as f64 + 0.5).collect();
        let r = mann_whitney_u(&x, &y).unwrap();
        assert_eq!(r.method, MwuMethod::Asymptotic);
        assert!(r.p_value > 0.3, "p={}", r.p_value);
    }

    #[test]
    fn degenerate_constant_samples() {
        let r = mann_whitney_u_with(&[0.0, 0.0, 0.0], &[0.0, 0.0], Alternative::Greater).unwrap();
        assert_eq!(r.method, MwuMethod::Degenerate);
        assert_eq!(r.p_value, 1.0);
    }

    #[test]
    fn invalid_inputs() {
        assert!(mann_whitney_u(&[], &[1.0]).is_err());
        assert!(mann_whitney_u(&[1.0], &[]).is_err());
        assert!(mann_whitney_u(&[f64::NAN], &[1.0]).is_err());
    }

    #[test]
    fn result_traits() {
        let r = mann_whitney_u(&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]).unwrap();
        assert!((r.score() - r.p_value).abs() < 1e-15);
        let s = r.summary();
        assert!(s.contains("Mann-Whitney"));
        assert!(s.contains("p="));
    }
}
