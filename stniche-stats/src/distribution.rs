//! Normal distribution tail probabilities used for asymptotic p-values.

use core::f64::consts::SQRT_2;

// ── Numerical helpers ──────────────────────────────────────────────────────

/// Complementary error function via Abramowitz & Stegun 7.1.26.
///
/// Evaluated directly on the tail so small upper-tail probabilities keep
/// their relative precision instead of cancelling against 1.
pub fn erfc(x: f64) -> f64 {
    if x < 0.0 {
        return 2.0 - erfc(-x);
    }
    let t = 1.0 / (1.0 + 0.3275911 * x);
    let poly = t
        * (0.254829592
            + t * (-0.284496736 + t * (1.421413741 + t * (-1.453152027 + t * 1.061405429))));
    poly * (-x * x).exp()
}

// ── Normal distribution ────────────────────────────────────────────────────

/// Normal (Gaussian) distribution with parameters μ and σ.
#[derive(Debug, Clone, Copy)]
pub struct Normal {
    mu: f64,
    sigma: f64,
}

impl Normal {
    /// Standard normal distribution N(0, 1).
    pub fn standard() -> Self {
        Self { mu: 0.0, sigma: 1.0 }
    }

    /// Cumulative distribution function `P(X <= x)`.
    pub fn cdf(&self, x: f64) -> f64 {
        0.5 * erfc(-(x - self.mu) / (self.sigma * SQRT_2))
    }

    /// Survival function `P(X > x)`.
    pub fn sf(&self, x: f64) -> f64 {
        0.5 * erfc((x - self.mu) / (self.sigma * SQRT_2))
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────
