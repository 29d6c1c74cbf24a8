//! Multiple testing correction.
//!
//! Every per-pair or per-group p-value of one analysis step must be collected
//! before any of them is adjusted; the functions here take the complete
//! vector and return adjusted values in input order.

use stniche_core::{NicheError, Result};

/// Multiple testing correction method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CorrectionMethod {
    /// Bonferroni correction, controls the family-wise error rate.
    Bonferroni,
    /// Benjamini-Hochberg step-up procedure, controls the false discovery rate.
    BenjaminiHochberg,
}

/// Apply a multiple testing correction to `p_values`.
pub fn correct(p_values: &[f64], method: CorrectionMethod) -> Result<Vec<f64>> {
    match method {
        CorrectionMethod::Bonferroni => bonferroni(p_values),
        CorrectionMethod::BenjaminiHochberg => benjamini_hochberg(p_values),
    }
}

/// Bonferroni correction: `p_adj = min(p * n, 1.0)`.
pub fn bonferroni(p_values: &[f64]) -> Result<Vec<f64>> {
    check_range(p_values)?;
    let n = p_values.len() as f64;
    Ok(p_values.iter().map(|&p| (p * n).min(1.0)).collect())
}

/// Benjamini-Hochberg adjusted p-values.
///
/// The i-th smallest p-value becomes `min over j >= i of p(j) * n / j`,
/// capped at 1, so adjusted values are non-decreasing in the raw p-value.
pub fn benjamini_hochberg(p_values: &[f64]) -> Result<Vec<f64>> {
    check_range(p_values)?;
    let n = p_values.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| p_values[a].total_cmp(&p_values[b]));

    let mut adjusted = vec![0.0; n];
    let mut running = 1.0_f64;
    for (pos, &idx) in order.iter().enumerate().rev() {
        let scaled = p_values[idx] * n as f64 / (pos + 1) as f64;
        running = running.min(scaled);
        adjusted[idx] = running;
    }
    Ok(adjusted)
}

fn check_range(p_values: &[f64]) -> Result<()> {
    if let Some((i, p)) = p_values
        .iter()
        .enumerate()
        .find(|(_, p)| !(0.0..=1.0).contains(*p))
    {
        return Err(NicheError::InvalidInput(format!(
            "p-value at index {i} is outside [0, 1]: {p}"
        )));
    }
    Ok(())
}

// ── Tests ──────────────────────────────────────────────────────────────────


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn bh_monotone_and_bounded(p in proptest::collection::vec(0.0f64..=1.0, 1..60)) {
            let adj = benjamini_hochberg(&p).unwrap();
            let mut pairs: Vec<(f64, f64)> = p.iter().copied().zip(adj.iter().copied()).collect();
            pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
            for w in pairs.windows(2) {
                prop_assert!(w[1].1 >= w[0].1 - 1e-12);
            }
            for (&raw, &a) in p.iter().zip(&adj) {
                prop_assert!((0.0..=1.0).contains(&a));
                prop_assert!(a >= raw - 1e-12);
            }
        }
    }
}
