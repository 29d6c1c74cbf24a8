//! Means over samples and over aligned per-sample vectors.

use stniche_core::{NicheError, Result};

/// Arithmetic mean.
pub fn mean(data: &[f64]) -> Result<f64> {
    if data.is_empty() {
        return Err(NicheError::InvalidInput(
            "mean: data must not be empty".into(),
        ));
    }
    Ok(data.iter().sum::<f64>() / data.len() as f64)
}

/// Arithmetic mean, or 0 for empty input.
///
/// For zero-filled tables where an empty row simply means "never observed".
pub fn mean_or_zero(data: &[f64]) -> f64 {
    if data.is_empty() {
        0.0
    } else {
        data.iter().sum::<f64>() / data.len() as f64
    }
}

/// Elementwise mean of equally long vectors.
///
/// Returns `None` when `rows` is empty. Rows of differing length are an
/// input error.
pub fn column_means<R: AsRef<[f64]>>(rows: &[R]) -> Result<Option<Vec<f64>>> {
    let Some(first) = rows.first() else {
        return Ok(None);
    };
    let width = first.as_ref().len();
    let mut sums = vec![0.0; width];
    for (i, row) in rows.iter().enumerate() {
        let row = row.as_ref();
        if row.len() != width {
            return Err(NicheError::InvalidInput(format!(
                "column_means: row {i} has {} values, expected {width}",
                row.len()
            )));
        }
        for (s, v) in sums.iter_mut().zip(row) {
            *s += v;
        }
    }
    let n = rows.len() as f64;
    Ok(Some(sums.into_iter().map(|s| s / n).collect()))
}

// ── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-12;

    #[test]
    fn mean_basic() {
        assert!((mean(&[1.0, 2.0, 3.0, 4.0]).unwrap() - 2.5).abs() < TOL);
        assert!(mean(&[]).is_err());
    }

    #[test]
    fn mean_or_zero_empty() {
        assert_eq!(mean_or_zero(&[]), 0.0);
        assert!((mean_or_zero(&[2.0, 4.0]) - 3.0).abs() < TOL);
    }

    #[test]
    fn column_means_elementwise() {
        let rows = vec![vec![1.0, 0.0, 4.0], vec![3.0, 0.0, 0.0]];
        let m = column_means(&rows).unwrap().unwrap();
        assert_eq!(m, vec![2.0, 0.0, 2.0]);
    }

    #[test]
    fn column_means_empty_and_ragged() {
        let none: Vec<Vec<f64>> = Vec::new();
        assert!(column_means(&none).unwrap().is_none());
        let ragged = vec![vec![1.0, 2.0], vec![1.0]];
        assert!(column_means(&ragged).is_err());
    }
}
