//! Pairwise neighbourhood enrichment between two condition groups.
//!
//! Per-sample [`AdjacencyMatrix`] values are re-indexed onto the unified
//! label set, averaged within each group, and compared label pair by label
//! pair with a two-sided Mann-Whitney U test. All p-values are adjusted
//! together with Benjamini-Hochberg before any filtering.

use std::collections::{BTreeSet, HashMap};

use log::{debug, info};
use stniche_core::{NicheError, Result, Scored, Summarizable};
use stniche_stats::{benjamini_hochberg, mann_whitney_u};

use crate::config::PairwiseConfig;
use crate::dataset::SpotTable;
use crate::grid::AdjacencyMatrix;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Mean adjacency of one condition group over the unified label set.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GroupAverageMatrix {
    pub group: String,
    /// Number of samples averaged.
    pub n_samples: usize,
    labels: Vec<String>,
    data: Vec<f64>,
}

impl GroupAverageMatrix {
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Mean interaction of `from` with `to`; 0 for unknown labels.
    pub fn get(&self, from: &str, to: &str) -> f64 {
        let pos = |l: &str| self.labels.iter().position(|x| x == l);
        match (pos(from), pos(to)) {
            (Some(i), Some(j)) => self.data[i * self.labels.len() + j],
            _ => 0.0,
        }
    }

    /// Rows of the matrix in label order.
    pub fn rows(&self) -> impl Iterator<Item = &[f64]> + '_ {
        self.data.chunks(self.labels.len().max(1))
    }

    /// `self - other` with the diagonal zeroed, i.e. how much more often
    /// each pair of distinct labels borders in this group.
    pub fn difference(&self, other: &GroupAverageMatrix) -> Result<GroupAverageMatrix> {
        if self.labels != other.labels {
            return Err(NicheError::InvalidInput(format!(
                "cannot subtract '{}' from '{}': label sets differ",
                other.group, self.group
            )));
        }
        let n = self.labels.len();
        let mut data: Vec<f64> = self.data.iter().zip(&other.data).map(|(a, b)| a - b).collect();
        for i in 0..n {
            data[i * n + i] = 0.0;
        }
        Ok(GroupAverageMatrix {
            group: format!("{} - {}", self.group, other.group),
            n_samples: self.n_samples + other.n_samples,
            labels: self.labels.clone(),
            data,
        })
    }
}

/// Test outcome for one ordered label pair.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PairStatistic {
    pub label1: String,
    pub label2: String,
    /// Mean normalised interaction in the first compared group.
    pub group1_mean: f64,
    /// Mean normalised interaction in the second compared group.
    pub group2_mean: f64,
    pub p_value: f64,
    pub fdr: f64,
}

impl PairStatistic {
    pub fn is_self_pair(&self) -> bool {
        self.label1 == self.label2
    }

    /// The label pair with its two labels in sorted order.
    pub fn unordered(&self) -> (String, String) {
        unordered(&self.label1, &self.label2)
    }
}

impl Scored for PairStatistic {
    fn score(&self) -> f64 {
        self.fdr
    }
}

/// Result of a two-group pairwise comparison.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PairwiseResult {
    pub groups: (String, String),
    pub focus_group: Option<String>,
    /// Group averages, in the order of `groups`.
    pub averages: (GroupAverageMatrix, GroupAverageMatrix),
    /// One row per ordered pair of the unified label set.
    pub all_pairs: Vec<PairStatistic>,
    /// Non-self pairs passing the FDR cutoff, and the focus filter when a
    /// focus group is set.
    pub significant: Vec<PairStatistic>,
}

impl PairwiseResult {
    /// Mean of `stat` in the focus group and in the other group.
    pub fn focus_means(&self, stat: &PairStatistic) -> Option<(f64, f64)> {
        let focus = self.focus_group.as_deref()?;
        if focus == self.groups.0 {
            Some((stat.group1_mean, stat.group2_mean))
        } else {
            Some((stat.group2_mean, stat.group1_mean))
        }
    }

    /// Unordered label pairs of the significant rows.
    pub fn significant_pairs(&self) -> SignificantPairs {
        SignificantPairs::from_stats(&self.significant)
    }

    /// Focus-minus-other average matrix (first minus second group when no
    /// focus is set).
    pub fn difference(&self) -> Result<GroupAverageMatrix> {
        match self.focus_group.as_deref() {
            Some(f) if f == self.groups.1 => self.averages.1.difference(&self.averages.0),
            _ => self.averages.0.difference(&self.averages.1),
        }
    }
}

impl Summarizable for PairwiseResult {
    fn summary(&self) -> String {
        format!(
            "Pairwise {} vs {}: {} pairs tested, {} significant",
            self.groups.0,
            self.groups.1,
            self.all_pairs.len(),
            self.significant.len(),
        )
    }
}

/// Set of unordered label pairs allowed to seed motifs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignificantPairs {
    pairs: BTreeSet<(String, String)>,
}

impl SignificantPairs {
    pub fn from_stats(stats: &[PairStatistic]) -> Self {
        Self {
            pairs: stats.iter().map(|s| s.unordered()).collect(),
        }
    }

    pub fn contains(&self, a: &str, b: &str) -> bool {
        self.pairs.contains(&unordered(a, b))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl<A: Into<String>, B: Into<String>> FromIterator<(A, B)> for SignificantPairs {
    fn from_iter<I: IntoIterator<Item = (A, B)>>(iter: I) -> Self {
        Self {
            pairs: iter
                .into_iter()
                .map(|(a, b)| unordered(&a.into(), &b.into()))
                .collect(),
        }
    }
}

fn unordered(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

// ---------------------------------------------------------------------------
// Enrichment
// ---------------------------------------------------------------------------

/// Run the pairwise comparison on every sample of `table`.
pub fn pairwise_enrichment(table: &SpotTable, config: &PairwiseConfig) -> Result<PairwiseResult> {
    config.validate()?;
    let matrices = table.adjacency_matrices();
    let sample_groups: HashMap<&str, &str> = table
        .grids()
        .iter()
        .map(|g| (g.sample(), g.group()))
        .collect();
    compare_groups(&matrices, &sample_groups, table.labels(), config)
}

/// Compare per-sample matrices between the two groups of `config`.
///
/// `sample_groups` maps sample id to condition group; samples in neither
/// compared group are ignored. `labels` is the unified label set.
pub fn compare_groups(
    matrices: &[AdjacencyMatrix],
    sample_groups: &HashMap<&str, &str>,
    labels: &[String],
    config: &PairwiseConfig,
) -> Result<PairwiseResult> {
    config.validate()?;
    let (g1, g2) = (config.groups.0.as_str(), config.groups.1.as_str());
    let n = labels.len();

    let collect = |group: &str| -> Vec<Vec<f64>> {
        matrices
            .iter()
            .filter(|m| sample_groups.get(m.sample()) == Some(&group))
            .map(|m| m.reindexed(labels))
            .collect()
    };
    let values1 = collect(g1);
    let values2 = collect(g2);
    debug!(
        "pairwise: {} samples in '{}', {} in '{}', {} labels",
        values1.len(),
        g1,
        values2.len(),
        g2,
        n
    );

    let average = |group: &str, values: &[Vec<f64>]| GroupAverageMatrix {
        group: group.to_string(),
        n_samples: values.len(),
        labels: labels.to_vec(),
        data: (0..n * n).map(|k| cell_mean(values, k)).collect(),
    };
    let avg1 = average(g1, values1.as_slice());
    let avg2 = average(g2, values2.as_slice());

    let test_cell = |k: usize| -> f64 {
        let v1: Vec<f64> = values1.iter().map(|v| v[k]).collect();
        let v2: Vec<f64> = values2.iter().map(|v| v[k]).collect();
        pair_p_value(&v1, &v2)
    };
    #[cfg(feature = "parallel")]
    let p_values: Vec<f64> = {
        use rayon::prelude::*;
        (0..n * n).into_par_iter().map(test_cell).collect()
    };
    #[cfg(not(feature = "parallel"))]
    let p_values: Vec<f64> = (0..n * n).map(test_cell).collect();

    let fdrs = benjamini_hochberg(&p_values)?;

    let all_pairs: Vec<PairStatistic> = (0..n * n)
        .map(|k| PairStatistic {
            label1: labels[k / n].clone(),
            label2: labels[k % n].clone(),
            group1_mean: avg1.data[k],
            group2_mean: avg2.data[k],
            p_value: p_values[k],
            fdr: fdrs[k],
        })
        .collect();

    let passing: Vec<PairStatistic> = all_pairs
        .iter()
        .filter(|s| s.fdr < config.p_value && !s.is_self_pair())
        .cloned()
        .collect();

    let mut result = PairwiseResult {
        groups: config.groups.clone(),
        focus_group: config.focus_group.clone(),
        averages: (avg1, avg2),
        all_pairs,
        significant: Vec::new(),
    };

    result.significant = if result.focus_group.is_some() {
        focus_filter(&result, passing, config.enrichment_fold)
    } else {
        passing
    };

    info!(
        "pairwise: {} of {} label pairs significant",
        result.significant.len(),
        result.all_pairs.len()
    );
    Ok(result)
}

/// Keep pairs whose focus mean exceeds `fold` × the other group's mean and
/// the average focus mean over all `passing` pairs.
fn focus_filter(result: &PairwiseResult, passing: Vec<PairStatistic>, fold: f64) -> Vec<PairStatistic> {
    let means: Vec<(f64, f64)> = passing
        .iter()
        .filter_map(|s| result.focus_means(s))
        .collect();
    if means.is_empty() {
        return Vec::new();
    }
    let focus_avg = means.iter().map(|m| m.0).sum::<f64>() / means.len() as f64;
    passing
        .into_iter()
        .zip(means)
        .filter(|(_, (focus, other))| *focus > fold * other && *focus > focus_avg)
        .map(|(s, _)| s)
        .collect()
}

fn cell_mean(values: &[Vec<f64>], k: usize) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().map(|v| v[k]).sum::<f64>() / values.len() as f64
}

/// Two-sided p-value for one label pair. A pair never observed in one of the
/// groups (or a group without samples) is untestable and gets `p = 1`.
fn pair_p_value(v1: &[f64], v2: &[f64]) -> f64 {
    let observed = |v: &[f64]| v.iter().any(|&x| x != 0.0);
    if !observed(v1) || !observed(v2) {
        return 1.0;
    }
    mann_whitney_u(v1, v2).map_or(1.0, |r| r.p_value)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
