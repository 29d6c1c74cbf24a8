//! Enrichment scoring of motif groups across the focus samples.
//!
//! For every [`MotifGroup`], occurrences are counted per focus sample and
//! turned into per-sample ratios (occurrences ÷ spots in the sample). Each
//! group is compared with the mean of all other groups: fold change of mean
//! counts, and a one-sided Mann-Whitney test of its ratio vector against the
//! elementwise mean of the other groups' ratio vectors. p-values of all
//! groups are adjusted together with Benjamini-Hochberg.

use std::collections::{BTreeMap, HashMap};

use log::{debug, warn};
use stniche_core::{Result, Scored, Summarizable};
use stniche_stats::{benjamini_hochberg, column_means, mann_whitney_u_with, mean_or_zero, Alternative};

use crate::config::ScoringConfig;
use crate::dataset::SpotTable;
use crate::grouping::MotifGrouping;
use crate::motif::MotifSet;

/// Floor for the fold-change denominator.
pub const FOLD_CHANGE_EPSILON: f64 = 1e-9;

// ---------------------------------------------------------------------------
// Sample universe
// ---------------------------------------------------------------------------

/// The samples a grouping is scored over, with their spot totals.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SampleUniverse {
    samples: Vec<(String, usize)>,
}

impl SampleUniverse {
    /// Explicit `(sample, total spots)` list.
    pub fn new(samples: Vec<(String, usize)>) -> Self {
        Self { samples }
    }

    /// All samples of `group` in `table`.
    pub fn for_group(table: &SpotTable, group: &str) -> Self {
        Self {
            samples: table
                .grids_in_group(group)
                .map(|g| (g.sample().to_string(), g.len()))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> impl Iterator<Item = &str> + '_ {
        self.samples.iter().map(|(s, _)| s.as_str())
    }

    fn index(&self) -> HashMap<&str, usize> {
        self.samples
            .iter()
            .enumerate()
            .map(|(i, (s, _))| (s.as_str(), i))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

/// Enrichment statistics of one motif group.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GroupStatistic {
    pub group_id: usize,
    /// Number of samples with at least one occurrence.
    pub count_sample: usize,
    /// Mean occurrence count over all samples of the universe.
    pub count_mean: f64,
    /// Mean of the per-sample ratios.
    pub ratio_mean: f64,
    /// Per-sample occurrences ÷ spots, in universe order.
    pub ratios: Vec<f64>,
    /// Mean `count_mean` of all other groups (floored at ε).
    pub count_mean_other: f64,
    pub fold_change: f64,
    /// `count_sample` ÷ number of samples.
    pub coverage: f64,
    pub p_value: f64,
    pub adjusted_p: f64,
    pub significant: bool,
}

impl Scored for GroupStatistic {
    fn score(&self) -> f64 {
        self.adjusted_p
    }
}

/// Statistics of every group of one grouping pass, sorted by adjusted
/// p-value.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GroupStatistics {
    pub rows: Vec<GroupStatistic>,
}

impl GroupStatistics {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, GroupStatistic> {
        self.rows.iter()
    }

    /// Row of `group_id`.
    pub fn get(&self, group_id: usize) -> Option<&GroupStatistic> {
        self.rows.iter().find(|r| r.group_id == group_id)
    }

    /// Rows flagged significant.
    pub fn significant(&self) -> impl Iterator<Item = &GroupStatistic> + '_ {
        self.rows.iter().filter(|r| r.significant)
    }
}

impl Summarizable for GroupStatistics {
    fn summary(&self) -> String {
        format!(
            "GroupStatistics: {} groups, {} significant",
            self.rows.len(),
            self.significant().count(),
        )
    }
}

/// Score every group of `grouping` over `universe`.
///
/// Memberships in samples outside the universe are ignored. Degenerate
/// comparisons (a single group, no samples, constant ratios) get `p = 1`.
pub fn score_groups(
    grouping: &MotifGrouping,
    universe: &SampleUniverse,
    config: &ScoringConfig,
) -> Result<GroupStatistics> {
    config.validate()?;
    let index = universe.index();
    let n_samples = universe.len();
    let n_groups = grouping.len();

    let mut counts: Vec<Vec<f64>> = Vec::with_capacity(n_groups);
    for group in grouping.groups() {
        let mut row = vec![0.0; n_samples];
        for key in &group.members {
            match index.get(key.sample.as_str()) {
                Some(&i) => row[i] += 1.0,
                None => warn!(
                    "group {}: member {}:{} is outside the scored samples",
                    group.id, key.sample, key.id
                ),
            }
        }
        counts.push(row);
    }

    let ratios: Vec<Vec<f64>> = counts
        .iter()
        .map(|row| {
            row.iter()
                .zip(&universe.samples)
                .map(|(&c, (_, total))| if *total > 0 { c / *total as f64 } else { 0.0 })
                .collect()
        })
        .collect();
    let count_means: Vec<f64> = counts.iter().map(|r| mean_or_zero(r)).collect();

    let p_for = |i: usize| -> f64 { one_vs_rest_p(&ratios, i) };
    #[cfg(feature = "parallel")]
    let p_values: Vec<f64> = {
        use rayon::prelude::*;
        (0..n_groups).into_par_iter().map(p_for).collect()
    };
    #[cfg(not(feature = "parallel"))]
    let p_values: Vec<f64> = (0..n_groups).map(p_for).collect();

    let adjusted = benjamini_hochberg(&p_values)?;

    let total_means: f64 = count_means.iter().sum();
    let mut rows: Vec<GroupStatistic> = Vec::with_capacity(n_groups);
    for (i, group) in grouping.groups().iter().enumerate() {
        let count_mean_other = if n_groups > 1 {
            let other = (total_means - count_means[i]) / (n_groups - 1) as f64;
            if other > 0.0 {
                other
            } else {
                FOLD_CHANGE_EPSILON
            }
        } else {
            FOLD_CHANGE_EPSILON
        };
        let count_sample = counts[i].iter().filter(|&&c| c > 0.0).count();
        let coverage = if n_samples > 0 {
            count_sample as f64 / n_samples as f64
        } else {
            0.0
        };
        let fold_change = count_means[i] / count_mean_other;
        let significant = adjusted[i] < config.p_threshold
            && fold_change > config.fc_threshold
            && coverage >= config.coverage_threshold;
        rows.push(GroupStatistic {
            group_id: group.id,
            count_sample,
            count_mean: count_means[i],
            ratio_mean: mean_or_zero(&ratios[i]),
            ratios: ratios[i].clone(),
            count_mean_other,
            fold_change,
            coverage,
            p_value: p_values[i],
            adjusted_p: adjusted[i],
            significant,
        });
    }
    rows.sort_by(|a, b| a.adjusted_p.total_cmp(&b.adjusted_p));

    let stats = GroupStatistics { rows };
    debug!("{}", stats.summary());
    Ok(stats)
}

/// One-sided test of group `i`'s ratios against the elementwise mean of the
/// other groups' ratios.
fn one_vs_rest_p(ratios: &[Vec<f64>], i: usize) -> f64 {
    let others: Vec<&[f64]> = ratios
        .iter()
        .enumerate()
        .filter(|&(j, _)| j != i)
        .map(|(_, r)| r.as_slice())
        .collect();
    let background = match column_means(&others) {
        Ok(Some(bg)) => bg,
        _ => return 1.0,
    };
    mann_whitney_u_with(&ratios[i], &background, Alternative::Greater).map_or(1.0, |r| r.p_value)
}

// ---------------------------------------------------------------------------
// Label-composition deduplication
// ---------------------------------------------------------------------------

/// Keep one group per label composition.
///
/// Among groups whose representative motifs have the same label histogram,
/// only the one with the lowest raw p-value survives (the earliest row on
/// ties). Survivors are sorted by adjusted p-value and cut at
/// `adjusted_p_threshold` (inclusive). Groups whose representative cannot be
/// resolved are skipped.
pub fn filter_unique_significant(
    stats: &GroupStatistics,
    grouping: &MotifGrouping,
    motifs: &MotifSet,
    adjusted_p_threshold: f64,
) -> Vec<GroupStatistic> {
    let mut best: BTreeMap<BTreeMap<String, usize>, &GroupStatistic> = BTreeMap::new();
    for row in stats.iter() {
        let representative = grouping
            .get(row.group_id)
            .ok()
            .and_then(|g| g.representative())
            .and_then(|key| motifs.get(key));
        let Some(motif) = representative else {
            warn!("group {}: representative motif not found, skipped", row.group_id);
            continue;
        };
        best.entry(motif.label_histogram())
            .and_modify(|current| {
                if row.p_value < current.p_value {
                    *current = row;
                }
            })
            .or_insert(row);
    }

    let mut out: Vec<GroupStatistic> = best.into_values().cloned().collect();
    out.sort_by(|a, b| {
        a.adjusted_p
            .total_cmp(&b.adjusted_p)
            .then(a.group_id.cmp(&b.group_id))
    });
    out.retain(|r| r.adjusted_p <= adjusted_p_threshold);
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridCoord;
    use crate::grouping::group_motifs;
    use crate::motif::{Motif, MotifKey, MotifNode};

    const TOL: f64 = 1e-12;

    fn row_triad(sample: &str, id: usize, r: i64, labels: [&str; 3]) -> Motif {
        Motif {
            key: MotifKey::new(sample, id),
            nodes: (0..3)
                .map(|i| MotifNode::new(GridCoord::new(r, 2 * i as i64), labels[i]))
                .collect(),
        }
    }

    fn bent_triad(sample: &str, id: usize, r: i64) -> Motif {
        Motif {
            key: MotifKey::new(sample, id),
            nodes: vec![
                MotifNode::new(GridCoord::new(r, 0), "A"),
                MotifNode::new(GridCoord::new(r, 2), "B"),
                MotifNode::new(GridCoord::new(r + 1, 3), "C"),
            ],
        }
    }

    fn universe(n: usize) -> SampleUniverse {
        SampleUniverse::new((0..n).map(|i| (format!("s{i}"), 100)).collect())
    }

    /// Ten samples; the row A-B-C triad occurs 5 times in every sample, the
    /// bent triad once in two samples, the A-A-C row triad once in one.
    fn motifs() -> MotifSet {
        let mut out = Vec::new();
        for s in 0..10 {
            let sample = format!("s{s}");
            for k in 0..5 {
                out.push(row_triad(&sample, k, 10 * k as i64, ["A", "B", "C"]));
            }
            if s < 2 {
                out.push(bent_triad(&sample, 5, 100));
            }
            if s == 0 {
                out.push(row_triad(&sample, 6, 200, ["A", "A", "C"]));
            }
        }
        out.into_iter().collect()
    }

    #[test]
    fn counts_ratios_and_fold_change() {
        let grouping = group_motifs(&motifs());
        let stats = score_groups(&grouping, &universe(10), &ScoringConfig::default()).unwrap();
        assert_eq!(stats.len(), 3);

        let row = stats.get(0).unwrap();
        assert_eq!(row.count_sample, 10);
        assert!((row.count_mean - 5.0).abs() < TOL);
        assert!((row.ratio_mean - 0.05).abs() < TOL);
        assert!((row.coverage - 1.0).abs() < TOL);
        // Others: 0.2 and 0.1 mean counts.
        assert!((row.count_mean_other - 0.15).abs() < TOL);
        assert!((row.fold_change - 5.0 / 0.15).abs() < 1e-9);
        assert!(row.p_value < 0.001, "p={}", row.p_value);
        assert!(row.significant);

        let rare = stats.get(2).unwrap();
        assert_eq!(rare.count_sample, 1);
        assert!((rare.coverage - 0.1).abs() < TOL);
        assert!(!rare.significant);
        assert!(rare.p_value > 0.5);
    }

    #[test]
    fn sorted_by_adjusted_p() {
        let grouping = group_motifs(&motifs());
        let stats = score_groups(&grouping, &universe(10), &ScoringConfig::default()).unwrap();
        assert!(stats.rows.windows(2).all(|w| w[0].adjusted_p <= w[1].adjusted_p));
        assert_eq!(stats.rows[0].group_id, 0);
        assert_eq!(stats.significant().count(), 1);
    }

    #[test]
    fn single_group_is_degenerate() {
        let set: MotifSet = (0..3).map(|s| row_triad(&format!("s{s}"), 0, 0, ["A", "B", "C"])).collect();
        let grouping = group_motifs(&set);
        let stats = score_groups(&grouping, &universe(3), &ScoringConfig::default()).unwrap();
        let row = &stats.rows[0];
        assert_eq!(row.p_value, 1.0);
        assert!((row.count_mean_other - FOLD_CHANGE_EPSILON).abs() < 1e-20);
        assert!(row.fold_change > 1e8);
        assert!(!row.significant);
    }

    #[test]
    fn empty_universe_scores_zero() {
        let grouping = group_motifs(&motifs());
        let stats = score_groups(&grouping, &SampleUniverse::new(Vec::new()), &ScoringConfig::default()).unwrap();
        for row in stats.iter() {
            assert_eq!(row.coverage, 0.0);
            assert_eq!(row.count_mean, 0.0);
            assert_eq!(row.p_value, 1.0);
        }
    }

    #[test]
    fn empty_grouping() {
        let stats = score_groups(&MotifGrouping::default(), &universe(4), &ScoringConfig::default()).unwrap();
        assert!(stats.is_empty());
    }

    #[test]
    fn unique_filter_keeps_best_per_composition() {
        let set = motifs();
        let grouping = group_motifs(&set);
        let stats = score_groups(&grouping, &universe(10), &ScoringConfig::default()).unwrap();
        // Row A-B-C and bent A-B-C share a label histogram.
        let unique = filter_unique_significant(&stats, &grouping, &set, 1.0);
        assert_eq!(unique.len(), 2);
        assert!(unique.iter().any(|r| r.group_id == 0));
        assert!(!unique.iter().any(|r| r.group_id == 1));

        let strict = filter_unique_significant(&stats, &grouping, &set, 0.05);
        assert_eq!(strict.len(), 1);
        assert_eq!(strict[0].group_id, 0);
    }

    #[test]
    fn unique_filter_skips_unresolvable_groups() {
        let set = motifs();
        let grouping = group_motifs(&set);
        let stats = score_groups(&grouping, &universe(10), &ScoringConfig::default()).unwrap();
        let unique = filter_unique_significant(&stats, &grouping, &MotifSet::new(), 1.0);
        assert!(unique.is_empty());
    }
}
