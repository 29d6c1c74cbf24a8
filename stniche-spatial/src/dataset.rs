//! Spot table input.
//!
//! [`SpotTable`] is the already-loaded per-spot table the engine consumes:
//! array coordinates, sample id, cluster label and condition group for
//! every spot. It is split into one [`SampleGrid`] per sample on
//! construction and stays immutable afterwards.

use std::collections::{BTreeSet, HashMap};

use log::debug;
use stniche_core::{NicheError, Result, Summarizable};

use crate::grid::{adjacency_matrix, AdjacencyMatrix, GridCoord, SampleGrid};

/// One sampled location.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Spot {
    pub row: i64,
    pub col: i64,
    pub sample: String,
    pub cluster: String,
    pub group: String,
}

impl Spot {
    pub fn new(
        row: i64,
        col: i64,
        sample: impl Into<String>,
        cluster: impl Into<String>,
        group: impl Into<String>,
    ) -> Self {
        Self {
            row,
            col,
            sample: sample.into(),
            cluster: cluster.into(),
            group: group.into(),
        }
    }

    pub fn coord(&self) -> GridCoord {
        GridCoord::new(self.row, self.col)
    }
}

/// Validated spot table, split per sample.
#[derive(Debug, Clone)]
pub struct SpotTable {
    grids: Vec<SampleGrid>,
    by_sample: HashMap<String, usize>,
    labels: Vec<String>,
}

impl SpotTable {
    /// Build a table from spots.
    ///
    /// Samples keep the order in which they are first seen. Fails when an
    /// identifier is empty, when a sample is assigned to two groups, or when
    /// a coordinate occurs twice within one sample.
    pub fn new(spots: Vec<Spot>) -> Result<Self> {
        let mut order: Vec<(String, String, Vec<(GridCoord, String)>)> = Vec::new();
        let mut by_sample: HashMap<String, usize> = HashMap::new();
        let mut labels = BTreeSet::new();

        for (i, spot) in spots.into_iter().enumerate() {
            if spot.sample.is_empty() || spot.cluster.is_empty() || spot.group.is_empty() {
                return Err(NicheError::InvalidInput(format!(
                    "spot {i} at ({}, {}) has an empty sample, cluster or group label",
                    spot.row, spot.col
                )));
            }
            let idx = match by_sample.get(&spot.sample) {
                Some(&idx) => {
                    if order[idx].1 != spot.group {
                        return Err(NicheError::InvalidInput(format!(
                            "sample '{}' is assigned to both '{}' and '{}'",
                            spot.sample, order[idx].1, spot.group
                        )));
                    }
                    idx
                }
                None => {
                    by_sample.insert(spot.sample.clone(), order.len());
                    order.push((spot.sample.clone(), spot.group.clone(), Vec::new()));
                    order.len() - 1
                }
            };
            labels.insert(spot.cluster.clone());
            order[idx].2.push((spot.coord(), spot.cluster));
        }

        let mut grids = Vec::with_capacity(order.len());
        for (sample, group, spots) in order {
            let grid = SampleGrid::from_spots(sample.clone(), group, spots).map_err(|c| {
                NicheError::InvalidInput(format!(
                    "sample '{sample}' has more than one spot at ({}, {})",
                    c.row, c.col
                ))
            })?;
            debug!("sample {}: {} spots", grid.sample(), grid.len());
            grids.push(grid);
        }

        Ok(Self {
            grids,
            by_sample,
            labels: labels.into_iter().collect(),
        })
    }

    /// Sample grids in first-seen order.
    pub fn grids(&self) -> &[SampleGrid] {
        &self.grids
    }

    /// Sample ids in first-seen order.
    pub fn samples(&self) -> impl Iterator<Item = &str> + '_ {
        self.grids.iter().map(|g| g.sample())
    }

    /// Grid of one sample.
    pub fn grid(&self, sample: &str) -> Option<&SampleGrid> {
        self.by_sample.get(sample).map(|&i| &self.grids[i])
    }

    /// Grids of the samples belonging to `group`, in first-seen order.
    pub fn grids_in_group<'a>(&'a self, group: &'a str) -> impl Iterator<Item = &'a SampleGrid> + 'a {
        self.grids.iter().filter(move |g| g.group() == group)
    }

    /// Sample ids belonging to `group`.
    pub fn samples_in_group<'a>(&'a self, group: &'a str) -> Vec<&'a str> {
        self.grids_in_group(group).map(|g| g.sample()).collect()
    }

    /// Condition group of `sample`.
    pub fn group_of(&self, sample: &str) -> Option<&str> {
        self.grid(sample).map(|g| g.group())
    }

    /// Whether any sample belongs to `group`.
    pub fn has_group(&self, group: &str) -> bool {
        self.grids.iter().any(|g| g.group() == group)
    }

    /// Total number of spots in `sample` (0 for unknown samples).
    pub fn total_spots(&self, sample: &str) -> usize {
        self.grid(sample).map_or(0, |g| g.len())
    }

    /// Sorted union of every cluster label in the table.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Largest number of spots in any sample.
    pub fn max_sample_size(&self) -> usize {
        self.grids.iter().map(|g| g.len()).max().unwrap_or(0)
    }

    /// One adjacency matrix per sample, in sample order.
    pub fn adjacency_matrices(&self) -> Vec<AdjacencyMatrix> {
        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            self.grids.par_iter().map(adjacency_matrix).collect()
        }
        #[cfg(not(feature = "parallel"))]
        {
            self.grids.iter().map(adjacency_matrix).collect()
        }
    }
}

impl Summarizable for SpotTable {
    fn summary(&self) -> String {
        let spots: usize = self.grids.iter().map(|g| g.len()).sum();
        format!(
            "SpotTable: {} spots in {} samples, {} cluster labels",
            spots,
            self.grids.len(),
            self.labels.len(),
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn spots() -> Vec<Spot> {
        vec![
            Spot::new(0, 0, "s1", "A", "tumor"),
            Spot::new(0, 2, "s1", "B", "tumor"),
            Spot::new(0, 0, "s2", "C", "normal"),
            Spot::new(1, 1, "s1", "C", "tumor"),
        ]
    }

    #[test]
    fn splits_by_sample() {
        let t = SpotTable::new(spots()).unwrap();
        assert_eq!(t.samples().collect::<Vec<_>>(), vec!["s1", "s2"]);
        assert_eq!(t.total_spots("s1"), 3);
        assert_eq!(t.total_spots("s2"), 1);
        assert_eq!(t.total_spots("nope"), 0);
        assert_eq!(t.labels(), &["A".to_string(), "B".into(), "C".into()]);
        assert_eq!(t.group_of("s2"), Some("normal"));
        assert_eq!(t.samples_in_group("tumor"), vec!["s1"]);
        assert!(t.has_group("normal"));
        assert!(!t.has_group("other"));
        assert_eq!(t.max_sample_size(), 3);
        assert_eq!(t.grid("s1").unwrap().label_at(GridCoord::new(1, 1)), Some("C"));
    }

    #[test]
    fn rejects_conflicting_group() {
        let mut s = spots();
        s.push(Spot::new(4, 4, "s1", "A", "normal"));
        assert!(matches!(SpotTable::new(s), Err(NicheError::InvalidInput(_))));
    }

    #[test]
    fn rejects_duplicate_coordinate() {
        let mut s = spots();
        s.push(Spot::new(0, 2, "s1", "A", "tumor"));
        let err = SpotTable::new(s).unwrap_err();
        assert!(err.to_string().contains("(0, 2)"));
    }

    #[test]
    fn same_coordinate_in_two_samples_is_fine() {
        assert!(SpotTable::new(spots()).is_ok());
    }

    #[test]
    fn rejects_empty_identifiers() {
        let s = vec![Spot::new(0, 0, "", "A", "g")];
        assert!(SpotTable::new(s).is_err());
    }

    #[test]
    fn matrices_per_sample() {
        let t = SpotTable::new(spots()).unwrap();
        let m = t.adjacency_matrices();
        assert_eq!(m.len(), 2);
        assert_eq!(m[0].sample(), "s1");
        assert!((m[0].get("A", "B") - 1.0).abs() < 1e-12);
        assert!(t.summary().contains("2 samples"));
    }
}
