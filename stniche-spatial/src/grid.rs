//! Hexagonal spot grids and per-sample label adjacency.
//!
//! Spots sit on an offset hexagonal lattice addressed by integer
//! `(row, col)` indices, as produced by Visium-style array coordinates:
//! neighbours in the same row are two columns apart and diagonal neighbours
//! differ by one in each axis. [`SampleGrid`] is a coordinate → cluster label
//! lookup for one sample; [`adjacency_matrix`] aggregates how often each
//! label borders each other label.

use std::collections::{BTreeMap, HashMap};

use stniche_core::Summarizable;

// ---------------------------------------------------------------------------
// Coordinates
// ---------------------------------------------------------------------------

/// The eight offsets `(Δrow, Δcol)` that reach the neighbours of a spot.
pub const HEX_NEIGHBOR_OFFSETS: [(i64, i64); 8] = [
    (-1, 0),
    (1, 0),
    (0, -2),
    (0, 2),
    (-1, -1),
    (1, -1),
    (-1, 1),
    (1, 1),
];

/// Integer array position of a spot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GridCoord {
    pub row: i64,
    pub col: i64,
}

impl GridCoord {
    pub fn new(row: i64, col: i64) -> Self {
        Self { row, col }
    }

    /// Shift by `(Δrow, Δcol)`; `None` if the position is not representable.
    pub fn offset(self, (dr, dc): (i64, i64)) -> Option<Self> {
        Some(Self::new(self.row.checked_add(dr)?, self.col.checked_add(dc)?))
    }

    /// Candidate neighbour positions, in [`HEX_NEIGHBOR_OFFSETS`] order.
    /// Positions beyond the `i64` range are skipped.
    pub fn neighbors(self) -> impl Iterator<Item = GridCoord> {
        HEX_NEIGHBOR_OFFSETS.into_iter().filter_map(move |d| self.offset(d))
    }
}

impl From<(i64, i64)> for GridCoord {
    fn from((row, col): (i64, i64)) -> Self {
        Self::new(row, col)
    }
}

// ---------------------------------------------------------------------------
// Sample grid
// ---------------------------------------------------------------------------

/// Coordinate → cluster label lookup for the spots of one sample.
///
/// Spots keep their input order, which fixes the enumeration order of every
/// structure derived from the grid.
#[derive(Debug, Clone)]
pub struct SampleGrid {
    sample: String,
    group: String,
    spots: Vec<(GridCoord, String)>,
    index: HashMap<GridCoord, usize>,
}

impl SampleGrid {
    /// Build a grid from `(coord, label)` spots. Later duplicates of a
    /// coordinate are reported through the returned `Err` with the offending
    /// coordinate.
    pub(crate) fn from_spots(
        sample: String,
        group: String,
        spots: Vec<(GridCoord, String)>,
    ) -> std::result::Result<Self, GridCoord> {
        let mut index = HashMap::with_capacity(spots.len());
        for (i, (coord, _)) in spots.iter().enumerate() {
            if index.insert(*coord, i).is_some() {
                return Err(*coord);
            }
        }
        Ok(Self { sample, group, spots, index })
    }

    pub fn sample(&self) -> &str {
        &self.sample
    }

    /// Condition group the sample belongs to.
    pub fn group(&self) -> &str {
        &self.group
    }

    /// Number of spots on the grid.
    pub fn len(&self) -> usize {
        self.spots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spots.is_empty()
    }

    /// Label of the spot at `coord`, if the position is on tissue.
    pub fn label_at(&self, coord: GridCoord) -> Option<&str> {
        self.index.get(&coord).map(|&i| self.spots[i].1.as_str())
    }

    /// Spots in input order.
    pub fn spots(&self) -> impl Iterator<Item = (GridCoord, &str)> + '_ {
        self.spots.iter().map(|(c, l)| (*c, l.as_str()))
    }

    /// Occupied neighbours of `coord`. Off-tissue positions are skipped.
    pub fn neighbors(&self, coord: GridCoord) -> impl Iterator<Item = (GridCoord, &str)> + '_ {
        coord
            .neighbors()
            .filter_map(move |n| self.label_at(n).map(|l| (n, l)))
    }

    /// Number of spots carrying each label.
    pub fn label_counts(&self) -> BTreeMap<&str, usize> {
        let mut counts = BTreeMap::new();
        for (_, label) in &self.spots {
            *counts.entry(label.as_str()).or_insert(0) += 1;
        }
        counts
    }
}

// ---------------------------------------------------------------------------
// Adjacency matrix
// ---------------------------------------------------------------------------

/// Normalised label co-occurrence for one sample.
///
/// Entry `(a, b)` is the number of `(spot labelled a, neighbour labelled b)`
/// incidences divided by the number of spots labelled `a` in the sample.
/// Labels are the sorted set of labels present in the sample.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AdjacencyMatrix {
    sample: String,
    labels: Vec<String>,
    /// Row-major `labels.len()²` values.
    data: Vec<f64>,
}

impl AdjacencyMatrix {
    pub fn sample(&self) -> &str {
        &self.sample
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Normalised interaction of `from` with `to`; 0 for labels absent from
    /// the sample.
    pub fn get(&self, from: &str, to: &str) -> f64 {
        match (self.position(from), self.position(to)) {
            (Some(i), Some(j)) => self.data[i * self.labels.len() + j],
            _ => 0.0,
        }
    }

    /// Sum of the outgoing row of `label`.
    pub fn row_sum(&self, label: &str) -> f64 {
        let n = self.labels.len();
        self.position(label)
            .map(|i| self.data[i * n..(i + 1) * n].iter().sum())
            .unwrap_or(0.0)
    }

    /// Values re-indexed onto `labels` (row-major), zero-filling labels this
    /// sample never saw.
    pub fn reindexed(&self, labels: &[String]) -> Vec<f64> {
        let local: Vec<Option<usize>> = labels.iter().map(|l| self.position(l)).collect();
        let n = self.labels.len();
        let mut out = Vec::with_capacity(labels.len() * labels.len());
        for row in &local {
            for col in &local {
                out.push(match (row, col) {
                    (Some(i), Some(j)) => self.data[i * n + j],
                    _ => 0.0,
                });
            }
        }
        out
    }

    fn position(&self, label: &str) -> Option<usize> {
        self.labels
            .binary_search_by(|l| l.as_str().cmp(label))
            .ok()
    }
}

impl Summarizable for AdjacencyMatrix {
    fn summary(&self) -> String {
        let nonzero = self.data.iter().filter(|&&v| v != 0.0).count();
        format!(
            "AdjacencyMatrix[{}]: {} labels, {} non-zero interactions",
            self.sample,
            self.labels.len(),
            nonzero,
        )
    }
}

/// Count label co-occurrences between neighbouring spots of `grid` and
/// normalise each row by the number of spots carrying the row label.
///
/// Every ordered incidence is counted, so an `a`–`b` contact contributes to
/// both `(a, b)` and `(b, a)`.
pub fn adjacency_matrix(grid: &SampleGrid) -> AdjacencyMatrix {
    let counts = grid.label_counts();
    let labels: Vec<String> = counts.keys().map(|l| l.to_string()).collect();
    let position: HashMap<&str, usize> = counts
        .keys()
        .enumerate()
        .map(|(i, l)| (*l, i))
        .collect();
    let n = labels.len();

    let mut data = vec![0.0; n * n];
    for (coord, label) in grid.spots() {
        let i = position[label];
        for (_, nb_label) in grid.neighbors(coord) {
            data[i * n + position[nb_label]] += 1.0;
        }
    }

    for (i, count) in counts.values().enumerate() {
        if *count > 0 {
            let c = *count as f64;
            for v in &mut data[i * n..(i + 1) * n] {
                *v /= c;
            }
        }
    }

    AdjacencyMatrix {
        sample: grid.sample.clone(),
        labels,
        data,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-12;

    fn grid(spots: &[((i64, i64), &str)]) -> SampleGrid {
        SampleGrid::from_spots(
            "s1".into(),
            "G1".into(),
            spots.iter().map(|&(c, l)| (c.into(), l.to_string())).collect(),
        )
        .unwrap()
    }

    #[test]
    fn offsets_are_symmetric() {
        for &(dr, dc) in &HEX_NEIGHBOR_OFFSETS {
            assert!(HEX_NEIGHBOR_OFFSETS.contains(&(-dr, -dc)));
        }
        let c = GridCoord::new(3, 5);
        let adjacent = |o: GridCoord| c.neighbors().any(|n| n == o);
        assert!(adjacent(GridCoord::new(3, 7)));
        assert!(adjacent(GridCoord::new(2, 4)));
        assert!(!adjacent(GridCoord::new(3, 6)));
        assert!(!adjacent(c));
    }

    #[test]
    fn duplicate_coordinate_rejected() {
        let err = SampleGrid::from_spots(
            "s".into(),
            "g".into(),
            vec![((0, 0).into(), "A".into()), ((0, 0).into(), "B".into())],
        )
        .unwrap_err();
        assert_eq!(err, GridCoord::new(0, 0));
    }

    #[test]
    fn neighbors_at_coordinate_limits() {
        let corner = GridCoord::new(i64::MAX, i64::MAX);
        let nb: Vec<GridCoord> = corner.neighbors().collect();
        assert_eq!(
            nb,
            vec![
                GridCoord::new(i64::MAX - 1, i64::MAX),
                GridCoord::new(i64::MAX, i64::MAX - 2),
                GridCoord::new(i64::MAX - 1, i64::MAX - 1),
            ]
        );
        assert_eq!(GridCoord::new(i64::MIN, 0).neighbors().count(), 5);
        assert_eq!(corner.offset((1, 0)), None);

        let g = grid(&[((i64::MAX, i64::MAX), "A"), ((i64::MAX, i64::MAX - 2), "B")]);
        let m = adjacency_matrix(&g);
        assert!((m.get("A", "B") - 1.0).abs() < TOL);
    }

    #[test]
    fn neighbors_skip_off_tissue() {
        let g = grid(&[((0, 0), "A"), ((0, 2), "B"), ((5, 5), "C")]);
        let nb: Vec<_> = g.neighbors(GridCoord::new(0, 0)).collect();
        assert_eq!(nb, vec![(GridCoord::new(0, 2), "B")]);
        assert_eq!(g.neighbors(GridCoord::new(5, 5)).count(), 0);
    }

    #[test]
    fn adjacency_normalised_by_label_count() {
        // A(0,0) - B(0,2) - A(0,4); C isolated.
        let g = grid(&[((0, 0), "A"), ((0, 2), "B"), ((0, 4), "A"), ((9, 9), "C")]);
        let m = adjacency_matrix(&g);
        assert_eq!(m.labels(), &["A".to_string(), "B".into(), "C".into()]);
        // Two A spots, each touching B once → 2 / 2.
        assert!((m.get("A", "B") - 1.0).abs() < TOL);
        // One B spot touching two A → 2 / 1.
        assert!((m.get("B", "A") - 2.0).abs() < TOL);
        assert_eq!(m.get("A", "A"), 0.0);
        assert_eq!(m.row_sum("C"), 0.0);
        assert_eq!(m.get("A", "Z"), 0.0);
    }

    #[test]
    fn reindex_zero_fills() {
        let g = grid(&[((0, 0), "B"), ((1, 1), "C")]);
        let m = adjacency_matrix(&g);
        let labels: Vec<String> = ["A", "B", "C"].iter().map(|s| s.to_string()).collect();
        let v = m.reindexed(&labels);
        assert_eq!(v.len(), 9);
        assert_eq!(&v[0..3], &[0.0, 0.0, 0.0]);
        assert!((v[3 + 2] - 1.0).abs() < TOL); // B → C
        assert!((v[6 + 1] - 1.0).abs() < TOL); // C → B
    }

    #[test]
    fn summary_mentions_sample() {
        let m = adjacency_matrix(&grid(&[((0, 0), "A"), ((0, 2), "A")]));
        assert!(m.summary().contains("s1"));
    }
}
