//! Spatial motifs and their node-by-node assembly.
//!
//! A [`Motif`] is an ordered list of `(coordinate, label)` nodes inside one
//! sample. Motifs are seeded from neighbouring spot pairs whose label pair is
//! significant ([`assemble_pairs`]), extended to triads ([`assemble_triads`]),
//! and grown one node at a time ([`expand_motifs`]).

use std::collections::{BTreeMap, HashMap, HashSet};

use log::{debug, warn};
use stniche_core::Summarizable;

use crate::dataset::SpotTable;
use crate::grid::{GridCoord, SampleGrid};
use crate::pairwise::SignificantPairs;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One spot of a motif.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MotifNode {
    pub coord: GridCoord,
    pub label: String,
}

impl MotifNode {
    pub fn new(coord: GridCoord, label: impl Into<String>) -> Self {
        Self {
            coord,
            label: label.into(),
        }
    }
}

/// Identity of a motif: the sample it lives in and its id within that sample.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MotifKey {
    pub sample: String,
    pub id: usize,
}

impl MotifKey {
    pub fn new(sample: impl Into<String>, id: usize) -> Self {
        Self {
            sample: sample.into(),
            id,
        }
    }
}

/// A set of co-located spots in one sample.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Motif {
    pub key: MotifKey,
    pub nodes: Vec<MotifNode>,
}

impl Motif {
    pub fn sample(&self) -> &str {
        &self.key.sample
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, coord: GridCoord) -> bool {
        self.nodes.iter().any(|n| n.coord == coord)
    }

    /// Number of nodes per label.
    pub fn label_histogram(&self) -> BTreeMap<String, usize> {
        let mut hist = BTreeMap::new();
        for node in &self.nodes {
            *hist.entry(node.label.clone()).or_insert(0) += 1;
        }
        hist
    }
}

/// An ordered collection of motifs with lookup by [`MotifKey`].
///
/// Keys are indexed on insertion; a repeated key resolves to its first
/// motif.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(from = "Vec<Motif>", into = "Vec<Motif>"))]
pub struct MotifSet {
    motifs: Vec<Motif>,
    index: HashMap<MotifKey, usize>,
}

impl MotifSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.motifs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.motifs.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Motif> {
        self.motifs.iter()
    }

    pub fn push(&mut self, motif: Motif) {
        self.index.entry(motif.key.clone()).or_insert(self.motifs.len());
        self.motifs.push(motif);
    }

    pub fn get(&self, key: &MotifKey) -> Option<&Motif> {
        self.index.get(key).map(|&i| &self.motifs[i])
    }

    /// Motifs for `keys`, in the order given. Unknown keys are skipped.
    pub fn select<'a>(&self, keys: impl IntoIterator<Item = &'a MotifKey>) -> MotifSet {
        keys.into_iter()
            .filter_map(|k| self.get(k).cloned())
            .collect()
    }

    /// Per-sample motif detail: `sample → motif id → nodes`.
    pub fn detail(&self) -> BTreeMap<&str, BTreeMap<usize, &[MotifNode]>> {
        let mut out: BTreeMap<&str, BTreeMap<usize, &[MotifNode]>> = BTreeMap::new();
        for m in &self.motifs {
            out.entry(m.sample())
                .or_default()
                .insert(m.key.id, m.nodes.as_slice());
        }
        out
    }

    /// Largest motif size in the set.
    pub fn max_motif_len(&self) -> usize {
        self.motifs.iter().map(|m| m.len()).max().unwrap_or(0)
    }
}

impl FromIterator<Motif> for MotifSet {
    fn from_iter<I: IntoIterator<Item = Motif>>(iter: I) -> Self {
        let mut set = MotifSet::new();
        for motif in iter {
            set.push(motif);
        }
        set
    }
}

impl From<Vec<Motif>> for MotifSet {
    fn from(motifs: Vec<Motif>) -> Self {
        motifs.into_iter().collect()
    }
}

impl From<MotifSet> for Vec<Motif> {
    fn from(set: MotifSet) -> Self {
        set.motifs
    }
}

impl IntoIterator for MotifSet {
    type Item = Motif;
    type IntoIter = std::vec::IntoIter<Motif>;

    fn into_iter(self) -> Self::IntoIter {
        self.motifs.into_iter()
    }
}

impl<'a> IntoIterator for &'a MotifSet {
    type Item = &'a Motif;
    type IntoIter = std::slice::Iter<'a, Motif>;

    fn into_iter(self) -> Self::IntoIter {
        self.motifs.iter()
    }
}

impl Summarizable for MotifSet {
    fn summary(&self) -> String {
        let samples: HashSet<&str> = self.motifs.iter().map(|m| m.sample()).collect();
        format!(
            "MotifSet: {} motifs in {} samples, up to {} nodes",
            self.motifs.len(),
            samples.len(),
            self.max_motif_len(),
        )
    }
}

// ---------------------------------------------------------------------------
// Assembly
// ---------------------------------------------------------------------------

/// Neighbouring spot pairs of `grid` whose unordered label pair is in
/// `pairs`. Each physical adjacency yields one two-node motif, ids counting
/// from 0 in spot order.
pub fn assemble_pairs(grid: &SampleGrid, pairs: &SignificantPairs) -> Vec<Motif> {
    let mut seen: HashSet<(GridCoord, GridCoord)> = HashSet::new();
    let mut out = Vec::new();
    for (coord, label) in grid.spots() {
        for (nb, nb_label) in grid.neighbors(coord) {
            if !pairs.contains(label, nb_label) {
                continue;
            }
            let edge = if coord <= nb { (coord, nb) } else { (nb, coord) };
            if seen.insert(edge) {
                out.push(Motif {
                    key: MotifKey::new(grid.sample(), out.len()),
                    nodes: vec![MotifNode::new(coord, label), MotifNode::new(nb, nb_label)],
                });
            }
        }
    }
    out
}

/// Seed three-node motifs for every grid in `grids`.
///
/// Each significant pair is extended by every distinct spot neighbouring
/// either endpoint; each such spot gives its own motif, so one pair may seed
/// several triads.
pub fn assemble_triads<'a>(
    grids: impl IntoIterator<Item = &'a SampleGrid>,
    pairs: &SignificantPairs,
) -> MotifSet {
    let mut out = MotifSet::new();
    for grid in grids {
        let mut next_id = 0;
        let seeds = assemble_pairs(grid, pairs);
        for pair in &seeds {
            for new_node in frontier(grid, pair) {
                let mut nodes = pair.nodes.clone();
                nodes.push(new_node);
                out.push(Motif {
                    key: MotifKey::new(grid.sample(), next_id),
                    nodes,
                });
                next_id += 1;
            }
        }
        debug!(
            "sample {}: {} seed pairs, {} triads",
            grid.sample(),
            seeds.len(),
            next_id
        );
    }
    out
}

/// Grow every motif by one node.
///
/// For each motif, every distinct occupied neighbour of any member node that
/// is not yet a member yields one new motif. Motifs without such a neighbour
/// are dropped, so an empty result means nothing can grow any further. New
/// ids count from 0 per sample. Motifs whose sample is not in `table` are
/// skipped with a warning.
pub fn expand_motifs(motifs: &MotifSet, table: &SpotTable) -> MotifSet {
    let mut next_id: HashMap<&str, usize> = HashMap::new();
    let mut out = MotifSet::new();
    for motif in motifs {
        let Some(grid) = table.grid(motif.sample()) else {
            warn!(
                "motif {}:{} refers to unknown sample, skipped",
                motif.sample(),
                motif.key.id
            );
            continue;
        };
        for new_node in frontier(grid, motif) {
            let id = next_id.entry(grid.sample()).or_insert(0);
            let mut nodes = motif.nodes.clone();
            nodes.push(new_node);
            out.push(Motif {
                key: MotifKey::new(grid.sample(), *id),
                nodes,
            });
            *id += 1;
        }
    }
    out
}

/// Distinct occupied non-member neighbours of `motif`, in node then offset
/// order.
fn frontier(grid: &SampleGrid, motif: &Motif) -> Vec<MotifNode> {
    let mut seen: HashSet<GridCoord> = HashSet::new();
    let mut out = Vec::new();
    for node in &motif.nodes {
        for (nb, label) in grid.neighbors(node.coord) {
            if !motif.contains(nb) && seen.insert(nb) {
                out.push(MotifNode::new(nb, label));
            }
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
