//! Spot-level niche membership derived from a final motif set.

use std::collections::{BTreeMap, BTreeSet};

use stniche_core::Summarizable;

use crate::grid::GridCoord;
use crate::motif::MotifSet;

/// Per-sample set of spots covered by at least one motif.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NicheMembership {
    samples: BTreeMap<String, BTreeSet<GridCoord>>,
}

impl NicheMembership {
    /// Collect the coordinates of every node of every motif in `motifs`.
    pub fn from_motifs(motifs: &MotifSet) -> Self {
        let mut samples: BTreeMap<String, BTreeSet<GridCoord>> = BTreeMap::new();
        for motif in motifs {
            samples
                .entry(motif.sample().to_string())
                .or_default()
                .extend(motif.nodes.iter().map(|n| n.coord));
        }
        Self { samples }
    }

    pub fn is_niche(&self, sample: &str, coord: GridCoord) -> bool {
        self.samples
            .get(sample)
            .is_some_and(|coords| coords.contains(&coord))
    }

    /// Niche spots of `sample`, in coordinate order.
    pub fn spots(&self, sample: &str) -> impl Iterator<Item = GridCoord> + '_ {
        self.samples.get(sample).into_iter().flatten().copied()
    }

    /// Samples with at least one niche spot.
    pub fn samples(&self) -> impl Iterator<Item = &str> + '_ {
        self.samples.keys().map(String::as_str)
    }

    /// Total niche spots over all samples.
    pub fn len(&self) -> usize {
        self.samples.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl Summarizable for NicheMembership {
    fn summary(&self) -> String {
        format!(
            "NicheMembership: {} spots in {} samples",
            self.len(),
            self.samples.len()
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
