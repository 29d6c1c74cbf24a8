//! Partition motifs into shape classes.
//!
//! Grouping is greedy and representative-based: motifs are visited in order
//! and each joins the first existing group whose representative (first
//! member) has a matching [`MotifSignature`], or founds a new group. This
//! costs O(groups × motifs) signature comparisons instead of a full pairwise
//! clustering. Signature matching is exact equality after rounding, so it
//! is transitive and the resulting classes do not depend on visiting order;
//! only the group ids do.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use log::debug;
use stniche_core::{NicheError, Result, Summarizable};

use crate::motif::{Motif, MotifKey, MotifSet};
use crate::signature::MotifSignature;

/// Motifs sharing one signature.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MotifGroup {
    pub id: usize,
    /// Member motifs, representative first.
    pub members: Vec<MotifKey>,
    /// Signature of the representative.
    pub signature: MotifSignature,
}

impl MotifGroup {
    /// First member; `None` only for a hand-built empty group.
    pub fn representative(&self) -> Option<&MotifKey> {
        self.members.first()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// The groups of one grouping pass. Ids are dense, in formation order, and
/// only meaningful for this pass.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MotifGrouping {
    groups: Vec<MotifGroup>,
}

impl MotifGrouping {
    pub fn groups(&self) -> &[MotifGroup] {
        &self.groups
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Look up a group; stale ids from another pass are a
    /// [`NicheError::MissingReference`].
    pub fn get(&self, id: usize) -> Result<&MotifGroup> {
        self.groups
            .get(id)
            .ok_or_else(|| NicheError::MissingReference(format!("motif group {id}")))
    }

    /// `group id → members`.
    pub fn as_map(&self) -> BTreeMap<usize, Vec<MotifKey>> {
        self.groups
            .iter()
            .map(|g| (g.id, g.members.clone()))
            .collect()
    }

    /// Membership as sets, independent of group ids and member order.
    pub fn partition(&self) -> BTreeSet<BTreeSet<MotifKey>> {
        self.groups
            .iter()
            .map(|g| g.members.iter().cloned().collect())
            .collect()
    }

    fn insert(&mut self, motif: &Motif) {
        let signature = MotifSignature::of(motif);
        match self
            .groups
            .iter_mut()
            .find(|g| g.signature.matches(&signature))
        {
            Some(group) => group.members.push(motif.key.clone()),
            None => {
                let id = self.groups.len();
                self.groups.push(MotifGroup {
                    id,
                    members: vec![motif.key.clone()],
                    signature,
                });
            }
        }
    }
}

impl Summarizable for MotifGrouping {
    fn summary(&self) -> String {
        let motifs: usize = self.groups.iter().map(|g| g.len()).sum();
        format!("MotifGrouping: {} motifs in {} groups", motifs, self.groups.len())
    }
}

/// Group motifs in the order given.
pub fn group_motifs(motifs: &MotifSet) -> MotifGrouping {
    let mut grouping = MotifGrouping::default();
    for motif in motifs {
        grouping.insert(motif);
    }
    debug!("grouped {} motifs into {} groups", motifs.len(), grouping.len());
    grouping
}

/// Group motifs after bucketing them by label set.
///
/// Buckets are visited in first-seen order and motifs keep their relative
/// order within a bucket, so motifs of one composition receive adjacent
/// group ids. Membership is the same as [`group_motifs`].
pub fn group_motifs_by_label_set(motifs: &MotifSet) -> MotifGrouping {
    let mut buckets: Vec<Vec<&Motif>> = Vec::new();
    let mut bucket_of: HashMap<BTreeSet<&str>, usize> = HashMap::new();
    for motif in motifs {
        let labels: BTreeSet<&str> = motif.nodes.iter().map(|n| n.label.as_str()).collect();
        let idx = *bucket_of.entry(labels).or_insert_with(|| {
            buckets.push(Vec::new());
            buckets.len() - 1
        });
        buckets[idx].push(motif);
    }

    let mut grouping = MotifGrouping::default();
    for motif in buckets.into_iter().flatten() {
        grouping.insert(motif);
    }
    debug!(
        "grouped {} motifs into {} groups (label-set buckets)",
        motifs.len(),
        grouping.len()
    );
    grouping
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::grid::GridCoord;
    use crate::motif::MotifNode;
    use proptest::prelude::*;

    /// Small connected-ish motifs drawn from a handful of shapes.
    fn motifs() -> impl Strategy<Value = Vec<Vec<((i64, i64), u8)>>> {
        let shapes: Vec<Vec<(i64, i64)>> = vec![
            vec![(0, 0), (0, 2), (0, 4)],
            vec![(0, 0), (0, 2), (1, 1)],
            vec![(0, 0), (0, 2), (1, 3)],
            vec![(0, 0), (1, 1), (2, 2)],
        ];
        let motif = (0..shapes.len(), -5i64..5, -5i64..5, proptest::collection::vec(0u8..2, 3))
            .prop_map(move |(s, dr, dc, labels)| {
                shapes[s]
                    .iter()
                    .zip(labels)
                    .map(|(&(r, c), l)| ((r + dr, c + dc), l))
                    .collect::<Vec<_>>()
            });
        proptest::collection::vec(motif, 1..25)
    }

    fn to_set(raw: &[Vec<((i64, i64), u8)>]) -> MotifSet {
        raw.iter()
            .enumerate()
            .map(|(i, nodes)| Motif {
                key: MotifKey::new("s", i),
                nodes: nodes
                    .iter()
                    .map(|&((r, c), l)| MotifNode::new(GridCoord::new(r, c), format!("L{l}")))
                    .collect(),
            })
            .collect()
    }

    proptest! {
        #[test]
        fn membership_independent_of_order(raw in motifs(), seed in 0usize..1000) {
            let original = to_set(&raw);
            let mut shuffled: Vec<Motif> = original.iter().cloned().collect();
            // Deterministic shuffle driven by the seed.
            let n = shuffled.len();
            for i in (1..n).rev() {
                let j = (seed.wrapping_mul(31).wrapping_add(i * 17)) % (i + 1);
                shuffled.swap(i, j);
            }
            let shuffled: MotifSet = shuffled.into_iter().collect();
            prop_assert_eq!(group_motifs(&original).partition(), group_motifs(&shuffled).partition());
            prop_assert_eq!(
                group_motifs(&original).partition(),
                group_motifs_by_label_set(&original).partition()
            );
        }
    }
}
