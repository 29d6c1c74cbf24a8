//! Canonical geometric fingerprint of a motif.
//!
//! A [`MotifSignature`] is the list of pairwise Euclidean distances between
//! motif nodes, each tagged with the order-normalised label pair of its two
//! endpoints, sorted by distance. Distances are rounded to six decimals
//! before comparison. Two motifs match when their sorted distance sequences
//! are identical and every distance carries the same multiset of label
//! pairs, which makes matching invariant to translation, rotation,
//! reflection and node order.

use std::collections::BTreeMap;

use crate::motif::Motif;

/// Distances are compared as integers in units of this scale.
pub const DISTANCE_SCALE: f64 = 1e6;

/// One node pair of a signature.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SignatureEntry {
    /// Distance rounded to six decimals, in millionths.
    pub distance_key: i64,
    /// Endpoint labels, lexicographically ordered.
    pub labels: (String, String),
}

impl SignatureEntry {
    /// The rounded distance.
    pub fn distance(&self) -> f64 {
        self.distance_key as f64 / DISTANCE_SCALE
    }
}

/// Isometry- and enumeration-invariant fingerprint of a motif.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MotifSignature {
    /// Entries sorted by distance, then label pair.
    entries: Vec<SignatureEntry>,
    /// Node count per label.
    label_counts: BTreeMap<String, usize>,
}

impl MotifSignature {
    /// Signature of a grid motif, using `(row, col)` as planar coordinates.
    pub fn of(motif: &Motif) -> Self {
        Self::from_points(
            motif
                .nodes
                .iter()
                .map(|n| ((n.coord.row as f64, n.coord.col as f64), n.label.as_str())),
        )
    }

    /// Signature of arbitrary labelled points in the plane.
    pub fn from_points<'a>(points: impl IntoIterator<Item = ((f64, f64), &'a str)>) -> Self {
        let points: Vec<((f64, f64), &str)> = points.into_iter().collect();
        let n = points.len();

        let (sx, sy) = points
            .iter()
            .fold((0.0, 0.0), |(ax, ay), ((x, y), _)| (ax + x, ay + y));
        let centroid = if n > 0 {
            (sx / n as f64, sy / n as f64)
        } else {
            (0.0, 0.0)
        };
        let centred: Vec<(f64, f64)> = points
            .iter()
            .map(|((x, y), _)| (x - centroid.0, y - centroid.1))
            .collect();

        let mut entries = Vec::with_capacity(n * n.saturating_sub(1) / 2);
        for i in 0..n {
            for j in (i + 1)..n {
                let d = ((centred[i].0 - centred[j].0).powi(2)
                    + (centred[i].1 - centred[j].1).powi(2))
                .sqrt();
                let (a, b) = (points[i].1, points[j].1);
                let labels = if a <= b { (a, b) } else { (b, a) };
                entries.push(SignatureEntry {
                    distance_key: (d * DISTANCE_SCALE).round() as i64,
                    labels: (labels.0.to_string(), labels.1.to_string()),
                });
            }
        }
        // Sorting on the label pair as well turns the per-distance multiset
        // comparison into plain equality.
        entries.sort();

        let mut label_counts = BTreeMap::new();
        for (_, label) in &points {
            *label_counts.entry(label.to_string()).or_insert(0) += 1;
        }

        Self {
            entries,
            label_counts,
        }
    }

    /// Whether two motifs have the same shape and label placement.
    pub fn matches(&self, other: &MotifSignature) -> bool {
        self == other
    }

    pub fn entries(&self) -> &[SignatureEntry] {
        &self.entries
    }

    /// Node count per label.
    pub fn label_counts(&self) -> &BTreeMap<String, usize> {
        &self.label_counts
    }

    /// Number of nodes.
    pub fn n_nodes(&self) -> usize {
        self.label_counts.values().sum()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
