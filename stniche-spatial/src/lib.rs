//! Discovery of condition-enriched spatial niches on hexagonal spot grids.
//!
//! A niche is a small arrangement of cluster labels on neighbouring spots
//! that recurs across the samples of one condition more often than other
//! arrangements do. Discovery runs in stages:
//!
//! - **Grid adjacency**: [`SpotTable`], [`SampleGrid`], [`AdjacencyMatrix`]
//! - **Pairwise enrichment**: [`pairwise_enrichment`] compares label contact
//!   rates between two conditions
//! - **Motif assembly**: [`assemble_triads`], [`expand_motifs`]
//! - **Geometric grouping**: [`MotifSignature`], [`group_motifs`]
//! - **Enrichment scoring**: [`score_groups`], [`filter_unique_significant`]
//! - **Iterative expansion**: [`ExpansionController`]
//!
//! [`discover_niches`] runs them all for the focus condition of a
//! [`NicheConfig`].
//!
//! # Quick start
//!
//! ```
//! use stniche_spatial::{adjacency_matrix, Spot, SpotTable};
//!
//! let spots = ["B", "A", "B", "C"]
//!     .iter()
//!     .enumerate()
//!     .map(|(i, l)| Spot::new(0, 2 * i as i64, "s1", *l, "tumor"))
//!     .collect();
//! let table = SpotTable::new(spots).unwrap();
//!
//! let adj = adjacency_matrix(table.grid("s1").unwrap());
//! // The single A spot touches two B spots.
//! assert_eq!(adj.get("A", "B"), 2.0);
//! assert_eq!(adj.get("C", "A"), 0.0);
//! ```

pub mod config;
pub mod dataset;
pub mod expansion;
pub mod grid;
pub mod grouping;
pub mod membership;
pub mod motif;
pub mod pairwise;
pub mod pipeline;
pub mod scoring;
pub mod signature;

pub use config::{ExpansionConfig, NicheConfig, PairwiseConfig, ScoringConfig};
pub use dataset::{Spot, SpotTable};
pub use expansion::{ExpansionController, ExpansionOutcome, ExpansionState, HaltReason};
pub use grid::{adjacency_matrix, AdjacencyMatrix, GridCoord, SampleGrid, HEX_NEIGHBOR_OFFSETS};
pub use grouping::{group_motifs, group_motifs_by_label_set, MotifGroup, MotifGrouping};
pub use membership::NicheMembership;
pub use motif::{assemble_pairs, assemble_triads, expand_motifs, Motif, MotifKey, MotifNode, MotifSet};
pub use pairwise::{
    compare_groups, pairwise_enrichment, GroupAverageMatrix, PairStatistic, PairwiseResult,
    SignificantPairs,
};
pub use pipeline::{discover_niches, discover_seed, run_iterative_analysis, NicheReport, SeedAnalysis};
pub use scoring::{
    filter_unique_significant, score_groups, GroupStatistic, GroupStatistics, SampleUniverse,
    FOLD_CHANGE_EPSILON,
};
pub use signature::{MotifSignature, SignatureEntry, DISTANCE_SCALE};
