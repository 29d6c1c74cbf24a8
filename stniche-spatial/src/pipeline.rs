//! End-to-end niche discovery.
//!
//! ```text
//! SpotTable ─► pairwise_enrichment ─► SignificantPairs
//!           ─► assemble_triads (focus samples) ─► group_motifs ─► score_groups
//!           ─► filter_unique_significant ─► run_iterative_analysis
//! ```
//!
//! Every stage returns a new value; nothing is mutated in place between
//! stages.

use std::collections::BTreeMap;

use log::{info, warn};
use stniche_core::{Result, Summarizable};

use crate::config::{ExpansionConfig, NicheConfig};
use crate::dataset::SpotTable;
use crate::expansion::{ExpansionController, ExpansionOutcome};
use crate::grouping::{group_motifs, MotifGrouping};
use crate::membership::NicheMembership;
use crate::motif::{assemble_triads, MotifSet};
use crate::pairwise::{pairwise_enrichment, PairwiseResult};
use crate::scoring::{
    filter_unique_significant, score_groups, GroupStatistic, GroupStatistics, SampleUniverse,
};

/// Seed stage: significant pairs, three-node motifs and their scores.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SeedAnalysis {
    pub pairwise: PairwiseResult,
    /// Triads assembled in the focus samples.
    pub motifs: MotifSet,
    pub grouping: MotifGrouping,
    /// Scores of every triad group, sorted by adjusted p-value.
    pub statistics: GroupStatistics,
    /// One group per label composition, cut at the seed p threshold.
    pub selected: Vec<GroupStatistic>,
}

/// Run the seed stage for the focus group of `config`.
pub fn discover_seed(table: &SpotTable, config: &NicheConfig) -> Result<SeedAnalysis> {
    config.validate()?;
    let focus = config.focus_group()?;

    let pairwise = pairwise_enrichment(table, &config.pairwise)?;
    let pairs = pairwise.significant_pairs();
    info!("{}", pairwise.summary());

    let motifs = assemble_triads(table.grids_in_group(focus), &pairs);
    let grouping = group_motifs(&motifs);
    let universe = SampleUniverse::for_group(table, focus);
    let statistics = score_groups(&grouping, &universe, &config.seed_scoring)?;
    let selected = filter_unique_significant(
        &statistics,
        &grouping,
        &motifs,
        config.seed_scoring.p_threshold,
    );
    info!(
        "seed: {} triads in {} groups, {} selected",
        motifs.len(),
        grouping.len(),
        selected.len()
    );

    Ok(SeedAnalysis {
        pairwise,
        motifs,
        grouping,
        statistics,
        selected,
    })
}

/// Expand each listed seed group on its own.
///
/// Group ids are resolved against `grouping`, member motifs against
/// `motifs`. Unknown ids, motifs and samples are logged and skipped, and a
/// group left without motifs is skipped entirely. Results are keyed by the
/// row's group id.
pub fn run_iterative_analysis(
    rows: &[GroupStatistic],
    grouping: &MotifGrouping,
    motifs: &MotifSet,
    table: &SpotTable,
    focus_group: &str,
    config: &ExpansionConfig,
) -> Result<BTreeMap<usize, ExpansionOutcome>> {
    let controller = ExpansionController::new(table, focus_group, *config)?;
    let mut out = BTreeMap::new();

    for row in rows {
        let group = match grouping.get(row.group_id) {
            Ok(g) => g,
            Err(e) => {
                warn!("{e}, skipped");
                continue;
            }
        };
        let mut seed = MotifSet::new();
        for key in &group.members {
            match motifs.get(key) {
                Some(m) if table.grid(m.sample()).is_some() => seed.push(m.clone()),
                Some(_) => warn!("group {}: sample {} not in table, skipped", group.id, key.sample),
                None => warn!("group {}: motif {}:{} not found, skipped", group.id, key.sample, key.id),
            }
        }
        if seed.is_empty() {
            warn!("group {}: no valid motifs, skipped", group.id);
            continue;
        }

        info!("expanding group {} from {} motifs", group.id, seed.len());
        let outcome = controller.run(seed)?;
        info!("group {}: {}", group.id, outcome.summary());
        out.insert(row.group_id, outcome);
    }
    Ok(out)
}

/// Everything a discovery run produces.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NicheReport {
    pub focus_group: String,
    pub seed: SeedAnalysis,
    /// Final expansion of each selected seed group, keyed by seed group id.
    pub expansions: BTreeMap<usize, ExpansionOutcome>,
}

impl NicheReport {
    /// Spots covered by the final motifs of seed group `group_id`.
    pub fn membership(&self, group_id: usize) -> Option<NicheMembership> {
        self.expansions
            .get(&group_id)
            .map(|o| NicheMembership::from_motifs(&o.motifs))
    }
}

impl Summarizable for NicheReport {
    fn summary(&self) -> String {
        format!(
            "NicheReport ({}): {} significant pairs, {} seed groups selected, {} expanded",
            self.focus_group,
            self.seed.pairwise.significant.len(),
            self.seed.selected.len(),
            self.expansions.len(),
        )
    }
}

/// Discover niches enriched in the focus group of `config`.
///
/// Fails with a configuration error when no focus group is set or it is
/// not one of the compared groups. An empty result at any stage is not an
/// error; the report then simply has no expansions.
pub fn discover_niches(table: &SpotTable, config: &NicheConfig) -> Result<NicheReport> {
    let seed = discover_seed(table, config)?;
    let focus = config.focus_group()?;
    let expansions = run_iterative_analysis(
        &seed.selected,
        &seed.grouping,
        &seed.motifs,
        table,
        focus,
        &config.expansion,
    )?;
    Ok(NicheReport {
        focus_group: focus.to_string(),
        seed,
        expansions,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
