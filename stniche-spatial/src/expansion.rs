//! Iterative node-by-node motif growth.
//!
//! [`ExpansionController`] repeatedly grows the current motifs by one node,
//! regroups and rescores them, and keeps the members of the best enriched
//! group. It stops at the first round that cannot improve on the previous
//! one and returns that previous motif set.

use std::fmt;

use log::{debug, info};
use stniche_core::{Result, Summarizable};

use crate::config::ExpansionConfig;
use crate::dataset::SpotTable;
use crate::grouping::group_motifs_by_label_set;
use crate::motif::{expand_motifs, MotifSet};
use crate::scoring::{score_groups, GroupStatistic, SampleUniverse};

/// Why expansion stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum HaltReason {
    /// No motif had an unused neighbouring spot.
    NoExpansionPossible,
    /// No expanded group exceeded the fold-change threshold.
    NoSignificantGroup,
    /// Enriched groups existed but none reached the coverage threshold.
    CoverageInsufficient,
    /// The round ceiling was reached.
    RoundLimit,
}

impl fmt::Display for HaltReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HaltReason::NoExpansionPossible => "no expansion possible",
            HaltReason::NoSignificantGroup => "no significant group",
            HaltReason::CoverageInsufficient => "coverage insufficient",
            HaltReason::RoundLimit => "round limit reached",
        })
    }
}

/// State of the expansion loop.
#[derive(Debug, Clone, PartialEq)]
pub enum ExpansionState {
    /// Still growing from these motifs.
    Active(MotifSet),
    /// Finished; `motifs` is the last set that passed every check.
    Halted { motifs: MotifSet, reason: HaltReason },
}

/// Result of a finished expansion.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExpansionOutcome {
    /// Final motif set; the seed if the first round already failed.
    pub motifs: MotifSet,
    pub reason: HaltReason,
    /// Rounds that were accepted.
    pub rounds: usize,
    /// Statistics of the group selected in each accepted round.
    pub history: Vec<GroupStatistic>,
}

impl Summarizable for ExpansionOutcome {
    fn summary(&self) -> String {
        format!(
            "Expansion halted after {} accepted rounds ({}): {} motifs of {} nodes",
            self.rounds,
            self.reason,
            self.motifs.len(),
            self.motifs.max_motif_len(),
        )
    }
}

/// Drives grow → group → score → select rounds for one focus group.
#[derive(Debug, Clone)]
pub struct ExpansionController<'a> {
    table: &'a SpotTable,
    universe: SampleUniverse,
    config: ExpansionConfig,
}

impl<'a> ExpansionController<'a> {
    /// Controller scoring over the samples of `focus_group`.
    pub fn new(table: &'a SpotTable, focus_group: &str, config: ExpansionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            table,
            universe: SampleUniverse::for_group(table, focus_group),
            config,
        })
    }

    /// Controller over an explicit sample universe.
    pub fn with_universe(
        table: &'a SpotTable,
        universe: SampleUniverse,
        config: ExpansionConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self { table, universe, config })
    }

    /// Round ceiling: configured, or the size of the largest sample.
    pub fn max_rounds(&self) -> usize {
        self.config
            .max_rounds
            .unwrap_or_else(|| self.table.max_sample_size().max(1))
    }

    /// Perform one round from `current`.
    ///
    /// Returns the next state and, when the round is accepted, the
    /// statistics of the selected group.
    pub fn step(&self, current: MotifSet) -> Result<(ExpansionState, Option<GroupStatistic>)> {
        let expanded = expand_motifs(&current, self.table);
        if expanded.is_empty() {
            return Ok((halt(current, HaltReason::NoExpansionPossible), None));
        }

        let grouping = group_motifs_by_label_set(&expanded);
        let stats = score_groups(&grouping, &self.universe, &self.config.scoring)?;
        let scoring = &self.config.scoring;

        let enriched: Vec<&GroupStatistic> = stats
            .iter()
            .filter(|r| r.fold_change > scoring.fc_threshold)
            .collect();
        if enriched.is_empty() {
            return Ok((halt(current, HaltReason::NoSignificantGroup), None));
        }

        let max_coverage = enriched
            .iter()
            .map(|r| r.coverage)
            .fold(f64::NEG_INFINITY, f64::max);
        info!("expansion: {} enriched groups, max coverage {:.3}", enriched.len(), max_coverage);
        if max_coverage < scoring.coverage_threshold {
            return Ok((halt(current, HaltReason::CoverageInsufficient), None));
        }

        // First minimum in adjusted-p order wins ties.
        let mut best = enriched[0];
        for &row in &enriched[1..] {
            if row.p_value < best.p_value {
                best = row;
            }
        }
        let members = &grouping.get(best.group_id)?.members;
        let next = expanded.select(members.iter());
        debug!(
            "expansion: selected group {} with {} motifs (p={:.3e})",
            best.group_id,
            next.len(),
            best.p_value
        );
        Ok((ExpansionState::Active(next), Some(best.clone())))
    }

    /// Run until halted, starting from `seed`.
    pub fn run(&self, seed: MotifSet) -> Result<ExpansionOutcome> {
        let max_rounds = self.max_rounds();
        let mut state = ExpansionState::Active(seed);
        let mut history = Vec::new();
        let mut round = 0;

        loop {
            let current = match state {
                ExpansionState::Halted { motifs, reason } => {
                    info!(
                        "expansion finished after {} rounds: {}",
                        history.len(),
                        reason
                    );
                    return Ok(ExpansionOutcome {
                        motifs,
                        reason,
                        rounds: history.len(),
                        history,
                    });
                }
                ExpansionState::Active(current) => current,
            };
            if round == max_rounds {
                state = halt(current, HaltReason::RoundLimit);
                continue;
            }
            round += 1;
            info!("expansion round {round}: growing {} motifs", current.len());
            let (next, selected) = self.step(current)?;
            history.extend(selected);
            state = next;
        }
    }
}

fn halt(motifs: MotifSet, reason: HaltReason) -> ExpansionState {
    info!("expansion halting: {reason}");
    ExpansionState::Halted { motifs, reason }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
