//! Analysis thresholds.
//!
//! Each stage takes a small plain config struct with defaults suited to
//! Visium-scale data. `validate` is called by the stage entry points, so
//! an out-of-range threshold fails before any work is done.

use stniche_core::{NicheError, Result};

/// Pairwise neighbourhood enrichment between two condition groups.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PairwiseConfig {
    /// The two condition groups compared.
    pub groups: (String, String),
    /// Group whose enrichment is tested for; must be one of `groups`.
    pub focus_group: Option<String>,
    /// Required ratio of focus-group mean over other-group mean.
    pub enrichment_fold: f64,
    /// FDR cutoff for a pair to be retained.
    pub p_value: f64,
}

impl PairwiseConfig {
    pub fn new(group1: impl Into<String>, group2: impl Into<String>) -> Self {
        Self {
            groups: (group1.into(), group2.into()),
            ..Self::default()
        }
    }

    /// Set the focus group.
    pub fn with_focus(mut self, focus: impl Into<String>) -> Self {
        self.focus_group = Some(focus.into());
        self
    }

    /// The group compared against the focus group, if a focus is set.
    pub fn other_group(&self) -> Option<&str> {
        let focus = self.focus_group.as_deref()?;
        if focus == self.groups.0 {
            Some(&self.groups.1)
        } else {
            Some(&self.groups.0)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.groups.0 == self.groups.1 {
            return Err(NicheError::Config(format!(
                "compared groups must differ, got '{}' twice",
                self.groups.0
            )));
        }
        if let Some(focus) = &self.focus_group {
            if *focus != self.groups.0 && *focus != self.groups.1 {
                return Err(NicheError::Config(format!(
                    "focus group '{}' is not one of the compared groups ('{}', '{}')",
                    focus, self.groups.0, self.groups.1
                )));
            }
        }
        check_non_negative("enrichment_fold", self.enrichment_fold)?;
        check_probability("p_value", self.p_value)
    }
}

impl Default for PairwiseConfig {
    fn default() -> Self {
        Self {
            groups: ("GroupA".into(), "GroupB".into()),
            focus_group: None,
            enrichment_fold: 4.0,
            p_value: 0.05,
        }
    }
}

/// Thresholds deciding whether a motif group is enriched.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScoringConfig {
    /// A group must exceed this fold change over the other groups.
    pub fc_threshold: f64,
    /// Adjusted p-value cutoff.
    pub p_threshold: f64,
    /// Minimum fraction of focus samples containing the group.
    pub coverage_threshold: f64,
}

impl ScoringConfig {
    pub fn validate(&self) -> Result<()> {
        check_non_negative("fc_threshold", self.fc_threshold)?;
        check_probability("p_threshold", self.p_threshold)?;
        if !(0.0..=1.0).contains(&self.coverage_threshold) {
            return Err(NicheError::InvalidInput(format!(
                "coverage_threshold must lie in [0, 1], got {}",
                self.coverage_threshold
            )));
        }
        Ok(())
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            fc_threshold: 4.0,
            p_threshold: 0.05,
            coverage_threshold: 0.8,
        }
    }
}

/// Iterative node-by-node growth of motifs.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExpansionConfig {
    pub scoring: ScoringConfig,
    /// Hard ceiling on expansion rounds. `None` derives it from the largest
    /// sample, since a motif can never outgrow its sample.
    pub max_rounds: Option<usize>,
}

impl ExpansionConfig {
    pub fn validate(&self) -> Result<()> {
        self.scoring.validate()?;
        if self.max_rounds == Some(0) {
            return Err(NicheError::InvalidInput(
                "max_rounds must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

impl Default for ExpansionConfig {
    fn default() -> Self {
        Self {
            scoring: ScoringConfig {
                coverage_threshold: 0.6,
                ..ScoringConfig::default()
            },
            max_rounds: None,
        }
    }
}

/// Configuration of a full discovery run.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NicheConfig {
    pub pairwise: PairwiseConfig,
    /// Scoring of the seeded three-node motifs.
    pub seed_scoring: ScoringConfig,
    pub expansion: ExpansionConfig,
}

impl NicheConfig {
    /// Focus group of the run. Discovery needs one.
    pub fn focus_group(&self) -> Result<&str> {
        self.pairwise.focus_group.as_deref().ok_or_else(|| {
            NicheError::Config("niche discovery requires a focus group".into())
        })
    }

    pub fn validate(&self) -> Result<()> {
        self.pairwise.validate()?;
        self.focus_group()?;
        self.seed_scoring.validate()?;
        self.expansion.validate()
    }
}

fn check_probability(name: &str, value: f64) -> Result<()> {
    if !(value > 0.0 && value <= 1.0) {
        return Err(NicheError::InvalidInput(format!(
            "{name} must lie in (0, 1], got {value}"
        )));
    }
    Ok(())
}

fn check_non_negative(name: &str, value: f64) -> Result<()> {
    if !(value.is_finite() && value >= 0.0) {
        return Err(NicheError::InvalidInput(format!(
            "{name} must be finite and non-negative, got {value}"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(PairwiseConfig::default().validate().is_ok());
        assert!(ScoringConfig::default().validate().is_ok());
        assert!(ExpansionConfig::default().validate().is_ok());
        assert_eq!(ExpansionConfig::default().scoring.coverage_threshold, 0.6);
    }

    #[test]
    fn focus_outside_groups_is_config_error() {
        let cfg = PairwiseConfig::new("tumor", "normal").with_focus("stroma");
        assert!(matches!(cfg.validate(), Err(NicheError::Config(_))));
    }

    #[test]
    fn identical_groups_rejected() {
        let cfg = PairwiseConfig::new("a", "a");
        assert!(matches!(cfg.validate(), Err(NicheError::Config(_))));
    }

    #[test]
    fn other_group() {
        let cfg = PairwiseConfig::new("tumor", "normal").with_focus("normal");
        assert_eq!(cfg.other_group(), Some("tumor"));
        assert_eq!(PairwiseConfig::new("a", "b").other_group(), None);
    }

    #[test]
    fn thresholds_checked() {
        let mut cfg = PairwiseConfig::new("a", "b");
        cfg.p_value = 0.0;
        assert!(cfg.validate().is_err());
        cfg.p_value = 0.05;
        cfg.enrichment_fold = f64::NAN;
        assert!(cfg.validate().is_err());

        let s = ScoringConfig { coverage_threshold: 1.5, ..ScoringConfig::default() };
        assert!(s.validate().is_err());

        let e = ExpansionConfig { max_rounds: Some(0), ..ExpansionConfig::default() };
        assert!(e.validate().is_err());
    }

    #[test]
    fn discovery_needs_focus() {
        let cfg = NicheConfig::default();
        assert!(matches!(cfg.validate(), Err(NicheError::Config(_))));
        let cfg = NicheConfig {
            pairwise: PairwiseConfig::new("a", "b").with_focus("a"),
            ..NicheConfig::default()
        };
        assert!(cfg.validate().is_ok());
    }
}
