//! Statistical methods for the stniche spatial niche toolkit.
//!
//! - **Ranking** — average ranks with tie bookkeeping ([`rank`])
//! - **Distributions** — standard normal tail probabilities ([`distribution`])
//! - **Hypothesis testing** — Mann-Whitney U with exact and asymptotic
//!   p-values and one- or two-sided alternatives ([`testing`])
//! - **Multiple testing correction** — Bonferroni, Benjamini-Hochberg
//!   ([`correction`])
//! - **Descriptive statistics** — means over vectors and aligned columns
//!   ([`descriptive`])

pub mod correction;
pub mod descriptive;
pub mod distribution;
pub mod rank;
pub mod testing;

pub use correction::{benjamini_hochberg, bonferroni, correct, CorrectionMethod};
pub use descriptive::{column_means, mean, mean_or_zero};
pub use distribution::Normal;
pub use rank::{average_ranks, Ranking};
pub use testing::{mann_whitney_u, mann_whitney_u_with, Alternative, MwuMethod, TestResult};
