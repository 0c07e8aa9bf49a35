// Fusion Module - Multi-Judge Label Consensus
//
// Two fusers share one vote representation:
// - Ground truth: equal-weight expert majority with a tie-breaking third expert
// - Label aggregation: reliability-weighted crowd voting

pub mod ground_truth;
pub mod label_aggregator;

pub use ground_truth::{resolve_ground_truth, resolve_label, GroundTruth, ResolvedFact};
pub use label_aggregator::{resolve_tally, AggregatedLabels, LabelAggregator};

use kgacc_common::Label;

/// Weighted votes for the three labels of one fact, plus the raw vote count
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VoteTally {
    scores: [f64; 3],
    votes: usize,
}

impl VoteTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tally directly from slot scores (ordered Correct, Incorrect, IDK)
    pub fn from_scores(scores: [f64; 3], votes: usize) -> Self {
        Self { scores, votes }
    }

    /// Add one judgment carrying `weight`
    pub fn add(&mut self, label: Label, weight: f64) {
        self.scores[label.slot()] += weight;
        self.votes += 1;
    }

    pub fn score(&self, label: Label) -> f64 {
        self.scores[label.slot()]
    }

    pub fn scores(&self) -> [f64; 3] {
        self.scores
    }

    pub fn votes(&self) -> usize {
        self.votes
    }

    /// Number of labels that received any weight
    pub fn supported_labels(&self) -> usize {
        self.scores.iter().filter(|&&s| s != 0.0).count()
    }

    /// Label with the strictly highest score
    ///
    /// Returns `None` when two or more labels share the maximum.
    pub fn unique_leader(&self) -> Option<Label> {
        let max = self.scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let at_max = self.scores.iter().filter(|&&s| s == max).count();
        if at_max != 1 {
            return None;
        }
        Label::ALL
            .into_iter()
            .find(|label| self.scores[label.slot()] == max)
    }
}
