// Label Aggregator - Reliability-Weighted Crowd Voting
//
// Each crowd judgment adds its annotator's reliability weight to the label it
// chose. Facts seen once are dropped, facts seen twice need unanimity, and
// facts seen three or more times go to the highest score with IDK on ties.

use kgacc_common::io::AnnotatorData;
use kgacc_common::{Error, Fact, FactTable, Label, LabeledDataset, Result, Stratum};
use tracing::{debug, info};

use super::VoteTally;
use crate::reliability::ReliabilityWeights;

/// Resolve an accumulated tally into a consensus label
///
/// Returns `None` when the fact is dropped for lack of evidence.
pub fn resolve_tally(tally: &VoteTally) -> Option<Label> {
    match tally.votes() {
        0 | 1 => None,
        2 => {
            if tally.supported_labels() == 1 {
                tally.unique_leader()
            } else {
                None
            }
        }
        _ => Some(tally.unique_leader().unwrap_or(Label::Idk)),
    }
}

/// Accumulates weighted crowd votes per stratum and fact
pub struct LabelAggregator<'a> {
    weights: &'a ReliabilityWeights,
    honeypot_topic: &'a str,
    tallies: Vec<FactTable<VoteTally>>,
}

impl<'a> LabelAggregator<'a> {
    pub fn new(num_strata: usize, weights: &'a ReliabilityWeights, honeypot_topic: &'a str) -> Self {
        Self {
            weights,
            honeypot_topic,
            tallies: (0..num_strata).map(|_| FactTable::new()).collect(),
        }
    }

    /// Add one weighted vote for a fact in a stratum
    pub fn add_vote(&mut self, stratum: Stratum, fact: &Fact, label: Label, weight: f64) -> Result<()> {
        let strata = self.tallies.len();
        let tallies = self
            .tallies
            .get_mut(stratum)
            .ok_or(Error::StratumOutOfRange { stratum, strata })?;

        match tallies.get_mut(fact) {
            Some(tally) => tally.add(label, weight),
            None => {
                let mut tally = VoteTally::new();
                tally.add(label, weight);
                tallies.insert(fact.clone(), tally);
            }
        }
        Ok(())
    }

    /// Add all non-honeypot judgments of one crowd annotator
    pub fn add_annotator(&mut self, annotator: &AnnotatorData) -> Result<()> {
        let weight = self.weights.weight(&annotator.name)?;
        let mut added = 0usize;

        for (fact, annotation) in annotator.annotations.iter() {
            let meta = annotator.metadata.lookup(&annotation.batch, &annotator.name)?;
            if meta.is_honeypot(self.honeypot_topic) {
                continue;
            }
            self.add_vote(meta.stratum, fact, annotation.label, weight)?;
            added += 1;
        }

        debug!(
            "Annotator '{}' contributed {} votes with weight {:.3}",
            annotator.name, added, weight
        );
        Ok(())
    }

    /// Tally of a fact in a stratum, if any vote was cast
    pub fn tally(&self, stratum: Stratum, fact: &Fact) -> Option<&VoteTally> {
        self.tallies.get(stratum)?.get(fact)
    }

    /// Resolve every tally
    pub fn finish(self) -> AggregatedLabels {
        let mut dropped = 0usize;
        let strata: Vec<FactTable<Label>> = self
            .tallies
            .iter()
            .map(|tallies| {
                tallies
                    .iter()
                    .filter_map(|(fact, tally)| match resolve_tally(tally) {
                        Some(label) => Some((fact.clone(), label)),
                        None => {
                            dropped += 1;
                            None
                        }
                    })
                    .collect()
            })
            .collect();

        let aggregated = AggregatedLabels { strata, dropped };
        info!(
            "Aggregated {} crowd labels ({} facts dropped for insufficient evidence)",
            aggregated.len(),
            aggregated.dropped
        );
        aggregated
    }
}

/// Consensus crowd labels per stratum, in first-vote order
#[derive(Debug, Clone, Default)]
pub struct AggregatedLabels {
    strata: Vec<FactTable<Label>>,
    dropped: usize,
}

impl AggregatedLabels {
    pub fn stratum(&self, stratum: Stratum) -> Option<&FactTable<Label>> {
        self.strata.get(stratum)
    }

    pub fn get(&self, stratum: Stratum, fact: &Fact) -> Option<Label> {
        self.strata.get(stratum)?.get(fact).copied()
    }

    /// Facts discarded by the resolution policy
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn len(&self) -> usize {
        self.strata.iter().map(FactTable::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Insert the crowd labels into a dataset, replacing labels of the same fact
    pub fn merge_into(&self, dataset: &mut LabeledDataset) -> Result<()> {
        for (stratum, labels) in self.strata.iter().enumerate() {
            for (fact, label) in labels.iter() {
                dataset.insert(stratum, fact.clone(), *label)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reliability::AnnotatorReliability;
    use kgacc_common::{Annotation, AnnotationTable, BatchId, BatchMeta, BatchMetadata};

    fn weights(entries: &[(&str, f64)]) -> ReliabilityWeights {
        let mut weights = ReliabilityWeights::new();
        for (name, weight) in entries {
            weights.insert(*name, AnnotatorReliability::from_weight(*weight));
        }
        weights
    }

    fn annotator(name: &str, rows: &[(&str, Label, &str)]) -> AnnotatorData {
        let annotations: AnnotationTable = rows
            .iter()
            .map(|(s, label, batch)| (Fact::new(*s, "p", "o"), Annotation::new(*label, *batch)))
            .collect();
        let mut metadata = BatchMetadata::new();
        metadata.insert(BatchId::from("1"), BatchMeta::new(0, &["sports"]));
        metadata.insert(BatchId::from("2"), BatchMeta::new(1, &["music"]));
        metadata.insert(BatchId::from("9"), BatchMeta::new(0, &["expert"]));
        AnnotatorData {
            name: name.to_string(),
            annotations,
            metadata,
        }
    }

    #[test]
    fn test_single_vote_dropped() {
        let tally = VoteTally::from_scores([0.8, 0.0, 0.0], 1);
        assert_eq!(resolve_tally(&tally), None);
    }

    #[test]
    fn test_two_votes_agreeing() {
        let mut tally = VoteTally::new();
        tally.add(Label::Correct, 0.6);
        tally.add(Label::Correct, 0.9);
        assert_eq!(resolve_tally(&tally), Some(Label::Correct));
    }

    #[test]
    fn test_two_votes_disagreeing_dropped() {
        let mut tally = VoteTally::new();
        tally.add(Label::Correct, 0.9);
        tally.add(Label::Incorrect, 0.1);
        assert_eq!(resolve_tally(&tally), None);
    }

    #[test]
    fn test_three_votes_weighted_winner() {
        let tally = VoteTally::from_scores([0.9, 0.4, 0.0], 3);
        assert_eq!(resolve_tally(&tally), Some(Label::Correct));
    }

    #[test]
    fn test_three_votes_tied_is_idk() {
        let tally = VoteTally::from_scores([0.5, 0.5, 0.0], 3);
        assert_eq!(resolve_tally(&tally), Some(Label::Idk));
    }

    #[test]
    fn test_weight_outvotes_count() {
        // One reliable annotator against two unreliable ones
        let mut tally = VoteTally::new();
        tally.add(Label::Incorrect, 0.95);
        tally.add(Label::Correct, 0.3);
        tally.add(Label::Correct, 0.3);
        assert_eq!(resolve_tally(&tally), Some(Label::Incorrect));
    }

    #[test]
    fn test_aggregator_skips_honeypots_and_splits_strata() {
        let weights = weights(&[("ann", 0.8), ("bob", 0.7), ("cat", 0.6)]);
        let annotators = [
            annotator("ann", &[("a", Label::Correct, "1"), ("b", Label::Incorrect, "2"), ("h", Label::Correct, "9")]),
            annotator("bob", &[("a", Label::Correct, "1"), ("b", Label::Correct, "2"), ("h", Label::Correct, "9")]),
            annotator("cat", &[("a", Label::Incorrect, "1"), ("b", Label::Correct, "2"), ("h", Label::Correct, "9")]),
        ];

        let mut aggregator = LabelAggregator::new(2, &weights, "expert");
        for a in &annotators {
            aggregator.add_annotator(a).unwrap();
        }
        assert!(aggregator.tally(0, &Fact::new("h", "p", "o")).is_none());
        assert_eq!(aggregator.tally(1, &Fact::new("b", "p", "o")).unwrap().votes(), 3);

        let labels = aggregator.finish();
        assert_eq!(labels.get(0, &Fact::new("a", "p", "o")), Some(Label::Correct));
        // 0.7 + 0.6 for Correct against 0.8 for Incorrect
        assert_eq!(labels.get(1, &Fact::new("b", "p", "o")), Some(Label::Correct));
        assert_eq!(labels.len(), 2);
        assert_eq!(labels.dropped(), 0);
    }

    #[test]
    fn test_aggregated_labels_keep_first_vote_order() {
        let weights = weights(&[("ann", 0.8), ("bob", 0.7)]);
        let annotators = [
            annotator("ann", &[("c", Label::Correct, "1"), ("a", Label::Incorrect, "1")]),
            annotator("bob", &[("a", Label::Incorrect, "1"), ("c", Label::Correct, "1")]),
        ];

        let mut aggregator = LabelAggregator::new(2, &weights, "expert");
        for a in &annotators {
            aggregator.add_annotator(a).unwrap();
        }
        let labels = aggregator.finish();

        let stratum = labels.stratum(0).unwrap();
        let order: Vec<&str> = stratum.facts().map(|f| f.subject.as_str()).collect();
        assert_eq!(order, vec!["c", "a"]);
        assert_eq!(labels.get(0, &Fact::new("a", "p", "o")), Some(Label::Incorrect));
        assert_eq!(labels.get(1, &Fact::new("a", "p", "o")), None);
        assert!(labels.stratum(1).unwrap().is_empty());
        assert!(labels.stratum(5).is_none());
    }

    #[test]
    fn test_aggregator_requires_weight() {
        let weights = weights(&[("ann", 0.8)]);
        let mut aggregator = LabelAggregator::new(2, &weights, "expert");
        let err = aggregator
            .add_annotator(&annotator("zed", &[("a", Label::Correct, "1")]))
            .unwrap_err();
        assert!(matches!(err, Error::UndefinedReliability(name) if name == "zed"));
    }

    #[test]
    fn test_merge_replaces_existing_labels() {
        let weights = weights(&[("ann", 0.8), ("bob", 0.7)]);
        let mut aggregator = LabelAggregator::new(1, &weights, "expert");
        let fact = Fact::new("a", "p", "o");
        aggregator.add_vote(0, &fact, Label::Incorrect, 0.8).unwrap();
        aggregator.add_vote(0, &fact, Label::Incorrect, 0.7).unwrap();
        let labels = aggregator.finish();

        let mut dataset = LabeledDataset::new(1);
        dataset.insert(0, fact.clone(), Label::Correct).unwrap();
        labels.merge_into(&mut dataset).unwrap();
        assert_eq!(dataset.get(0, &fact), Some(Label::Incorrect));
    }

    #[test]
    fn test_vote_outside_strata_rejected() {
        let weights = ReliabilityWeights::new();
        let mut aggregator = LabelAggregator::new(1, &weights, "expert");
        let err = aggregator
            .add_vote(3, &Fact::new("a", "p", "o"), Label::Correct, 0.5)
            .unwrap_err();
        assert!(matches!(err, Error::StratumOutOfRange { stratum: 3, strata: 1 }));
    }
}
