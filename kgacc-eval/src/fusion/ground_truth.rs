// Ground Truth Resolver - Expert Majority Vote with Tie-Breaker
//
// The first two experts decide when they agree. Otherwise the third expert's
// judgment is added and the strict majority wins; three distinct judgments
// resolve to IDK.

use kgacc_common::io::AnnotatorData;
use kgacc_common::{
    BatchId, Error, Fact, FactTable, Label, LabelCounts, LabeledDataset, Result, Stratum,
};
use tracing::{debug, info};

use super::VoteTally;

/// Resolve one fact from three expert judgments
///
/// The tie-breaker never overrides agreement between the first two experts.
pub fn resolve_label(first: Label, second: Label, tie_breaker: Label) -> Label {
    if first == second {
        return first;
    }

    let mut tally = VoteTally::new();
    tally.add(first, 1.0);
    tally.add(second, 1.0);
    tally.add(tie_breaker, 1.0);

    tally.unique_leader().unwrap_or(Label::Idk)
}

/// Ground-truth label of one fact with its sampling coordinates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFact {
    pub label: Label,
    pub batch: BatchId,
    pub stratum: Stratum,
}

/// Expert ground truth, in the first expert's table order
#[derive(Debug, Clone, Default)]
pub struct GroundTruth {
    facts: FactTable<ResolvedFact>,
    disagreements: usize,
    unresolved: usize,
}

impl GroundTruth {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a resolved fact directly
    pub fn insert(&mut self, fact: Fact, resolved: ResolvedFact) {
        self.facts.insert(fact, resolved);
    }

    pub fn get(&self, fact: &Fact) -> Option<&ResolvedFact> {
        self.facts.get(fact)
    }

    pub fn label(&self, fact: &Fact) -> Option<Label> {
        self.facts.get(fact).map(|r| r.label)
    }

    pub fn contains(&self, fact: &Fact) -> bool {
        self.facts.contains(fact)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Fact, &ResolvedFact)> {
        self.facts.iter()
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    /// Facts on which the first two experts disagreed
    pub fn disagreements(&self) -> usize {
        self.disagreements
    }

    /// Disagreements that the tie-breaker could not settle (resolved to IDK)
    pub fn unresolved(&self) -> usize {
        self.unresolved
    }

    /// Disagreements settled by the tie-breaker
    pub fn resolved_ties(&self) -> usize {
        self.disagreements - self.unresolved
    }

    pub fn label_counts(&self) -> LabelCounts {
        let mut counts = LabelCounts::default();
        for (_, resolved) in self.facts.iter() {
            counts.add(resolved.label);
        }
        counts
    }

    /// Per-stratum dataset seeded with the ground-truth labels
    pub fn to_dataset(&self, num_strata: usize) -> Result<LabeledDataset> {
        let mut dataset = LabeledDataset::new(num_strata);
        for (fact, resolved) in self.facts.iter() {
            dataset.insert(resolved.stratum, fact.clone(), resolved.label)?;
        }
        Ok(dataset)
    }
}

/// Resolve the expert ground truth
///
/// `experts` is ordered: the first expert supplies the fact universe, batch ids
/// and batch metadata; the third acts as tie-breaker.
///
/// # Errors
///
/// - `MissingAnnotation` when a fact of the first expert is absent from another
/// - `UnknownBatch` when a batch has no metadata entry
pub fn resolve_ground_truth(experts: &[AnnotatorData; 3]) -> Result<GroundTruth> {
    let [first, second, tie_breaker] = experts;
    let mut ground_truth = GroundTruth::new();

    for (fact, annotation) in first.annotations.iter() {
        let second_label = lookup_label(second, fact)?;
        let tie_label = lookup_label(tie_breaker, fact)?;

        if annotation.label != second_label {
            ground_truth.disagreements += 1;
            if is_three_way_split(annotation.label, second_label, tie_label) {
                ground_truth.unresolved += 1;
            }
        }
        let label = resolve_label(annotation.label, second_label, tie_label);

        let meta = first.metadata.lookup(&annotation.batch, &first.name)?;
        ground_truth.facts.insert(
            fact.clone(),
            ResolvedFact {
                label,
                batch: annotation.batch.clone(),
                stratum: meta.stratum,
            },
        );
    }

    info!(
        "Resolved ground truth for {} facts ({} expert disagreements, {} unresolved)",
        ground_truth.len(),
        ground_truth.disagreements,
        ground_truth.unresolved
    );
    Ok(ground_truth)
}

fn lookup_label(expert: &AnnotatorData, fact: &Fact) -> Result<Label> {
    match expert.annotations.get(fact) {
        Some(annotation) => Ok(annotation.label),
        None => {
            debug!("Fact {} missing from expert '{}'", fact, expert.name);
            Err(Error::MissingAnnotation {
                fact: fact.clone(),
                table: expert.name.clone(),
            })
        }
    }
}

fn is_three_way_split(a: Label, b: Label, c: Label) -> bool {
    a != b && b != c && a != c
}
