//! LLM judgments scored against the expert ground truth

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use kgacc_common::io::LlmAnnotation;
use kgacc_common::{Error, Fact, Label, LabelCounts, Result};
use tracing::debug;

use crate::fusion::GroundTruth;

/// Map a raw LLM answer to a label (`na` counts as IDK)
pub fn parse_llm_label(raw: &str) -> Result<Label> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "correct" => Ok(Label::Correct),
        "incorrect" => Ok(Label::Incorrect),
        "idk" | "na" => Ok(Label::Idk),
        other => Err(Error::InvalidInput(format!("Unknown LLM label '{}'", other))),
    }
}

/// Metrics of one LLM over the ground-truth facts
#[derive(Debug, Clone, PartialEq)]
pub struct LlmEvaluation {
    pub name: String,
    /// Share of facts answered without retries
    pub compliance: f64,
    /// Share of answers that are right or abstain
    pub truthfulness: f64,
    /// Share of answers that do not abstain
    pub informativeness: f64,
    pub accuracy: f64,
    /// Mean recall over the labels present in the ground truth
    pub balanced_accuracy: f64,
    pub predicted: LabelCounts,
}

/// Balanced accuracy: mean per-class recall over classes present in `truth`
pub fn balanced_accuracy(truth: &[Label], predicted: &[Label]) -> f64 {
    let mut support = [0usize; 3];
    let mut hits = [0usize; 3];
    for (&t, &p) in truth.iter().zip(predicted) {
        support[t.slot()] += 1;
        if t == p {
            hits[t.slot()] += 1;
        }
    }

    let recalls: Vec<f64> = support
        .into_iter()
        .zip(hits)
        .filter(|&(s, _)| s > 0)
        .map(|(s, h)| h as f64 / s as f64)
        .collect();
    if recalls.is_empty() {
        return 0.0;
    }
    recalls.iter().sum::<f64>() / recalls.len() as f64
}

/// Score one LLM annotation file
///
/// `facts` maps the ids used in `annotations` to triples.
///
/// # Errors
///
/// - `EmptySample` for an empty ground truth
/// - `MissingAnnotation` when a ground-truth fact has no LLM answer
/// - `InvalidInput` for an unknown LLM label
pub fn evaluate_llm(
    name: &str,
    annotations: &HashMap<String, LlmAnnotation>,
    facts: &BTreeMap<String, Fact>,
    ground_truth: &GroundTruth,
) -> Result<LlmEvaluation> {
    if ground_truth.is_empty() {
        return Err(Error::EmptySample("no ground-truth facts to compare".to_string()));
    }

    let by_fact: HashMap<&Fact, &LlmAnnotation> = facts
        .iter()
        .filter_map(|(id, fact)| annotations.get(id).map(|a| (fact, a)))
        .collect();
    debug!("LLM '{}' answered {} of {} facts", name, by_fact.len(), facts.len());

    let mut truth = Vec::with_capacity(ground_truth.len());
    let mut predicted = Vec::with_capacity(ground_truth.len());
    let mut compliant = 0usize;

    for (fact, resolved) in ground_truth.iter() {
        let answer = by_fact.get(fact).ok_or_else(|| Error::MissingAnnotation {
            fact: fact.clone(),
            table: name.to_string(),
        })?;
        if answer.retries == 0 {
            compliant += 1;
        }
        truth.push(resolved.label);
        predicted.push(parse_llm_label(&answer.label)?);
    }

    let n = truth.len() as f64;
    let share = |count: usize| count as f64 / n;
    let correct = truth.iter().zip(&predicted).filter(|(t, p)| t == p).count();
    let truthful = truth
        .iter()
        .zip(&predicted)
        .filter(|(t, p)| t == p || **p == Label::Idk)
        .count();
    let informative = predicted.iter().filter(|&&p| p != Label::Idk).count();

    Ok(LlmEvaluation {
        name: name.to_string(),
        compliance: share(compliant),
        truthfulness: share(truthful),
        informativeness: share(informative),
        accuracy: share(correct),
        balanced_accuracy: balanced_accuracy(&truth, &predicted),
        predicted: predicted.iter().collect(),
    })
}

impl fmt::Display for LlmEvaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}:", self.name)?;
        writeln!(f, "Compliance={:.2}", self.compliance)?;
        writeln!(f, "Truthfulness={:.2}", self.truthfulness)?;
        writeln!(f, "Informativeness={:.2}", self.informativeness)?;
        writeln!(f, "Accuracy={:.2}", self.accuracy)?;
        writeln!(f, "Balanced Accuracy={:.2}", self.balanced_accuracy)?;
        write!(
            f,
            "Correct={} Incorrect={} IDK={}",
            self.predicted.correct, self.predicted.incorrect, self.predicted.idk
        )
    }
}
