//! Annotator reliability weighting
//!
//! Each crowd annotator is scored by their agreement with the expert ground
//! truth on honeypot facts. The linear-weighted kappa is squashed through a
//! logistic curve so every weight lies strictly between 0 and 1.

pub mod kappa;

use std::collections::BTreeMap;

use kgacc_common::io::AnnotatorData;
use kgacc_common::{Error, Label, Result};
use tracing::{debug, info, warn};

use crate::fusion::GroundTruth;

pub use kappa::{label_kappa, linear_weighted_kappa};

/// Default steepness of the kappa → weight logistic curve
pub const DEFAULT_RHO: f64 = 5.0;

/// Logistic transform of a kappa score: 1 / (1 + e^(−ρκ))
pub fn kappa_to_weight(kappa: f64, rho: f64) -> f64 {
    1.0 / (1.0 + (-rho * kappa).exp())
}

/// Paired judgments of one annotator and the ground truth on honeypot facts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HoneypotJudgments {
    pub annotator: Vec<Label>,
    pub expert: Vec<Label>,
}

impl HoneypotJudgments {
    pub fn len(&self) -> usize {
        self.annotator.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotator.is_empty()
    }
}

/// Collect an annotator's honeypot judgments alongside the ground-truth labels
///
/// # Errors
///
/// - `UnknownBatch` when an annotation's batch is missing from the metadata
/// - `MissingAnnotation` when a honeypot fact has no ground-truth label
pub fn collect_honeypots(
    annotator: &AnnotatorData,
    ground_truth: &GroundTruth,
    honeypot_topic: &str,
) -> Result<HoneypotJudgments> {
    let mut judgments = HoneypotJudgments::default();

    for (fact, annotation) in annotator.annotations.iter() {
        let meta = annotator.metadata.lookup(&annotation.batch, &annotator.name)?;
        if !meta.is_honeypot(honeypot_topic) {
            continue;
        }
        let expert = ground_truth
            .label(fact)
            .ok_or_else(|| Error::MissingAnnotation {
                fact: fact.clone(),
                table: "ground truth".to_string(),
            })?;
        judgments.annotator.push(annotation.label);
        judgments.expert.push(expert);
    }

    Ok(judgments)
}

/// Reliability of one crowd annotator
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnnotatorReliability {
    pub kappa: f64,
    pub weight: f64,
    pub honeypots: usize,
}

impl AnnotatorReliability {
    /// Score an annotator from their honeypot judgments
    pub fn from_honeypots(judgments: &HoneypotJudgments, rho: f64) -> Result<Self> {
        let kappa = label_kappa(&judgments.annotator, &judgments.expert)?;
        Ok(Self {
            kappa,
            weight: kappa_to_weight(kappa, rho),
            honeypots: judgments.len(),
        })
    }

    /// Reliability carrying a fixed weight, without a kappa measurement
    pub fn from_weight(weight: f64) -> Self {
        Self {
            kappa: f64::NAN,
            weight,
            honeypots: 0,
        }
    }
}

/// Reliability of every crowd annotator, keyed by annotator name
#[derive(Debug, Clone, Default)]
pub struct ReliabilityWeights {
    annotators: BTreeMap<String, AnnotatorReliability>,
}

impl ReliabilityWeights {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, reliability: AnnotatorReliability) {
        self.annotators.insert(name.into(), reliability);
    }

    pub fn get(&self, name: &str) -> Option<&AnnotatorReliability> {
        self.annotators.get(name)
    }

    /// Weight of an annotator
    ///
    /// # Errors
    ///
    /// `UndefinedReliability` when no weight was computed for `name`
    pub fn weight(&self, name: &str) -> Result<f64> {
        self.annotators
            .get(name)
            .map(|r| r.weight)
            .ok_or_else(|| Error::UndefinedReliability(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AnnotatorReliability)> {
        self.annotators.iter().map(|(name, r)| (name.as_str(), r))
    }

    pub fn len(&self) -> usize {
        self.annotators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotators.is_empty()
    }

    /// Compute the weight of every annotator against the ground truth
    ///
    /// # Errors
    ///
    /// `UndefinedReliability` for an annotator without honeypot facts; no
    /// default weight is ever assigned.
    pub fn compute(
        annotators: &[AnnotatorData],
        ground_truth: &GroundTruth,
        honeypot_topic: &str,
        rho: f64,
    ) -> Result<Self> {
        let mut weights = Self::new();

        for annotator in annotators {
            let judgments = collect_honeypots(annotator, ground_truth, honeypot_topic)?;
            if judgments.is_empty() {
                warn!("Annotator '{}' has no honeypot facts", annotator.name);
                return Err(Error::UndefinedReliability(annotator.name.clone()));
            }

            let reliability = AnnotatorReliability::from_honeypots(&judgments, rho)?;
            debug!(
                "Annotator '{}': kappa={:.3} weight={:.3} over {} honeypots",
                annotator.name, reliability.kappa, reliability.weight, reliability.honeypots
            );
            weights.insert(annotator.name.clone(), reliability);
        }

        info!("Computed reliability weights for {} annotators", weights.len());
        Ok(weights)
    }
}
