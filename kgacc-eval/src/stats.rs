//! Descriptive statistics over the annotation campaign
//!
//! Expert agreement, crowd workload, per-stratum label distributions and
//! error-type frequencies. Everything here is reporting only; nothing feeds
//! back into the estimators.

use std::collections::{HashMap, HashSet};
use std::fmt;

use kgacc_common::io::AnnotatorData;
use kgacc_common::{Error, Fact, FactTable, LabelCounts, Result, Stratum};

use crate::fusion::GroundTruth;
use crate::reliability::label_kappa;

/// Rounded percentage of `part` in `whole` (0 for an empty whole)
pub fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    (part as f64 / whole as f64 * 100.0).round()
}

/// Agreement between the first two experts and the work of the tie-breaker
#[derive(Debug, Clone, PartialEq)]
pub struct ExpertAgreement {
    pub facts: usize,
    pub disagreements: usize,
    pub kappa: f64,
    pub resolved_ties: usize,
    pub ground_truth: LabelCounts,
}

/// Compare the first two experts over the first expert's facts
pub fn expert_agreement(experts: &[AnnotatorData; 3], ground_truth: &GroundTruth) -> Result<ExpertAgreement> {
    let [first, second, _] = experts;
    let mut first_labels = Vec::with_capacity(first.annotations.len());
    let mut second_labels = Vec::with_capacity(first.annotations.len());

    for (fact, annotation) in first.annotations.iter() {
        let other = second
            .annotations
            .get(fact)
            .ok_or_else(|| Error::MissingAnnotation {
                fact: fact.clone(),
                table: second.name.clone(),
            })?;
        first_labels.push(annotation.label);
        second_labels.push(other.label);
    }

    Ok(ExpertAgreement {
        facts: first_labels.len(),
        disagreements: ground_truth.disagreements(),
        kappa: label_kappa(&first_labels, &second_labels)?,
        resolved_ties: ground_truth.resolved_ties(),
        ground_truth: ground_truth.label_counts(),
    })
}

impl fmt::Display for ExpertAgreement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Expert annotations statistics:")?;
        writeln!(
            f,
            "Disagreement for {} facts out of {} ({}%)",
            self.disagreements,
            self.facts,
            percent(self.disagreements, self.facts)
        )?;
        writeln!(f, "Cohen's kappa score: {:.2}", self.kappa)?;
        writeln!(
            f,
            "Tie breaker resolved {} ties out of {} ({}%)",
            self.resolved_ties,
            self.disagreements,
            percent(self.resolved_ties, self.disagreements)
        )?;
        write!(
            f,
            "Ground truth labels: Correct={} Incorrect={} IDK={}",
            self.ground_truth.correct, self.ground_truth.incorrect, self.ground_truth.idk
        )
    }
}

/// Workload of the crowd annotators
#[derive(Debug, Clone, PartialEq)]
pub struct CrowdStats {
    pub annotators: usize,
    pub total_annotations: usize,
    pub distinct_facts: usize,
    pub distinct_honeypot_facts: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub max: usize,
    pub min: usize,
}

/// Count annotations per annotator; honeypot facts are those with a ground-truth label
pub fn crowd_stats(crowd: &[AnnotatorData], ground_truth: &GroundTruth) -> CrowdStats {
    let counts: Vec<usize> = crowd.iter().map(|a| a.annotations.len()).collect();
    let mut facts = HashSet::new();
    let mut honeypots = HashSet::new();

    for annotator in crowd {
        for fact in annotator.annotations.facts() {
            if ground_truth.contains(fact) {
                honeypots.insert(fact);
            }
            facts.insert(fact);
        }
    }

    let total: usize = counts.iter().sum();
    let (mean, std_dev) = if counts.is_empty() {
        (0.0, 0.0)
    } else {
        let n = counts.len() as f64;
        let mean = total as f64 / n;
        let var = counts.iter().map(|&c| (c as f64 - mean).powi(2)).sum::<f64>() / n;
        (mean, var.sqrt())
    };

    CrowdStats {
        annotators: crowd.len(),
        total_annotations: total,
        distinct_facts: facts.len(),
        distinct_honeypot_facts: honeypots.len(),
        mean,
        std_dev,
        max: counts.iter().copied().max().unwrap_or(0),
        min: counts.iter().copied().min().unwrap_or(0),
    }
}

impl fmt::Display for CrowdStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Crowd annotations statistics:")?;
        writeln!(f, "{} annotators conducted annotations", self.annotators)?;
        writeln!(f, "A total of {} annotations", self.total_annotations)?;
        writeln!(f, "Annotated {} distinct facts", self.distinct_facts)?;
        writeln!(
            f,
            "Annotated {} distinct facts from honeypots",
            self.distinct_honeypot_facts
        )?;
        writeln!(
            f,
            "Average num of annotations: {:.0} +/- {:.0}",
            self.mean, self.std_dev
        )?;
        writeln!(f, "Max num of annotations by annotator: {}", self.max)?;
        write!(f, "Min num of annotations by annotator: {}", self.min)
    }
}

/// Label distributions per stratum for experts and crowd
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StratumStats {
    /// Ground-truth label counts per stratum
    pub expert: Vec<LabelCounts>,
    /// Distinct crowd facts per stratum
    pub crowd_facts: Vec<usize>,
    /// Raw crowd label counts per stratum (every judgment counted)
    pub crowd_labels: Vec<LabelCounts>,
}

pub fn stratum_stats(
    ground_truth: &GroundTruth,
    crowd: &[AnnotatorData],
    num_strata: usize,
) -> Result<StratumStats> {
    let mut stats = StratumStats {
        expert: vec![LabelCounts::default(); num_strata],
        crowd_facts: vec![0; num_strata],
        crowd_labels: vec![LabelCounts::default(); num_strata],
    };

    for (_, resolved) in ground_truth.iter() {
        counts_at(&mut stats.expert, resolved.stratum)?.add(resolved.label);
    }

    let mut seen: HashMap<Stratum, HashSet<&Fact>> = HashMap::new();
    for annotator in crowd {
        for (fact, annotation) in annotator.annotations.iter() {
            let meta = annotator.metadata.lookup(&annotation.batch, &annotator.name)?;
            counts_at(&mut stats.crowd_labels, meta.stratum)?.add(annotation.label);
            seen.entry(meta.stratum).or_default().insert(fact);
        }
    }
    for (stratum, facts) in seen {
        stats.crowd_facts[stratum] = facts.len();
    }

    Ok(stats)
}

fn counts_at(counts: &mut [LabelCounts], stratum: Stratum) -> Result<&mut LabelCounts> {
    let strata = counts.len();
    counts
        .get_mut(stratum)
        .ok_or(Error::StratumOutOfRange { stratum, strata })
}

fn write_distribution(f: &mut fmt::Formatter<'_>, stratum: usize, counts: &LabelCounts) -> fmt::Result {
    let total = counts.total();
    writeln!(
        f,
        "stratum {}: Correct={} ({}%) Incorrect={} ({}%) IDK={} ({}%)",
        stratum + 1,
        counts.correct,
        percent(counts.correct, total),
        counts.incorrect,
        percent(counts.incorrect, total),
        counts.idk,
        percent(counts.idk, total)
    )
}

impl fmt::Display for StratumStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Facts assigned to experts per stratum:")?;
        for (ix, counts) in self.expert.iter().enumerate() {
            writeln!(f, "stratum {}: {} facts", ix + 1, counts.total())?;
        }
        writeln!(f, "Expert label distribution per stratum:")?;
        for (ix, counts) in self.expert.iter().enumerate() {
            write_distribution(f, ix, counts)?;
        }
        writeln!(f, "Facts assigned to crowd annotators per stratum:")?;
        for (ix, count) in self.crowd_facts.iter().enumerate() {
            writeln!(f, "stratum {}: {} facts", ix + 1, count)?;
        }
        writeln!(f, "Crowd label distribution per stratum:")?;
        for (ix, counts) in self.crowd_labels.iter().enumerate() {
            write_distribution(f, ix, counts)?;
        }
        Ok(())
    }
}

/// Frequencies of error categories, in first-seen order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorStats {
    pub counts: Vec<(String, usize)>,
}

impl ErrorStats {
    pub fn total(&self) -> usize {
        self.counts.iter().map(|(_, c)| c).sum()
    }

    pub fn get(&self, category: &str) -> usize {
        self.counts
            .iter()
            .find(|(name, _)| name == category)
            .map(|(_, c)| *c)
            .unwrap_or(0)
    }
}

/// Tally error categories over several error-annotation tables
pub fn error_stats<'a>(tables: impl IntoIterator<Item = &'a FactTable<String>>) -> ErrorStats {
    let mut stats = ErrorStats::default();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for table in tables {
        for (_, category) in table.iter() {
            match index.get(category.as_str()) {
                Some(&ix) => stats.counts[ix].1 += 1,
                None => {
                    index.insert(category.as_str(), stats.counts.len());
                    stats.counts.push((category.clone(), 1));
                }
            }
        }
    }
    stats
}

impl fmt::Display for ErrorStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = self.total();
        writeln!(f, "Error annotation statistics")?;
        write!(f, "Total number of error annotations: {}", total)?;
        for (category, count) in &self.counts {
            write!(
                f,
                "\n{}: {} ({}%)",
                category.replace(';', "+"),
                count,
                percent(*count, total)
            )?;
        }
        Ok(())
    }
}
