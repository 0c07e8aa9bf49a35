//! Console reports for the pipelines

use std::fmt;

use kgacc_common::{LabelCounts, LabeledDataset};

use crate::estimation::Estimate;

/// Per-stratum and population accuracy with margins of error
#[derive(Debug, Clone, PartialEq)]
pub struct AccuracyReport {
    pub strata: Vec<Estimate>,
    pub overall: Estimate,
}

fn write_estimate(f: &mut fmt::Formatter<'_>, name: &str, estimate: &Estimate) -> fmt::Result {
    if estimate.is_defined() {
        write!(f, "{}: {:.2} +/- {:.2}", name, estimate.accuracy, estimate.margin_of_error)
    } else {
        write!(f, "{}: n/a +/- {:.2}", name, estimate.margin_of_error)
    }
}

impl fmt::Display for AccuracyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (ix, estimate) in self.strata.iter().enumerate() {
            write_estimate(f, &format!("Stratum {}", ix + 1), estimate)?;
            writeln!(f)?;
        }
        write_estimate(f, "KG", &self.overall)
    }
}

/// Label frequencies of a labeled dataset, per stratum
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelCountReport {
    pub strata: Vec<LabelCounts>,
}

impl LabelCountReport {
    pub fn from_dataset(dataset: &LabeledDataset) -> Self {
        Self {
            strata: (0..dataset.num_strata()).map(|s| dataset.counts(s)).collect(),
        }
    }

    pub fn total(&self) -> LabelCounts {
        let mut total = LabelCounts::default();
        for counts in &self.strata {
            total.merge(counts);
        }
        total
    }
}

fn write_counts(f: &mut fmt::Formatter<'_>, name: &str, counts: &LabelCounts) -> fmt::Result {
    write!(
        f,
        "{}: Correct={}\tIncorrect={}\tIDK={}\tTotal={}",
        name,
        counts.correct,
        counts.incorrect,
        counts.idk,
        counts.total()
    )
}

impl fmt::Display for LabelCountReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (ix, counts) in self.strata.iter().enumerate() {
            write_counts(f, &format!("Stratum {}", ix + 1), counts)?;
            writeln!(f)?;
        }
        write_counts(f, "KG", &self.total())
    }
}
