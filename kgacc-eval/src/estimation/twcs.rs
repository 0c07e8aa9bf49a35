//! Two-stage cluster sampling (TWCS) estimator
//!
//! Batches are the primary sampling unit and facts within a batch the second
//! stage. The stratum accuracy is the unweighted mean of per-cluster
//! accuracies; cluster sizes are deliberately not weighted in.

use kgacc_common::{Error, Result};

use super::{critical_value, margin_of_error, Estimate};
use crate::clustering::Cluster;

/// Accuracy estimator for the clusters of one stratum
#[derive(Debug, Clone, Copy)]
pub struct TwcsEstimator {
    alpha: f64,
    z: f64,
}

impl TwcsEstimator {
    /// # Errors
    ///
    /// `InvalidInput` unless 0 < α < 1
    pub fn new(alpha: f64) -> Result<Self> {
        Ok(Self {
            alpha,
            z: critical_value(alpha)?,
        })
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Normal critical value used for the margin of error
    pub fn z(&self) -> f64 {
        self.z
    }

    /// Mean correctness of each cluster
    ///
    /// # Errors
    ///
    /// `InvalidInput` for an empty cluster
    pub fn cluster_accuracies(&self, sample: &[Cluster]) -> Result<Vec<f64>> {
        sample
            .iter()
            .enumerate()
            .map(|(ix, cluster)| {
                if cluster.is_empty() {
                    return Err(Error::InvalidInput(format!("cluster {} is empty", ix)));
                }
                let correct: u32 = cluster.iter().map(|&v| u32::from(v)).sum();
                Ok(f64::from(correct) / cluster.len() as f64)
            })
            .collect()
    }

    /// Stratum accuracy: mean of the cluster accuracies, NaN without clusters
    pub fn estimate(&self, sample: &[Cluster]) -> Result<f64> {
        let cae = self.cluster_accuracies(sample)?;
        Ok(mean(&cae))
    }

    /// Σ(caeᵢ − ae)² / (n(n−1)); infinite for fewer than two clusters
    pub fn compute_var(&self, sample: &[Cluster]) -> Result<f64> {
        let cae = self.cluster_accuracies(sample)?;
        Ok(variance_of_mean(&cae))
    }

    pub fn compute_moe(&self, variance: f64) -> f64 {
        margin_of_error(self.z, variance)
    }

    /// Accuracy, variance and margin of error in one pass
    ///
    /// A sample without clusters gives an undefined estimate with an
    /// infinite margin of error.
    pub fn evaluate(&self, sample: &[Cluster]) -> Result<Estimate> {
        if sample.is_empty() {
            return Ok(Estimate::undefined());
        }
        let cae = self.cluster_accuracies(sample)?;
        let variance = variance_of_mean(&cae);
        Ok(Estimate {
            accuracy: mean(&cae),
            variance,
            margin_of_error: self.compute_moe(variance),
        })
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn variance_of_mean(cae: &[f64]) -> f64 {
    let n = cae.len();
    if n <= 1 {
        return f64::INFINITY;
    }
    let ae = mean(cae);
    let squares: f64 = cae.iter().map(|c| (c - ae).powi(2)).sum();
    squares / (n * (n - 1)) as f64
}
