//! Stratified two-stage cluster sampling (STWCS) estimator
//!
//! Strata are sampled independently, so the population variance is the
//! weight-squared sum of the stratum variances.

use kgacc_common::{Error, Result};

use super::{critical_value, margin_of_error, Estimate};

/// Combines per-stratum estimates with population weights
#[derive(Debug, Clone, Copy)]
pub struct StwcsEstimator {
    alpha: f64,
    z: f64,
}

impl StwcsEstimator {
    pub fn new(alpha: f64) -> Result<Self> {
        Ok(Self {
            alpha,
            z: critical_value(alpha)?,
        })
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn z(&self) -> f64 {
        self.z
    }

    /// Σ accuracyₛ · weightₛ
    ///
    /// Weights are taken as given; they are expected to sum to 1. Strata with
    /// zero weight are skipped, so an undefined (NaN) accuracy there does not
    /// reach the total.
    pub fn estimate(&self, accuracies: &[f64], weights: &[f64]) -> Result<f64> {
        check_lengths(accuracies, weights)?;
        Ok(accuracies
            .iter()
            .zip(weights)
            .filter(|(_, w)| **w != 0.0)
            .map(|(a, w)| a * w)
            .sum())
    }

    /// Σ varianceₛ · weightₛ²
    ///
    /// Strata with zero weight contribute nothing, even with infinite variance.
    pub fn compute_var(&self, variances: &[f64], weights: &[f64]) -> Result<f64> {
        check_lengths(variances, weights)?;
        Ok(variances
            .iter()
            .zip(weights)
            .filter(|(_, w)| **w != 0.0)
            .map(|(v, w)| v * w * w)
            .sum())
    }

    pub fn compute_moe(&self, variance: f64) -> f64 {
        margin_of_error(self.z, variance)
    }

    /// Population estimate from per-stratum estimates
    pub fn evaluate(&self, strata: &[Estimate], weights: &[f64]) -> Result<Estimate> {
        let accuracies: Vec<f64> = strata.iter().map(|e| e.accuracy).collect();
        let variances: Vec<f64> = strata.iter().map(|e| e.variance).collect();
        let variance = self.compute_var(&variances, weights)?;
        Ok(Estimate {
            accuracy: self.estimate(&accuracies, weights)?,
            variance,
            margin_of_error: self.compute_moe(variance),
        })
    }
}

fn check_lengths(values: &[f64], weights: &[f64]) -> Result<()> {
    if values.len() != weights.len() {
        return Err(Error::StrataMismatch {
            estimates: values.len(),
            weights: weights.len(),
        });
    }
    Ok(())
}
