//! Linear-weighted Cohen's kappa
//!
//! Agreement between two raters on an ordinal scale of `categories` classes,
//! with disagreement penalised by the distance |i - j| between classes.

use kgacc_common::{Error, Label, Result};

/// Linear-weighted kappa between two equally long ordinal rating sequences
///
/// κ = 1 − Σ wᵢⱼ Cᵢⱼ / Σ wᵢⱼ Eᵢⱼ with wᵢⱼ = |i − j|, C the confusion matrix
/// and E the matrix expected from the raters' marginals. When no disagreement
/// is expected (both raters used one and the same class) the raters agree
/// perfectly and κ = 1.
///
/// # Errors
///
/// - `EmptySample` for empty input
/// - `InvalidInput` for sequences of different length or out-of-range classes
pub fn linear_weighted_kappa(rater_a: &[usize], rater_b: &[usize], categories: usize) -> Result<f64> {
    if rater_a.len() != rater_b.len() {
        return Err(Error::InvalidInput(format!(
            "kappa needs paired ratings, got {} and {}",
            rater_a.len(),
            rater_b.len()
        )));
    }
    if rater_a.is_empty() {
        return Err(Error::EmptySample("kappa over zero ratings".to_string()));
    }

    let mut confusion = vec![vec![0.0f64; categories]; categories];
    for (&a, &b) in rater_a.iter().zip(rater_b) {
        if a >= categories || b >= categories {
            return Err(Error::InvalidInput(format!(
                "rating ({}, {}) outside {} categories",
                a, b, categories
            )));
        }
        confusion[a][b] += 1.0;
    }

    let total = rater_a.len() as f64;
    let row_sums: Vec<f64> = confusion.iter().map(|row| row.iter().sum()).collect();
    let col_sums: Vec<f64> = (0..categories)
        .map(|j| confusion.iter().map(|row| row[j]).sum())
        .collect();

    let mut observed = 0.0;
    let mut expected = 0.0;
    for i in 0..categories {
        for j in 0..categories {
            let weight = i.abs_diff(j) as f64;
            observed += weight * confusion[i][j];
            expected += weight * row_sums[i] * col_sums[j] / total;
        }
    }

    if expected == 0.0 {
        return Ok(1.0);
    }
    Ok(1.0 - observed / expected)
}

/// Linear-weighted kappa over labels on the ordinal scale Incorrect < IDK < Correct
pub fn label_kappa(rater_a: &[Label], rater_b: &[Label]) -> Result<f64> {
    let a: Vec<usize> = rater_a.iter().map(|l| l.ordinal()).collect();
    let b: Vec<usize> = rater_b.iter().map(|l| l.ordinal()).collect();
    linear_weighted_kappa(&a, &b, Label::ALL.len())
}
