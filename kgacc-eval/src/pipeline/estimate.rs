//! Accuracy estimation over the human-labeled dataset

use kgacc_common::io::{load_labeled_dataset, load_strata_weights, AnnotatorData};
use kgacc_common::{LabeledDataset, Result};
use tracing::{debug, info, warn};

use super::RunContext;
use crate::clustering::build_clusters;
use crate::estimation::{StwcsEstimator, TwcsEstimator};
use crate::report::AccuracyReport;

/// Cluster the dataset and estimate per-stratum and population accuracy
///
/// `crowd` must be in processing order; `expert` is the first expert, whose
/// batches close the scan.
pub fn estimate_accuracy(
    dataset: &LabeledDataset,
    crowd: &[AnnotatorData],
    expert: &AnnotatorData,
    strata_weights: &[f64],
    alpha: f64,
    strict_batch_contiguity: bool,
) -> Result<AccuracyReport> {
    let clusters = build_clusters(dataset, crowd, expert, strict_batch_contiguity)?;

    let twcs = TwcsEstimator::new(alpha)?;
    let strata = clusters
        .iter()
        .enumerate()
        .map(|(stratum, sample)| {
            if sample.is_empty() {
                warn!("Stratum {} has no clusters; its accuracy is undefined", stratum + 1);
            }
            let estimate = twcs.evaluate(sample)?;
            debug!(
                "Stratum {}: {} clusters, accuracy={:.4} var={:.6}",
                stratum + 1,
                sample.len(),
                estimate.accuracy,
                estimate.variance
            );
            Ok(estimate)
        })
        .collect::<Result<Vec<_>>>()?;

    let overall = StwcsEstimator::new(alpha)?.evaluate(&strata, strata_weights)?;
    Ok(AccuracyReport { strata, overall })
}

/// Load the dataset, annotations and strata weights, then estimate accuracy
///
/// `alpha` overrides the configured significance level.
pub fn run_estimate(ctx: &RunContext, alpha: Option<f64>) -> Result<AccuracyReport> {
    let alpha = alpha.unwrap_or(ctx.config.estimation.alpha);
    let dataset = load_labeled_dataset(&ctx.layout.human_dataset(), ctx.config.strata)?;
    info!("Loaded labeled dataset with {} facts", dataset.len());

    let crowd = ctx.load_crowd()?;
    let expert = AnnotatorData::load("expert1", &ctx.layout.expert_dir(1))?;
    let weights = load_strata_weights(&ctx.layout.strata_weights())?;

    estimate_accuracy(
        &dataset,
        &crowd,
        &expert,
        &weights,
        alpha,
        ctx.config.clustering.strict_batch_contiguity,
    )
}
