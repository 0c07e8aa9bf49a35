//! Dataset preparation
//!
//! Expert ground truth plus reliability-weighted crowd labels, merged into the
//! human-labeled dataset.

use kgacc_common::config::TomlConfig;
use kgacc_common::io::{write_labeled_dataset, AnnotatorData};
use kgacc_common::{LabeledDataset, Result};
use tracing::info;

use super::RunContext;
use crate::fusion::{resolve_ground_truth, GroundTruth, LabelAggregator};
use crate::reliability::ReliabilityWeights;
use crate::report::LabelCountReport;

/// Everything produced by dataset preparation
#[derive(Debug, Clone)]
pub struct PreparedDataset {
    pub ground_truth: GroundTruth,
    pub weights: ReliabilityWeights,
    pub dataset: LabeledDataset,
    /// Crowd facts discarded by the aggregation policy
    pub dropped: usize,
}

impl PreparedDataset {
    pub fn label_counts(&self) -> LabelCountReport {
        LabelCountReport::from_dataset(&self.dataset)
    }
}

/// Build the labeled dataset from loaded annotations
pub fn prepare_dataset(
    experts: &[AnnotatorData; 3],
    crowd: &[AnnotatorData],
    config: &TomlConfig,
) -> Result<PreparedDataset> {
    let ground_truth = resolve_ground_truth(experts)?;
    let weights = ReliabilityWeights::compute(
        crowd,
        &ground_truth,
        &config.honeypot_topic,
        config.reliability.rho,
    )?;

    let mut aggregator = LabelAggregator::new(config.strata, &weights, &config.honeypot_topic);
    for annotator in crowd {
        aggregator.add_annotator(annotator)?;
    }
    let aggregated = aggregator.finish();

    let mut dataset = ground_truth.to_dataset(config.strata)?;
    aggregated.merge_into(&mut dataset)?;
    let dropped = aggregated.dropped();

    Ok(PreparedDataset {
        ground_truth,
        weights,
        dataset,
        dropped,
    })
}

/// Load annotations, prepare the dataset and write it below the data root
pub fn run_prepare(ctx: &RunContext) -> Result<PreparedDataset> {
    let experts = ctx.load_experts()?;
    let crowd = ctx.load_crowd()?;
    let prepared = prepare_dataset(&experts, &crowd, &ctx.config)?;

    let path = ctx.layout.human_dataset();
    write_labeled_dataset(&path, &prepared.dataset)?;
    info!(
        "Wrote {} labeled facts to {:?}",
        prepared.dataset.len(),
        path
    );
    Ok(prepared)
}
