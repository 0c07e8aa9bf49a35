//! Reporting pipelines: annotation statistics, error types and LLM evaluation

use std::fmt;

use kgacc_common::io::{
    discover_annotators, discover_llm_files, load_error_annotations, load_llm_annotations,
    load_llm_facts, AnnotatorData,
};
use kgacc_common::Result;
use tracing::{debug, info};

use super::RunContext;
use crate::fusion::resolve_ground_truth;
use crate::llm::{evaluate_llm, LlmEvaluation};
use crate::stats::{
    crowd_stats, error_stats, expert_agreement, stratum_stats, CrowdStats, ErrorStats,
    ExpertAgreement, StratumStats,
};

/// Combined output of the `stats` command
#[derive(Debug, Clone)]
pub struct AnnotationStats {
    pub experts: ExpertAgreement,
    pub crowd: CrowdStats,
    pub strata: StratumStats,
}

impl fmt::Display for AnnotationStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.experts)?;
        writeln!(f)?;
        writeln!(f, "{}", self.crowd)?;
        writeln!(f)?;
        write!(f, "{}", self.strata)
    }
}

pub fn run_stats(ctx: &RunContext) -> Result<AnnotationStats> {
    let experts = ctx.load_experts()?;
    let crowd = ctx.load_crowd()?;
    let ground_truth = resolve_ground_truth(&experts)?;

    Ok(AnnotationStats {
        experts: expert_agreement(&experts, &ground_truth)?,
        crowd: crowd_stats(&crowd, &ground_truth),
        strata: stratum_stats(&ground_truth, &crowd, ctx.config.strata)?,
    })
}

/// Tally error categories of the three experts and every crowd annotator
///
/// Crowd annotators without an error table are skipped.
pub fn run_error_stats(ctx: &RunContext) -> Result<ErrorStats> {
    let mut tables = Vec::new();
    for n in 1..=3 {
        let path = AnnotatorData::error_annotations_path(&ctx.layout.expert_dir(n));
        tables.push(load_error_annotations(&path)?);
    }

    for annotator in discover_annotators(&ctx.layout.laymen_dir())? {
        let path = AnnotatorData::error_annotations_path(&annotator.path);
        if !path.exists() {
            debug!("No error annotations for '{}'", annotator.name);
            continue;
        }
        tables.push(load_error_annotations(&path)?);
    }

    info!("Loaded {} error annotation tables", tables.len());
    Ok(error_stats(&tables))
}

/// Score every LLM annotation file against the expert ground truth
pub fn run_evaluate_llm(ctx: &RunContext) -> Result<Vec<LlmEvaluation>> {
    let experts = ctx.load_experts()?;
    let ground_truth = resolve_ground_truth(&experts)?;
    let facts = load_llm_facts(&ctx.layout.llm_dataset())?;

    discover_llm_files(&ctx.layout.llm_annotations_dir())?
        .into_iter()
        .map(|(name, path)| {
            let annotations = load_llm_annotations(&path)?;
            evaluate_llm(&name, &annotations, &facts, &ground_truth)
        })
        .collect()
}
