//! End-to-end pipelines behind the CLI commands
//!
//! Each pipeline loads its inputs through a `RunContext`, runs the pure
//! computation and hands back a report value for the caller to print.

pub mod analysis;
pub mod estimate;
pub mod prepare;

use kgacc_common::config::{DataLayout, TomlConfig};
use kgacc_common::io::{load_annotators, AnnotatorData};
use kgacc_common::Result;
use tracing::info;

pub use analysis::{run_error_stats, run_evaluate_llm, run_stats, AnnotationStats};
pub use estimate::{estimate_accuracy, run_estimate};
pub use prepare::{prepare_dataset, run_prepare, PreparedDataset};

/// Resolved configuration and data layout of one run
#[derive(Debug, Clone)]
pub struct RunContext {
    pub layout: DataLayout,
    pub config: TomlConfig,
}

impl RunContext {
    pub fn new(layout: DataLayout, config: TomlConfig) -> Self {
        Self { layout, config }
    }

    /// Load the three experts; the third is the tie-breaker
    pub fn load_experts(&self) -> Result<[AnnotatorData; 3]> {
        let load = |n: usize| AnnotatorData::load(format!("expert{}", n), &self.layout.expert_dir(n));
        Ok([load(1)?, load(2)?, load(3)?])
    }

    /// Load every crowd annotator in name order
    pub fn load_crowd(&self) -> Result<Vec<AnnotatorData>> {
        let crowd = load_annotators(&self.layout.laymen_dir())?;
        info!("Loaded {} crowd annotators", crowd.len());
        Ok(crowd)
    }
}
