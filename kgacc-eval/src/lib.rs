//! kgacc-eval library interface
//!
//! Label fusion, annotator reliability, cluster construction and the
//! survey-sampling estimators, plus the pipelines and reports built on them.

pub mod clustering;
pub mod estimation;
pub mod fusion;
pub mod llm;
pub mod pipeline;
pub mod reliability;
pub mod report;
pub mod stats;

pub use kgacc_common::{Error, Result};
