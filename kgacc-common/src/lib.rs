//! # KGACC Common Library
//!
//! Shared code for the knowledge-graph accuracy tooling including:
//! - Domain types (facts, labels, batches, strata)
//! - Common error type
//! - Configuration loading and data root resolution
//! - Input loading and labeled dataset writing

pub mod config;
pub mod error;
pub mod io;
pub mod types;

pub use error::{Error, Result};
pub use types::{
    Annotation, AnnotationTable, BatchId, BatchMeta, BatchMetadata, Fact, FactTable, Label,
    LabelCounts, LabeledDataset, Stratum,
};
