//! Common error types for KGACC

use std::path::PathBuf;

use thiserror::Error;

use crate::types::{BatchId, Fact};

/// Common result type for KGACC operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the KGACC crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error (wraps serde_json::Error)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Input file could not be opened or parsed
    #[error("Failed to load {}: {message}", .path.display())]
    Load { path: PathBuf, message: String },

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input value
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A fact expected in an annotation table is absent
    #[error("Fact {fact} missing from {table}")]
    MissingAnnotation { fact: Fact, table: String },

    /// A batch referenced by an annotation has no metadata entry
    #[error("Batch {batch} not found in metadata of {owner}")]
    UnknownBatch { batch: BatchId, owner: String },

    /// Stratum index outside the configured number of strata
    #[error("Stratum {stratum} out of range (configured strata: {strata})")]
    StratumOutOfRange { stratum: usize, strata: usize },

    /// Annotator shares no honeypot facts with the ground truth
    #[error("Reliability of annotator '{0}' is undefined: no honeypot facts")]
    UndefinedReliability(String),

    /// Batch seen again after a different batch interrupted its run
    #[error("Batch {batch} revisited non-contiguously in stratum {stratum}")]
    FragmentedBatch { stratum: usize, batch: BatchId },

    /// Estimator received no observations
    #[error("Empty sample: {0}")]
    EmptySample(String),

    /// Per-stratum inputs and weights have different lengths
    #[error("Strata mismatch: {estimates} values for {weights} weights")]
    StrataMismatch { estimates: usize, weights: usize },
}
