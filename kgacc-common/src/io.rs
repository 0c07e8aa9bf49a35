//! Input loading and labeled dataset writing
//!
//! All loaders fail with `Error::Load` naming the offending file; there is no
//! partial recovery from a malformed input.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Display;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize, Serializer};
use tracing::{debug, warn};

use crate::config::{ANNOTATIONS_FILE, ERROR_ANNOTATIONS_FILE, METADATA_FILE};
use crate::types::{
    Annotation, AnnotationTable, BatchId, BatchMetadata, Fact, FactTable, Label, LabeledDataset,
};
use crate::{Error, Result};

/// Tolerance used when checking that strata weights sum to 1
const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

fn load_error(path: &Path, err: impl Display) -> Error {
    Error::Load {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).map_err(|e| load_error(path, e))?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| load_error(path, e))
}

#[derive(Debug, Deserialize)]
struct AnnotationRow {
    #[serde(rename = "Subject")]
    subject: String,
    #[serde(rename = "Predicate")]
    predicate: String,
    #[serde(rename = "Object")]
    object: String,
    #[serde(rename = "Annotation")]
    annotation: Label,
    #[serde(rename = "BatchID")]
    batch: BatchId,
}

#[derive(Debug, Deserialize)]
struct ErrorRow {
    #[serde(rename = "Subject")]
    subject: String,
    #[serde(rename = "Predicate")]
    predicate: String,
    #[serde(rename = "Object")]
    object: String,
    #[serde(rename = "Error")]
    error: String,
}

/// Load an annotation table (`Subject,Predicate,Object,Annotation,BatchID`)
///
/// A fact listed twice keeps its first row position and its last label/batch.
pub fn load_annotations(path: &Path) -> Result<AnnotationTable> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| load_error(path, e))?;
    let mut table = AnnotationTable::new();
    let mut rows = 0usize;

    for row in reader.deserialize::<AnnotationRow>() {
        let row = row.map_err(|e| load_error(path, e))?;
        rows += 1;
        table.insert(
            Fact::new(row.subject, row.predicate, row.object),
            Annotation::new(row.annotation, row.batch),
        );
    }

    if rows != table.len() {
        debug!(
            "{:?}: {} rows collapsed into {} distinct facts",
            path,
            rows,
            table.len()
        );
    }
    Ok(table)
}

/// Load batch metadata (`{"<batch>": {"stratum": n, "topics": [...]}}`)
pub fn load_batch_metadata(path: &Path) -> Result<BatchMetadata> {
    read_json(path)
}

/// Load an error-type annotation table (`Subject,Predicate,Object,Error`)
pub fn load_error_annotations(path: &Path) -> Result<FactTable<String>> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| load_error(path, e))?;
    let mut table = FactTable::new();

    for row in reader.deserialize::<ErrorRow>() {
        let row = row.map_err(|e| load_error(path, e))?;
        table.insert(Fact::new(row.subject, row.predicate, row.object), row.error);
    }
    Ok(table)
}

/// One annotator's annotations together with their batch metadata
#[derive(Debug, Clone)]
pub struct AnnotatorData {
    pub name: String,
    pub annotations: AnnotationTable,
    pub metadata: BatchMetadata,
}

impl AnnotatorData {
    /// Load `annotations.csv` and `metadata.json` from an annotator directory
    pub fn load(name: impl Into<String>, dir: &Path) -> Result<Self> {
        let name = name.into();
        let annotations = load_annotations(&dir.join(ANNOTATIONS_FILE))?;
        let metadata = load_batch_metadata(&dir.join(METADATA_FILE))?;
        debug!(
            "Loaded annotator '{}': {} facts, {} batches",
            name,
            annotations.len(),
            metadata.len()
        );
        Ok(Self {
            name,
            annotations,
            metadata,
        })
    }

    /// Path of the annotator's error-type table
    pub fn error_annotations_path(dir: &Path) -> PathBuf {
        dir.join(ERROR_ANNOTATIONS_FILE)
    }
}

/// Annotator directory found under the laymen folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotatorDir {
    pub name: String,
    pub path: PathBuf,
}

/// List annotator sub-directories, sorted lexicographically by name
///
/// The order is part of the processing contract: deduplication and cluster
/// construction depend on it.
pub fn discover_annotators(dir: &Path) -> Result<Vec<AnnotatorDir>> {
    let mut annotators = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(|e| load_error(dir, e))? {
        let entry = entry.map_err(|e| load_error(dir, e))?;
        if entry.file_type().map_err(|e| load_error(dir, e))?.is_dir() {
            annotators.push(AnnotatorDir {
                name: entry.file_name().to_string_lossy().into_owned(),
                path: entry.path(),
            });
        }
    }
    annotators.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(annotators)
}

/// Load every annotator below `dir` in processing order
pub fn load_annotators(dir: &Path) -> Result<Vec<AnnotatorData>> {
    discover_annotators(dir)?
        .iter()
        .map(|a| AnnotatorData::load(a.name.clone(), &a.path))
        .collect()
}

/// Load a labeled dataset (`{"<stratum>": [[[s, p, o], label], ...]}`)
pub fn load_labeled_dataset(path: &Path, num_strata: usize) -> Result<LabeledDataset> {
    let raw: BTreeMap<String, Vec<(Fact, Label)>> = read_json(path)?;
    let mut dataset = LabeledDataset::new(num_strata);

    for (key, facts) in raw {
        let stratum: usize = key
            .parse()
            .map_err(|e| load_error(path, format!("invalid stratum key '{}': {}", key, e)))?;
        for (fact, label) in facts {
            dataset.insert(stratum, fact, label)?;
        }
    }
    Ok(dataset)
}

struct DatasetJson<'a>(&'a LabeledDataset);

impl Serialize for DatasetJson<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_map(
            self.0
                .iter()
                .map(|(stratum, facts)| (stratum.to_string(), facts.iter().collect::<Vec<_>>())),
        )
    }
}

/// Write a labeled dataset, creating parent directories as needed
pub fn write_labeled_dataset(path: &Path, dataset: &LabeledDataset) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(&mut writer, &DatasetJson(dataset))?;
    writer.flush()?;
    Ok(())
}

/// Load the strata weight vector: the first data row of the weights CSV
pub fn load_strata_weights(path: &Path) -> Result<Vec<f64>> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| load_error(path, e))?;
    let record = reader
        .records()
        .next()
        .ok_or_else(|| load_error(path, "no weight row"))?
        .map_err(|e| load_error(path, e))?;

    let weights = record
        .iter()
        .map(|field| {
            field
                .trim()
                .parse::<f64>()
                .map_err(|e| load_error(path, format!("invalid weight '{}': {}", field, e)))
        })
        .collect::<Result<Vec<_>>>()?;

    let sum: f64 = weights.iter().sum();
    if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
        warn!("Strata weights in {:?} sum to {} rather than 1", path, sum);
    }
    Ok(weights)
}

/// LLM judgment on one fact
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LlmAnnotation {
    /// Raw label (`correct`, `incorrect`, `idk`, `na`)
    pub label: String,

    /// Number of re-prompts needed to obtain a well-formed answer
    #[serde(default)]
    pub retries: u32,
}

/// Load the fact id → triple mapping used by LLM annotation files
pub fn load_llm_facts(path: &Path) -> Result<BTreeMap<String, Fact>> {
    read_json(path)
}

/// Load one LLM annotation file (`{"<id>": {"label": ..., "retries": n}}`)
pub fn load_llm_annotations(path: &Path) -> Result<HashMap<String, LlmAnnotation>> {
    read_json(path)
}

/// List `*.json` files in a directory as (stem, path), sorted by stem
pub fn discover_llm_files(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(|e| load_error(dir, e))? {
        let path = entry.map_err(|e| load_error(dir, e))?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            files.push((stem.to_string(), path.clone()));
        }
    }
    files.sort();
    Ok(files)
}
