//! Domain types shared by the KGACC crates
//!
//! A fact is the unit of judgment and the key used everywhere else; labels,
//! batches and strata describe how facts were sampled and judged.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Stratum index (0-based)
pub type Stratum = usize;

/// Knowledge graph fact identified by its (subject, predicate, object) triple
///
/// Serialized as a three-element array, matching the dataset files.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "(String, String, String)", into = "(String, String, String)")]
pub struct Fact {
    pub subject: String,
    pub predicate: String,
    pub object: String,
}

impl Fact {
    pub fn new(
        subject: impl Into<String>,
        predicate: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
        }
    }
}

impl From<(String, String, String)> for Fact {
    fn from((subject, predicate, object): (String, String, String)) -> Self {
        Self {
            subject,
            predicate,
            object,
        }
    }
}

impl From<Fact> for (String, String, String) {
    fn from(fact: Fact) -> Self {
        (fact.subject, fact.predicate, fact.object)
    }
}

impl fmt::Display for Fact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.subject, self.predicate, self.object)
    }
}

/// Correctness judgment on a single fact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Label {
    Correct,
    Incorrect,
    #[serde(rename = "I Don't Know")]
    Idk,
}

impl Label {
    /// All labels in score-slot order
    pub const ALL: [Label; 3] = [Label::Correct, Label::Incorrect, Label::Idk];

    /// Index of the label in a score vector ordered as `ALL`
    pub fn slot(self) -> usize {
        match self {
            Label::Correct => 0,
            Label::Incorrect => 1,
            Label::Idk => 2,
        }
    }

    pub fn from_slot(slot: usize) -> Option<Label> {
        Label::ALL.get(slot).copied()
    }

    /// Position on the ordinal agreement scale: Incorrect < IDK < Correct
    pub fn ordinal(self) -> usize {
        match self {
            Label::Incorrect => 0,
            Label::Idk => 1,
            Label::Correct => 2,
        }
    }

    /// Binary correctness value (1 = correct, 0 = incorrect); IDK carries none
    pub fn correctness(self) -> Option<u8> {
        match self {
            Label::Correct => Some(1),
            Label::Incorrect => Some(0),
            Label::Idk => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Label::Correct => "Correct",
            Label::Incorrect => "Incorrect",
            Label::Idk => "I Don't Know",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Label {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Correct" => Ok(Label::Correct),
            "Incorrect" => Ok(Label::Incorrect),
            "I Don't Know" => Ok(Label::Idk),
            other => Err(Error::InvalidInput(format!("Unknown label '{}'", other))),
        }
    }
}

/// Per-label tallies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LabelCounts {
    pub correct: usize,
    pub incorrect: usize,
    pub idk: usize,
}

impl LabelCounts {
    pub fn add(&mut self, label: Label) {
        match label {
            Label::Correct => self.correct += 1,
            Label::Incorrect => self.incorrect += 1,
            Label::Idk => self.idk += 1,
        }
    }

    pub fn get(&self, label: Label) -> usize {
        match label {
            Label::Correct => self.correct,
            Label::Incorrect => self.incorrect,
            Label::Idk => self.idk,
        }
    }

    pub fn total(&self) -> usize {
        self.correct + self.incorrect + self.idk
    }

    pub fn merge(&mut self, other: &LabelCounts) {
        self.correct += other.correct;
        self.incorrect += other.incorrect;
        self.idk += other.idk;
    }
}

impl<'a> FromIterator<&'a Label> for LabelCounts {
    fn from_iter<I: IntoIterator<Item = &'a Label>>(iter: I) -> Self {
        let mut counts = LabelCounts::default();
        for label in iter {
            counts.add(*label);
        }
        counts
    }
}

/// Annotation batch identifier, kept as the raw string found in the input files
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchId(String);

impl BatchId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for BatchId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<u32> for BatchId {
    fn from(id: u32) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Batch metadata entry: the stratum the batch was drawn from and its topic tags
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchMeta {
    pub stratum: Stratum,
    #[serde(default)]
    pub topics: Vec<String>,
}

impl BatchMeta {
    pub fn new(stratum: Stratum, topics: &[&str]) -> Self {
        Self {
            stratum,
            topics: topics.iter().map(|t| t.to_string()).collect(),
        }
    }

    /// True when the batch is tagged as a control (honeypot) batch
    pub fn is_honeypot(&self, honeypot_topic: &str) -> bool {
        self.topics.iter().any(|t| t == honeypot_topic)
    }
}

/// Batch id → metadata lookup for one annotator
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct BatchMetadata {
    batches: HashMap<BatchId, BatchMeta>,
}

impl BatchMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, batch: BatchId, meta: BatchMeta) {
        self.batches.insert(batch, meta);
    }

    pub fn get(&self, batch: &BatchId) -> Option<&BatchMeta> {
        self.batches.get(batch)
    }

    /// Look up a batch, failing with `UnknownBatch` naming the metadata owner
    pub fn lookup(&self, batch: &BatchId, owner: &str) -> Result<&BatchMeta> {
        self.batches.get(batch).ok_or_else(|| Error::UnknownBatch {
            batch: batch.clone(),
            owner: owner.to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }
}

/// Fact-keyed table preserving first-insertion order
///
/// Re-inserting a fact replaces its value but keeps its original position,
/// so iteration order is the order in which facts were first seen.
#[derive(Debug, Clone)]
pub struct FactTable<V> {
    entries: Vec<(Fact, V)>,
    index: HashMap<Fact, usize>,
}

impl<V> Default for FactTable<V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<V> FactTable<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, returning the replaced one for a repeated fact
    pub fn insert(&mut self, fact: Fact, value: V) -> Option<V> {
        match self.index.get(&fact) {
            Some(&ix) => Some(std::mem::replace(&mut self.entries[ix].1, value)),
            None => {
                self.index.insert(fact.clone(), self.entries.len());
                self.entries.push((fact, value));
                None
            }
        }
    }

    pub fn get(&self, fact: &Fact) -> Option<&V> {
        self.index.get(fact).map(|&ix| &self.entries[ix].1)
    }

    pub fn get_mut(&mut self, fact: &Fact) -> Option<&mut V> {
        let ix = *self.index.get(fact)?;
        Some(&mut self.entries[ix].1)
    }

    pub fn contains(&self, fact: &Fact) -> bool {
        self.index.contains_key(fact)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Fact, &V)> {
        self.entries.iter().map(|(fact, value)| (fact, value))
    }

    pub fn facts(&self) -> impl Iterator<Item = &Fact> {
        self.entries.iter().map(|(fact, _)| fact)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V> FromIterator<(Fact, V)> for FactTable<V> {
    fn from_iter<I: IntoIterator<Item = (Fact, V)>>(iter: I) -> Self {
        let mut table = FactTable::new();
        for (fact, value) in iter {
            table.insert(fact, value);
        }
        table
    }
}

/// One annotator's judgment on a fact and the batch it was shown in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub label: Label,
    pub batch: BatchId,
}

impl Annotation {
    pub fn new(label: Label, batch: impl Into<BatchId>) -> Self {
        Self {
            label,
            batch: batch.into(),
        }
    }
}

/// One annotator's annotations in table order
pub type AnnotationTable = FactTable<Annotation>;

/// Stratum-indexed mapping from fact to label
///
/// Used both as the reference dataset (in-sample filter and label source for
/// clustering) and as the output of dataset preparation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledDataset {
    strata: Vec<BTreeMap<Fact, Label>>,
}

impl LabeledDataset {
    pub fn new(num_strata: usize) -> Self {
        Self {
            strata: vec![BTreeMap::new(); num_strata],
        }
    }

    pub fn num_strata(&self) -> usize {
        self.strata.len()
    }

    /// Insert or replace the label of a fact within a stratum
    pub fn insert(&mut self, stratum: Stratum, fact: Fact, label: Label) -> Result<Option<Label>> {
        let strata = self.strata.len();
        let facts = self
            .strata
            .get_mut(stratum)
            .ok_or(Error::StratumOutOfRange { stratum, strata })?;
        Ok(facts.insert(fact, label))
    }

    pub fn get(&self, stratum: Stratum, fact: &Fact) -> Option<Label> {
        self.strata.get(stratum)?.get(fact).copied()
    }

    pub fn stratum(&self, stratum: Stratum) -> Option<&BTreeMap<Fact, Label>> {
        self.strata.get(stratum)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Stratum, &BTreeMap<Fact, Label>)> {
        self.strata.iter().enumerate()
    }

    /// Label tallies of one stratum (empty counts for an unknown stratum)
    pub fn counts(&self, stratum: Stratum) -> LabelCounts {
        self.strata
            .get(stratum)
            .map(|facts| facts.values().collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.strata.iter().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.strata.iter().all(BTreeMap::is_empty)
    }
}
