//! Cluster construction for two-stage cluster sampling
//!
//! Observed judgments are streamed in a fixed order (crowd annotators sorted
//! by name, then the first expert) and grouped into clusters of binary
//! correctness values, one cluster per contiguous run of a batch within a
//! stratum. A single set of observed facts spans both passes, so each fact is
//! counted once, at its first occurrence.

use std::collections::HashSet;

use kgacc_common::io::AnnotatorData;
use kgacc_common::{BatchId, Error, Fact, LabeledDataset, Result, Stratum};
use tracing::{debug, info, warn};

/// Binary correctness values (1 = correct, 0 = incorrect) from one batch
pub type Cluster = Vec<u8>;

/// Facts already consumed by the scan, shared across passes
#[derive(Debug, Clone, Default)]
pub struct ObservedFacts {
    facts: HashSet<Fact>,
}

impl ObservedFacts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a fact as observed; returns false if it already was
    pub fn mark(&mut self, fact: &Fact) -> bool {
        self.facts.insert(fact.clone())
    }

    pub fn contains(&self, fact: &Fact) -> bool {
        self.facts.contains(fact)
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }
}

/// Running cluster state of one stratum
#[derive(Debug, Clone, Default)]
pub struct StratumClusters {
    current_batch: Option<BatchId>,
    clusters: Vec<Cluster>,
    closed_batches: HashSet<BatchId>,
}

impl StratumClusters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Batch whose cluster is currently open
    pub fn current_batch(&self) -> Option<&BatchId> {
        self.current_batch.as_ref()
    }

    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    pub fn into_clusters(self) -> Vec<Cluster> {
        self.clusters
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    /// Total number of values across clusters
    pub fn observations(&self) -> usize {
        self.clusters.iter().map(Vec::len).sum()
    }

    /// Whether `batch` had a run that was closed by a different batch
    pub fn is_closed(&self, batch: &BatchId) -> bool {
        self.closed_batches.contains(batch)
    }

    /// Extend the open cluster when `batch` is current, otherwise open a new one
    ///
    /// Returns true if a new cluster was opened.
    fn push(&mut self, batch: &BatchId, value: u8) -> bool {
        if self.current_batch.as_ref() == Some(batch) {
            if let Some(cluster) = self.clusters.last_mut() {
                cluster.push(value);
                return false;
            }
        }

        if let Some(previous) = self.current_batch.take() {
            self.closed_batches.insert(previous);
        }
        self.clusters.push(vec![value]);
        self.current_batch = Some(batch.clone());
        true
    }
}

/// Outcome of feeding one judgment to the builder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// Fact consumed earlier in the scan
    Duplicate,
    /// Fact absent from the dataset for its stratum
    OutOfSample,
    /// Dataset label is IDK
    Idk,
    /// Value appended to the open cluster
    Extended,
    /// Value started a new cluster
    Opened,
    /// Value started a second cluster for an already closed batch (lenient mode)
    Reopened,
}

/// Tally of observations over a scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub duplicates: usize,
    pub out_of_sample: usize,
    pub idk: usize,
    pub clustered: usize,
    pub clusters_opened: usize,
    pub fragmented: usize,
}

impl ScanStats {
    pub fn record(&mut self, observation: Observation) {
        match observation {
            Observation::Duplicate => self.duplicates += 1,
            Observation::OutOfSample => self.out_of_sample += 1,
            Observation::Idk => self.idk += 1,
            Observation::Extended => self.clustered += 1,
            Observation::Opened => {
                self.clustered += 1;
                self.clusters_opened += 1;
            }
            Observation::Reopened => {
                self.clustered += 1;
                self.clusters_opened += 1;
                self.fragmented += 1;
            }
        }
    }
}

/// Streaming cluster builder over all strata of a dataset
pub struct ClusterBuilder<'a> {
    dataset: &'a LabeledDataset,
    strict: bool,
    observed: ObservedFacts,
    strata: Vec<StratumClusters>,
    stats: ScanStats,
}

impl<'a> ClusterBuilder<'a> {
    /// `strict` turns a non-contiguous batch into an error instead of a warning
    pub fn new(dataset: &'a LabeledDataset, strict: bool) -> Self {
        Self {
            dataset,
            strict,
            observed: ObservedFacts::new(),
            strata: vec![StratumClusters::new(); dataset.num_strata()],
            stats: ScanStats::default(),
        }
    }

    /// Feed one judgment, in stream order
    ///
    /// The label comes from the dataset, not from the judgment itself.
    ///
    /// # Errors
    ///
    /// - `StratumOutOfRange` for a stratum the dataset does not have
    /// - `FragmentedBatch` in strict mode when a closed batch reappears
    pub fn observe(&mut self, fact: &Fact, batch: &BatchId, stratum: Stratum) -> Result<Observation> {
        let strata = self.strata.len();
        if stratum >= strata {
            return Err(Error::StratumOutOfRange { stratum, strata });
        }

        let observation = self.classify(fact, batch, stratum)?;
        self.stats.record(observation);
        Ok(observation)
    }

    fn classify(&mut self, fact: &Fact, batch: &BatchId, stratum: Stratum) -> Result<Observation> {
        if !self.observed.mark(fact) {
            return Ok(Observation::Duplicate);
        }
        let Some(label) = self.dataset.get(stratum, fact) else {
            return Ok(Observation::OutOfSample);
        };
        let Some(value) = label.correctness() else {
            return Ok(Observation::Idk);
        };

        let clusters = &mut self.strata[stratum];
        let reopening = clusters.current_batch() != Some(batch) && clusters.is_closed(batch);
        if reopening {
            if self.strict {
                return Err(Error::FragmentedBatch {
                    stratum,
                    batch: batch.clone(),
                });
            }
            warn!(
                "Batch {} revisited in stratum {}: starting a second cluster",
                batch, stratum
            );
        }

        let opened = clusters.push(batch, value);
        Ok(match (opened, reopening) {
            (false, _) => Observation::Extended,
            (true, false) => Observation::Opened,
            (true, true) => Observation::Reopened,
        })
    }

    /// Feed every annotation of one annotator in table order
    pub fn scan_annotator(&mut self, annotator: &AnnotatorData) -> Result<ScanStats> {
        let mut stats = ScanStats::default();
        for (fact, annotation) in annotator.annotations.iter() {
            let meta = annotator.metadata.lookup(&annotation.batch, &annotator.name)?;
            stats.record(self.observe(fact, &annotation.batch, meta.stratum)?);
        }
        debug!(
            "Scanned '{}': {} clustered, {} duplicates, {} out of sample, {} IDK",
            annotator.name, stats.clustered, stats.duplicates, stats.out_of_sample, stats.idk
        );
        Ok(stats)
    }

    pub fn observed(&self) -> &ObservedFacts {
        &self.observed
    }

    pub fn stratum(&self, stratum: Stratum) -> Option<&StratumClusters> {
        self.strata.get(stratum)
    }

    pub fn stats(&self) -> ScanStats {
        self.stats
    }

    /// Clusters per stratum
    pub fn finish(self) -> Vec<Vec<Cluster>> {
        info!(
            "Built {} clusters from {} observations ({} batch fragmentations)",
            self.stats.clusters_opened, self.stats.clustered, self.stats.fragmented
        );
        self.strata
            .into_iter()
            .map(StratumClusters::into_clusters)
            .collect()
    }
}

/// Build clusters from the crowd annotators, then the first expert
///
/// `crowd` must already be in processing order (sorted by annotator name).
pub fn build_clusters(
    dataset: &LabeledDataset,
    crowd: &[AnnotatorData],
    expert: &AnnotatorData,
    strict: bool,
) -> Result<Vec<Vec<Cluster>>> {
    let mut builder = ClusterBuilder::new(dataset, strict);
    for annotator in crowd {
        builder.scan_annotator(annotator)?;
    }
    builder.scan_annotator(expert)?;
    Ok(builder.finish())
}
