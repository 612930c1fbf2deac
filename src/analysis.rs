//! Extension points for higher-order analysis stages
//!
//! Connectivity statistics, shock detection, and similar measures sit on
//! top of the preprocessed dataset but are intentionally not implemented
//! here. Each plugs in as an [`AnalysisStage`]: a named, synchronous
//! computation over the read-only [`AnalysisInput`] that yields a JSON
//! payload. The runner executes stages in registration order and collects
//! per-stage failures instead of aborting the batch.

use anyhow::Result;
use serde::Serialize;
use tracing::{debug, warn};

use crate::types::{FlowRecord, MarketCluster, SpatialWeights, TimeSeriesSet};

/// Read-only view of the preprocessed dataset handed to every stage.
#[derive(Clone, Copy)]
pub struct AnalysisInput<'a> {
    pub weights: &'a SpatialWeights,
    pub clusters: &'a [MarketCluster],
    pub flows: &'a [FlowRecord],
    pub series: &'a TimeSeriesSet,
}

/// The output of one stage: its name plus an arbitrary JSON payload whose
/// shape is the stage's own contract with its consumers.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub stage: String,
    pub payload: serde_json::Value,
}

pub trait AnalysisStage: Send + Sync {
    /// Stage name used for logging and report attribution.
    fn name(&self) -> &str;

    fn run(&self, input: &AnalysisInput<'_>) -> Result<AnalysisReport>;
}

/// A failed stage, kept alongside the successful reports.
#[derive(Debug)]
pub struct StageFailure {
    pub stage: String,
    pub error: anyhow::Error,
}

#[derive(Debug, Default)]
pub struct AnalysisOutcome {
    pub reports: Vec<AnalysisReport>,
    pub failures: Vec<StageFailure>,
}

/// Runs registered analysis stages over one dataset.
#[derive(Default)]
pub struct AnalysisRunner {
    stages: Vec<Box<dyn AnalysisStage>>,
}

impl AnalysisRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stage(mut self, stage: Box<dyn AnalysisStage>) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Run every stage in registration order. A stage failure is recorded
    /// and the next stage still runs; downstream consumers always get the
    /// reports that could be produced.
    pub fn run_all(&self, input: &AnalysisInput<'_>) -> AnalysisOutcome {
        let mut outcome = AnalysisOutcome::default();
        for stage in &self.stages {
            match stage.run(input) {
                Ok(report) => {
                    debug!("analysis stage {} completed", stage.name());
                    outcome.reports.push(report);
                }
                Err(error) => {
                    warn!("analysis stage {} failed: {:#}", stage.name(), error);
                    outcome.failures.push(StageFailure {
                        stage: stage.name().to_string(),
                        error,
                    });
                }
            }
        }
        outcome
    }
}
