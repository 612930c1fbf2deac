//! Error types shared across the ingestion pipeline

use std::path::PathBuf;

use thiserror::Error;

use crate::queue::QueueError;

/// The four base dataset sources the pipeline loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Geo,
    Flows,
    TimeSeries,
    Weights,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Geo => "geo",
            SourceKind::Flows => "flows",
            SourceKind::TimeSeries => "time_series",
            SourceKind::Weights => "weights",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum IngestError {
    /// A source file exists but cannot be decoded. Unlike a missing file
    /// this aborts the whole load.
    #[error("malformed {kind} source {}: {source}", .path.display())]
    MalformedSource {
        kind: SourceKind,
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
    #[error("task queue error: {0}")]
    Queue(#[from] QueueError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl IngestError {
    pub(crate) fn malformed(
        kind: SourceKind,
        path: impl Into<PathBuf>,
        source: anyhow::Error,
    ) -> Self {
        IngestError::MalformedSource {
            kind,
            path: path.into(),
            source,
        }
    }
}
