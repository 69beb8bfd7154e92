//! Outcome of an update.

use crate::pipeline::data::DataObject;
use crate::pipeline::error::{ErrorKind, ErrorRecord, PipelineError, PipelineResult};
use crate::pipeline::id::{AlgorithmId, PortId};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateStatus {
    Succeeded,
    Failed,
    Cancelled,
}

/// Everything an update did: the error records it collected and which
/// algorithms ran, which were served from cache and which ports released
/// their data.
#[derive(Debug, Clone)]
pub struct UpdateReport {
    pub port: PortId,
    pub status: UpdateStatus,
    pub errors: Vec<ErrorRecord>,
    pub executed: Vec<AlgorithmId>,
    pub reused: Vec<AlgorithmId>,
    pub released: Vec<PortId>,
    pub elapsed: Duration,
}

impl UpdateReport {
    pub(crate) fn new(port: PortId) -> Self {
        Self {
            port,
            status: UpdateStatus::Succeeded,
            errors: Vec::new(),
            executed: Vec::new(),
            reused: Vec::new(),
            released: Vec::new(),
            elapsed: Duration::ZERO,
        }
    }

    /// Derive the status from the collected records.
    pub(crate) fn finish(&mut self, elapsed: Duration) {
        self.elapsed = elapsed;
        self.status = if self.errors.iter().any(|e| e.kind == ErrorKind::Cancelled) {
            UpdateStatus::Cancelled
        } else if self.errors.is_empty() {
            UpdateStatus::Succeeded
        } else {
            UpdateStatus::Failed
        };
    }

    pub fn is_success(&self) -> bool {
        self.status == UpdateStatus::Succeeded
    }

    /// Number of `Execute` calls made for `algorithm` during this update.
    pub fn execute_count(&self, algorithm: AlgorithmId) -> usize {
        self.executed.iter().filter(|&&a| a == algorithm).count()
    }

    pub fn was_reused(&self, algorithm: AlgorithmId) -> bool {
        self.reused.contains(&algorithm)
    }

    /// Algorithms with at least one error record, in first-failure order.
    pub fn failed_algorithms(&self) -> Vec<AlgorithmId> {
        let mut out = Vec::new();
        for record in &self.errors {
            if !out.contains(&record.algorithm) {
                out.push(record.algorithm);
            }
        }
        out
    }

    pub fn into_result(self) -> PipelineResult<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(PipelineError::UpdateFailed {
                port: self.port,
                status: self.status,
                errors: self.errors,
            })
        }
    }
}

/// Result of a piece-by-piece update.
#[derive(Debug, Clone)]
pub struct StreamedUpdate {
    pub report: UpdateReport,
    /// Output of every completed piece, in piece order.
    pub pieces: Vec<DataObject>,
    /// All pieces combined; `None` unless every piece succeeded.
    pub combined: Option<DataObject>,
}
