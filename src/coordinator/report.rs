use std::path::PathBuf;

use serde::Serialize;

use crate::audit::RunStatistics;
use crate::domain::Origin;
use crate::pipeline::{DecodeFailure, MergeStats, PipelineError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AreaStatus {
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Succeeded,
    /// At least one area failed and at least one succeeded
    Partial,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodeErrorSample {
    pub origin: Origin,
    pub line_no: usize,
    pub identifier: String,
    pub message: String,
}

impl From<&DecodeFailure> for DecodeErrorSample {
    fn from(failure: &DecodeFailure) -> Self {
        Self {
            origin: failure.origin,
            line_no: failure.line_no,
            identifier: failure.identifier.clone(),
            message: failure.error.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AreaFailure {
    pub stage: &'static str,
    pub message: String,
}

/// Outcome of one area's pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AreaReport {
    pub area: String,
    pub status: AreaStatus,
    pub failure: Option<AreaFailure>,
    pub merge: Option<MergeStats>,
    pub merged_path: Option<PathBuf>,
    pub canonical_path: Option<PathBuf>,
    pub groups: usize,
    pub modules: usize,
    pub decode_failures: usize,
    /// First decode failures, bounded by configuration
    pub decode_error_samples: Vec<DecodeErrorSample>,
    pub checkpoints: u64,
    pub routes: Option<RunStatistics>,
    pub outputs: Vec<PathBuf>,
}

impl AreaReport {
    pub fn new(area: impl Into<String>) -> Self {
        Self {
            area: area.into(),
            status: AreaStatus::Failed,
            failure: None,
            merge: None,
            merged_path: None,
            canonical_path: None,
            groups: 0,
            modules: 0,
            decode_failures: 0,
            decode_error_samples: Vec::new(),
            checkpoints: 0,
            routes: None,
            outputs: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == AreaStatus::Succeeded
    }

    pub fn record_decode_failure(&mut self, failure: &DecodeFailure, sample_limit: usize) {
        self.decode_failures += 1;
        if self.decode_error_samples.len() < sample_limit {
            self.decode_error_samples.push(failure.into());
        }
    }

    pub fn succeed(&mut self) {
        self.status = AreaStatus::Succeeded;
        self.failure = None;
    }

    pub fn fail(&mut self, error: &PipelineError) {
        if let Some(stats) = error.merge_stats() {
            self.merge = Some(stats.clone());
        }
        self.fail_with(error.stage(), error.to_string());
    }

    pub fn fail_with(&mut self, stage: &'static str, message: String) {
        self.status = AreaStatus::Failed;
        self.failure = Some(AreaFailure { stage, message });
        self.outputs.clear();
    }
}

/// Combined outcome of every area in a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub status: RunStatus,
    pub areas: Vec<AreaReport>,
}

impl RunReport {
    pub fn from_areas(areas: Vec<AreaReport>) -> Self {
        let succeeded = areas.iter().filter(|a| a.is_success()).count();
        let status = match succeeded {
            0 => RunStatus::Failed,
            n if n == areas.len() => RunStatus::Succeeded,
            _ => RunStatus::Partial,
        };
        Self { status, areas }
    }

    pub fn area(&self, name: &str) -> Option<&AreaReport> {
        self.areas.iter().find(|a| a.area == name)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
