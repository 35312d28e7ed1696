use async_trait::async_trait;
use serde::Serialize;

use super::error::AuditError;
use super::statistics::RunStatistics;
use crate::domain::{Cents, Route};

/// When an audit entry was taken
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Checkpoint {
    /// Ordinal of a commit checkpoint inside the run
    Interim(u64),
    Final,
}

/// Counters for one route of one area at a checkpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditEntry {
    pub area: String,
    pub route: Route,
    pub checkpoint: Checkpoint,
    pub entities: u64,
    pub modules: u64,
    pub balance: Cents,
}

impl AuditEntry {
    /// One entry per route
    pub fn from_statistics(
        area: &str,
        stats: &RunStatistics,
        checkpoint: Checkpoint,
    ) -> Vec<AuditEntry> {
        stats
            .iter()
            .map(|(route, counters)| AuditEntry {
                area: area.to_string(),
                route,
                checkpoint,
                entities: counters.entities,
                modules: counters.modules,
                balance: counters.balance,
            })
            .collect()
    }
}

/// External bookkeeping for run counters.
///
/// Shared by every area of a run; implementations must serialize their
/// writes.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, entry: &AuditEntry) -> Result<(), AuditError>;

    /// Record every route of `stats` at one checkpoint
    async fn record_statistics(
        &self,
        area: &str,
        stats: &RunStatistics,
        checkpoint: Checkpoint,
    ) -> Result<(), AuditError> {
        for entry in AuditEntry::from_statistics(area, stats, checkpoint) {
            self.record(&entry).await?;
        }
        Ok(())
    }
}
