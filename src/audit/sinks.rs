use std::path::{Path, PathBuf};

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::info;

use super::error::AuditError;
use super::sink::{AuditEntry, AuditSink, Checkpoint};

/// Emits each entry as a structured log event
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        info!(
            area = %entry.area,
            route = %entry.route,
            checkpoint = ?entry.checkpoint,
            entities = entry.entities,
            modules = entry.modules,
            balance = %entry.balance,
            "Audit checkpoint"
        );
        Ok(())
    }
}

/// In-memory sink keyed by area
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    entries: DashMap<String, Vec<AuditEntry>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries recorded for an area, in arrival order
    pub fn entries(&self, area: &str) -> Vec<AuditEntry> {
        self.entries
            .get(area)
            .map(|r| r.value().clone())
            .unwrap_or_default()
    }

    pub fn final_entries(&self, area: &str) -> Vec<AuditEntry> {
        self.entries(area)
            .into_iter()
            .filter(|e| e.checkpoint == Checkpoint::Final)
            .collect()
    }

    /// Areas with at least one entry, sorted
    pub fn areas(&self) -> Vec<String> {
        let mut areas: Vec<_> = self.entries.iter().map(|e| e.key().clone()).collect();
        areas.sort();
        areas
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn record(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        self.entries
            .entry(entry.area.clone())
            .or_default()
            .push(entry.clone());
        Ok(())
    }
}

/// Appends one JSON object per entry to a file
pub struct JsonLinesAuditSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl JsonLinesAuditSink {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, AuditError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl AuditSink for JsonLinesAuditSink {
    async fn record(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');

        let mut file = self.file.lock().await;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::RunStatistics;
    use crate::domain::{Cents, Route};
    use std::sync::Arc;

    fn entry(area: &str, checkpoint: Checkpoint) -> AuditEntry {
        AuditEntry {
            area: area.to_string(),
            route: Route::A,
            checkpoint,
            entities: 2,
            modules: 5,
            balance: Cents::from_raw(12_345),
        }
    }

    #[tokio::test]
    async fn memory_sink_groups_by_area() {
        let sink = MemoryAuditSink::new();
        sink.record(&entry("south", Checkpoint::Interim(1))).await.unwrap();
        sink.record(&entry("north", Checkpoint::Final)).await.unwrap();
        sink.record(&entry("south", Checkpoint::Final)).await.unwrap();

        assert_eq!(sink.areas(), vec!["north".to_string(), "south".to_string()]);
        assert_eq!(sink.entries("south").len(), 2);
        assert_eq!(sink.final_entries("south").len(), 1);
        assert!(sink.entries("east").is_empty());
    }

    #[tokio::test]
    async fn record_statistics_writes_one_entry_per_route() {
        let sink = MemoryAuditSink::new();
        let stats = RunStatistics::new();
        sink.record_statistics("north", &stats, Checkpoint::Final)
            .await
            .unwrap();
        assert_eq!(sink.final_entries("north").len(), 2);
    }

    #[tokio::test]
    async fn concurrent_writers_produce_whole_lines() {
        let dir = tempfile::tempdir().unwrap();
        let sink = Arc::new(JsonLinesAuditSink::open(dir.path().join("audit.jsonl")).await.unwrap());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let sink = sink.clone();
                tokio::spawn(async move {
                    sink.record(&entry(&format!("area{i}"), Checkpoint::Final))
                        .await
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        let contents = std::fs::read_to_string(sink.path()).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 8);
        for line in lines {
            let value: serde_json::Value = serde_json::from_str(line).unwrap();
            assert_eq!(value["balance"], "123.45");
            assert_eq!(value["checkpoint"], "final");
            assert_eq!(value["route"], "a");
        }
    }

    #[tokio::test]
    async fn tracing_sink_accepts_entries() {
        TracingAuditSink
            .record(&entry("north", Checkpoint::Interim(1)))
            .await
            .unwrap();
    }
}
