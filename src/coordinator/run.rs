use std::sync::Arc;

use tracing::{error, info};

use super::report::{AreaReport, RunReport};
use super::session::{AreaSession, AreaSpec, RunSettings};
use crate::audit::AuditSink;

/// Runs every configured area as its own task.
///
/// Areas share nothing but the audit sink; one area failing never stops
/// the others.
pub struct RunCoordinator {
    settings: Arc<RunSettings>,
    sink: Arc<dyn AuditSink>,
    areas: Vec<AreaSpec>,
}

impl RunCoordinator {
    pub fn new(settings: RunSettings, sink: Arc<dyn AuditSink>) -> Self {
        Self {
            settings: Arc::new(settings),
            sink,
            areas: Vec::new(),
        }
    }

    /// Add an area to the run (fluent interface)
    pub fn add_area(mut self, spec: AreaSpec) -> Self {
        self.areas.push(spec);
        self
    }

    /// Run all areas concurrently and collect their reports in
    /// configuration order
    pub async fn run(self) -> RunReport {
        let handles: Vec<_> = self
            .areas
            .into_iter()
            .map(|spec| {
                let name = spec.name.clone();
                let session = AreaSession::new(spec, self.settings.clone(), self.sink.clone());
                (name, tokio::spawn(session.run()))
            })
            .collect();

        let mut reports = Vec::with_capacity(handles.len());
        for (name, handle) in handles {
            let report = handle.await.unwrap_or_else(|e| {
                error!(area = %name, error = %e, "Area task did not complete");
                let mut report = AreaReport::new(&name);
                report.fail_with("task", e.to_string());
                report
            });
            reports.push(report);
        }

        let report = RunReport::from_areas(reports);
        info!(
            status = ?report.status,
            areas = report.areas.len(),
            failed = report.areas.iter().filter(|a| !a.is_success()).count(),
            "Run finished"
        );
        report
    }
}
