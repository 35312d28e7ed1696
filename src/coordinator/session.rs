use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::fs;
use tracing::{error, info};

use super::policy::{DecodeErrorMode, ErrorPolicy};
use super::report::AreaReport;
use crate::audit::{AuditSink, Checkpoint};
use crate::domain::{DateRules, LAYOUT_V1, RecordLayout};
use crate::io::{AreaOutputs, remove_artifact, remove_outputs, write_lines};
use crate::pipeline::{
    ClosedGroup, DEFAULT_CHECKPOINT_INTERVAL, DEFAULT_FROZEN_RECORD_TYPE,
    DEFAULT_QUEUE_ROUTING_CODE, EntityBatcher, EntityKeySpec, GroupOutcome, MergeConfig,
    OutputRouter, PipelineError, RecordProcessor, canonical_sort, merge_extracts,
};

/// One processing area: a pair of extracts and how to treat decode errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AreaSpec {
    pub name: String,
    pub primary: PathBuf,
    pub secondary: PathBuf,
    pub on_decode_error: DecodeErrorMode,
}

impl AreaSpec {
    pub fn new(
        name: impl Into<String>,
        primary: impl Into<PathBuf>,
        secondary: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            primary: primary.into(),
            secondary: secondary.into(),
            on_decode_error: DecodeErrorMode::default(),
        }
    }

    pub fn with_decode_errors(mut self, mode: DecodeErrorMode) -> Self {
        self.on_decode_error = mode;
        self
    }
}

/// Settings shared by every area of a run
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub work_dir: PathBuf,
    pub output_dir: PathBuf,
    pub layout: RecordLayout,
    pub rules: DateRules,
    pub max_age: Duration,
    pub checkpoint_interval: usize,
    pub decode_error_samples: usize,
    pub queue_routing_code: String,
    pub frozen_record_type: String,
}

impl RunSettings {
    pub fn new(work_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            output_dir: output_dir.into(),
            layout: LAYOUT_V1,
            rules: DateRules::default(),
            max_age: Duration::from_secs(36 * 3600),
            checkpoint_interval: DEFAULT_CHECKPOINT_INTERVAL,
            decode_error_samples: 10,
            queue_routing_code: DEFAULT_QUEUE_ROUTING_CODE.to_string(),
            frozen_record_type: DEFAULT_FROZEN_RECORD_TYPE.to_string(),
        }
    }

    pub fn merged_path(&self, area: &str) -> PathBuf {
        self.work_dir.join(format!("{area}.merged.dat"))
    }

    pub fn canonical_path(&self, area: &str) -> PathBuf {
        self.work_dir.join(format!("{area}.canonical.dat"))
    }
}

/// Runs Merge, Sort, Batch, Process and Write for one area, strictly in order
pub struct AreaSession {
    spec: AreaSpec,
    settings: Arc<RunSettings>,
    sink: Arc<dyn AuditSink>,
    policy: Arc<dyn ErrorPolicy>,
    now: SystemTime,
}

impl AreaSession {
    pub fn new(spec: AreaSpec, settings: Arc<RunSettings>, sink: Arc<dyn AuditSink>) -> Self {
        let policy = spec.on_decode_error.policy();
        Self {
            spec,
            settings,
            sink,
            policy,
            now: SystemTime::now(),
        }
    }

    pub fn with_policy(mut self, policy: Arc<dyn ErrorPolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// Reference time for the freshness check
    pub fn with_clock(mut self, now: SystemTime) -> Self {
        self.now = now;
        self
    }

    pub fn area(&self) -> &str {
        &self.spec.name
    }

    /// Run the pipeline; failures are captured in the report, never raised
    pub async fn run(self) -> AreaReport {
        let mut report = AreaReport::new(&self.spec.name);
        info!(area = %self.spec.name, "Area started");

        match self.execute(&mut report).await {
            Ok(()) => {
                report.succeed();
                info!(
                    area = %self.spec.name,
                    groups = report.groups,
                    modules = report.modules,
                    decode_failures = report.decode_failures,
                    "Area finished"
                );
            }
            Err(e) => {
                error!(area = %self.spec.name, stage = e.stage(), error = %e, "Area failed");
                report.fail(&e);
            }
        }

        report
    }

    async fn execute(&self, report: &mut AreaReport) -> Result<(), PipelineError> {
        let area = self.spec.name.as_str();
        let settings = &self.settings;

        prepare_dir(&settings.work_dir).await?;
        prepare_dir(&settings.output_dir).await?;
        remove_outputs(&settings.output_dir, area)
            .await
            .map_err(PipelineError::Output)?;
        let merged = settings.merged_path(area);
        let canonical = settings.canonical_path(area);
        for path in [&merged, &canonical] {
            remove_artifact(path).await.map_err(PipelineError::Output)?;
        }

        let merge_config = MergeConfig {
            layout: settings.layout,
            max_age: settings.max_age,
        };
        let outcome = merge_extracts(
            &self.spec.primary,
            &self.spec.secondary,
            &merge_config,
            self.now,
        )
        .await?;
        report.merge = Some(outcome.stats);
        let mut records = outcome.records;

        let lines: Vec<&str> = records.iter().map(|r| r.line()).collect();
        write_lines(&merged, &lines)
            .await
            .map_err(PipelineError::Output)?;
        report.merged_path = Some(merged);

        canonical_sort(&mut records)?;
        let lines: Vec<&str> = records.iter().map(|r| r.line()).collect();
        write_lines(&canonical, &lines)
            .await
            .map_err(PipelineError::Output)?;
        report.canonical_path = Some(canonical);

        let processor = RecordProcessor::new(
            settings.layout,
            settings.rules,
            settings.queue_routing_code.clone(),
            settings.frozen_record_type.clone(),
        )?;
        let mut batcher = EntityBatcher::new(
            EntityKeySpec::from_layout(&settings.layout)?,
            settings.checkpoint_interval,
        );
        let mut router = OutputRouter::new(AreaOutputs::new(&settings.output_dir, area));

        for record in records {
            if let Some(closed) = batcher.push(record) {
                self.handle_group(closed, &processor, &mut router, report)
                    .await?;
            }
        }
        if let Some(closed) = batcher.finish() {
            self.handle_group(closed, &processor, &mut router, report)
                .await?;
        }

        let (outputs, stats) = router.close().await?;
        self.sink
            .record_statistics(area, &stats, Checkpoint::Final)
            .await?;

        report.outputs = outputs;
        report.routes = Some(stats);
        Ok(())
    }

    async fn handle_group(
        &self,
        closed: ClosedGroup,
        processor: &RecordProcessor,
        router: &mut OutputRouter,
        report: &mut AreaReport,
    ) -> Result<(), PipelineError> {
        let area = self.spec.name.as_str();
        let GroupOutcome { entity, failures } = processor.process(closed.group);

        report.groups += 1;
        report.modules += entity.modules.len();

        for failure in failures {
            report.record_decode_failure(&failure, self.settings.decode_error_samples);
            if !self.policy.handle_decode_error(area, &failure) {
                return Err(failure.into_error());
            }
        }

        router.route(&entity).await?;

        if let Some(ordinal) = closed.checkpoint {
            router.flush().await?;
            self.sink
                .record_statistics(area, router.statistics(), Checkpoint::Interim(ordinal))
                .await?;
            report.checkpoints += 1;
        }

        Ok(())
    }
}

async fn prepare_dir(dir: &Path) -> Result<(), PipelineError> {
    fs::create_dir_all(dir)
        .await
        .map_err(|e| PipelineError::Output(e.into()))
}
