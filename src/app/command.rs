use std::sync::Arc;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::info;

use super::cli::Args;
use super::config::Config;
use super::error::AppError;
use crate::audit::{AuditSink, JsonLinesAuditSink, TracingAuditSink};
use crate::coordinator::{RunCoordinator, RunReport};

/// Audit destination for a run: a JSON-lines file when configured,
/// otherwise the log
pub async fn audit_sink(config: &Config) -> Result<Arc<dyn AuditSink>, AppError> {
    Ok(match &config.audit_log {
        Some(path) => Arc::new(JsonLinesAuditSink::open(path).await?),
        None => Arc::new(TracingAuditSink),
    })
}

/// Run every selected area of `config` and return the combined report
pub async fn run_config(config: &Config, only: &[String]) -> Result<RunReport, AppError> {
    config.validate()?;
    let specs = config.area_specs(only)?;
    let sink = audit_sink(config).await?;

    info!(
        areas = specs.len(),
        work_dir = %config.work_dir.display(),
        output_dir = %config.output_dir.display(),
        "Starting run"
    );

    let coordinator = specs
        .into_iter()
        .fold(RunCoordinator::new(config.settings(), sink), |c, spec| {
            c.add_area(spec)
        });
    Ok(coordinator.run().await)
}

/// Resolve the configuration from `args`, run it and write the JSON report
/// to `writer` (and to `--report` when given)
pub async fn execute<W>(args: &Args, writer: &mut W) -> Result<RunReport, AppError>
where
    W: AsyncWrite + Unpin,
{
    let config = args.load_config().await?;
    let report = run_config(&config, &args.areas).await?;

    let mut json = report.to_json_pretty()?;
    json.push('\n');

    if let Some(path) = &args.report {
        tokio::fs::write(path, &json).await?;
    }
    writer.write_all(json.as_bytes()).await?;
    writer.flush().await?;

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::RunStatus;
    use crate::domain::{LAYOUT_V1, LineBuilder, names};
    use clap::Parser;
    use std::path::Path;

    fn line(tin: &str) -> String {
        LineBuilder::new(&LAYOUT_V1)
            .set(names::TIN, tin)
            .set(names::NAME_CONTROL, "SMIT")
            .set(names::CYCLE, "202412")
            .set(names::EXTRACT_DATE, "20241215")
            .set(names::ROUTING_CODE, "12")
            .set(names::FAMILY, "T")
            .set(names::RECORD_TYPE, "01")
            .set(names::TAX_PERIOD, "202201")
            .set(names::BALANCE, "1000")
            .build()
    }

    fn write_extract(dir: &Path, name: &str, tins: &[&str]) -> String {
        let path = dir.join(name);
        let body: String = tins.iter().map(|t| format!("{}\n", line(t))).collect();
        std::fs::write(&path, body).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[tokio::test]
    async fn ad_hoc_run_writes_report_and_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let primary = write_extract(dir.path(), "p.dat", &["00000000123"]);
        let secondary = write_extract(dir.path(), "s.dat", &["00000000050"]);
        let work = dir.path().join("work").to_string_lossy().into_owned();
        let out = dir.path().join("out").to_string_lossy().into_owned();
        let report_path = dir.path().join("report.json");
        let report_arg = report_path.to_string_lossy().into_owned();

        let args = Args::try_parse_from([
            "casefile", "--primary", &primary, "--secondary", &secondary, "--work-dir", &work,
            "--output-dir", &out, "--name", "north", "--report", &report_arg,
        ])
        .unwrap();

        let mut stdout = Vec::new();
        let report = execute(&args, &mut stdout).await.unwrap();

        assert_eq!(report.status, RunStatus::Succeeded);
        let printed: serde_json::Value = serde_json::from_slice(&stdout).unwrap();
        assert_eq!(printed["status"], "succeeded");
        assert_eq!(printed["areas"][0]["area"], "north");
        assert_eq!(std::fs::read(&report_path).unwrap(), stdout);

        let entities = std::fs::read_to_string(dir.path().join("out/north.a.entity.dat")).unwrap();
        let tins: Vec<_> = entities.lines().map(|l| l.split('|').nth(1).unwrap()).collect();
        assert_eq!(tins, vec!["00000000050", "00000000123"]);
    }

    #[tokio::test]
    async fn audit_log_receives_final_entries() {
        let dir = tempfile::tempdir().unwrap();
        let primary = write_extract(dir.path(), "p.dat", &["00000000123"]);
        let secondary = write_extract(dir.path(), "s.dat", &["00000000050"]);
        let audit = dir.path().join("audit.jsonl");

        let mut config = Config::single_area(
            "north",
            primary,
            secondary,
            dir.path().join("work"),
            dir.path().join("out"),
        );
        config.audit_log = Some(audit.clone());

        let report = run_config(&config, &[]).await.unwrap();
        assert_eq!(report.status, RunStatus::Succeeded);

        let entries: Vec<serde_json::Value> = std::fs::read_to_string(&audit)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        let finals: Vec<_> = entries
            .iter()
            .filter(|e| e["checkpoint"] == "final")
            .collect();
        assert_eq!(finals.len(), 2);
        assert_eq!(finals[0]["area"], "north");
    }

    #[tokio::test]
    async fn unknown_area_filter_is_a_config_error() {
        let config = Config::single_area("north", "a", "b", "w", "o");
        let result = run_config(&config, &["south".to_string()]).await;
        assert!(matches!(result, Err(AppError::Config(_))));
    }
}
