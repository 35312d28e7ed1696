use std::future::Future;
use std::path::PathBuf;

use clap::Parser;
use tracing::{error, warn};

use super::config::Config;
use super::error::AppError;
use super::logging::{LogFormat, LogLevel};
use crate::coordinator::RunStatus;

/// Batch engine for paired fixed-width case extracts
#[derive(Debug, Clone, Parser)]
#[command(name = "casefile", version, about)]
pub struct Args {
    /// TOML run configuration
    #[arg(short, long, env = "CASEFILE_CONFIG", conflicts_with = "primary")]
    pub config: Option<PathBuf>,

    /// Primary extract of a single ad-hoc area
    #[arg(long, requires = "secondary")]
    pub primary: Option<PathBuf>,

    /// Secondary extract of a single ad-hoc area
    #[arg(long, requires = "primary")]
    pub secondary: Option<PathBuf>,

    /// Name of the ad-hoc area
    #[arg(long, default_value = "adhoc")]
    pub name: String,

    /// Directory for merged and canonical files
    #[arg(long, env = "CASEFILE_WORK_DIR")]
    pub work_dir: Option<PathBuf>,

    /// Directory for entity, summary and module files
    #[arg(long, env = "CASEFILE_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Only run the named area (repeatable)
    #[arg(long = "area", value_name = "NAME")]
    pub areas: Vec<String>,

    /// Also write the JSON run report to this file
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Append audit entries as JSON lines to this file
    #[arg(long, env = "CASEFILE_AUDIT_LOG")]
    pub audit_log: Option<PathBuf>,

    #[arg(long, env = "CASEFILE_LOG_LEVEL", default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    #[arg(long, env = "CASEFILE_LOG_FORMAT", default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl Args {
    /// Build the run configuration from the config file or the ad-hoc
    /// area flags; directory and audit flags override the file
    pub async fn load_config(&self) -> Result<Config, AppError> {
        let mut config = match (&self.config, &self.primary, &self.secondary) {
            (Some(path), _, _) => Config::load(path).await?,
            (None, Some(primary), Some(secondary)) => {
                let (Some(work_dir), Some(output_dir)) = (&self.work_dir, &self.output_dir)
                else {
                    return Err(AppError::Config(
                        "--work-dir and --output-dir are required without --config".to_string(),
                    ));
                };
                Config::single_area(&self.name, primary, secondary, work_dir, output_dir)
            }
            _ => {
                return Err(AppError::Config(
                    "either --config or --primary/--secondary is required".to_string(),
                ));
            }
        };

        if let Some(dir) = &self.work_dir {
            config.work_dir = dir.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(path) = &self.audit_log {
            config.audit_log = Some(path.clone());
        }

        config.validate()?;
        Ok(config)
    }
}

/// Exit code for a finished run
pub fn exit_code(status: RunStatus) -> i32 {
    match status {
        RunStatus::Succeeded => 0,
        RunStatus::Partial | RunStatus::Failed => 1,
    }
}

/// CLI application runner that handles:
/// - Signal handling (SIGINT, SIGTERM, SIGHUP)
/// - Stdout buffering
/// - Exit codes (0 = success, 1 = failed area or error, 130 = SIGINT, 143 = SIGTERM)
///
/// An interrupted run exits without closing its output streams, so nothing
/// from it appears under a finished name.
pub struct CliApp {
    name: String,
}

impl CliApp {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the application and exit the process with the resulting code
    pub async fn run<F, Fut>(self, main_fn: F) -> !
    where
        F: FnOnce(tokio::io::BufWriter<tokio::io::Stdout>) -> Fut,
        Fut: Future<Output = Result<RunStatus, AppError>>,
    {
        let writer = tokio::io::BufWriter::new(tokio::io::stdout());
        let signal_fut = self.wait_for_signal();

        tokio::select! {
            result = main_fn(writer) => {
                match result {
                    Ok(status) => std::process::exit(exit_code(status)),
                    Err(e) => {
                        error!(app = %self.name, error = %e, "Run aborted");
                        eprintln!("Error: {}", e);
                        std::process::exit(1);
                    }
                }
            }
            signal_code = signal_fut => {
                std::process::exit(signal_code);
            }
        }
    }

    /// Wait for SIGINT, SIGTERM or SIGHUP (Ctrl+C elsewhere) and return
    /// the matching exit code
    async fn wait_for_signal(&self) -> i32 {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};

            let mut sigterm =
                signal(SignalKind::terminate()).expect("Failed to setup SIGTERM handler");
            let mut sigint =
                signal(SignalKind::interrupt()).expect("Failed to setup SIGINT handler");
            let mut sighup = signal(SignalKind::hangup()).expect("Failed to setup SIGHUP handler");

            tokio::select! {
                _ = sigterm.recv() => {
                    warn!(app = %self.name, "Received SIGTERM");
                    143 // 128 + 15
                }
                _ = sigint.recv() => {
                    warn!(app = %self.name, "Received SIGINT");
                    130 // 128 + 2
                }
                _ = sighup.recv() => {
                    warn!(app = %self.name, "Received SIGHUP");
                    129 // 128 + 1
                }
            }
        }

        #[cfg(not(unix))]
        {
            tokio::signal::ctrl_c()
                .await
                .expect("Failed to setup Ctrl+C handler");
            warn!(app = %self.name, "Received Ctrl+C");
            130
        }
    }
}
