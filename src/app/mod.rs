pub mod cli;
pub mod command;
pub mod config;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use cli::{Args, CliApp, exit_code};
pub use command::{audit_sink, execute, run_config};
pub use config::{AreaConfig, Config};
pub use error::AppError;
pub use logging::{LogConfig, LogFormat, LogLevel, init_logging};
