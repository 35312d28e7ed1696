use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// IO-level errors for extract access and output encoding
#[derive(Error, Debug)]
pub enum IoError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Delimited output error: {0}")]
    CsvAsync(#[from] csv_async::Error),

    #[error("Input file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Input file {} is stale: modified {age_secs}s ago, limit {max_age_secs}s", .path.display())]
    Stale {
        path: PathBuf,
        age_secs: u64,
        max_age_secs: u64,
    },

    #[error("Input file {} is still empty after repair", .0.display())]
    EmptyAfterRepair(PathBuf),

}
