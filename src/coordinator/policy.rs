use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::pipeline::DecodeFailure;

/// Policy for handling records that fail to decode
pub trait ErrorPolicy: Send + Sync {
    /// Return true to continue processing, false to abort the area
    fn handle_decode_error(&self, area: &str, failure: &DecodeFailure) -> bool;
}

/// Skip the record and log it
pub struct SkipErrors;

impl ErrorPolicy for SkipErrors {
    fn handle_decode_error(&self, area: &str, failure: &DecodeFailure) -> bool {
        warn!(
            area,
            origin = %failure.origin,
            line_no = failure.line_no,
            identifier = %failure.identifier,
            error = %failure.error,
            "Skipping record that failed to decode"
        );
        true
    }
}

/// Abort the area on the first decode error
pub struct AbortOnError;

impl ErrorPolicy for AbortOnError {
    fn handle_decode_error(&self, area: &str, failure: &DecodeFailure) -> bool {
        error!(
            area,
            origin = %failure.origin,
            line_no = failure.line_no,
            identifier = %failure.identifier,
            error = %failure.error,
            "Aborting area on decode error"
        );
        false
    }
}

/// Skip the record without logging
pub struct SilentSkip;

impl ErrorPolicy for SilentSkip {
    fn handle_decode_error(&self, _area: &str, _failure: &DecodeFailure) -> bool {
        true
    }
}

/// Configured choice of [`ErrorPolicy`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecodeErrorMode {
    #[default]
    Skip,
    Abort,
    Silent,
}

impl DecodeErrorMode {
    pub fn policy(&self) -> Arc<dyn ErrorPolicy> {
        match self {
            DecodeErrorMode::Skip => Arc::new(SkipErrors),
            DecodeErrorMode::Abort => Arc::new(AbortOnError),
            DecodeErrorMode::Silent => Arc::new(SilentSkip),
        }
    }
}
