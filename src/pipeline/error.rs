use thiserror::Error;

use super::merge::MergeStats;
use crate::audit::AuditError;
use crate::domain::{DomainError, Origin};
use crate::io::IoError;

/// Stage failures that end an area's pipeline
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Input validation failed for {origin} extract: {source}")]
    InputValidation {
        origin: Origin,
        #[source]
        source: IoError,
    },

    #[error("Expected one cycle marker, found {}: {}", values.len(), values.join(", "))]
    CycleMarker {
        values: Vec<String>,
        stats: Box<MergeStats>,
    },

    #[error("No valid records after validation")]
    NoValidRecords { stats: Box<MergeStats> },

    #[error("Canonical order violated at position {position}: {previous} > {current}")]
    SortInvariant {
        position: usize,
        previous: String,
        current: String,
    },

    #[error("Output write failed: {0}")]
    Output(#[source] IoError),

    #[error("Decode error at {origin} line {line_no} ({identifier}): {source}")]
    DecodeAborted {
        origin: Origin,
        line_no: usize,
        identifier: String,
        #[source]
        source: DomainError,
    },

    #[error("Layout error: {0}")]
    Layout(#[from] DomainError),

    #[error("Route totals overflowed")]
    TotalsOverflow,

    #[error("Audit sink error: {0}")]
    Audit(#[from] AuditError),
}

impl PipelineError {
    /// Pipeline stage the error belongs to, as shown in the run report
    pub fn stage(&self) -> &'static str {
        match self {
            Self::InputValidation { .. }
            | Self::CycleMarker { .. }
            | Self::NoValidRecords { .. } => "merge",
            Self::SortInvariant { .. } => "sort",
            Self::DecodeAborted { .. } | Self::Layout(_) => "process",
            Self::Output(_) | Self::TotalsOverflow => "write",
            Self::Audit(_) => "audit",
        }
    }

    /// Merge counters gathered before a merge check failed
    pub fn merge_stats(&self) -> Option<&MergeStats> {
        match self {
            Self::CycleMarker { stats, .. } | Self::NoValidRecords { stats } => Some(stats),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn error_display_formats_correctly() {
        let err = PipelineError::InputValidation {
            origin: Origin::Secondary,
            source: IoError::NotFound(PathBuf::from("/in/b.dat")),
        };
        assert_eq!(
            err.to_string(),
            "Input validation failed for secondary extract: Input file not found: /in/b.dat"
        );

        let err = PipelineError::CycleMarker {
            values: vec!["202411".to_string(), "202412".to_string()],
            stats: Box::default(),
        };
        assert_eq!(
            err.to_string(),
            "Expected one cycle marker, found 2: 202411, 202412"
        );

        let err = PipelineError::SortInvariant {
            position: 4,
            previous: "00000000123".to_string(),
            current: "00000000050".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Canonical order violated at position 4: 00000000123 > 00000000050"
        );
    }

    #[test]
    fn stages_follow_taxonomy() {
        let no_records = PipelineError::NoValidRecords {
            stats: Box::default(),
        };
        assert_eq!(no_records.stage(), "merge");
        assert_eq!(
            PipelineError::CycleMarker {
                values: vec![],
                stats: Box::default(),
            }
            .stage(),
            "merge"
        );
        assert_eq!(
            PipelineError::Output(IoError::NotFound(PathBuf::from("x"))).stage(),
            "write"
        );
        assert_eq!(
            PipelineError::Layout(DomainError::MissingField("tin")).stage(),
            "process"
        );
    }

    #[test]
    fn merge_failures_keep_their_counters() {
        let stats = MergeStats {
            accepted: 3,
            rejected_identifiers: 1,
            ..MergeStats::default()
        };
        let err = PipelineError::NoValidRecords {
            stats: Box::new(stats.clone()),
        };
        assert_eq!(err.merge_stats(), Some(&stats));
        assert!(PipelineError::TotalsOverflow.merge_stats().is_none());
    }
}
