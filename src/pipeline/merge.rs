use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use serde::Serialize;
use tracing::{debug, info, warn};

use super::error::PipelineError;
use crate::domain::{CanonicalRecord, Origin, RecordLayout, names};
use crate::io::{ExtractCheck, ExtractLines, check_extract, read_lines};

/// Settings for validating and concatenating one area's extracts
#[derive(Debug, Clone, Copy)]
pub struct MergeConfig {
    pub layout: RecordLayout,
    pub max_age: Duration,
}

/// Per-file counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractStats {
    pub path: PathBuf,
    pub size: u64,
    pub lines: usize,
    pub repaired: bool,
}

impl ExtractStats {
    fn new(check: &ExtractCheck, lines: usize) -> Self {
        Self {
            path: check.path.clone(),
            size: check.size,
            lines,
            repaired: check.repaired,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeStats {
    pub primary: ExtractStats,
    pub secondary: ExtractStats,
    /// Learned from the first non-blank line
    pub record_len: Option<usize>,
    pub accepted: usize,
    pub rejected_identifiers: usize,
    /// Lines holding bytes outside ASCII, which would shift fixed offsets
    pub rejected_encoding: usize,
    pub blank_lines: usize,
    pub length_mismatches: usize,
    pub cycle_marker: Option<String>,
}

#[derive(Debug)]
pub struct MergeOutcome {
    /// Primary records first, then secondary, in file order
    pub records: Vec<CanonicalRecord>,
    pub stats: MergeStats,
}

/// Digits only and not all zeros
pub fn is_valid_identifier(raw: &str) -> bool {
    !raw.is_empty()
        && raw.bytes().all(|b| b.is_ascii_digit())
        && raw.bytes().any(|b| b != b'0')
}

async fn load_extract(
    path: &Path,
    origin: Origin,
    config: &MergeConfig,
    now: SystemTime,
) -> Result<(ExtractCheck, ExtractLines), PipelineError> {
    let wrap = |source| PipelineError::InputValidation { origin, source };

    let check = check_extract(path, config.max_age, now).await.map_err(wrap)?;
    let lines = read_lines(path, origin).await.map_err(wrap)?;
    Ok((check, lines))
}

/// Validate both extracts and concatenate their accepted lines.
///
/// Lines with non-ASCII bytes or whose identifier is not a positive digit
/// string are dropped and counted. Exactly one distinct cycle marker must remain across the
/// accepted records.
pub async fn merge_extracts(
    primary: &Path,
    secondary: &Path,
    config: &MergeConfig,
    now: SystemTime,
) -> Result<MergeOutcome, PipelineError> {
    let identifier = config.layout.span(names::TIN)?;
    let cycle = config.layout.span(names::CYCLE)?;

    let (primary_check, primary_extract) =
        load_extract(primary, Origin::Primary, config, now).await?;
    let (secondary_check, secondary_extract) =
        load_extract(secondary, Origin::Secondary, config, now).await?;

    let mut stats = MergeStats {
        primary: ExtractStats::new(&primary_check, primary_extract.total()),
        secondary: ExtractStats::new(&secondary_check, secondary_extract.total()),
        rejected_encoding: primary_extract.non_ascii.len() + secondary_extract.non_ascii.len(),
        ..MergeStats::default()
    };
    let primary_lines = primary_extract.lines;
    let secondary_lines = secondary_extract.lines;

    stats.record_len = primary_lines
        .iter()
        .chain(secondary_lines.iter())
        .find(|line| !line.text.trim().is_empty())
        .map(|line| line.text.len());

    if let Some(record_len) = stats.record_len {
        if record_len != config.layout.record_len {
            warn!(
                record_len,
                layout_len = config.layout.record_len,
                layout_version = config.layout.version,
                "Learned record length differs from layout"
            );
        }
        for check in [&primary_check, &secondary_check] {
            if check.size % (record_len as u64 + 1) != 0 {
                warn!(
                    path = %check.path.display(),
                    size = check.size,
                    record_len,
                    "Extract size is not a whole number of records"
                );
            }
        }
    }

    let mut records = Vec::with_capacity(primary_lines.len() + secondary_lines.len());
    let mut markers = BTreeSet::new();

    for raw in primary_lines.into_iter().chain(secondary_lines) {
        if raw.text.trim().is_empty() {
            stats.blank_lines += 1;
            continue;
        }

        let id = identifier.slice(&raw.text);
        if !is_valid_identifier(id) {
            debug!(origin = %raw.origin, line_no = raw.line_no, identifier = id, "Dropping line with invalid identifier");
            stats.rejected_identifiers += 1;
            continue;
        }

        if stats.record_len.is_some_and(|len| len != raw.text.len()) {
            debug!(origin = %raw.origin, line_no = raw.line_no, len = raw.text.len(), "Record length mismatch");
            stats.length_mismatches += 1;
        }

        markers.insert(cycle.slice(&raw.text).to_string());
        records.push(CanonicalRecord::new(raw, identifier));
    }

    if stats.rejected_identifiers > 0 {
        warn!(rejected = stats.rejected_identifiers, "Dropped lines with invalid identifiers");
    }
    if stats.rejected_encoding > 0 {
        warn!(rejected = stats.rejected_encoding, "Dropped lines with non-ASCII bytes");
    }
    if stats.length_mismatches > 0 {
        warn!(mismatches = stats.length_mismatches, "Records with unexpected length");
    }

    stats.accepted = records.len();

    match markers.len() {
        0 => warn!("No cycle marker found in accepted records"),
        1 => stats.cycle_marker = markers.into_iter().next(),
        _ => {
            return Err(PipelineError::CycleMarker {
                values: markers.into_iter().collect(),
                stats: Box::new(stats),
            });
        }
    }

    if records.is_empty() {
        return Err(PipelineError::NoValidRecords {
            stats: Box::new(stats),
        });
    }

    info!(
        accepted = stats.accepted,
        rejected = stats.rejected_identifiers,
        cycle = stats.cycle_marker.as_deref().unwrap_or(""),
        "Merged extracts"
    );

    Ok(MergeOutcome { records, stats })
}
