use tracing::debug;

use super::error::PipelineError;
use crate::domain::CanonicalRecord;

/// Stable ascending sort by identifier string, followed by an order check.
///
/// Comparison is on the raw substring, so `"00000000050"` sorts before
/// `"00000000123"` and ties keep their merge order.
pub fn canonical_sort(records: &mut [CanonicalRecord]) -> Result<(), PipelineError> {
    records.sort_by(|a, b| a.identifier().cmp(b.identifier()));
    verify_order(records)?;
    debug!(records = records.len(), "Canonical sort complete");
    Ok(())
}

/// Fail on the first identifier that is smaller than its predecessor
pub fn verify_order(records: &[CanonicalRecord]) -> Result<(), PipelineError> {
    for (position, pair) in records.windows(2).enumerate() {
        let (previous, current) = (pair[0].identifier(), pair[1].identifier());
        if previous > current {
            return Err(PipelineError::SortInvariant {
                position: position + 1,
                previous: previous.to_string(),
                current: current.to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Origin, RawLine, Span};
    use proptest::prelude::*;

    fn record(id: &str, origin: Origin, line_no: usize) -> CanonicalRecord {
        let raw = RawLine {
            text: format!("{id}PAYLOAD"),
            origin,
            line_no,
        };
        CanonicalRecord::new(raw, Span::new(0, id.len()))
    }

    #[test]
    fn sorts_by_string_comparison() {
        let mut records = vec![
            record("00000000123", Origin::Primary, 1),
            record("00000000050", Origin::Secondary, 1),
        ];
        canonical_sort(&mut records).unwrap();
        let ids: Vec<_> = records.iter().map(|r| r.identifier()).collect();
        assert_eq!(ids, vec!["00000000050", "00000000123"]);
    }

    #[test]
    fn ties_keep_merge_order() {
        let mut records = vec![
            record("00000000777", Origin::Primary, 1),
            record("00000000001", Origin::Primary, 2),
            record("00000000777", Origin::Secondary, 1),
        ];
        canonical_sort(&mut records).unwrap();
        assert_eq!(records[1].origin(), Origin::Primary);
        assert_eq!(records[2].origin(), Origin::Secondary);
    }

    #[test]
    fn verify_reports_first_violation() {
        let records = vec![
            record("00000000001", Origin::Primary, 1),
            record("00000000009", Origin::Primary, 2),
            record("00000000005", Origin::Primary, 3),
        ];
        match verify_order(&records) {
            Err(PipelineError::SortInvariant {
                position,
                previous,
                current,
            }) => {
                assert_eq!(position, 2);
                assert_eq!(previous, "00000000009");
                assert_eq!(current, "00000000005");
            }
            other => panic!("Expected sort invariant violation, got {other:?}"),
        }
    }

    proptest! {
        #[test]
        fn sorted_stream_is_non_decreasing(ids in prop::collection::vec("[0-9]{11}", 0..50)) {
            let mut records: Vec<_> = ids
                .iter()
                .enumerate()
                .map(|(i, id)| record(id, Origin::Primary, i + 1))
                .collect();
            canonical_sort(&mut records).unwrap();
            for pair in records.windows(2) {
                prop_assert!(pair[0].identifier() <= pair[1].identifier());
            }
            prop_assert_eq!(records.len(), ids.len());
        }
    }
}
