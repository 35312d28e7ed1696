use thiserror::Error;

/// Field-level decode errors raised while turning a fixed-width line into a
/// typed record. Every variant is recoverable: the record is skipped and the
/// rest of its group keeps processing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Field {field} is too short: expected {expected} bytes, found {actual}")]
    ShortField {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Numeric overflow in field {field}: {raw:?}")]
    NumericOverflow { field: &'static str, raw: String },

    #[error("Invalid date in field {field}: {raw:?}")]
    InvalidDate { field: &'static str, raw: String },

    #[error("Invalid period in field {field}: {raw:?}")]
    InvalidPeriod { field: &'static str, raw: String },

    #[error("Unknown record type: {0:?}")]
    UnknownRecordType(String),

    #[error("Unknown record family: {0:?}")]
    UnknownFamily(String),

    #[error("Layout has no field named {0}")]
    MissingField(&'static str),

    #[error("Field {field} decoded as {found}, expected {expected}")]
    KindMismatch {
        field: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Arithmetic overflow")]
    Overflow,
}
