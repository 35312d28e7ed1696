//! Declarative fixed-width record layout.
//!
//! Every field of an extract line is described once, as a
//! `(name, offset, length, kind)` entry, and consumed by the generic decoder
//! in [`super::decode`]. Offsets are zero-based byte positions.

use super::error::DomainError;

/// How a field's bytes are interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Raw substring, clipped to the line
    Text,
    /// Digits accumulated left to right, everything else ignored
    Numeric,
    /// 8-digit YYYYMMDD
    Date,
    /// 6-digit YYYYMM
    Period,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Numeric => "numeric",
            FieldKind::Date => "date",
            FieldKind::Period => "period",
        }
    }
}

/// Byte range inside a line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    pub offset: usize,
    pub len: usize,
}

impl Span {
    pub const fn new(offset: usize, len: usize) -> Self {
        Self { offset, len }
    }

    pub const fn end(&self) -> usize {
        self.offset + self.len
    }

    /// Substring covered by this span, clipped to the line.
    ///
    /// Returns an empty string when the clipped range does not fall on
    /// character boundaries (non-ASCII input).
    pub fn slice<'a>(&self, line: &'a str) -> &'a str {
        let start = self.offset.min(line.len());
        let end = self.end().min(line.len());
        line.get(start..end).unwrap_or("")
    }
}

/// One field of the layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub span: Span,
    pub kind: FieldKind,
}

impl FieldSpec {
    pub const fn new(name: &'static str, offset: usize, len: usize, kind: FieldKind) -> Self {
        Self {
            name,
            span: Span::new(offset, len),
            kind,
        }
    }
}

/// Versioned record layout
#[derive(Debug, Clone, Copy)]
pub struct RecordLayout {
    pub version: u16,
    pub record_len: usize,
    pub fields: &'static [FieldSpec],
}

impl RecordLayout {
    /// Look up a field by name
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Span of a named field
    pub fn span(&self, name: &'static str) -> Result<Span, DomainError> {
        self.field(name)
            .map(|f| f.span)
            .ok_or(DomainError::MissingField(name))
    }

    /// Check that fields are contiguous, non-overlapping and fill the record
    pub fn check_contiguous(&self) -> Result<(), String> {
        let mut expected_offset = 0;
        for field in self.fields {
            if field.span.offset != expected_offset {
                return Err(format!(
                    "field {} starts at {}, expected {}",
                    field.name, field.span.offset, expected_offset
                ));
            }
            if field.span.len == 0 {
                return Err(format!("field {} has zero length", field.name));
            }
            expected_offset = field.span.end();
        }
        if expected_offset != self.record_len {
            return Err(format!(
                "fields end at {}, record length is {}",
                expected_offset, self.record_len
            ));
        }
        Ok(())
    }
}

/// Names of the fields the pipeline reads directly
pub mod names {
    pub const TIN: &str = "tin";
    pub const TIN_TYPE: &str = "tin_type";
    pub const FILE_SOURCE: &str = "file_source";
    pub const NAME_CONTROL: &str = "name_control";
    pub const CYCLE: &str = "cycle";
    pub const EXTRACT_DATE: &str = "extract_date";
    pub const ROUTING_CODE: &str = "routing_code";
    pub const FAMILY: &str = "family";
    pub const RECORD_TYPE: &str = "record_type";
    pub const MFT: &str = "mft";
    pub const TAX_PERIOD: &str = "tax_period";
    pub const BALANCE: &str = "balance";
    pub const BALANCE_SIGN: &str = "balance_sign";
    pub const ASSESSMENT_DATE: &str = "assessment_date";
    pub const CSED: &str = "csed";
}

const FIELDS_V1: [FieldSpec; 81] = [
    // entity section
    FieldSpec::new("tin", 0, 11, FieldKind::Text),
    FieldSpec::new("tin_type", 11, 1, FieldKind::Text),
    FieldSpec::new("file_source", 12, 1, FieldKind::Text),
    FieldSpec::new("name_control", 13, 4, FieldKind::Text),
    FieldSpec::new("cycle", 17, 6, FieldKind::Text),
    FieldSpec::new("extract_date", 23, 8, FieldKind::Date),
    FieldSpec::new("routing_code", 31, 2, FieldKind::Text),
    FieldSpec::new("area_office", 33, 2, FieldKind::Numeric),
    FieldSpec::new("territory", 35, 2, FieldKind::Numeric),
    FieldSpec::new("group_code", 37, 2, FieldKind::Numeric),
    FieldSpec::new("assignment", 39, 10, FieldKind::Text),
    FieldSpec::new("grade", 49, 2, FieldKind::Numeric),
    FieldSpec::new("entity_name", 51, 35, FieldKind::Text),
    FieldSpec::new("street", 86, 35, FieldKind::Text),
    FieldSpec::new("city", 121, 22, FieldKind::Text),
    FieldSpec::new("state", 143, 2, FieldKind::Text),
    FieldSpec::new("zip", 145, 9, FieldKind::Numeric),
    FieldSpec::new("caseload_code", 154, 1, FieldKind::Text),
    FieldSpec::new("entity_status", 155, 2, FieldKind::Text),
    FieldSpec::new("entity_created", 157, 8, FieldKind::Date),
    FieldSpec::new("entity_assigned", 165, 8, FieldKind::Date),
    FieldSpec::new("risk_score", 173, 3, FieldKind::Numeric),
    FieldSpec::new("large_dollar", 176, 1, FieldKind::Text),
    FieldSpec::new("repeater", 177, 1, FieldKind::Text),
    FieldSpec::new("prior_assignment", 178, 10, FieldKind::Text),
    FieldSpec::new("entity_flags", 188, 5, FieldKind::Text),
    FieldSpec::new("deceased", 193, 1, FieldKind::Text),
    FieldSpec::new("ics_indicator", 194, 1, FieldKind::Text),
    FieldSpec::new("secondary_tin", 195, 11, FieldKind::Text),
    // module section
    FieldSpec::new("family", 206, 1, FieldKind::Text),
    FieldSpec::new("record_type", 207, 2, FieldKind::Text),
    FieldSpec::new("mft", 209, 2, FieldKind::Numeric),
    FieldSpec::new("tax_period", 211, 6, FieldKind::Period),
    FieldSpec::new("period_seq", 217, 2, FieldKind::Numeric),
    FieldSpec::new("module_status", 219, 2, FieldKind::Text),
    FieldSpec::new("balance", 221, 13, FieldKind::Numeric),
    FieldSpec::new("balance_sign", 234, 1, FieldKind::Text),
    FieldSpec::new("assessed_amount", 235, 13, FieldKind::Numeric),
    FieldSpec::new("accrued_penalty", 248, 11, FieldKind::Numeric),
    FieldSpec::new("accrued_interest", 259, 11, FieldKind::Numeric),
    FieldSpec::new("assessment_date", 270, 8, FieldKind::Date),
    FieldSpec::new("csed", 278, 8, FieldKind::Date),
    FieldSpec::new("ased", 286, 8, FieldKind::Date),
    FieldSpec::new("return_due_date", 294, 8, FieldKind::Date),
    FieldSpec::new("status_date", 302, 8, FieldKind::Date),
    FieldSpec::new("last_payment_date", 310, 8, FieldKind::Date),
    FieldSpec::new("last_payment_amount", 318, 11, FieldKind::Numeric),
    FieldSpec::new("lien_indicator", 329, 1, FieldKind::Text),
    FieldSpec::new("levy_indicator", 330, 1, FieldKind::Text),
    FieldSpec::new("bankruptcy_indicator", 331, 1, FieldKind::Text),
    FieldSpec::new("installment_indicator", 332, 1, FieldKind::Text),
    FieldSpec::new("hold_code", 333, 2, FieldKind::Text),
    FieldSpec::new("freeze_codes", 335, 6, FieldKind::Text),
    FieldSpec::new("transfer_code", 341, 2, FieldKind::Text),
    FieldSpec::new("return_type", 343, 3, FieldKind::Text),
    FieldSpec::new("filing_requirement", 346, 2, FieldKind::Numeric),
    FieldSpec::new("delinquency_weeks", 348, 3, FieldKind::Numeric),
    FieldSpec::new("notice_count", 351, 2, FieldKind::Numeric),
    FieldSpec::new("first_notice_date", 353, 8, FieldKind::Date),
    FieldSpec::new("last_notice_date", 361, 8, FieldKind::Date),
    FieldSpec::new("tdi_status", 369, 2, FieldKind::Text),
    FieldSpec::new("tdi_status_date", 371, 8, FieldKind::Date),
    FieldSpec::new("predicted_balance", 379, 11, FieldKind::Numeric),
    FieldSpec::new("income_amount", 390, 11, FieldKind::Numeric),
    FieldSpec::new("employee_count", 401, 5, FieldKind::Numeric),
    FieldSpec::new("source_code", 406, 2, FieldKind::Text),
    FieldSpec::new("project_code", 408, 4, FieldKind::Numeric),
    FieldSpec::new("case_code", 412, 3, FieldKind::Text),
    FieldSpec::new("subcode", 415, 3, FieldKind::Text),
    FieldSpec::new("dln", 418, 14, FieldKind::Text),
    FieldSpec::new("posted_cycle", 432, 6, FieldKind::Text),
    FieldSpec::new("ftd_amount", 438, 11, FieldKind::Numeric),
    FieldSpec::new("penalty_code", 449, 3, FieldKind::Text),
    FieldSpec::new("interest_date", 452, 8, FieldKind::Date),
    FieldSpec::new("agency_code", 460, 2, FieldKind::Text),
    FieldSpec::new("pdc_indicator", 462, 1, FieldKind::Text),
    FieldSpec::new("over_65", 463, 1, FieldKind::Text),
    FieldSpec::new("module_flags", 464, 8, FieldKind::Text),
    FieldSpec::new("status_history", 472, 12, FieldKind::Text),
    FieldSpec::new("originating_area", 484, 2, FieldKind::Numeric),
    FieldSpec::new("reserved", 486, 10, FieldKind::Text),
];

/// Extract layout, version 1
pub const LAYOUT_V1: RecordLayout = RecordLayout {
    version: 1,
    record_len: 496,
    fields: &FIELDS_V1,
};

/// Builds fixed-width lines field by field.
///
/// Text fields are space padded on the right, the other kinds are zero
/// padded on the left; values longer than the field are truncated.
#[derive(Debug, Clone)]
pub struct LineBuilder<'l> {
    layout: &'l RecordLayout,
    buf: Vec<u8>,
}

impl<'l> LineBuilder<'l> {
    pub fn new(layout: &'l RecordLayout) -> Self {
        let mut buf = vec![b' '; layout.record_len];
        for field in layout.fields {
            if field.kind != FieldKind::Text {
                buf[field.span.offset..field.span.end()].fill(b'0');
            }
        }
        Self { layout, buf }
    }

    /// Set a field by name; unknown names are ignored in release builds
    pub fn set(mut self, name: &str, value: &str) -> Self {
        let Some(field) = self.layout.field(name) else {
            debug_assert!(false, "unknown layout field {name}");
            return self;
        };
        let width = field.span.len;
        let padded = match field.kind {
            FieldKind::Text => format!("{:<width$}", value),
            _ => format!("{:0>width$}", value),
        };
        let bytes = &padded.as_bytes()[..width.min(padded.len())];
        self.buf[field.span.offset..field.span.offset + bytes.len()].copy_from_slice(bytes);
        self
    }

    pub fn build(self) -> String {
        String::from_utf8_lossy(&self.buf).into_owned()
    }
}
