use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

use super::amount::Cents;
use super::decode::{DateRules, DecodedRecord, TaxPeriod, decode_line};
use super::error::DomainError;
use super::layout::{RecordLayout, Span, names};

/// Which of the two extract files a line came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Primary,
    Secondary,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Primary => f.write_str("primary"),
            Origin::Secondary => f.write_str("secondary"),
        }
    }
}

/// One source line before validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLine {
    pub text: String,
    pub origin: Origin,
    /// 1-based line number inside its origin file
    pub line_no: usize,
}

/// A line that passed identifier validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalRecord {
    line: String,
    origin: Origin,
    line_no: usize,
    identifier: Span,
}

impl CanonicalRecord {
    pub fn new(raw: RawLine, identifier: Span) -> Self {
        Self {
            line: raw.text,
            origin: raw.origin,
            line_no: raw.line_no,
            identifier,
        }
    }

    /// Identifier substring, leading zeros intact
    pub fn identifier(&self) -> &str {
        self.identifier.slice(&self.line)
    }

    pub fn line(&self) -> &str {
        &self.line
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub fn line_no(&self) -> usize {
        self.line_no
    }

    /// Substring at an arbitrary span
    pub fn slice(&self, span: Span) -> &str {
        span.slice(&self.line)
    }
}

/// One-byte record family marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum RecordFamily {
    /// `I`: delinquent-return modules
    DelinquentReturn,
    /// `T`: balance-due modules
    BalanceDue,
}

impl RecordFamily {
    pub fn from_code(code: &str) -> Result<Self, DomainError> {
        match code {
            "T" => Ok(Self::BalanceDue),
            "I" => Ok(Self::DelinquentReturn),
            other => Err(DomainError::UnknownFamily(other.to_string())),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::BalanceDue => "T",
            Self::DelinquentReturn => "I",
        }
    }
}

/// Two-byte record type code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RecordType {
    /// `01`
    BalanceDue,
    /// `02`
    DelinquentReturn,
    /// `03`
    TransferIn,
    /// `04`
    TransferReversal,
    /// `05`
    Frozen,
    /// `06`
    Informational,
}

impl RecordType {
    pub fn from_code(code: &str) -> Result<Self, DomainError> {
        match code {
            "01" => Ok(Self::BalanceDue),
            "02" => Ok(Self::DelinquentReturn),
            "03" => Ok(Self::TransferIn),
            "04" => Ok(Self::TransferReversal),
            "05" => Ok(Self::Frozen),
            "06" => Ok(Self::Informational),
            other => Err(DomainError::UnknownRecordType(other.to_string())),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::BalanceDue => "01",
            Self::DelinquentReturn => "02",
            Self::TransferIn => "03",
            Self::TransferReversal => "04",
            Self::Frozen => "05",
            Self::Informational => "06",
        }
    }
}

/// Typed view of one extract line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRecord {
    pub identifier: String,
    pub tin_type: String,
    pub file_source: String,
    pub name_control: String,
    pub cycle: String,
    pub extract_date: NaiveDate,
    pub routing_code: String,
    pub family: RecordFamily,
    pub record_type: RecordType,
    pub mft: u64,
    pub tax_period: TaxPeriod,
    pub balance: Cents,
    pub assessment_date: NaiveDate,
    pub csed: NaiveDate,
    /// Every field of the line, including the ones above
    pub fields: DecodedRecord,
}

impl ParsedRecord {
    /// Decode a line through the layout and lift the fields the rules use
    pub fn from_line(
        layout: &RecordLayout,
        line: &str,
        rules: &DateRules,
    ) -> Result<Self, DomainError> {
        let fields = decode_line(layout, line, rules)?;

        let credit = fields.text(names::BALANCE_SIGN)? == "-";
        let balance = Cents::from_digits(fields.number(names::BALANCE)?, credit)?;

        Ok(Self {
            identifier: fields.text(names::TIN)?.to_string(),
            tin_type: fields.text(names::TIN_TYPE)?.to_string(),
            file_source: fields.text(names::FILE_SOURCE)?.to_string(),
            name_control: fields.text(names::NAME_CONTROL)?.to_string(),
            cycle: fields.text(names::CYCLE)?.to_string(),
            extract_date: fields.date(names::EXTRACT_DATE)?,
            routing_code: fields.text(names::ROUTING_CODE)?.to_string(),
            family: RecordFamily::from_code(fields.text(names::FAMILY)?)?,
            record_type: RecordType::from_code(fields.text(names::RECORD_TYPE)?)?,
            mft: fields.number(names::MFT)?,
            tax_period: fields.period(names::TAX_PERIOD)?.clone(),
            balance,
            assessment_date: fields.date(names::ASSESSMENT_DATE)?,
            csed: fields.date(names::CSED)?,
            fields,
        })
    }
}
