//! Generic field decoder driven by a [`RecordLayout`].
//!
//! Numeric parsing is lenient: digits are accumulated left to right and
//! any other byte is skipped silently. Dates and periods are built on top of
//! that lenient value, so `"2023-01-05"` and `"20230105"` decode the same.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use super::error::DomainError;
use super::layout::{FieldKind, FieldSpec, RecordLayout};

/// February override for one specific year.
///
/// The legacy leap computation is `year % 4 == 0`; this rule corrects it
/// for a single historical year without touching the general rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeapSubstitution {
    pub year: i32,
    pub february_days: u32,
}

/// Date decoding constants, overridable from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DateRules {
    /// Value an all-zero YYYYMMDD decodes to
    pub epoch: NaiveDate,
    /// Year used when a period's year component is zero
    pub fallback_year: i32,
    /// Month used when a period's month component is zero
    pub fallback_month: u32,
    pub leap_substitution: Option<LeapSubstitution>,
}

impl Default for DateRules {
    fn default() -> Self {
        Self {
            epoch: NaiveDate::from_ymd_opt(1900, 1, 1).unwrap_or(NaiveDate::MIN),
            fallback_year: 1900,
            fallback_month: 12,
            leap_substitution: Some(LeapSubstitution {
                year: 1900,
                february_days: 28,
            }),
        }
    }
}

impl DateRules {
    /// Days in February under the legacy rule plus substitution
    pub fn february_days(&self, year: i32) -> u32 {
        if let Some(sub) = self.leap_substitution
            && sub.year == year
        {
            return sub.february_days;
        }
        if year % 4 == 0 { 29 } else { 28 }
    }

    /// Last day of the given month
    pub fn month_end_day(&self, year: i32, month: u32) -> u32 {
        match month {
            2 => self.february_days(year),
            4 | 6 | 9 | 11 => 30,
            _ => 31,
        }
    }

    pub fn is_epoch(&self, date: NaiveDate) -> bool {
        date == self.epoch
    }
}

/// Decoded YYYYMM tax period
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxPeriod {
    /// The six bytes as they appeared in the line
    pub raw: String,
    pub year: i32,
    pub month: u32,
    /// Legacy month-end day; may name a day the calendar does not have
    pub end_day: u32,
}

impl TaxPeriod {
    /// Period end as a calendar date, `None` when the legacy leap rule
    /// produced a day that does not exist (e.g. 2100-02-29)
    pub fn end_date(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, self.end_day)
    }

    /// Whole months from this period to `date`
    pub fn months_until(&self, date: NaiveDate) -> i64 {
        let from = self.year as i64 * 12 + self.month as i64;
        let to = date.year() as i64 * 12 + date.month() as i64;
        to - from
    }
}

/// A single decoded field value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Number(u64),
    Date(NaiveDate),
    Period(TaxPeriod),
}

impl FieldValue {
    pub fn kind_name(&self) -> &'static str {
        match self {
            FieldValue::Text(_) => FieldKind::Text.as_str(),
            FieldValue::Number(_) => FieldKind::Numeric.as_str(),
            FieldValue::Date(_) => FieldKind::Date.as_str(),
            FieldValue::Period(_) => FieldKind::Period.as_str(),
        }
    }
}

/// Lenient digit accumulation
pub fn lenient_number(field: &'static str, raw: &str) -> Result<u64, DomainError> {
    raw.bytes()
        .filter(u8::is_ascii_digit)
        .try_fold(0u64, |acc, b| {
            acc.checked_mul(10)
                .and_then(|v| v.checked_add((b - b'0') as u64))
        })
        .ok_or_else(|| DomainError::NumericOverflow {
            field,
            raw: raw.to_string(),
        })
}

/// Decode YYYYMMDD; zero maps to the epoch sentinel
pub fn decode_date8(
    field: &'static str,
    raw: &str,
    rules: &DateRules,
) -> Result<NaiveDate, DomainError> {
    let value = lenient_number(field, raw)?;
    if value == 0 {
        return Ok(rules.epoch);
    }
    let invalid = || DomainError::InvalidDate {
        field,
        raw: raw.to_string(),
    };
    let year = i32::try_from(value / 10_000).map_err(|_| invalid())?;
    let month = ((value / 100) % 100) as u32;
    let day = (value % 100) as u32;
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid)
}

/// Decode YYYYMM with fallback year/month for zero components
pub fn decode_period(
    field: &'static str,
    raw: &str,
    rules: &DateRules,
) -> Result<TaxPeriod, DomainError> {
    let year_digits = lenient_number(field, raw.get(..4.min(raw.len())).unwrap_or(""))?;
    let month_digits = lenient_number(field, raw.get(4.min(raw.len())..).unwrap_or(""))?;

    let year = match year_digits {
        0 => rules.fallback_year,
        y => y as i32,
    };
    let month = match month_digits {
        0 => rules.fallback_month,
        m if m <= 12 => m as u32,
        _ => {
            return Err(DomainError::InvalidPeriod {
                field,
                raw: raw.to_string(),
            });
        }
    };

    Ok(TaxPeriod {
        raw: raw.to_string(),
        year,
        month,
        end_day: rules.month_end_day(year, month),
    })
}

fn decode_field(spec: &FieldSpec, line: &str, rules: &DateRules) -> Result<FieldValue, DomainError> {
    let raw = spec.span.slice(line);

    // a date or period cut in half by the end of the line is unreadable;
    // one that lies entirely past the end reads as blanks
    if matches!(spec.kind, FieldKind::Date | FieldKind::Period)
        && !raw.is_empty()
        && raw.len() < spec.span.len
    {
        return Err(DomainError::ShortField {
            field: spec.name,
            expected: spec.span.len,
            actual: raw.len(),
        });
    }

    match spec.kind {
        FieldKind::Text => Ok(FieldValue::Text(raw.to_string())),
        FieldKind::Numeric => lenient_number(spec.name, raw).map(FieldValue::Number),
        FieldKind::Date => decode_date8(spec.name, raw, rules).map(FieldValue::Date),
        FieldKind::Period => decode_period(spec.name, raw, rules).map(FieldValue::Period),
    }
}

/// All fields of one line, in layout order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedRecord {
    values: Vec<(&'static str, FieldValue)>,
}

impl DecodedRecord {
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.values
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &FieldValue)> {
        self.values.iter().map(|(n, v)| (*n, v))
    }

    fn require(&self, name: &'static str) -> Result<&FieldValue, DomainError> {
        self.get(name).ok_or(DomainError::MissingField(name))
    }

    fn mismatch(name: &'static str, expected: FieldKind, found: &FieldValue) -> DomainError {
        DomainError::KindMismatch {
            field: name,
            expected: expected.as_str(),
            found: found.kind_name(),
        }
    }

    pub fn text(&self, name: &'static str) -> Result<&str, DomainError> {
        match self.require(name)? {
            FieldValue::Text(s) => Ok(s),
            other => Err(Self::mismatch(name, FieldKind::Text, other)),
        }
    }

    pub fn number(&self, name: &'static str) -> Result<u64, DomainError> {
        match self.require(name)? {
            FieldValue::Number(n) => Ok(*n),
            other => Err(Self::mismatch(name, FieldKind::Numeric, other)),
        }
    }

    pub fn date(&self, name: &'static str) -> Result<NaiveDate, DomainError> {
        match self.require(name)? {
            FieldValue::Date(d) => Ok(*d),
            other => Err(Self::mismatch(name, FieldKind::Date, other)),
        }
    }

    pub fn period(&self, name: &'static str) -> Result<&TaxPeriod, DomainError> {
        match self.require(name)? {
            FieldValue::Period(p) => Ok(p),
            other => Err(Self::mismatch(name, FieldKind::Period, other)),
        }
    }
}

/// Decode every field of `line` according to `layout`
pub fn decode_line(
    layout: &RecordLayout,
    line: &str,
    rules: &DateRules,
) -> Result<DecodedRecord, DomainError> {
    let values = layout
        .fields
        .iter()
        .map(|spec| decode_field(spec, line, rules).map(|value| (spec.name, value)))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(DecodedRecord { values })
}
