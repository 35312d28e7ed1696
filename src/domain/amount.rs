use std::fmt;

use serde::{Serialize, Serializer};

use super::error::DomainError;

/// Signed monetary amount stored as whole cents
///
/// Legacy extracts carry balances as unsigned digit runs with a separate
/// sign byte, so construction goes through [`Cents::from_digits`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
pub struct Cents(i64);

impl Cents {
    const SCALE: i64 = 100;

    /// Create from a raw cent count
    pub fn from_raw(raw: i64) -> Self {
        Self(raw)
    }

    /// Get raw cent count
    pub fn raw(&self) -> i64 {
        self.0
    }

    /// Zero value
    pub fn zero() -> Self {
        Self(0)
    }

    /// Build from an unsigned digit value and a credit flag
    pub fn from_digits(digits: u64, credit: bool) -> Result<Self, DomainError> {
        let magnitude = i64::try_from(digits).map_err(|_| DomainError::Overflow)?;
        Ok(if credit { Self(-magnitude) } else { Self(magnitude) })
    }

    /// Render with two decimal places (e.g., "-12.05")
    pub fn to_decimal_string(&self) -> String {
        let abs_value = self.0.unsigned_abs();
        let integer_part = abs_value / Self::SCALE as u64;
        let decimal_part = abs_value % Self::SCALE as u64;

        let sign = if self.0 < 0 { "-" } else { "" };
        format!("{}{}.{:02}", sign, integer_part, decimal_part)
    }

    /// Checked addition, returns None on overflow
    pub fn checked_add(&self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }
}

impl fmt::Display for Cents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_decimal_string())
    }
}

impl Serialize for Cents {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_decimal_string())
    }
}
