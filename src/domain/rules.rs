use serde::Serialize;

use super::amount::Cents;
use super::decode::DateRules;
use super::error::DomainError;
use super::record::{ParsedRecord, RecordType};

/// Months from period end to extract date at which age severity steps up
pub const AGE_LOW_MONTHS: i64 = 24;
pub const AGE_MEDIUM_MONTHS: i64 = 48;
pub const AGE_HIGH_MONTHS: i64 = 72;

/// Days left before the collection statute expires at which statute
/// severity steps up
pub const STATUTE_LOW_DAYS: i64 = 365;
pub const STATUTE_MEDIUM_DAYS: i64 = 180;

/// Kind of case an entity represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum EntityType {
    #[default]
    Unclassified,
    BalanceDue,
    DelinquentReturn,
    Combined,
}

impl EntityType {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unclassified => " ",
            Self::BalanceDue => "T",
            Self::DelinquentReturn => "I",
            Self::Combined => "C",
        }
    }

    fn merge(self, other: EntityType) -> EntityType {
        match (self, other) {
            (Self::Unclassified, x) | (x, Self::Unclassified) => x,
            (a, b) if a == b => a,
            _ => Self::Combined,
        }
    }
}

/// Transfer indicator carried across an entity's modules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum TransferFlag {
    #[default]
    None,
    Pending,
    Transferred,
}

impl TransferFlag {
    pub fn code(&self) -> &'static str {
        match self {
            Self::None => "0",
            Self::Pending => "1",
            Self::Transferred => "2",
        }
    }
}

/// Ordered severity level; ratchets only move up
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize)]
pub enum Severity {
    #[default]
    None,
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn code(&self) -> &'static str {
        match self {
            Self::None => "0",
            Self::Low => "1",
            Self::Medium => "2",
            Self::High => "3",
        }
    }
}

/// Entity type and transfer flag after applying one record type
pub fn transition(
    entity_type: EntityType,
    flag: TransferFlag,
    record_type: RecordType,
) -> (EntityType, TransferFlag) {
    match record_type {
        RecordType::BalanceDue => (entity_type.merge(EntityType::BalanceDue), flag),
        RecordType::DelinquentReturn | RecordType::Frozen => {
            (entity_type.merge(EntityType::DelinquentReturn), flag)
        }
        RecordType::TransferIn => {
            let next = match flag {
                TransferFlag::None => TransferFlag::Pending,
                TransferFlag::Pending | TransferFlag::Transferred => TransferFlag::Transferred,
            };
            (entity_type, next)
        }
        RecordType::TransferReversal => {
            let next = match flag {
                TransferFlag::Pending => TransferFlag::None,
                other => other,
            };
            (entity_type, next)
        }
        RecordType::Informational => (entity_type, flag),
    }
}

/// Whether a record type feeds the aggregate balance
pub fn contributes_to_balance(record_type: RecordType) -> bool {
    matches!(record_type, RecordType::BalanceDue | RecordType::TransferIn)
}

/// Age of the module's tax period relative to the extract date
pub fn age_severity(record: &ParsedRecord) -> Severity {
    match record.tax_period.months_until(record.extract_date) {
        m if m >= AGE_HIGH_MONTHS => Severity::High,
        m if m >= AGE_MEDIUM_MONTHS => Severity::Medium,
        m if m >= AGE_LOW_MONTHS => Severity::Low,
        _ => Severity::None,
    }
}

/// Closeness of the collection statute expiration date
pub fn statute_severity(record: &ParsedRecord, rules: &DateRules) -> Severity {
    if rules.is_epoch(record.csed) {
        return Severity::None;
    }
    match (record.csed - record.extract_date).num_days() {
        d if d < 0 => Severity::High,
        d if d <= STATUTE_MEDIUM_DAYS => Severity::Medium,
        d if d <= STATUTE_LOW_DAYS => Severity::Low,
        _ => Severity::None,
    }
}

/// Running derived state of one entity group
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EntityState {
    entity_type: EntityType,
    transfer_flag: TransferFlag,
    age: Severity,
    statute: Severity,
    balance: Cents,
    modules: usize,
}

impl EntityState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    pub fn transfer_flag(&self) -> TransferFlag {
        self.transfer_flag
    }

    pub fn age(&self) -> Severity {
        self.age
    }

    pub fn statute(&self) -> Severity {
        self.statute
    }

    /// Aggregate balance over contributing record types
    pub fn balance(&self) -> Cents {
        self.balance
    }

    pub fn modules(&self) -> usize {
        self.modules
    }

    /// Fold one decoded record into the state, returning its balance contribution
    pub fn apply(&mut self, record: &ParsedRecord, rules: &DateRules) -> Result<Cents, DomainError> {
        let contribution = if contributes_to_balance(record.record_type) {
            record.balance
        } else {
            Cents::zero()
        };
        let balance = self
            .balance
            .checked_add(contribution)
            .ok_or(DomainError::Overflow)?;

        let (entity_type, transfer_flag) =
            transition(self.entity_type, self.transfer_flag, record.record_type);

        self.entity_type = entity_type;
        self.transfer_flag = transfer_flag;
        self.age = self.age.max(age_severity(record));
        self.statute = self.statute.max(statute_severity(record, rules));
        self.balance = balance;
        self.modules += 1;

        Ok(contribution)
    }
}
