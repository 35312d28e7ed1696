//! Output record schema, version 1.
//!
//! Rows are serialized pipe-delimited without a header; field order is the
//! struct declaration order and is part of the contract with downstream
//! consumers. Any change to a row bumps [`OUTPUT_SCHEMA_VERSION`].

use serde::Serialize;

use crate::domain::{Cents, Route};

pub const OUTPUT_SCHEMA_VERSION: u16 = 1;

/// Field delimiter of every output file
pub const OUTPUT_DELIMITER: u8 = b'|';

/// One row per entity per family, written when the entity is first seen
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityRow {
    pub schema: u16,
    pub tin: String,
    pub tin_type: String,
    pub file_source: String,
    pub name_control: String,
    pub cycle: String,
    pub route: Route,
    pub entity_type: &'static str,
    pub transfer_flag: &'static str,
    pub age_severity: &'static str,
    pub statute_severity: &'static str,
    pub module_count: usize,
    pub balance: Cents,
}

/// Per-family totals of one entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryRow {
    pub schema: u16,
    pub tin: String,
    pub tin_type: String,
    pub file_source: String,
    pub cycle: String,
    pub route: Route,
    pub modules: usize,
    pub balance: Cents,
    pub earliest_period: String,
    pub latest_period: String,
}

/// One row per decoded group member
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleRow {
    pub schema: u16,
    pub tin: String,
    pub tin_type: String,
    pub file_source: String,
    pub sequence: usize,
    pub family: &'static str,
    pub record_type: &'static str,
    pub tax_period: String,
    pub mft: u64,
    pub routing_code: String,
    pub balance: Cents,
    pub running_balance: Cents,
    pub assessment_date: String,
    pub csed: String,
}

/// Which of the three per-family streams a row belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputKind {
    Entity,
    Summary,
    Module,
}

impl OutputKind {
    pub const ALL: [OutputKind; 3] = [OutputKind::Entity, OutputKind::Summary, OutputKind::Module];

    pub fn label(&self) -> &'static str {
        match self {
            OutputKind::Entity => "entity",
            OutputKind::Summary => "summary",
            OutputKind::Module => "module",
        }
    }

    /// File name for an area/family/kind triple, e.g. `north.a.entity.dat`
    pub fn file_name(&self, area: &str, route: Route) -> String {
        format!("{}.{}.{}.dat", area, route.label(), self.label())
    }
}
