use std::cmp::Ordering;

use tracing::debug;

use super::batch::EntityGroup;
use super::error::PipelineError;
use crate::domain::{
    CanonicalRecord, Cents, DateRules, DomainError, EntityState, Origin, ParsedRecord,
    RecordFamily, RecordLayout, Route, Span, names,
};

/// Record type whose members keep their slot during the period sort
pub const DEFAULT_FROZEN_RECORD_TYPE: &str = "05";

/// Routing code that selects the queue family
pub const DEFAULT_QUEUE_ROUTING_CODE: &str = "99";

/// Intra-group ordering rules.
///
/// Groups of more than two members are split into runs of equal name
/// control, then each run is ordered by family (lead family first) and by
/// tax period descending. Outside the lead family, frozen records stay in
/// the slots they arrived in.
#[derive(Debug, Clone)]
pub struct GroupSortPolicy {
    name: Span,
    family: Span,
    period: Span,
    record_type: Span,
    lead_family: String,
    frozen_record_type: String,
}

impl GroupSortPolicy {
    pub fn from_layout(
        layout: &RecordLayout,
        frozen_record_type: impl Into<String>,
    ) -> Result<Self, DomainError> {
        Ok(Self {
            name: layout.span(names::NAME_CONTROL)?,
            family: layout.span(names::FAMILY)?,
            period: layout.span(names::TAX_PERIOD)?,
            record_type: layout.span(names::RECORD_TYPE)?,
            lead_family: RecordFamily::BalanceDue.code().to_string(),
            frozen_record_type: frozen_record_type.into(),
        })
    }

    pub fn order(&self, members: Vec<CanonicalRecord>) -> Vec<CanonicalRecord> {
        if members.len() <= 2 {
            return members;
        }
        self.name_runs(members)
            .into_iter()
            .flat_map(|run| self.period_sort(run))
            .collect()
    }

    /// Maximal runs of equal name control; one run when every name matches
    pub fn name_runs(&self, mut members: Vec<CanonicalRecord>) -> Vec<Vec<CanonicalRecord>> {
        let uniform = members
            .windows(2)
            .all(|pair| pair[0].slice(self.name) == pair[1].slice(self.name));
        if uniform {
            return vec![members];
        }

        members.sort_by(|a, b| a.slice(self.name).cmp(b.slice(self.name)));

        let mut runs: Vec<Vec<CanonicalRecord>> = Vec::new();
        for record in members {
            if let Some(run) = runs.last_mut()
                && run[0].slice(self.name) == record.slice(self.name)
            {
                run.push(record);
                continue;
            }
            runs.push(vec![record]);
        }
        runs
    }

    fn by_period_desc(&self, a: &CanonicalRecord, b: &CanonicalRecord) -> Ordering {
        b.slice(self.period).cmp(a.slice(self.period))
    }

    fn is_frozen(&self, record: &CanonicalRecord) -> bool {
        record.slice(self.record_type) == self.frozen_record_type
    }

    /// Lead family first, by period descending; the other families follow
    /// in descending code order around frozen records
    fn period_sort(&self, run: Vec<CanonicalRecord>) -> Vec<CanonicalRecord> {
        let (mut lead, mut rest): (Vec<_>, Vec<_>) = run
            .into_iter()
            .partition(|r| r.slice(self.family) == self.lead_family);

        rest.sort_by(|a, b| b.slice(self.family).cmp(a.slice(self.family)));
        lead.sort_by(|a, b| self.by_period_desc(a, b));
        lead.extend(self.sort_around_frozen(rest));
        lead
    }

    fn sort_around_frozen(&self, members: Vec<CanonicalRecord>) -> Vec<CanonicalRecord> {
        let mut slots = Vec::with_capacity(members.len());
        let mut movable = Vec::new();
        for record in members {
            if self.is_frozen(&record) {
                slots.push(Some(record));
            } else {
                slots.push(None);
                movable.push(record);
            }
        }

        movable.sort_by(|a, b| self.by_period_desc(a, b));
        let mut movable = movable.into_iter();
        slots
            .into_iter()
            .filter_map(|slot| slot.or_else(|| movable.next()))
            .collect()
    }
}

/// A record that could not be decoded; it is left out of its group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeFailure {
    pub origin: Origin,
    pub line_no: usize,
    pub identifier: String,
    pub error: DomainError,
}

impl DecodeFailure {
    pub fn into_error(self) -> PipelineError {
        PipelineError::DecodeAborted {
            origin: self.origin,
            line_no: self.line_no,
            identifier: self.identifier,
            source: self.error,
        }
    }
}

/// One decoded group member in processing order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedModule {
    pub record: ParsedRecord,
    pub origin: Origin,
    pub line_no: usize,
    pub route: Route,
    /// 1-based among decoded members
    pub sequence: usize,
    pub contribution: Cents,
    /// Entity balance after this module
    pub running_balance: Cents,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedEntity {
    pub key: String,
    pub ordinal: usize,
    /// Group size before decoding
    pub members: usize,
    pub modules: Vec<ProcessedModule>,
    pub state: EntityState,
}

impl ProcessedEntity {
    /// Routes touched by at least one module, in family order
    pub fn routes(&self) -> Vec<Route> {
        Route::ALL
            .into_iter()
            .filter(|route| self.modules.iter().any(|m| m.route == *route))
            .collect()
    }

    pub fn modules_in(&self, route: Route) -> impl Iterator<Item = &ProcessedModule> {
        self.modules.iter().filter(move |m| m.route == route)
    }

    pub fn first_module(&self) -> Option<&ProcessedModule> {
        self.modules.first()
    }
}

#[derive(Debug)]
pub struct GroupOutcome {
    pub entity: ProcessedEntity,
    pub failures: Vec<DecodeFailure>,
}

/// Orders, decodes and derives one entity group at a time
#[derive(Debug, Clone)]
pub struct RecordProcessor {
    layout: RecordLayout,
    rules: DateRules,
    queue_routing_code: String,
    sort: GroupSortPolicy,
}

impl RecordProcessor {
    pub fn new(
        layout: RecordLayout,
        rules: DateRules,
        queue_routing_code: impl Into<String>,
        frozen_record_type: impl Into<String>,
    ) -> Result<Self, DomainError> {
        let sort = GroupSortPolicy::from_layout(&layout, frozen_record_type)?;
        Ok(Self {
            layout,
            rules,
            queue_routing_code: queue_routing_code.into(),
            sort,
        })
    }

    /// Process a closed group. Members that fail to decode are skipped and
    /// returned alongside the entity.
    pub fn process(&self, group: EntityGroup) -> GroupOutcome {
        let key = group.key().to_string();
        let ordinal = group.ordinal();
        let members = group.len();

        let mut state = EntityState::new();
        let mut modules = Vec::with_capacity(members);
        let mut failures = Vec::new();

        for record in self.sort.order(group.into_members()) {
            match self.decode(&record, &mut state) {
                Ok((parsed, contribution)) => {
                    let route = Route::from_code(&parsed.routing_code, &self.queue_routing_code);
                    modules.push(ProcessedModule {
                        record: parsed,
                        origin: record.origin(),
                        line_no: record.line_no(),
                        route,
                        sequence: modules.len() + 1,
                        contribution,
                        running_balance: state.balance(),
                    });
                }
                Err(error) => {
                    debug!(
                        identifier = record.identifier(),
                        origin = %record.origin(),
                        line_no = record.line_no(),
                        %error,
                        "Record decode failed"
                    );
                    failures.push(DecodeFailure {
                        origin: record.origin(),
                        line_no: record.line_no(),
                        identifier: record.identifier().to_string(),
                        error,
                    });
                }
            }
        }

        debug!(
            key = %key,
            members,
            decoded = modules.len(),
            balance = %state.balance(),
            "Processed entity group"
        );

        GroupOutcome {
            entity: ProcessedEntity {
                key,
                ordinal,
                members,
                modules,
                state,
            },
            failures,
        }
    }

    fn decode(
        &self,
        record: &CanonicalRecord,
        state: &mut EntityState,
    ) -> Result<(ParsedRecord, Cents), DomainError> {
        let parsed = ParsedRecord::from_line(&self.layout, record.line(), &self.rules)?;
        let contribution = state.apply(&parsed, &self.rules)?;
        Ok((parsed, contribution))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EntityType, LAYOUT_V1, LineBuilder, RawLine, TransferFlag};

    struct Module<'a> {
        name: &'a str,
        family: &'a str,
        record_type: &'a str,
        period: &'a str,
        routing: &'a str,
        balance: &'a str,
    }

    impl Default for Module<'_> {
        fn default() -> Self {
            Self {
                name: "SMIT",
                family: "T",
                record_type: "01",
                period: "202112",
                routing: "12",
                balance: "0",
            }
        }
    }

    fn canonical(module: Module<'_>, line_no: usize) -> CanonicalRecord {
        let text = LineBuilder::new(&LAYOUT_V1)
            .set(names::TIN, "00000000123")
            .set(names::TIN_TYPE, "0")
            .set(names::FILE_SOURCE, "A")
            .set(names::NAME_CONTROL, module.name)
            .set(names::CYCLE, "202412")
            .set(names::EXTRACT_DATE, "20241215")
            .set(names::ROUTING_CODE, module.routing)
            .set(names::FAMILY, module.family)
            .set(names::RECORD_TYPE, module.record_type)
            .set(names::TAX_PERIOD, module.period)
            .set(names::BALANCE, module.balance)
            .build();
        let raw = RawLine {
            text,
            origin: Origin::Primary,
            line_no,
        };
        CanonicalRecord::new(raw, Span::new(0, 11))
    }

    fn group(modules: Vec<Module<'_>>) -> Vec<CanonicalRecord> {
        modules
            .into_iter()
            .enumerate()
            .map(|(i, m)| canonical(m, i + 1))
            .collect()
    }

    fn policy() -> GroupSortPolicy {
        GroupSortPolicy::from_layout(&LAYOUT_V1, DEFAULT_FROZEN_RECORD_TYPE).unwrap()
    }

    fn line_numbers(records: &[CanonicalRecord]) -> Vec<usize> {
        records.iter().map(|r| r.line_no()).collect()
    }

    fn processor() -> RecordProcessor {
        RecordProcessor::new(
            LAYOUT_V1,
            DateRules::default(),
            DEFAULT_QUEUE_ROUTING_CODE,
            DEFAULT_FROZEN_RECORD_TYPE,
        )
        .unwrap()
    }

    #[test]
    fn small_groups_pass_through_unsorted() {
        let single = group(vec![Module::default()]);
        assert_eq!(line_numbers(&policy().order(single)), vec![1]);

        let pair = group(vec![
            Module { period: "201901", ..Module::default() },
            Module { period: "202301", ..Module::default() },
        ]);
        assert_eq!(line_numbers(&policy().order(pair)), vec![1, 2]);
    }

    #[test]
    fn uniform_names_sort_as_one_run() {
        let records = group(vec![
            Module { period: "202001", ..Module::default() },
            Module { period: "202112", ..Module::default() },
            Module { period: "202106", ..Module::default() },
        ]);

        let policy = policy();
        assert_eq!(policy.name_runs(records.clone()).len(), 1);
        assert_eq!(line_numbers(&policy.order(records)), vec![2, 3, 1]);
    }

    #[test]
    fn differing_names_split_into_runs() {
        let records = group(vec![
            Module { name: "SMIT", period: "202001", ..Module::default() },
            Module { name: "JONE", period: "202101", ..Module::default() },
            Module { name: "SMIT", period: "202201", ..Module::default() },
        ]);

        let policy = policy();
        let runs = policy.name_runs(records.clone());
        assert_eq!(runs.len(), 2);
        assert_eq!(line_numbers(&policy.order(records)), vec![2, 3, 1]);
    }

    #[test]
    fn lead_family_precedes_and_sorts_by_period() {
        let records = group(vec![
            Module { family: "I", record_type: "02", period: "202201", ..Module::default() },
            Module { family: "T", period: "202001", ..Module::default() },
            Module { family: "T", period: "202101", ..Module::default() },
            Module { family: "I", record_type: "02", period: "202301", ..Module::default() },
        ]);

        assert_eq!(line_numbers(&policy().order(records)), vec![3, 2, 4, 1]);
    }

    #[test]
    fn frozen_records_keep_their_slot() {
        let records = group(vec![
            Module { family: "I", record_type: "02", period: "202001", ..Module::default() },
            Module { family: "I", record_type: "05", period: "201801", ..Module::default() },
            Module { family: "I", record_type: "02", period: "202201", ..Module::default() },
            Module { family: "I", record_type: "02", period: "202101", ..Module::default() },
        ]);

        // movable members fill slots 0, 2, 3 in descending period order
        assert_eq!(line_numbers(&policy().order(records)), vec![3, 2, 4, 1]);
    }

    #[test]
    fn lead_family_precedes_codes_that_sort_above_it() {
        let records = group(vec![
            Module { family: "Z", period: "202301", ..Module::default() },
            Module { period: "202001", ..Module::default() },
            Module { family: "I", record_type: "02", period: "202201", ..Module::default() },
            Module { period: "202101", ..Module::default() },
        ]);

        assert_eq!(line_numbers(&policy().order(records)), vec![4, 2, 1, 3]);
    }

    #[test]
    fn frozen_rule_does_not_apply_to_lead_family() {
        let records = group(vec![
            Module { record_type: "05", period: "201801", ..Module::default() },
            Module { period: "202201", ..Module::default() },
            Module { period: "202001", ..Module::default() },
        ]);

        assert_eq!(line_numbers(&policy().order(records)), vec![2, 3, 1]);
    }

    #[test]
    fn derives_state_and_running_balance() {
        let records = group(vec![
            Module { period: "202201", balance: "1000", ..Module::default() },
            Module { period: "202101", record_type: "03", balance: "500", routing: "99", ..Module::default() },
            Module { family: "I", record_type: "02", period: "202001", balance: "9999", ..Module::default() },
        ]);
        let outcome = processor().process(EntityGroup::new("000000001230A".to_string(), 1, records));

        assert!(outcome.failures.is_empty());
        let entity = outcome.entity;
        assert_eq!(entity.modules.len(), 3);
        assert_eq!(entity.state.entity_type(), EntityType::Combined);
        assert_eq!(entity.state.transfer_flag(), TransferFlag::Pending);
        assert_eq!(entity.state.balance(), Cents::from_raw(1500));

        let running: Vec<_> = entity.modules.iter().map(|m| m.running_balance.raw()).collect();
        assert_eq!(running, vec![1000, 1500, 1500]);
        let sequences: Vec<_> = entity.modules.iter().map(|m| m.sequence).collect();
        assert_eq!(sequences, vec![1, 2, 3]);

        assert_eq!(entity.routes(), vec![Route::A, Route::B]);
        assert_eq!(entity.modules_in(Route::B).count(), 1);
    }

    #[test]
    fn decode_failures_are_skipped_and_reported() {
        let records = group(vec![
            Module { period: "202201", balance: "100", ..Module::default() },
            Module { period: "202101", record_type: "99", ..Module::default() },
            Module { period: "202001", balance: "200", ..Module::default() },
        ]);
        let outcome = processor().process(EntityGroup::new("000000001230A".to_string(), 1, records));

        assert_eq!(outcome.entity.members, 3);
        assert_eq!(outcome.entity.modules.len(), 2);
        assert_eq!(outcome.entity.state.balance(), Cents::from_raw(300));
        assert_eq!(outcome.failures.len(), 1);

        let failure = outcome.failures[0].clone();
        assert_eq!(failure.line_no, 2);
        assert_eq!(failure.identifier, "00000000123");
        assert_eq!(failure.error, DomainError::UnknownRecordType("99".to_string()));
        assert!(matches!(
            failure.into_error(),
            PipelineError::DecodeAborted { line_no: 2, .. }
        ));
    }
}
