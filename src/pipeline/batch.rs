use tracing::debug;

use crate::domain::{CanonicalRecord, DomainError, RecordLayout, Span, names};

/// Groups closed between two commit checkpoints unless configured otherwise
pub const DEFAULT_CHECKPOINT_INTERVAL: usize = 1000;

/// Fields whose concatenation identifies an entity
#[derive(Debug, Clone)]
pub struct EntityKeySpec {
    spans: Vec<Span>,
}

impl EntityKeySpec {
    /// Identifier, identifier type and file source
    pub fn from_layout(layout: &RecordLayout) -> Result<Self, DomainError> {
        Ok(Self {
            spans: vec![
                layout.span(names::TIN)?,
                layout.span(names::TIN_TYPE)?,
                layout.span(names::FILE_SOURCE)?,
            ],
        })
    }

    pub fn key(&self, record: &CanonicalRecord) -> String {
        self.spans.iter().map(|span| record.slice(*span)).collect()
    }
}

/// Contiguous canonical records sharing one entity key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityGroup {
    key: String,
    /// 1-based position among the area's groups
    ordinal: usize,
    members: Vec<CanonicalRecord>,
}

impl EntityGroup {
    pub fn new(key: String, ordinal: usize, members: Vec<CanonicalRecord>) -> Self {
        Self {
            key,
            ordinal,
            members,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    pub fn members(&self) -> &[CanonicalRecord] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn into_members(self) -> Vec<CanonicalRecord> {
        self.members
    }
}

/// A group handed off by the batcher
#[derive(Debug)]
pub struct ClosedGroup {
    pub group: EntityGroup,
    /// Set when this group completes a checkpoint interval
    pub checkpoint: Option<u64>,
}

/// Splits the canonical stream on entity key changes.
///
/// Holds only the in-flight group; every closed group is returned to the
/// caller immediately.
pub struct EntityBatcher {
    key_spec: EntityKeySpec,
    checkpoint_interval: usize,
    current: Option<(String, Vec<CanonicalRecord>)>,
    closed: usize,
}

impl EntityBatcher {
    pub fn new(key_spec: EntityKeySpec, checkpoint_interval: usize) -> Self {
        Self {
            key_spec,
            checkpoint_interval: checkpoint_interval.max(1),
            current: None,
            closed: 0,
        }
    }

    /// Add the next record, returning the previous group if the key changed
    pub fn push(&mut self, record: CanonicalRecord) -> Option<ClosedGroup> {
        let key = self.key_spec.key(&record);

        if let Some((current_key, members)) = &mut self.current
            && *current_key == key
        {
            members.push(record);
            return None;
        }

        let closed = self.close();
        self.current = Some((key, vec![record]));
        closed
    }

    /// Close the in-flight group at end of input
    pub fn finish(&mut self) -> Option<ClosedGroup> {
        self.close()
    }

    /// Groups closed so far
    pub fn closed(&self) -> usize {
        self.closed
    }

    fn close(&mut self) -> Option<ClosedGroup> {
        let (key, members) = self.current.take()?;
        self.closed += 1;

        let checkpoint = (self.closed % self.checkpoint_interval == 0)
            .then(|| (self.closed / self.checkpoint_interval) as u64);
        if let Some(ordinal) = checkpoint {
            debug!(groups = self.closed, checkpoint = ordinal, "Checkpoint reached");
        }

        Some(ClosedGroup {
            group: EntityGroup::new(key, self.closed, members),
            checkpoint,
        })
    }
}
