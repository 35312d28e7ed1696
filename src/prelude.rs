//! Prelude module for convenient imports
//!
//! Import everything you need with: `use casefile::prelude::*;`

// Domain types
pub use crate::domain::{
    CanonicalRecord, Cents, DateRules, DomainError, LAYOUT_V1, LineBuilder, Origin, RawLine,
    RecordLayout, Route,
};

// IO types
pub use crate::io::{AreaOutputs, DelimitedWriter, IoError, OutputKind};

// Pipeline types
pub use crate::pipeline::{
    EntityBatcher, EntityKeySpec, GroupSortPolicy, MergeConfig, OutputRouter, PipelineError,
    RecordProcessor, canonical_sort, merge_extracts,
};

// Audit types
pub use crate::audit::{AuditEntry, AuditSink, JsonLinesAuditSink, MemoryAuditSink, RunStatistics};

// Coordinator types
pub use crate::coordinator::{
    AbortOnError, AreaReport, AreaSession, AreaSpec, DecodeErrorMode, ErrorPolicy, RunCoordinator,
    RunReport, RunSettings, RunStatus, SilentSkip, SkipErrors,
};

// App types
pub use crate::app::{AppError, Args, CliApp, Config};
