pub mod error;
pub mod sink;
pub mod sinks;
pub mod statistics;

// Re-export commonly used types
pub use error::AuditError;
pub use sink::{AuditEntry, AuditSink, Checkpoint};
pub use sinks::{JsonLinesAuditSink, MemoryAuditSink, TracingAuditSink};
pub use statistics::{RouteCounters, RunStatistics};
