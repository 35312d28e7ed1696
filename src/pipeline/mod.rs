pub mod batch;
pub mod error;
pub mod merge;
pub mod processor;
pub mod router;
pub mod sort;

// Re-export commonly used types
pub use batch::{ClosedGroup, DEFAULT_CHECKPOINT_INTERVAL, EntityBatcher, EntityGroup, EntityKeySpec};
pub use error::PipelineError;
pub use merge::{ExtractStats, MergeConfig, MergeOutcome, MergeStats, is_valid_identifier, merge_extracts};
pub use processor::{
    DEFAULT_FROZEN_RECORD_TYPE, DEFAULT_QUEUE_ROUTING_CODE, DecodeFailure, GroupOutcome,
    GroupSortPolicy, ProcessedEntity, ProcessedModule, RecordProcessor,
};
pub use router::OutputRouter;
pub use sort::{canonical_sort, verify_order};
