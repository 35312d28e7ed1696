pub mod policy;
pub mod report;
pub mod run;
pub mod session;

// Re-export commonly used types
pub use policy::{AbortOnError, DecodeErrorMode, ErrorPolicy, SilentSkip, SkipErrors};
pub use report::{AreaFailure, AreaReport, AreaStatus, DecodeErrorSample, RunReport, RunStatus};
pub use run::RunCoordinator;
pub use session::{AreaSession, AreaSpec, RunSettings};
