//! Fixed-width case extract batch engine.
//!
//! Each area's two extracts are validated, merged and put into canonical
//! identifier order, then grouped by entity, decoded, ordered within the
//! entity and routed into pipe-delimited output families.

pub mod app;
pub mod audit;
pub mod coordinator;
pub mod domain;
pub mod io;
pub mod pipeline;
pub mod prelude;
