pub mod amount;
pub mod decode;
pub mod error;
pub mod layout;
pub mod record;
pub mod route;
pub mod rules;

// Re-export commonly used types
pub use amount::Cents;
pub use decode::{DateRules, DecodedRecord, FieldValue, LeapSubstitution, TaxPeriod, decode_line};
pub use error::DomainError;
pub use layout::{FieldKind, FieldSpec, LAYOUT_V1, LineBuilder, RecordLayout, Span, names};
pub use record::{CanonicalRecord, Origin, ParsedRecord, RawLine, RecordFamily, RecordType};
pub use route::Route;
pub use rules::{EntityState, EntityType, Severity, TransferFlag};
