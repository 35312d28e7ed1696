pub mod error;
pub mod extract;
pub mod rows;
pub mod writer;

// Re-export commonly used types
pub use error::IoError;
pub use extract::{
    ExtractCheck, ExtractLines, check_extract, partial_path, read_lines, remove_artifact, write_lines,
};
pub use rows::{EntityRow, ModuleRow, OUTPUT_DELIMITER, OUTPUT_SCHEMA_VERSION, OutputKind, SummaryRow};
pub use writer::{AreaOutputs, DelimitedWriter, remove_outputs};
