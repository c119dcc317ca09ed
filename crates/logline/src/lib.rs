// Module structure for the logline access-log parser.

// Line parsing
pub mod parser;
pub mod format;
pub mod record;

// Selection and projection
pub mod filter;
pub mod output;
pub mod batch;

// Binary support
pub mod conf;
pub mod runtime;

pub use format::{compile_format, FieldName, FormatError, FormatSpec, Preset};
pub use parser::parse;
pub use record::{make_record, DeriveOptions, Record, RecordError, RecordParser};
