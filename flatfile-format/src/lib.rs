//! Herein lies the brains of the `flatfile` codec.
//!
//! A flat file is a sequence of text lines, each line being one record laid out
//! either as fixed-width columns or as delimited (optionally qualified) columns.
//! Records may form a hierarchy: an "order" line followed by its "line item"
//! lines, and so on, with an optional header row first and trailer row last.
//!
//! Use [FileReader][FileReader] to read files, and [FileWriter][FileWriter] to write files.
//! Both are driven by a [Layout][Layout], which pairs a [FormatDefinition][FormatDefinition]
//! with a [MetadataProvider][MetadataProvider] describing the record types.

pub mod column;
pub mod core;
pub mod definition;
pub mod error;
pub mod hierarchy;
pub mod layout;
pub mod message;
pub mod metadata;
pub mod record;
#[cfg(feature = "schema")]
pub mod schema;
pub mod sync;
pub mod tokenize;

pub use column::{ColumnDescriptor, ColumnKind, HierarchyDescriptor};
pub use definition::{
    ColumnCountValidation, ColumnWidthOverflow, DelimitedOptions, FileValidation,
    FixedWidthOptions, FormatDefinition, LineFormat, RecordKind, StringTransform, StringTrim,
    TextQualifierHandling,
};
pub use error::{ConfigError, FileError, FileResult, FileValidationRule};
pub use hierarchy::{HierarchyIndex, HierarchyNode, NodeId};
pub use layout::Layout;
pub use message::{MessageItem, Severity};
pub use metadata::MetadataProvider;
pub use record::{FileOperationResult, FileRecord, OperationStatus};
#[cfg(feature = "schema")]
pub use schema::{DynamicRecord, LayoutFile, RecordSchema, Schema};
#[cfg(feature = "reader")]
pub use sync::FileReader;
#[cfg(feature = "writer")]
pub use sync::FileWriter;
pub use tokenize::{DelimitedCodec, FixedWidthCodec, LineCodec, Tokenized};
