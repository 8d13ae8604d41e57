use std::fmt;

use crate::record::FileRecord;

pub type FileResult<T> = std::result::Result<T, FileError>;

/// Whole-file shape rules. Violating one aborts the current read or write call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileValidationRule {
    MustHaveRows,
    MustHaveHeaderRow,
    MustHaveTrailerRow,
    MustHaveAtLeastOneContentRow,
}

impl FileValidationRule {
    pub fn as_str(&self) -> &str {
        match self {
            FileValidationRule::MustHaveRows => "file must have at least one row",
            FileValidationRule::MustHaveHeaderRow => "file must start with a header row",
            FileValidationRule::MustHaveTrailerRow => "file must end with a trailer row",
            FileValidationRule::MustHaveAtLeastOneContentRow => {
                "file must have at least one content row"
            }
        }
    }
}

impl fmt::Display for FileValidationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FileError {
    #[error("Structural violation: {rule}{}", line_suffix(.record))]
    Structural {
        rule: FileValidationRule,
        record: Option<Box<FileRecord>>,
    },

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Invalid layout")]
    Config(#[from] ConfigError),

    #[error("I/O failure")]
    Io(#[from] std::io::Error),
}

impl FileError {
    pub(crate) fn structural(rule: FileValidationRule, record: Option<FileRecord>) -> FileError {
        FileError::Structural {
            rule,
            record: record.map(Box::new),
        }
    }

    pub(crate) fn invalid_state<S: Into<String>>(msg: S) -> FileError {
        FileError::InvalidState(msg.into())
    }

    /// The violated rule, if this is a structural error.
    pub fn rule(&self) -> Option<FileValidationRule> {
        match self {
            FileError::Structural { rule, .. } => Some(*rule),
            _ => None,
        }
    }
}

fn line_suffix(record: &Option<Box<FileRecord>>) -> String {
    match record {
        Some(record) => format!(" (line {})", record.line_number),
        None => String::new(),
    }
}

/// Problems with a layout, detected before any line is processed.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Record type `{0}` is used by more than one of header, content and trailer")]
    DuplicateRecordType(String),

    #[error("Record identifier `{0}` is declared more than once")]
    DuplicateRecordIdentifier(String),

    #[error("Record identifier `{identifier}` on `{record_type}` requires a hierarchical format")]
    IdentifierWithoutHierarchy {
        record_type: String,
        identifier: String,
    },

    #[error("Record type `{0}` is not known to the metadata provider")]
    UnknownRecordType(String),

    #[error("Column `{column}` of `{record_type}` has no width, which fixed-width formats require")]
    MissingWidth { record_type: String, column: String },

    #[error("Record identifier column {index} is outside the columns of `{record_type}`")]
    IdentifierColumnOutOfRange { record_type: String, index: usize },

    #[error("Hierarchical fixed-width formats need a non-zero identifier length")]
    EmptyIdentifierRange,

    #[error("Rule `{0}` is enabled but no matching record kind is configured")]
    RuleWithoutKind(FileValidationRule),

    #[error("Hierarchy child `{identifier}` of `{record_type}` has min_count {min} above max_count {max}")]
    InvalidCardinality {
        record_type: String,
        identifier: String,
        min: usize,
        max: usize,
    },

    #[error("Could not parse layout")]
    Parse(#[from] serde_json::Error),

    #[error("Could not read layout")]
    Io(#[from] std::io::Error),
}
