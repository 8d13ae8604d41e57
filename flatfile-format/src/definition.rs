use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, FileValidationRule};

/// What to do when a line has a different number of columns than its record type declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnCountValidation {
    Ignore,
    #[default]
    Warning,
    Error,
}

/// What to do when a value is wider than its fixed-width column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnWidthOverflow {
    /// Cut the value to the column width and attach a warning.
    #[default]
    Truncate,
    /// Attach an error, which keeps the record from being written.
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StringTransform {
    #[default]
    None,
    Upper,
    Lower,
}

impl StringTransform {
    pub fn apply(self, value: &str) -> String {
        match self {
            StringTransform::None => value.to_string(),
            StringTransform::Upper => value.to_uppercase(),
            StringTransform::Lower => value.to_lowercase(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StringTrim {
    #[default]
    None,
    Start,
    End,
    Both,
}

impl StringTrim {
    pub fn apply(self, value: &str) -> &str {
        match self {
            StringTrim::None => value,
            StringTrim::Start => value.trim_start(),
            StringTrim::End => value.trim_end(),
            StringTrim::Both => value.trim(),
        }
    }
}

/// How a misplaced or unterminated text qualifier is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextQualifierHandling {
    /// Error, and stop parsing the line.
    #[default]
    Strict,
    /// Warn, and keep the qualifier character as text.
    LooseAllow,
    /// Warn, and drop the qualifier character.
    LooseSkip,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DelimitedOptions {
    pub delimiter: char,
    pub qualifier: Option<char>,
    pub qualifier_handling: TextQualifierHandling,
    /// Only qualify text values that contain the delimiter or the qualifier.
    pub qualify_only_if_needed: bool,
    /// Column holding the record identifier in hierarchical formats.
    pub identifier_column: usize,
}

impl Default for DelimitedOptions {
    fn default() -> Self {
        DelimitedOptions {
            delimiter: ',',
            qualifier: Some('"'),
            qualifier_handling: TextQualifierHandling::Strict,
            qualify_only_if_needed: true,
            identifier_column: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixedWidthOptions {
    pub pad: char,
    /// Character offset of the record identifier in hierarchical formats.
    pub identifier_position: usize,
    /// Length in characters of the record identifier.
    pub identifier_length: usize,
}

impl Default for FixedWidthOptions {
    fn default() -> Self {
        FixedWidthOptions {
            pad: ' ',
            identifier_position: 0,
            identifier_length: 1,
        }
    }
}

/// How lines are split into columns and composed from them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineFormat {
    Delimited(DelimitedOptions),
    FixedWidth(FixedWidthOptions),
}

impl Default for LineFormat {
    fn default() -> Self {
        LineFormat::Delimited(DelimitedOptions::default())
    }
}

impl LineFormat {
    #[inline(always)]
    pub fn is_fixed_width(&self) -> bool {
        matches!(self, LineFormat::FixedWidth(_))
    }
}

/// Whole-file shape rules to enforce. All off by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileValidation {
    pub must_have_rows: bool,
    pub must_have_header_row: bool,
    pub must_have_trailer_row: bool,
    pub must_have_at_least_one_content_row: bool,
}

impl FileValidation {
    pub fn requires(&self, rule: FileValidationRule) -> bool {
        match rule {
            FileValidationRule::MustHaveRows => self.must_have_rows,
            FileValidationRule::MustHaveHeaderRow => self.must_have_header_row,
            FileValidationRule::MustHaveTrailerRow => self.must_have_trailer_row,
            FileValidationRule::MustHaveAtLeastOneContentRow => {
                self.must_have_at_least_one_content_row
            }
        }
    }

    pub fn with_rule(mut self, rule: FileValidationRule) -> Self {
        match rule {
            FileValidationRule::MustHaveRows => self.must_have_rows = true,
            FileValidationRule::MustHaveHeaderRow => self.must_have_header_row = true,
            FileValidationRule::MustHaveTrailerRow => self.must_have_trailer_row = true,
            FileValidationRule::MustHaveAtLeastOneContentRow => {
                self.must_have_at_least_one_content_row = true
            }
        }
        self
    }
}

/// One kind of record a file may contain: its type name, as known to the
/// metadata provider, and the identifier marking its lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordKind {
    pub record_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_identifier: Option<String>,
}

impl RecordKind {
    pub fn new<S: Into<String>>(record_type: S) -> RecordKind {
        RecordKind {
            record_type: record_type.into(),
            record_identifier: None,
        }
    }

    pub fn identified<S: Into<String>, I: Into<String>>(record_type: S, identifier: I) -> RecordKind {
        RecordKind {
            record_type: record_type.into(),
            record_identifier: Some(identifier.into()),
        }
    }

    /// Whether a line carrying `identifier` is of this kind. A kind without an
    /// identifier matches by position alone.
    pub fn matches(&self, identifier: Option<&str>) -> bool {
        match &self.record_identifier {
            None => true,
            Some(expected) => identifier == Some(expected.as_str()),
        }
    }

    #[inline(always)]
    pub(crate) fn identifier(&self) -> Option<&str> {
        self.record_identifier.as_deref()
    }
}

/// Declares what a flat file looks like.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatDefinition {
    pub content: RecordKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<RecordKind>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trailer: Option<RecordKind>,

    #[serde(default)]
    pub line_format: LineFormat,

    #[serde(default)]
    pub column_count_validation: ColumnCountValidation,

    #[serde(default)]
    pub width_overflow: ColumnWidthOverflow,

    #[serde(default)]
    pub string_transform: StringTransform,

    #[serde(default)]
    pub string_trim: StringTrim,

    #[serde(default)]
    pub file_validation: FileValidation,
}

impl FormatDefinition {
    pub fn new<S: Into<String>>(content_type: S, line_format: LineFormat) -> FormatDefinition {
        FormatDefinition {
            content: RecordKind::new(content_type),
            header: None,
            trailer: None,
            line_format,
            column_count_validation: ColumnCountValidation::default(),
            width_overflow: ColumnWidthOverflow::default(),
            string_transform: StringTransform::default(),
            string_trim: StringTrim::default(),
            file_validation: FileValidation::default(),
        }
    }

    /// A comma-delimited, `"`-qualified format.
    pub fn delimited<S: Into<String>>(content_type: S) -> FormatDefinition {
        FormatDefinition::new(content_type, LineFormat::Delimited(DelimitedOptions::default()))
    }

    pub fn fixed_width<S: Into<String>>(content_type: S) -> FormatDefinition {
        FormatDefinition::new(
            content_type,
            LineFormat::FixedWidth(FixedWidthOptions::default()),
        )
    }

    /// Marks content lines with `identifier`, which makes the format hierarchical.
    pub fn with_content_identifier<S: Into<String>>(mut self, identifier: S) -> Self {
        self.content.record_identifier = Some(identifier.into());
        self
    }

    pub fn with_header(mut self, header: RecordKind) -> Self {
        self.header = Some(header);
        self
    }

    pub fn with_trailer(mut self, trailer: RecordKind) -> Self {
        self.trailer = Some(trailer);
        self
    }

    pub fn with_line_format(mut self, line_format: LineFormat) -> Self {
        self.line_format = line_format;
        self
    }

    pub fn with_column_count_validation(mut self, validation: ColumnCountValidation) -> Self {
        self.column_count_validation = validation;
        self
    }

    pub fn with_width_overflow(mut self, overflow: ColumnWidthOverflow) -> Self {
        self.width_overflow = overflow;
        self
    }

    pub fn with_string_transform(mut self, transform: StringTransform) -> Self {
        self.string_transform = transform;
        self
    }

    pub fn with_string_trim(mut self, trim: StringTrim) -> Self {
        self.string_trim = trim;
        self
    }

    pub fn with_file_validation(mut self, validation: FileValidation) -> Self {
        self.file_validation = validation;
        self
    }

    pub fn with_rule(mut self, rule: FileValidationRule) -> Self {
        self.file_validation = self.file_validation.with_rule(rule);
        self
    }

    /// True iff content records carry a record identifier.
    #[inline(always)]
    pub fn is_hierarchical(&self) -> bool {
        self.content.record_identifier.is_some()
    }

    pub fn content_identifier(&self) -> Option<&str> {
        self.content.identifier()
    }

    pub fn header_identifier(&self) -> Option<&str> {
        self.header.as_ref().and_then(RecordKind::identifier)
    }

    pub fn trailer_identifier(&self) -> Option<&str> {
        self.trailer.as_ref().and_then(RecordKind::identifier)
    }

    /// Checks the invariants that do not need the metadata provider.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let kinds = std::iter::once(&self.content)
            .chain(self.header.iter())
            .chain(self.trailer.iter());

        let mut types = HashSet::new();
        let mut identifiers = HashSet::new();

        for kind in kinds {
            if !types.insert(kind.record_type.as_str()) {
                return Err(ConfigError::DuplicateRecordType(kind.record_type.clone()));
            }

            if let Some(identifier) = kind.identifier() {
                if !self.is_hierarchical() {
                    return Err(ConfigError::IdentifierWithoutHierarchy {
                        record_type: kind.record_type.clone(),
                        identifier: identifier.to_string(),
                    });
                }

                if !identifiers.insert(identifier) {
                    return Err(ConfigError::DuplicateRecordIdentifier(identifier.to_string()));
                }
            }
        }

        if self.file_validation.must_have_header_row && self.header.is_none() {
            return Err(ConfigError::RuleWithoutKind(
                FileValidationRule::MustHaveHeaderRow,
            ));
        }

        if self.file_validation.must_have_trailer_row && self.trailer.is_none() {
            return Err(ConfigError::RuleWithoutKind(
                FileValidationRule::MustHaveTrailerRow,
            ));
        }

        if let LineFormat::FixedWidth(options) = &self.line_format {
            if self.is_hierarchical() && options.identifier_length == 0 {
                return Err(ConfigError::EmptyIdentifierRange);
            }
        }

        Ok(())
    }
}
