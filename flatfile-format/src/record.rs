use std::fmt;

use serde::{Deserialize, Serialize};

use crate::message::{MessageItem, Severity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    Header,
    Content,
    Trailer,
    EndOfFile,
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OperationStatus::Header => "header",
            OperationStatus::Content => "content",
            OperationStatus::Trailer => "trailer",
            OperationStatus::EndOfFile => "end of file",
        };

        write!(f, "{}", s)
    }
}

/// One physical line, on either the read or the write path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord<V = ()> {
    pub line_number: usize,
    pub raw_line: String,
    pub columns: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_identifier: Option<String>,
    /// The record type the line was materialized as, when it could be resolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_type: Option<String>,
    /// Depth in the record hierarchy: 0 for the content root, [`FileRecord::ORPHANED`]
    /// for lines that could not be placed.
    pub level: i32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<MessageItem>,
    /// The line's own value, without descendants folded in. On read it is
    /// `None` when the line has errors; on write it is the value the line was
    /// composed from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<V>,
}

impl<V> FileRecord<V> {
    pub const ORPHANED: i32 = -1;

    pub fn new(line_number: usize, raw_line: String) -> FileRecord<V> {
        FileRecord {
            line_number,
            raw_line,
            columns: Vec::new(),
            record_identifier: None,
            record_type: None,
            level: 0,
            messages: Vec::new(),
            value: None,
        }
    }

    #[inline(always)]
    pub fn has_errors(&self) -> bool {
        self.messages.iter().any(MessageItem::is_error)
    }

    #[inline(always)]
    pub fn is_orphaned(&self) -> bool {
        self.level == Self::ORPHANED
    }

    pub fn push_message(&mut self, message: MessageItem) {
        self.messages.push(message);
    }

    pub fn push_error<S: Into<String>>(&mut self, text: S) {
        self.messages.push(MessageItem::error(text));
    }

    pub fn push_warning<S: Into<String>>(&mut self, text: S) {
        self.messages.push(MessageItem::warning(text));
    }

    /// Marks the line as unplaceable, with the reason as an error.
    pub(crate) fn orphan<S: Into<String>>(&mut self, reason: S) {
        self.level = Self::ORPHANED;
        self.push_error(reason);
    }

    /// Messages at or above `severity`.
    pub fn messages_at_least(&self, severity: Severity) -> impl Iterator<Item = &MessageItem> {
        self.messages.iter().filter(move |m| m.severity >= severity)
    }

    /// The same line with its value dropped.
    pub fn without_value(self) -> FileRecord {
        FileRecord {
            line_number: self.line_number,
            raw_line: self.raw_line,
            columns: self.columns,
            record_identifier: self.record_identifier,
            record_type: self.record_type,
            level: self.level,
            messages: self.messages,
            value: None,
        }
    }
}

/// The outcome of one read or write call: a header, a trailer, one content
/// record group, or the end of the file.
#[derive(Debug, Clone, Serialize)]
pub struct FileOperationResult<V> {
    pub status: OperationStatus,
    pub records: Vec<FileRecord<V>>,
    /// Lines consumed (read) or emitted (write) so far, including this call's.
    pub total_lines: usize,
    /// The root value of the group, with its descendants. Always `None` when
    /// any record has errors.
    pub value: Option<V>,
}

impl<V> FileOperationResult<V> {
    pub(crate) fn new(
        status: OperationStatus,
        records: Vec<FileRecord<V>>,
        total_lines: usize,
        value: Option<V>,
    ) -> FileOperationResult<V> {
        let value = if records.iter().any(FileRecord::has_errors) {
            None
        } else {
            value
        };

        FileOperationResult {
            status,
            records,
            total_lines,
            value,
        }
    }

    pub(crate) fn end_of_file(total_lines: usize) -> FileOperationResult<V> {
        FileOperationResult {
            status: OperationStatus::EndOfFile,
            records: Vec::new(),
            total_lines,
            value: None,
        }
    }

    #[inline(always)]
    pub fn has_errors(&self) -> bool {
        self.records.iter().any(FileRecord::has_errors)
    }

    #[inline(always)]
    pub fn is_end_of_file(&self) -> bool {
        self.status == OperationStatus::EndOfFile
    }

    /// Every message in the group, paired with the line it belongs to.
    pub fn messages(&self) -> impl Iterator<Item = (usize, &MessageItem)> {
        self.records
            .iter()
            .flat_map(|r| r.messages.iter().map(move |m| (r.line_number, m)))
    }

    pub fn into_value(self) -> Option<V> {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_is_withheld_on_error() {
        let mut bad = FileRecord::new(1, "x".into());
        bad.push_error("nope");
        let mut good = FileRecord::new(2, "y".into());
        good.value = Some(2);

        let result = FileOperationResult::new(OperationStatus::Content, vec![good, bad], 2, Some(1));
        assert!(result.has_errors());
        assert!(result.value.is_none());
        assert_eq!(result.messages().count(), 1);
        assert_eq!(result.records[0].value, Some(2));
    }

    #[test]
    fn dropping_value_keeps_the_line() {
        let mut record = FileRecord::new(3, "x,y".into());
        record.columns = vec!["x".into(), "y".into()];
        record.push_warning("hmm");
        record.value = Some("xy".to_string());

        let bare = record.without_value();
        assert_eq!(bare.line_number, 3);
        assert_eq!(bare.columns.len(), 2);
        assert_eq!(bare.messages.len(), 1);
        assert_eq!(bare.value, None);
    }

    #[test]
    fn warnings_keep_value() {
        let mut record = FileRecord::new(1, "x".into());
        record.push_warning("hmm");

        let result = FileOperationResult::new(OperationStatus::Content, vec![record], 1, Some(1));
        assert!(!result.has_errors());
        assert_eq!(result.value, Some(1));
    }
}
