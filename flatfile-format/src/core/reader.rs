//! Sans-IO reader state machine.
//!
//! `ReaderCore` turns a stream of decoded text lines into record groups. It
//! never touches a file itself: frontends hand it an iterator of lines on each
//! call and it pulls only as many as it needs, keeping at most two lines of
//! lookahead.

use std::collections::VecDeque;
use std::io;
use std::sync::Arc;

use crate::definition::{ColumnCountValidation, RecordKind};
use crate::error::{FileError, FileResult, FileValidationRule};
use crate::hierarchy::HierarchyIndex;
use crate::layout::Layout;
use crate::message::MessageItem;
use crate::metadata::MetadataProvider;
use crate::record::{FileOperationResult, FileRecord, OperationStatus};

use super::linker::HierarchyLinker;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderState {
    NotStarted,
    Reading,
    EndOfFile,
}

#[derive(Debug)]
struct Line {
    number: usize,
    text: String,
    identifier: Option<String>,
}

pub struct ReaderCore<P: MetadataProvider> {
    layout: Arc<Layout<P>>,
    hierarchy: Option<Arc<HierarchyIndex>>,
    state: ReaderState,
    lookahead: VecDeque<Line>,
    exhausted: bool,
    /// Lines pulled from the source, including those still in the lookahead.
    pulled: usize,
    /// Lines handed out in results.
    consumed: usize,
    seen_header: bool,
    seen_content: bool,
    seen_trailer: bool,
}

impl<P: MetadataProvider> ReaderCore<P> {
    pub fn new(layout: Arc<Layout<P>>) -> FileResult<ReaderCore<P>> {
        let hierarchy = if layout.definition().is_hierarchical() {
            Some(layout.hierarchy()?)
        } else {
            None
        };

        Ok(ReaderCore {
            layout,
            hierarchy,
            state: ReaderState::NotStarted,
            lookahead: VecDeque::with_capacity(2),
            exhausted: false,
            pulled: 0,
            consumed: 0,
            seen_header: false,
            seen_content: false,
            seen_trailer: false,
        })
    }

    #[inline(always)]
    pub fn layout(&self) -> &Arc<Layout<P>> {
        &self.layout
    }

    #[inline(always)]
    pub fn state(&self) -> ReaderState {
        self.state
    }

    #[inline(always)]
    pub fn is_end_of_file(&self) -> bool {
        self.state == ReaderState::EndOfFile
    }

    /// Lines handed out so far.
    #[inline(always)]
    pub fn total_lines(&self) -> usize {
        self.consumed
    }

    /// Reads the next header, trailer or content group, pulling lines from `lines`
    /// as needed. Once the source is drained an `EndOfFile` result is returned;
    /// reading after that is an error.
    pub fn read_next_group<I>(&mut self, lines: &mut I) -> FileResult<FileOperationResult<P::Value>>
    where
        I: Iterator<Item = io::Result<String>>,
    {
        if self.state == ReaderState::EndOfFile {
            return Err(FileError::invalid_state("read past end of file"));
        }
        self.state = ReaderState::Reading;

        let current = match self.advance(lines)? {
            Some(line) => line,
            None => return self.finish(),
        };

        let layout = Arc::clone(&self.layout);
        let definition = layout.definition();

        if current.number == 1 {
            if let Some(header) = &definition.header {
                if header.matches(current.identifier.as_deref()) {
                    self.seen_header = true;
                    return Ok(self.single(OperationStatus::Header, header, current));
                }
                if definition.file_validation.must_have_header_row {
                    let record = self.unplaced(current);
                    return Err(self.violation(FileValidationRule::MustHaveHeaderRow, Some(record)));
                }
            }
        }

        if self.peek(lines, 0)?.is_none() {
            if let Some(trailer) = &definition.trailer {
                if trailer.matches(current.identifier.as_deref()) {
                    self.seen_trailer = true;
                    return Ok(self.single(OperationStatus::Trailer, trailer, current));
                }
                if definition.file_validation.must_have_trailer_row {
                    let record = self.unplaced(current);
                    return Err(self.violation(FileValidationRule::MustHaveTrailerRow, Some(record)));
                }
            }
        }

        // Only a root line opens a hierarchical group.
        let group_index = self.hierarchy.as_ref().and_then(|index| {
            let root = &index.node(index.root()).record_identifier;
            if current.identifier.as_deref() == Some(root.as_str()) {
                Some(Arc::clone(index))
            } else {
                None
            }
        });

        // Orphans do not count as content.
        if self.hierarchy.is_none() || group_index.is_some() {
            self.seen_content = true;
        }

        match group_index {
            Some(index) => self.group(lines, &index, current),
            None => Ok(self.standalone(current)),
        }
    }

    fn finish(&mut self) -> FileResult<FileOperationResult<P::Value>> {
        self.state = ReaderState::EndOfFile;
        let rules = self.layout.definition().file_validation;

        if rules.must_have_rows && self.consumed == 0 {
            return Err(self.violation(FileValidationRule::MustHaveRows, None));
        }
        if rules.must_have_header_row && !self.seen_header {
            return Err(self.violation(FileValidationRule::MustHaveHeaderRow, None));
        }
        if rules.must_have_at_least_one_content_row && !self.seen_content {
            return Err(self.violation(FileValidationRule::MustHaveAtLeastOneContentRow, None));
        }
        if rules.must_have_trailer_row && !self.seen_trailer {
            return Err(self.violation(FileValidationRule::MustHaveTrailerRow, None));
        }

        tracing::debug!(total_lines = self.consumed, "end of file");
        Ok(FileOperationResult::end_of_file(self.consumed))
    }

    /// A structural violation ends the file.
    fn violation(
        &mut self,
        rule: FileValidationRule,
        record: Option<FileRecord<P::Value>>,
    ) -> FileError {
        self.state = ReaderState::EndOfFile;
        tracing::warn!(
            %rule,
            line = record.as_ref().map(|r| r.line_number),
            "structural violation"
        );
        FileError::structural(rule, record.map(FileRecord::without_value))
    }

    // Lookahead

    fn fill<I>(&mut self, lines: &mut I, want: usize) -> FileResult<()>
    where
        I: Iterator<Item = io::Result<String>>,
    {
        while self.lookahead.len() < want && !self.exhausted {
            match lines.next() {
                Some(text) => {
                    let mut text = text?;
                    if text.ends_with('\r') {
                        text.pop();
                    }
                    self.pulled += 1;
                    let identifier = if self.hierarchy.is_some() {
                        self.layout.codec().read_identifier(&text)
                    } else {
                        None
                    };
                    self.lookahead.push_back(Line {
                        number: self.pulled,
                        text,
                        identifier,
                    });
                }
                None => self.exhausted = true,
            }
        }
        Ok(())
    }

    fn advance<I>(&mut self, lines: &mut I) -> FileResult<Option<Line>>
    where
        I: Iterator<Item = io::Result<String>>,
    {
        self.fill(lines, 1)?;
        let line = self.lookahead.pop_front();
        if let Some(line) = &line {
            self.consumed = line.number;
        }
        Ok(line)
    }

    /// The line `offset` places after the current one.
    fn peek<I>(&mut self, lines: &mut I, offset: usize) -> FileResult<Option<&Line>>
    where
        I: Iterator<Item = io::Result<String>>,
    {
        self.fill(lines, offset + 1)?;
        Ok(self.lookahead.get(offset))
    }

    /// Whether the current group is complete, judged by the line after it.
    fn group_ends<I>(&mut self, lines: &mut I) -> FileResult<bool>
    where
        I: Iterator<Item = io::Result<String>>,
    {
        let identifier = match self.peek(lines, 0)? {
            None => return Ok(true),
            Some(next) => next.identifier.clone(),
        };

        let definition = self.layout.definition();
        if let Some(identifier) = identifier.as_deref() {
            let boundary = [
                definition.content_identifier(),
                definition.header_identifier(),
                definition.trailer_identifier(),
            ];
            if boundary.contains(&Some(identifier)) {
                return Ok(true);
            }
        }

        // A trailer without an identifier is whatever line comes last.
        let positional_trailer = matches!(&definition.trailer, Some(t) if t.record_identifier.is_none());
        if positional_trailer && self.peek(lines, 1)?.is_none() {
            return Ok(true);
        }

        Ok(false)
    }

    // Materialization

    fn record_for(line: Line) -> FileRecord<P::Value> {
        let mut record = FileRecord::new(line.number, line.text);
        record.record_identifier = line.identifier;
        record
    }

    /// A record for a line that could not be given a type, tokenized as best we can.
    fn unplaced(&self, line: Line) -> FileRecord<P::Value> {
        let mut record = Self::record_for(line);
        let tokenized = self.layout.codec().read_columns(&record.raw_line, &[]);
        record.columns = tokenized.columns;
        record
    }

    /// Splits the line into columns and builds its value, keeping a copy on the
    /// record. The value is `None` when the record ends up with errors.
    fn materialize(&self, record_type: &str, record: &mut FileRecord<P::Value>) -> Option<P::Value> {
        let layout = &*self.layout;
        let definition = layout.definition();
        let provider = layout.provider();
        let columns = layout.columns_for(record_type);

        let tokenized = layout.codec().read_columns(&record.raw_line, columns);
        tracing::trace!(
            line = record.line_number,
            record_type,
            columns = tokenized.columns.len(),
            "tokenized line"
        );

        let aborted = tokenized.has_errors();
        record.record_type = Some(record_type.to_string());
        record.columns = tokenized.columns;
        record.messages.extend(tokenized.messages);

        if aborted {
            return None;
        }

        if record.columns.len() != columns.len() {
            let text = format!(
                "Expected {} columns but found {}",
                columns.len(),
                record.columns.len()
            );
            match definition.column_count_validation {
                ColumnCountValidation::Ignore => {}
                ColumnCountValidation::Warning => record.push_warning(text),
                ColumnCountValidation::Error => record.push_error(text),
            }
        }

        let mut value = provider.create_instance(record_type);
        let mut messages = Vec::new();

        for (column, text) in columns.iter().zip(record.columns.iter()) {
            let cleaned = column.clean(definition, text);
            if let Err(e) = provider.set_column(&mut value, column, &cleaned) {
                messages.push(MessageItem::error(e).with_property(column.name.as_str()));
            }
        }

        record.messages.extend(messages);
        record.messages.extend(provider.validate(record_type, &value));
        provider.on_read(&mut value, definition, record);

        if record.has_errors() {
            return None;
        }
        record.value = Some(value.clone());
        Some(value)
    }

    /// A header or trailer line.
    fn single(
        &self,
        status: OperationStatus,
        kind: &RecordKind,
        line: Line,
    ) -> FileOperationResult<P::Value> {
        let mut record = Self::record_for(line);
        let value = self.materialize(&kind.record_type, &mut record);

        tracing::debug!(%status, line = record.line_number, "read record");
        FileOperationResult::new(status, vec![record], self.consumed, value)
    }

    /// A content line read on its own: any line of a flat format, or a line of
    /// a hierarchical format that does not start a group.
    fn standalone(&self, line: Line) -> FileOperationResult<P::Value> {
        let definition = self.layout.definition();

        let index = match &self.hierarchy {
            None => {
                let mut record = Self::record_for(line);
                let value = self.materialize(&definition.content.record_type, &mut record);
                tracing::debug!(line = record.line_number, "read content record");
                return FileOperationResult::new(
                    OperationStatus::Content,
                    vec![record],
                    self.consumed,
                    value,
                );
            }
            Some(index) => index,
        };

        let identifier = line.identifier.clone();
        let node = identifier.as_deref().and_then(|id| index.lookup(id));

        let mut record = match node {
            Some(node) => {
                let mut record = Self::record_for(line);
                self.materialize(&index.node(node).record_type, &mut record);
                record
            }
            None => self.unplaced(line),
        };

        let reason = match identifier.as_deref() {
            None => "Line has no record identifier".to_string(),
            Some(id) if Some(id) == definition.header_identifier() => {
                format!("Header record `{}` may only appear on the first line", id)
            }
            Some(id) if Some(id) == definition.trailer_identifier() => {
                format!("Trailer record `{}` may only appear on the last line", id)
            }
            Some(id) if node.is_some() => format!(
                "Record `{}` is not valid within current traversed hierarchy",
                id
            ),
            Some(id) => format!("Record identifier `{}` is not recognised", id),
        };
        record.orphan(reason);

        tracing::debug!(line = record.line_number, "orphaned record");
        FileOperationResult::new(OperationStatus::Content, vec![record], self.consumed, None)
    }

    /// Reads a root line and all of its descendants.
    fn group<I>(
        &mut self,
        lines: &mut I,
        index: &HierarchyIndex,
        first: Line,
    ) -> FileResult<FileOperationResult<P::Value>>
    where
        I: Iterator<Item = io::Result<String>>,
    {
        let layout = Arc::clone(&self.layout);
        let provider = layout.provider();
        let root = index.root();

        let mut records = Vec::new();
        let mut record = Self::record_for(first);
        let value = self.materialize(&index.node(root).record_type, &mut record);
        records.push(record);

        let mut linker = HierarchyLinker::new(root, 0, value);

        while !self.group_ends(lines)? {
            let line = match self.advance(lines)? {
                Some(line) => line,
                None => break,
            };

            let node = line.identifier.as_deref().and_then(|id| index.lookup(id));
            let node = match node {
                Some(node) => node,
                None => {
                    let mut record = self.unplaced(line);
                    let reason = match &record.record_identifier {
                        Some(id) => format!("Record identifier `{}` is not recognised", id),
                        None => "Line has no record identifier".to_string(),
                    };
                    record.orphan(reason);
                    records.push(record);
                    continue;
                }
            };

            let hierarchy_node = index.node(node);
            let mut record = Self::record_for(line);

            let parent = match linker.place(index, node) {
                Ok(parent) => parent,
                Err(misplaced) => {
                    self.materialize(&hierarchy_node.record_type, &mut record);
                    record.orphan(misplaced.message(&hierarchy_node.record_identifier));
                    records.push(record);
                    continue;
                }
            };

            if let Some(message) = linker.check_upper_bound(index, parent, node) {
                record.push_error(message);
            }
            record.level = hierarchy_node.level as i32;

            let value = self.materialize(&hierarchy_node.record_type, &mut record);
            let position = records.len();
            records.push(record);
            linker.attach(index, provider, &mut records, parent, node, position, value);
        }

        let value = linker.finish(index, provider, &mut records);

        tracing::debug!(
            line = records[0].line_number,
            records = records.len(),
            "read content group"
        );
        Ok(FileOperationResult::new(
            OperationStatus::Content,
            records,
            self.consumed,
            value,
        ))
    }
}
