//! Sans-IO writer state machine.
//!
//! `WriterCore` composes record values into lines and enforces the order in
//! which headers, content and trailers may be written. It produces the lines;
//! frontends are responsible for putting them somewhere.

use std::sync::Arc;

use crate::definition::RecordKind;
use crate::error::{FileError, FileResult, FileValidationRule};
use crate::hierarchy::{HierarchyIndex, NodeId};
use crate::layout::Layout;
use crate::metadata::MetadataProvider;
use crate::record::{FileOperationResult, FileRecord, OperationStatus};

/// Sans-IO writer state machine.
///
/// Each call returns a [`FileOperationResult`] whose records carry the composed
/// lines. The lines should be emitted only when the result's `value` is
/// `Some`; a group with errors is rejected whole and does not advance the line
/// count.
///
/// The line count assumes every accepted line reaches its destination. A
/// frontend that fails to emit a group must call [`WriterCore::abandon`].
pub struct WriterCore<P: MetadataProvider> {
    layout: Arc<Layout<P>>,
    hierarchy: Option<Arc<HierarchyIndex>>,
    line_number: usize,
    written_header: bool,
    written_content: bool,
    written_trailer: bool,
    closed: bool,
}

impl<P: MetadataProvider> WriterCore<P> {
    pub fn new(layout: Arc<Layout<P>>) -> FileResult<WriterCore<P>> {
        let hierarchy = if layout.definition().is_hierarchical() {
            Some(layout.hierarchy()?)
        } else {
            None
        };

        Ok(WriterCore {
            layout,
            hierarchy,
            line_number: 0,
            written_header: false,
            written_content: false,
            written_trailer: false,
            closed: false,
        })
    }

    #[inline(always)]
    pub fn layout(&self) -> &Arc<Layout<P>> {
        &self.layout
    }

    /// Lines accepted so far.
    #[inline(always)]
    pub fn total_lines(&self) -> usize {
        self.line_number
    }

    #[inline(always)]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Closes the writer after its output could not be emitted. The line count
    /// is no longer trustworthy, so every later call fails.
    pub fn abandon(&mut self) {
        if !self.closed {
            tracing::warn!(
                total_lines = self.line_number,
                "writer abandoned, output is incomplete"
            );
        }
        self.closed = true;
    }

    fn check_open(&self) -> FileResult<()> {
        if self.closed {
            return Err(FileError::invalid_state(
                "attempt made to write past the end of file",
            ));
        }
        if self.written_trailer {
            return Err(FileError::invalid_state(
                "attempt made to write past a Trailer row",
            ));
        }
        Ok(())
    }

    fn check_header_written(&self) -> FileResult<()> {
        let rules = &self.layout.definition().file_validation;
        if rules.must_have_header_row && !self.written_header {
            tracing::warn!("content written before the header row");
            return Err(FileError::structural(
                FileValidationRule::MustHaveHeaderRow,
                None,
            ));
        }
        Ok(())
    }

    pub fn header(&mut self, value: &P::Value) -> FileResult<FileOperationResult<P::Value>> {
        self.check_open()?;

        let layout = Arc::clone(&self.layout);
        let header = layout
            .definition()
            .header
            .as_ref()
            .ok_or_else(|| FileError::invalid_state("the format has no header record"))?;

        if self.written_header {
            return Err(FileError::invalid_state("a Header row has already been written"));
        }
        if self.line_number > 0 {
            return Err(FileError::invalid_state("a Header row must be the first line"));
        }

        let result = self.single(OperationStatus::Header, header, value);
        if result.value.is_some() {
            self.written_header = true;
        }
        Ok(result)
    }

    pub fn content(&mut self, value: &P::Value) -> FileResult<FileOperationResult<P::Value>> {
        self.check_open()?;
        self.check_header_written()?;

        let layout = Arc::clone(&self.layout);
        let definition = layout.definition();

        let mut records = Vec::new();
        let root = self.hierarchy.as_ref().map(|index| index.root());
        self.compose(
            value,
            &definition.content.record_type,
            definition.content_identifier(),
            0,
            root,
            &mut records,
        );

        let result = self.commit(OperationStatus::Content, records);
        if result.value.is_some() {
            self.written_content = true;
        }
        Ok(result)
    }

    pub fn trailer(&mut self, value: &P::Value) -> FileResult<FileOperationResult<P::Value>> {
        self.check_open()?;
        self.check_header_written()?;

        let layout = Arc::clone(&self.layout);
        let trailer = layout
            .definition()
            .trailer
            .as_ref()
            .ok_or_else(|| FileError::invalid_state("the format has no trailer record"))?;

        let result = self.single(OperationStatus::Trailer, trailer, value);
        if result.value.is_some() {
            self.written_trailer = true;
        }
        Ok(result)
    }

    /// Checks the whole-file rules against what was written, and closes the writer.
    pub fn finish(&mut self) -> FileResult<FileOperationResult<P::Value>> {
        if self.closed {
            return Err(FileError::invalid_state("end of file has already been written"));
        }
        self.closed = true;

        let rules = self.layout.definition().file_validation;
        let violated = if rules.must_have_rows && self.line_number == 0 {
            Some(FileValidationRule::MustHaveRows)
        } else if rules.must_have_header_row && !self.written_header {
            Some(FileValidationRule::MustHaveHeaderRow)
        } else if rules.must_have_at_least_one_content_row && !self.written_content {
            Some(FileValidationRule::MustHaveAtLeastOneContentRow)
        } else if rules.must_have_trailer_row && !self.written_trailer {
            Some(FileValidationRule::MustHaveTrailerRow)
        } else {
            None
        };

        if let Some(rule) = violated {
            tracing::warn!(%rule, "structural violation");
            return Err(FileError::structural(rule, None));
        }

        tracing::debug!(total_lines = self.line_number, "end of file");
        Ok(FileOperationResult::end_of_file(self.line_number))
    }

    fn single(
        &mut self,
        status: OperationStatus,
        kind: &RecordKind,
        value: &P::Value,
    ) -> FileOperationResult<P::Value> {
        let mut records = Vec::with_capacity(1);
        self.compose(
            value,
            &kind.record_type,
            kind.record_identifier.as_deref(),
            0,
            None,
            &mut records,
        );
        self.commit(status, records)
    }

    /// Accepts the composed records if none has errors.
    fn commit(
        &mut self,
        status: OperationStatus,
        records: Vec<FileRecord<P::Value>>,
    ) -> FileOperationResult<P::Value> {
        let rejected = records.iter().any(FileRecord::has_errors);

        if rejected {
            tracing::warn!(
                %status,
                line = self.line_number + 1,
                records = records.len(),
                "rejected record group with errors"
            );
        } else {
            self.line_number += records.len();
            tracing::debug!(%status, records = records.len(), "wrote record group");
        }

        let total_lines = self.line_number;
        let value = records.first().and_then(|root| root.value.clone());
        FileOperationResult::new(status, records, total_lines, value)
    }

    /// Composes `value` and, in pre-order, every descendant of it.
    fn compose(
        &self,
        value: &P::Value,
        record_type: &str,
        identifier: Option<&str>,
        level: i32,
        node: Option<NodeId>,
        records: &mut Vec<FileRecord<P::Value>>,
    ) {
        let layout = &*self.layout;
        let definition = layout.definition();
        let provider = layout.provider();
        let codec = layout.codec();
        let columns = layout.columns_for(record_type);

        let mut record = FileRecord::new(self.line_number + records.len() + 1, String::new());
        record.record_identifier = identifier.map(str::to_string);
        record.record_type = Some(record_type.to_string());
        record.level = level;
        record.value = Some(value.clone());
        record.columns = columns
            .iter()
            .map(|column| column.clean(definition, &provider.get_column(value, column)))
            .collect();

        let mut rendered = Vec::new();
        record.raw_line = codec.write_columns(definition, columns, &record.columns, identifier, &mut rendered);

        let (columns_before, line_before) = (record.columns.clone(), record.raw_line.clone());
        provider.on_write(value, definition, &mut record);

        if record.raw_line == line_before && record.columns != columns_before {
            rendered.clear();
            record.raw_line =
                codec.write_columns(definition, columns, &record.columns, identifier, &mut rendered);
        }

        record.messages.extend(rendered);
        record.messages.extend(provider.validate(record_type, value));

        let position = records.len();
        records.push(record);

        let (index, node) = match (&self.hierarchy, node) {
            (Some(index), Some(node)) => (index, node),
            _ => return,
        };

        for &child in &index.node(node).children {
            let child_node = index.node(child);
            let descriptor = match &child_node.descriptor {
                Some(d) => d,
                None => continue,
            };

            let children = provider.get_children(value, descriptor);
            if let Some(message) = descriptor.check_cardinality(children.len()) {
                records[position].push_error(message);
            }

            for child_value in children {
                self.compose(
                    child_value,
                    &child_node.record_type,
                    Some(child_node.record_identifier.as_str()),
                    level + 1,
                    Some(child),
                    records,
                );
            }
        }
    }
}
