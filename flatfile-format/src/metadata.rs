//! The record metadata contract.
//!
//! The codec never inspects record values itself. Everything it knows about a
//! record type (its columns, its children, how to build and validate one) comes
//! through a [`MetadataProvider`]. Implement it by hand, generate it, or use the
//! JSON-driven [`Schema`](crate::schema::Schema); the codec cannot tell the difference.

use crate::column::{ColumnDescriptor, HierarchyDescriptor};
use crate::definition::FormatDefinition;
use crate::message::MessageItem;
use crate::record::FileRecord;

pub trait MetadataProvider: Send + Sync {
    /// The materialized record value. Header, content, trailer and child records
    /// all share it; an enum or a dynamic map is typical. Each record keeps a
    /// copy of its own value, hence `Clone`.
    type Value: Clone;

    /// Ordered columns of `record_type`, or `None` if the type is unknown.
    fn columns_for(&self, record_type: &str) -> Option<&[ColumnDescriptor]>;

    /// Ordered child relationships declared by `record_type`.
    fn children_for(&self, record_type: &str) -> &[HierarchyDescriptor] {
        let _ = record_type;
        &[]
    }

    fn create_instance(&self, record_type: &str) -> Self::Value;

    fn get_column(&self, value: &Self::Value, column: &ColumnDescriptor) -> String;

    /// Stores the cleaned text of `column` on `value`. An `Err` is attached to
    /// the record as an error message naming the column.
    fn set_column(
        &self,
        value: &mut Self::Value,
        column: &ColumnDescriptor,
        text: &str,
    ) -> Result<(), String>;

    fn validate(&self, record_type: &str, value: &Self::Value) -> Vec<MessageItem> {
        let _ = (record_type, value);
        Vec::new()
    }

    /// Children of `value` for one relationship, in element order. A singular
    /// child is returned as a zero- or one-element list.
    fn get_children<'v>(
        &self,
        value: &'v Self::Value,
        descriptor: &HierarchyDescriptor,
    ) -> Vec<&'v Self::Value> {
        let _ = (value, descriptor);
        Vec::new()
    }

    fn set_children(
        &self,
        value: &mut Self::Value,
        descriptor: &HierarchyDescriptor,
        children: Vec<Self::Value>,
    ) {
        let _ = (value, descriptor, children);
    }

    /// Called after a line has been materialized and validated. May add messages.
    fn on_read(
        &self,
        value: &mut Self::Value,
        format: &FormatDefinition,
        record: &mut FileRecord<Self::Value>,
    ) {
        let _ = (value, format, record);
    }

    /// Called after a record's columns have been rendered, before it is emitted.
    ///
    /// Replacing `record.columns` causes the line to be rendered again; setting
    /// `record.raw_line` directly bypasses rendering altogether.
    fn on_write(
        &self,
        value: &Self::Value,
        format: &FormatDefinition,
        record: &mut FileRecord<Self::Value>,
    ) {
        let _ = (value, format, record);
    }
}
