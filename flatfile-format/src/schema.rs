//! A [`MetadataProvider`] driven by data instead of code.
//!
//! Record types, their columns and their children are declared in a
//! [`Schema`], usually loaded from a JSON [`LayoutFile`]. Values are
//! [`DynamicRecord`]s holding column text by column name.

use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::column::{ColumnDescriptor, ColumnKind, HierarchyDescriptor};
use crate::definition::FormatDefinition;
use crate::error::ConfigError;
use crate::layout::Layout;
use crate::message::MessageItem;
use crate::metadata::MetadataProvider;

/// A record value whose shape is only known at runtime.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynamicRecord {
    pub record_type: String,
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
    /// Child records keyed by their record identifier.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub children: BTreeMap<String, Vec<DynamicRecord>>,
}

impl DynamicRecord {
    pub fn new<S: Into<String>>(record_type: S) -> DynamicRecord {
        DynamicRecord {
            record_type: record_type.into(),
            ..Default::default()
        }
    }

    pub fn with_field<K: Into<String>, V: Into<String>>(mut self, name: K, value: V) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn with_child<S: Into<String>>(mut self, identifier: S, child: DynamicRecord) -> Self {
        self.children.entry(identifier.into()).or_default().push(child);
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn children(&self, identifier: &str) -> &[DynamicRecord] {
        self.children
            .get(identifier)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSchema {
    pub columns: Vec<ColumnDescriptor>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<HierarchyDescriptor>,
}

impl RecordSchema {
    pub fn new(columns: Vec<ColumnDescriptor>) -> RecordSchema {
        RecordSchema {
            columns,
            children: Vec::new(),
        }
    }

    pub fn with_child(mut self, child: HierarchyDescriptor) -> Self {
        self.children.push(child);
        self
    }
}

/// Record types by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schema {
    records: BTreeMap<String, RecordSchema>,
}

impl Schema {
    pub fn new() -> Schema {
        Schema::default()
    }

    pub fn with_record<S: Into<String>>(mut self, record_type: S, record: RecordSchema) -> Self {
        self.records.insert(record_type.into(), record);
        self
    }

    pub fn record(&self, record_type: &str) -> Option<&RecordSchema> {
        self.records.get(record_type)
    }

    pub fn record_types(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }
}

fn is_integer(text: &str) -> bool {
    let digits = text.strip_prefix(&['+', '-'][..]).unwrap_or(text);
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

fn is_decimal(text: &str) -> bool {
    let unsigned = text.strip_prefix(&['+', '-'][..]).unwrap_or(text);
    let (whole, fraction) = match unsigned.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (unsigned, ""),
    };

    !(whole.is_empty() && fraction.is_empty())
        && whole.chars().all(|c| c.is_ascii_digit())
        && fraction.chars().all(|c| c.is_ascii_digit())
}

fn is_boolean(text: &str) -> bool {
    matches!(
        text.to_ascii_lowercase().as_str(),
        "true" | "false" | "1" | "0" | "y" | "n" | "yes" | "no"
    )
}

impl MetadataProvider for Schema {
    type Value = DynamicRecord;

    fn columns_for(&self, record_type: &str) -> Option<&[ColumnDescriptor]> {
        self.records.get(record_type).map(|r| r.columns.as_slice())
    }

    fn children_for(&self, record_type: &str) -> &[HierarchyDescriptor] {
        self.records
            .get(record_type)
            .map(|r| r.children.as_slice())
            .unwrap_or(&[])
    }

    fn create_instance(&self, record_type: &str) -> DynamicRecord {
        DynamicRecord::new(record_type)
    }

    fn get_column(&self, value: &DynamicRecord, column: &ColumnDescriptor) -> String {
        value.get(&column.name).unwrap_or_default().to_string()
    }

    fn set_column(
        &self,
        value: &mut DynamicRecord,
        column: &ColumnDescriptor,
        text: &str,
    ) -> Result<(), String> {
        let trimmed = text.trim();

        if !trimmed.is_empty() {
            let valid = match column.kind {
                ColumnKind::Integer => is_integer(trimmed),
                ColumnKind::Number => is_decimal(trimmed),
                ColumnKind::Boolean => is_boolean(trimmed),
                ColumnKind::Text | ColumnKind::Date => true,
            };

            if !valid {
                return Err(format!(
                    "Value `{}` is not a valid {:?} for column `{}`",
                    trimmed, column.kind, column.name
                ));
            }
        }

        value.fields.insert(column.name.clone(), text.to_string());
        Ok(())
    }

    fn validate(&self, record_type: &str, value: &DynamicRecord) -> Vec<MessageItem> {
        self.columns_for(record_type)
            .unwrap_or(&[])
            .iter()
            .filter(|c| c.required)
            .filter(|c| value.get(&c.name).map_or(true, |v| v.trim().is_empty()))
            .map(|c| {
                MessageItem::error(format!("Column `{}` is required", c.name))
                    .with_property(c.name.as_str())
            })
            .collect()
    }

    fn get_children<'v>(
        &self,
        value: &'v DynamicRecord,
        descriptor: &HierarchyDescriptor,
    ) -> Vec<&'v DynamicRecord> {
        value.children(&descriptor.record_identifier).iter().collect()
    }

    fn set_children(
        &self,
        value: &mut DynamicRecord,
        descriptor: &HierarchyDescriptor,
        children: Vec<DynamicRecord>,
    ) {
        if !children.is_empty() {
            value
                .children
                .insert(descriptor.record_identifier.clone(), children);
        }
    }
}

/// A format definition bundled with the schema of its record types, as stored
/// in a JSON layout file:
///
/// ```json
/// { "format": { "content": { "record_type": "Order" } },
///   "records": { "Order": { "columns": [{ "name": "id" }] } } }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutFile {
    pub format: FormatDefinition,
    pub records: Schema,
}

impl LayoutFile {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<LayoutFile, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let layout: LayoutFile = text.parse()?;
        tracing::debug!(path = %path.as_ref().display(), "loaded layout file");
        Ok(layout)
    }

    pub fn into_layout(self) -> Result<Layout<Schema>, ConfigError> {
        Layout::new(self.format, self.records)
    }
}

impl FromStr for LayoutFile {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<LayoutFile, ConfigError> {
        Ok(serde_json::from_str(s)?)
    }
}
