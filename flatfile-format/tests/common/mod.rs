//! A hand-written provider over a small order-entry vocabulary.
//!
//! Order `O`
//! ├── Line `L` (collection)
//! │   └── Serial `S` (collection)
//! └── Note `N` (single)
//!     └── Continuation `C` (collection)
//!
//! with a `Header` (`H`) and a `Trailer` (`T`).

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use flatfile_format::{
    ColumnDescriptor, ColumnKind, FileOperationResult, FileReader, FormatDefinition,
    HierarchyDescriptor, Layout, MessageItem, MetadataProvider, RecordKind,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Header { batch: String },
    Order(Order),
    Line { sku: String, qty: u32, serials: Vec<Value> },
    Serial { serial: String },
    Note { text: String, continued: Vec<Value> },
    Continuation { text: String },
    Trailer { count: u32 },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Order {
    pub id: String,
    pub customer: String,
    pub lines: Vec<Value>,
    pub note: Option<Box<Value>>,
}

pub fn order(id: &str, customer: &str) -> Order {
    Order {
        id: id.to_string(),
        customer: customer.to_string(),
        ..Default::default()
    }
}

pub fn line(sku: &str, qty: u32) -> Value {
    Value::Line {
        sku: sku.to_string(),
        qty,
        serials: Vec::new(),
    }
}

pub fn note(text: &str) -> Value {
    Value::Note {
        text: text.to_string(),
        continued: Vec::new(),
    }
}

impl Order {
    pub fn with_line(mut self, line: Value) -> Self {
        self.lines.push(line);
        self
    }

    pub fn with_note(mut self, note: Value) -> Self {
        self.note = Some(Box::new(note));
        self
    }

    pub fn into_value(self) -> Value {
        Value::Order(self)
    }
}

pub struct Orders {
    columns: HashMap<&'static str, Vec<ColumnDescriptor>>,
    children: HashMap<&'static str, Vec<HierarchyDescriptor>>,
}

impl Orders {
    pub fn new() -> Orders {
        Orders::with_lines(HierarchyDescriptor::collection("L", "Line"))
    }

    /// Lets tests tune the cardinality of the order's lines.
    pub fn with_lines(lines: HierarchyDescriptor) -> Orders {
        let kind = || ColumnDescriptor::new("kind");

        let columns = vec![
            ("Header", vec![kind(), ColumnDescriptor::new("batch")]),
            (
                "Order",
                vec![kind(), ColumnDescriptor::new("id"), ColumnDescriptor::new("customer")],
            ),
            (
                "Line",
                vec![
                    kind(),
                    ColumnDescriptor::new("sku"),
                    ColumnDescriptor::new("qty").with_kind(ColumnKind::Integer),
                ],
            ),
            ("Serial", vec![kind(), ColumnDescriptor::new("serial")]),
            ("Note", vec![kind(), ColumnDescriptor::new("text")]),
            ("Continuation", vec![kind(), ColumnDescriptor::new("text")]),
            (
                "Trailer",
                vec![kind(), ColumnDescriptor::new("count").with_kind(ColumnKind::Integer)],
            ),
        ];

        let children = vec![
            ("Order", vec![lines, HierarchyDescriptor::single("N", "Note")]),
            ("Line", vec![HierarchyDescriptor::collection("S", "Serial")]),
            ("Note", vec![HierarchyDescriptor::collection("C", "Continuation")]),
        ];

        Orders {
            columns: columns.into_iter().collect(),
            children: children.into_iter().collect(),
        }
    }
}

impl MetadataProvider for Orders {
    type Value = Value;

    fn columns_for(&self, record_type: &str) -> Option<&[ColumnDescriptor]> {
        self.columns.get(record_type).map(Vec::as_slice)
    }

    fn children_for(&self, record_type: &str) -> &[HierarchyDescriptor] {
        self.children
            .get(record_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn create_instance(&self, record_type: &str) -> Value {
        match record_type {
            "Header" => Value::Header { batch: String::new() },
            "Order" => Value::Order(Order::default()),
            "Line" => line("", 0),
            "Serial" => Value::Serial { serial: String::new() },
            "Note" => note(""),
            "Continuation" => Value::Continuation { text: String::new() },
            _ => Value::Trailer { count: 0 },
        }
    }

    fn get_column(&self, value: &Value, column: &ColumnDescriptor) -> String {
        match (value, column.name.as_str()) {
            (Value::Header { batch }, "batch") => batch.clone(),
            (Value::Order(o), "id") => o.id.clone(),
            (Value::Order(o), "customer") => o.customer.clone(),
            (Value::Line { sku, .. }, "sku") => sku.clone(),
            (Value::Line { qty, .. }, "qty") => qty.to_string(),
            (Value::Serial { serial }, "serial") => serial.clone(),
            (Value::Note { text, .. }, "text") => text.clone(),
            (Value::Continuation { text }, "text") => text.clone(),
            (Value::Trailer { count }, "count") => count.to_string(),
            _ => String::new(),
        }
    }

    fn set_column(&self, value: &mut Value, column: &ColumnDescriptor, text: &str) -> Result<(), String> {
        let number = || {
            text.trim()
                .parse::<u32>()
                .map_err(|_| format!("`{}` is not a whole number", text))
        };

        match (value, column.name.as_str()) {
            (Value::Header { batch }, "batch") => *batch = text.to_string(),
            (Value::Order(o), "id") => o.id = text.to_string(),
            (Value::Order(o), "customer") => o.customer = text.to_string(),
            (Value::Line { sku, .. }, "sku") => *sku = text.to_string(),
            (Value::Line { qty, .. }, "qty") => *qty = number()?,
            (Value::Serial { serial }, "serial") => *serial = text.to_string(),
            (Value::Note { text: t, .. }, "text") => *t = text.to_string(),
            (Value::Continuation { text: t }, "text") => *t = text.to_string(),
            (Value::Trailer { count }, "count") => *count = number()?,
            _ => {}
        }
        Ok(())
    }

    fn validate(&self, _record_type: &str, value: &Value) -> Vec<MessageItem> {
        match value {
            Value::Order(o) if o.id.is_empty() => {
                vec![MessageItem::error("Order id is required").with_property("id")]
            }
            _ => Vec::new(),
        }
    }

    fn get_children<'v>(&self, value: &'v Value, descriptor: &HierarchyDescriptor) -> Vec<&'v Value> {
        match (value, descriptor.record_identifier.as_str()) {
            (Value::Order(o), "L") => o.lines.iter().collect(),
            (Value::Order(o), "N") => o.note.iter().map(|n| &**n).collect(),
            (Value::Line { serials, .. }, "S") => serials.iter().collect(),
            (Value::Note { continued, .. }, "C") => continued.iter().collect(),
            _ => Vec::new(),
        }
    }

    fn set_children(&self, value: &mut Value, descriptor: &HierarchyDescriptor, children: Vec<Value>) {
        match (value, descriptor.record_identifier.as_str()) {
            (Value::Order(o), "L") => o.lines = children,
            (Value::Order(o), "N") => o.note = children.into_iter().next().map(Box::new),
            (Value::Line { serials, .. }, "S") => *serials = children,
            (Value::Note { continued, .. }, "C") => *continued = children,
            _ => {}
        }
    }

    fn on_read(&self, value: &mut Value, _format: &FormatDefinition, record: &mut flatfile_format::FileRecord<Value>) {
        if let Value::Line { qty: 0, .. } = value {
            record.push_warning("Line has a zero quantity");
        }
    }

    fn on_write(&self, value: &Value, _format: &FormatDefinition, record: &mut flatfile_format::FileRecord<Value>) {
        match value {
            // Notes are shouted; the changed columns are rendered again.
            Value::Note { .. } => {
                for column in record.columns.iter_mut().skip(1) {
                    *column = column.to_uppercase();
                }
            }
            // Trailers bypass rendering entirely.
            Value::Trailer { count } => record.raw_line = format!("T,{:05}", count),
            _ => {}
        }
    }
}

/// Orders with a header and a trailer, comma delimited.
pub fn format() -> FormatDefinition {
    FormatDefinition::delimited("Order")
        .with_content_identifier("O")
        .with_header(RecordKind::identified("Header", "H"))
        .with_trailer(RecordKind::identified("Trailer", "T"))
}

pub fn layout(format: FormatDefinition, provider: Orders) -> Arc<Layout<Orders>> {
    Arc::new(Layout::new(format, provider).unwrap())
}

/// Every result up to and including end of file.
pub fn read_all<P: MetadataProvider>(
    layout: Arc<Layout<P>>,
    text: &str,
) -> Vec<FileOperationResult<P::Value>> {
    let mut reader = FileReader::new(text.as_bytes(), layout).unwrap();
    let mut results = Vec::new();
    loop {
        let result = reader.read_next_group().unwrap();
        let done = result.is_end_of_file();
        results.push(result);
        if done {
            return results;
        }
    }
}

/// Error texts of a result, in line order.
pub fn errors<V>(result: &FileOperationResult<V>) -> Vec<String> {
    result
        .messages()
        .filter(|(_, m)| m.is_error())
        .map(|(_, m)| m.text.clone())
        .collect()
}
