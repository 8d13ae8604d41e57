//! Splitting raw lines into columns, and composing lines from columns.

mod delimited;
mod fixed;

pub use delimited::DelimitedCodec;
pub use fixed::FixedWidthCodec;

use crate::column::ColumnDescriptor;
use crate::definition::{FormatDefinition, LineFormat};
use crate::message::MessageItem;

/// Column strings split out of one line, with any problems found on the way.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tokenized {
    pub columns: Vec<String>,
    pub messages: Vec<MessageItem>,
}

impl Tokenized {
    #[inline(always)]
    pub fn has_errors(&self) -> bool {
        self.messages.iter().any(MessageItem::is_error)
    }
}

pub trait LineCodec: Send + Sync {
    /// The record identifier carried by `raw_line`, if any.
    fn read_identifier(&self, raw_line: &str) -> Option<String>;

    /// Splits `raw_line` into column strings. `columns` drives the split for
    /// formats that need it; delimited formats ignore it.
    fn read_columns(&self, raw_line: &str, columns: &[ColumnDescriptor]) -> Tokenized;

    /// Composes a line from already cleaned `values`, one per descriptor. When
    /// `identifier` is given it is written into the line's identifier slot.
    fn write_columns(
        &self,
        format: &FormatDefinition,
        columns: &[ColumnDescriptor],
        values: &[String],
        identifier: Option<&str>,
        messages: &mut Vec<MessageItem>,
    ) -> String;
}

impl LineFormat {
    /// The codec implementing this line format.
    pub fn codec(&self) -> Box<dyn LineCodec> {
        match self {
            LineFormat::Delimited(options) => Box::new(DelimitedCodec::new(options.clone())),
            LineFormat::FixedWidth(options) => Box::new(FixedWidthCodec::new(options.clone())),
        }
    }
}
