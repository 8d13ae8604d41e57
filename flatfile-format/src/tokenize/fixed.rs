use super::{LineCodec, Tokenized};
use crate::column::ColumnDescriptor;
use crate::definition::{ColumnWidthOverflow, FixedWidthOptions, FormatDefinition};
use crate::message::MessageItem;

/// Fixed-width lines. Widths are counted in characters, not bytes.
///
/// Columns are padded on write and the trailing pad is stripped on read.
#[derive(Debug, Clone)]
pub struct FixedWidthCodec {
    options: FixedWidthOptions,
}

impl FixedWidthCodec {
    pub fn new(options: FixedWidthOptions) -> FixedWidthCodec {
        FixedWidthCodec { options }
    }

    /// Writes `identifier` over `[identifier_position, identifier_position + identifier_length)`,
    /// extending the line with padding if it is too short.
    fn overwrite_identifier(&self, line: String, identifier: &str) -> String {
        let start = self.options.identifier_position;
        let end = start + self.options.identifier_length;
        let mut chars: Vec<char> = line.chars().collect();

        if chars.len() < end {
            chars.resize(end, self.options.pad);
        }

        let mut id = identifier.chars();
        for slot in &mut chars[start..end] {
            *slot = id.next().unwrap_or(self.options.pad);
        }

        chars.into_iter().collect()
    }
}

impl LineCodec for FixedWidthCodec {
    fn read_identifier(&self, raw_line: &str) -> Option<String> {
        let identifier: String = raw_line
            .chars()
            .skip(self.options.identifier_position)
            .take(self.options.identifier_length)
            .collect();
        let identifier = identifier.trim_end_matches(self.options.pad);

        if identifier.is_empty() {
            None
        } else {
            Some(identifier.to_string())
        }
    }

    fn read_columns(&self, raw_line: &str, columns: &[ColumnDescriptor]) -> Tokenized {
        let chars: Vec<char> = raw_line.chars().collect();
        let mut out = Vec::with_capacity(columns.len() + 1);
        let mut pos = 0;

        for column in columns {
            let width = column.width.unwrap_or(0);
            let end = (pos + width).min(chars.len());
            if pos >= end {
                out.push(String::new());
            } else {
                let pad = column.resolve_pad(self.options.pad);
                let text: String = chars[pos..end].iter().collect();
                out.push(text.trim_end_matches(pad).to_string());
            }
            pos = end;
        }

        // Whatever is left over becomes one extra column for column-count validation to flag.
        if pos < chars.len() {
            out.push(chars[pos..].iter().collect());
        }

        Tokenized {
            columns: out,
            messages: Vec::new(),
        }
    }

    fn write_columns(
        &self,
        format: &FormatDefinition,
        columns: &[ColumnDescriptor],
        values: &[String],
        identifier: Option<&str>,
        messages: &mut Vec<MessageItem>,
    ) -> String {
        let mut line = String::new();

        for (column, value) in columns.iter().zip(values.iter()) {
            let width = column.width.unwrap_or(0);
            let len = value.chars().count();

            if len > width {
                let text = format!(
                    "Value of length {} exceeds the width {} of column `{}`",
                    len, width, column.name
                );
                match column.resolve_width_overflow(format) {
                    ColumnWidthOverflow::Truncate => messages.push(
                        MessageItem::warning(format!("{}; it was truncated", text))
                            .with_property(column.name.as_str()),
                    ),
                    ColumnWidthOverflow::Error => {
                        messages.push(MessageItem::error(text).with_property(column.name.as_str()))
                    }
                }
                line.extend(value.chars().take(width));
            } else {
                line.push_str(value);
                let pad = column.resolve_pad(self.options.pad);
                line.extend(std::iter::repeat(pad).take(width - len));
            }
        }

        match identifier {
            Some(identifier) => self.overwrite_identifier(line, identifier),
            None => line,
        }
    }
}
