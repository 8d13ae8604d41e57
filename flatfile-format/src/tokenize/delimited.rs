use super::{LineCodec, Tokenized};
use crate::column::ColumnDescriptor;
use crate::definition::{DelimitedOptions, FormatDefinition, TextQualifierHandling};
use crate::message::MessageItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QualifierState {
    Unqualified,
    Qualified,
}

/// What to do with a qualifier character that broke the rules.
enum Violation {
    Abort,
    Keep,
    Drop,
}

/// Delimited lines with an optional text qualifier.
#[derive(Debug, Clone)]
pub struct DelimitedCodec {
    options: DelimitedOptions,
}

impl DelimitedCodec {
    pub fn new(options: DelimitedOptions) -> DelimitedCodec {
        DelimitedCodec { options }
    }

    fn violation(&self, text: String, messages: &mut Vec<MessageItem>) -> Violation {
        match self.options.qualifier_handling {
            TextQualifierHandling::Strict => {
                messages.push(MessageItem::error(text));
                Violation::Abort
            }
            TextQualifierHandling::LooseAllow => {
                messages.push(MessageItem::warning(text));
                Violation::Keep
            }
            TextQualifierHandling::LooseSkip => {
                messages.push(MessageItem::warning(text));
                Violation::Drop
            }
        }
    }

    /// Single pass over the line, tracking whether we are inside qualified text.
    pub fn split(&self, raw_line: &str) -> Tokenized {
        let delimiter = self.options.delimiter;
        let qualifier = match self.options.qualifier {
            Some(q) => q,
            None => {
                return Tokenized {
                    columns: raw_line.split(delimiter).map(str::to_string).collect(),
                    messages: Vec::new(),
                }
            }
        };

        let chars: Vec<char> = raw_line.chars().collect();
        let mut columns = Vec::new();
        let mut messages = Vec::new();
        let mut column = String::new();
        let mut column_started = false;
        let mut state = QualifierState::Unqualified;
        let mut i = 0;

        while i < chars.len() {
            let c = chars[i];

            match state {
                QualifierState::Qualified if c == qualifier => {
                    match chars.get(i + 1) {
                        None => {
                            state = QualifierState::Unqualified;
                            i += 1;
                        }
                        Some(&next) if next == delimiter => {
                            state = QualifierState::Unqualified;
                            columns.push(std::mem::take(&mut column));
                            column_started = false;
                            i += 2;
                        }
                        Some(&next) if next == qualifier => {
                            column.push(qualifier);
                            i += 2;
                        }
                        Some(_) => {
                            let text = format!(
                                "Text qualifier character found at position {} inside qualified text",
                                i + 1
                            );
                            match self.violation(text, &mut messages) {
                                Violation::Abort => {
                                    columns.push(column);
                                    return Tokenized { columns, messages };
                                }
                                Violation::Keep => column.push(c),
                                Violation::Drop => {}
                            }
                            i += 1;
                        }
                    }
                }
                QualifierState::Qualified => {
                    column.push(c);
                    i += 1;
                }
                QualifierState::Unqualified if c == delimiter => {
                    columns.push(std::mem::take(&mut column));
                    column_started = false;
                    i += 1;
                }
                QualifierState::Unqualified if c == qualifier => {
                    if !column_started {
                        state = QualifierState::Qualified;
                        column_started = true;
                    } else {
                        let text = format!(
                            "Text qualifier character found at position {} inside unqualified text",
                            i + 1
                        );
                        match self.violation(text, &mut messages) {
                            Violation::Abort => {
                                columns.push(column);
                                return Tokenized { columns, messages };
                            }
                            Violation::Keep => column.push(c),
                            Violation::Drop => {}
                        }
                    }
                    i += 1;
                }
                QualifierState::Unqualified => {
                    column.push(c);
                    column_started = true;
                    i += 1;
                }
            }
        }

        if state == QualifierState::Qualified {
            let text = format!(
                "Unterminated text qualifier in column {}",
                columns.len() + 1
            );
            if let Violation::Abort = self.violation(text, &mut messages) {
                return Tokenized { columns, messages };
            }
        }

        columns.push(column);
        Tokenized { columns, messages }
    }

    fn needs_qualifier(&self, column: Option<&ColumnDescriptor>, value: &str) -> Option<char> {
        let qualifier = self.options.qualifier?;
        let is_text = column.map(|c| c.kind.is_text()).unwrap_or(true);
        if !is_text {
            return None;
        }

        if !self.options.qualify_only_if_needed
            || value.contains(self.options.delimiter)
            || value.contains(qualifier)
        {
            Some(qualifier)
        } else {
            None
        }
    }
}

impl LineCodec for DelimitedCodec {
    fn read_identifier(&self, raw_line: &str) -> Option<String> {
        self.split(raw_line)
            .columns
            .into_iter()
            .nth(self.options.identifier_column)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    fn read_columns(&self, raw_line: &str, _columns: &[ColumnDescriptor]) -> Tokenized {
        self.split(raw_line)
    }

    fn write_columns(
        &self,
        _format: &FormatDefinition,
        columns: &[ColumnDescriptor],
        values: &[String],
        identifier: Option<&str>,
        messages: &mut Vec<MessageItem>,
    ) -> String {
        let mut line = String::new();
        let mut delimiter = [0u8; 4];
        let delimiter = self.options.delimiter.encode_utf8(&mut delimiter);

        for (index, value) in values.iter().enumerate() {
            if index > 0 {
                line.push_str(delimiter);
            }

            let value = match identifier {
                Some(identifier) if index == self.options.identifier_column => identifier,
                _ => value.as_str(),
            };

            match self.needs_qualifier(columns.get(index), value) {
                Some(q) => {
                    line.push(q);
                    for c in value.chars() {
                        if c == q {
                            line.push(q);
                        }
                        line.push(c);
                    }
                    line.push(q);
                }
                None => {
                    // Unqualified, the delimiter would split the column in two.
                    if value.contains(self.options.delimiter) {
                        let mut message = MessageItem::error(format!(
                            "Value contains the delimiter {:?} and cannot be qualified",
                            self.options.delimiter
                        ));
                        if let Some(column) = columns.get(index) {
                            message = message.with_property(column.name.as_str());
                        }
                        messages.push(message);
                    }
                    line.push_str(value);
                }
            }
        }

        line
    }
}
