use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };

        write!(f, "{}", s)
    }
}

/// A single note attached to a record: a parse problem, a validation failure,
/// or a hierarchy violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageItem {
    pub severity: Severity,
    pub text: String,
    /// The column (or child record identifier) the message concerns, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property: Option<String>,
}

impl MessageItem {
    pub fn new<S: Into<String>>(severity: Severity, text: S) -> MessageItem {
        MessageItem {
            severity,
            text: text.into(),
            property: None,
        }
    }

    pub fn warning<S: Into<String>>(text: S) -> MessageItem {
        MessageItem::new(Severity::Warning, text)
    }

    pub fn error<S: Into<String>>(text: S) -> MessageItem {
        MessageItem::new(Severity::Error, text)
    }

    pub fn with_property<S: Into<String>>(mut self, property: S) -> MessageItem {
        self.property = Some(property.into());
        self
    }

    #[inline(always)]
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for MessageItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.property {
            Some(property) => write!(f, "{} [{}]: {}", self.severity, property, self.text),
            None => write!(f, "{}: {}", self.severity, self.text),
        }
    }
}
