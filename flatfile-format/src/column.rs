use serde::{Deserialize, Serialize};

use crate::definition::{ColumnWidthOverflow, FormatDefinition, StringTransform, StringTrim};

/// The logical kind of a column's value.
///
/// Only `Text` columns are ever wrapped in a text qualifier when written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    #[default]
    Text,
    Integer,
    Number,
    Boolean,
    Date,
}

impl ColumnKind {
    #[inline(always)]
    pub fn is_text(self) -> bool {
        self == ColumnKind::Text
    }
}

/// Describes one column of a record type.
///
/// The formatting fields are overrides: `None` means "use the format default",
/// see the `resolve_*` methods.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,

    #[serde(default)]
    pub kind: ColumnKind,

    /// Width in characters. Mandatory for fixed-width formats, ignored otherwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<usize>,

    /// An empty value is reported as an error by providers that honour it.
    #[serde(default)]
    pub required: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trim: Option<StringTrim>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<StringTransform>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width_overflow: Option<ColumnWidthOverflow>,

    /// Padding character for fixed-width output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pad: Option<char>,
}

impl ColumnDescriptor {
    pub fn new<S: Into<String>>(name: S) -> ColumnDescriptor {
        ColumnDescriptor {
            name: name.into(),
            kind: ColumnKind::Text,
            width: None,
            required: false,
            trim: None,
            transform: None,
            width_overflow: None,
            pad: None,
        }
    }

    pub fn with_kind(mut self, kind: ColumnKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_width(mut self, width: usize) -> Self {
        self.width = Some(width);
        self
    }

    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn with_trim(mut self, trim: StringTrim) -> Self {
        self.trim = Some(trim);
        self
    }

    pub fn with_transform(mut self, transform: StringTransform) -> Self {
        self.transform = Some(transform);
        self
    }

    pub fn with_width_overflow(mut self, overflow: ColumnWidthOverflow) -> Self {
        self.width_overflow = Some(overflow);
        self
    }

    pub fn with_pad(mut self, pad: char) -> Self {
        self.pad = Some(pad);
        self
    }

    #[inline(always)]
    pub fn resolve_trim(&self, format: &FormatDefinition) -> StringTrim {
        self.trim.unwrap_or(format.string_trim)
    }

    #[inline(always)]
    pub fn resolve_transform(&self, format: &FormatDefinition) -> StringTransform {
        self.transform.unwrap_or(format.string_transform)
    }

    #[inline(always)]
    pub fn resolve_width_overflow(&self, format: &FormatDefinition) -> ColumnWidthOverflow {
        self.width_overflow.unwrap_or(format.width_overflow)
    }

    #[inline(always)]
    pub fn resolve_pad(&self, default: char) -> char {
        self.pad.unwrap_or(default)
    }

    /// Applies the resolved trim, then the resolved transform.
    pub fn clean(&self, format: &FormatDefinition, value: &str) -> String {
        let trimmed = self.resolve_trim(format).apply(value);
        self.resolve_transform(format).apply(trimmed)
    }
}

/// Declares one parent/child relationship between record types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyDescriptor {
    pub record_identifier: String,
    pub child_type: String,

    #[serde(default)]
    pub is_collection: bool,

    #[serde(default)]
    pub is_mandatory: bool,

    #[serde(default)]
    pub min_count: usize,

    /// 0 means unbounded.
    #[serde(default)]
    pub max_count: usize,
}

impl HierarchyDescriptor {
    /// A single, optional child.
    pub fn single<I: Into<String>, T: Into<String>>(
        record_identifier: I,
        child_type: T,
    ) -> HierarchyDescriptor {
        HierarchyDescriptor {
            record_identifier: record_identifier.into(),
            child_type: child_type.into(),
            is_collection: false,
            is_mandatory: false,
            min_count: 0,
            max_count: 0,
        }
    }

    /// An unbounded, optional collection of children.
    pub fn collection<I: Into<String>, T: Into<String>>(
        record_identifier: I,
        child_type: T,
    ) -> HierarchyDescriptor {
        HierarchyDescriptor {
            is_collection: true,
            ..HierarchyDescriptor::single(record_identifier, child_type)
        }
    }

    pub fn mandatory(mut self) -> Self {
        self.is_mandatory = true;
        self
    }

    pub fn with_min_count(mut self, min_count: usize) -> Self {
        self.min_count = min_count;
        self
    }

    pub fn with_max_count(mut self, max_count: usize) -> Self {
        self.max_count = max_count;
        self
    }

    /// The largest number of occurrences permitted, if bounded.
    pub fn upper_bound(&self) -> Option<usize> {
        if !self.is_collection {
            Some(1)
        } else if self.max_count == 0 {
            None
        } else {
            Some(self.max_count)
        }
    }

    /// Cardinality problems for `count` occurrences of this child under one parent.
    ///
    /// Upper bounds are reported as each occurrence is attached, so only the
    /// lower bounds are checked here.
    pub(crate) fn check_lower_bounds(&self, count: usize) -> Option<String> {
        if count == 0 {
            if self.is_mandatory {
                return Some(format!(
                    "Record `{}` is mandatory but none were found",
                    self.record_identifier
                ));
            }
            return None;
        }

        if self.is_collection && self.min_count > count {
            return Some(format!(
                "Record `{}` must have at least {} occurrences but {} were found",
                self.record_identifier, self.min_count, count
            ));
        }

        None
    }

    /// Full cardinality check, used on the write path where counts are known up front.
    pub(crate) fn check_cardinality(&self, count: usize) -> Option<String> {
        if let Some(msg) = self.check_lower_bounds(count) {
            return Some(msg);
        }

        match self.upper_bound() {
            Some(1) if count > 1 => Some(format!(
                "Record `{}` does not support multiple records",
                self.record_identifier
            )),
            Some(max) if count > max => Some(format!(
                "Record `{}` allows at most {} occurrences but {} were found",
                self.record_identifier, max, count
            )),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_resolve_against_format() {
        let format = FormatDefinition::delimited("Row")
            .with_string_trim(StringTrim::Both)
            .with_string_transform(StringTransform::Upper);

        let plain = ColumnDescriptor::new("a");
        assert_eq!(plain.clean(&format, "  abc "), "ABC");

        let custom = ColumnDescriptor::new("b")
            .with_trim(StringTrim::None)
            .with_transform(StringTransform::Lower);
        assert_eq!(custom.clean(&format, " AbC "), " abc ");
    }

    #[test]
    fn lower_bounds() {
        let lines = HierarchyDescriptor::collection("D", "Line")
            .mandatory()
            .with_min_count(2);

        assert!(lines.check_lower_bounds(0).unwrap().contains("mandatory"));
        assert!(lines.check_lower_bounds(1).unwrap().contains("at least 2"));
        assert!(lines.check_lower_bounds(2).is_none());
    }

    #[test]
    fn singular_children_do_not_repeat() {
        let note = HierarchyDescriptor::single("N", "Note");
        assert!(note.check_cardinality(0).is_none());
        assert!(note.check_cardinality(1).is_none());
        assert!(note
            .check_cardinality(2)
            .unwrap()
            .contains("does not support multiple records"));
    }
}
