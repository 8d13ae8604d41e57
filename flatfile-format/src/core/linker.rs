//! Tracks where each line of a record group sits in the hierarchy while the
//! group is being read.
//!
//! Entries live in an arena for the lifetime of one group. Parents are stored
//! as indices, so walking back up the tree never fights the borrow checker.

use crate::hierarchy::{HierarchyIndex, NodeId};
use crate::metadata::MetadataProvider;
use crate::record::FileRecord;

#[derive(Debug)]
struct LinkEntry<V> {
    node: NodeId,
    /// Index of this entry's line in the group's records.
    record: usize,
    value: Option<V>,
    parent: Option<usize>,
    children: Vec<usize>,
    closed: bool,
}

/// Why a line could not be placed under the current cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Misplaced {
    NotAPeer,
    NotInTraversedHierarchy,
    NotADirectDescendant,
}

impl Misplaced {
    pub(crate) fn message(self, identifier: &str) -> String {
        match self {
            Misplaced::NotAPeer => format!("Record `{}` is not a valid peer", identifier),
            Misplaced::NotInTraversedHierarchy => format!(
                "Record `{}` is not valid within current traversed hierarchy",
                identifier
            ),
            Misplaced::NotADirectDescendant => {
                format!("Record `{}` is not a direct descendant", identifier)
            }
        }
    }
}

#[derive(Debug)]
pub(crate) struct HierarchyLinker<V> {
    entries: Vec<LinkEntry<V>>,
    /// The most recently attached entry.
    cursor: usize,
}

impl<V> HierarchyLinker<V> {
    pub(crate) fn new(root: NodeId, record: usize, value: Option<V>) -> HierarchyLinker<V> {
        HierarchyLinker {
            entries: vec![LinkEntry {
                node: root,
                record,
                value,
                parent: None,
                children: Vec::new(),
                closed: false,
            }],
            cursor: 0,
        }
    }

    /// Finds the entry a line of `node` would be attached under, comparing its
    /// level with the previous line's.
    pub(crate) fn place(&self, index: &HierarchyIndex, node: NodeId) -> Result<usize, Misplaced> {
        let previous = &self.entries[self.cursor];
        let previous_level = index.node(previous.node).level;
        let wanted_parent = index.node(node).parent;
        let level = index.node(node).level;

        if level == previous_level {
            return match previous.parent {
                Some(parent) if wanted_parent == Some(self.entries[parent].node) => Ok(parent),
                _ => Err(Misplaced::NotAPeer),
            };
        }

        if level < previous_level {
            let mut ancestor = previous.parent;
            while let Some(entry) = ancestor {
                if wanted_parent == Some(self.entries[entry].node) {
                    return Ok(entry);
                }
                ancestor = self.entries[entry].parent;
            }
            return Err(Misplaced::NotInTraversedHierarchy);
        }

        if wanted_parent == Some(previous.node) {
            Ok(self.cursor)
        } else {
            Err(Misplaced::NotADirectDescendant)
        }
    }

    /// How many children of `node` are attached under `parent` so far.
    pub(crate) fn count(&self, parent: usize, node: NodeId) -> usize {
        self.entries[parent]
            .children
            .iter()
            .filter(|&&c| self.entries[c].node == node)
            .count()
    }

    /// The error for one more occurrence of `node` under `parent`, if it would
    /// exceed the declared upper bound.
    pub(crate) fn check_upper_bound(
        &self,
        index: &HierarchyIndex,
        parent: usize,
        node: NodeId,
    ) -> Option<String> {
        let descriptor = index.node(node).descriptor.as_ref()?;
        let count = self.count(parent, node) + 1;

        match descriptor.upper_bound() {
            Some(1) if count > 1 => Some(format!(
                "Record `{}` does not support multiple records",
                descriptor.record_identifier
            )),
            Some(max) if count > max => Some(format!(
                "Record `{}` allows at most {} occurrences but {} were found",
                descriptor.record_identifier, max, count
            )),
            _ => None,
        }
    }

    /// Attaches a placed line under `parent` and makes it the cursor. Every
    /// entry between the old cursor and `parent` is closed first.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn attach<P>(
        &mut self,
        index: &HierarchyIndex,
        provider: &P,
        records: &mut [FileRecord<V>],
        parent: usize,
        node: NodeId,
        record: usize,
        value: Option<V>,
    ) where
        P: MetadataProvider<Value = V> + ?Sized,
    {
        self.close_until(index, provider, records, Some(parent));

        let id = self.entries.len();
        self.entries.push(LinkEntry {
            node,
            record,
            value,
            parent: Some(parent),
            children: Vec::new(),
            closed: false,
        });
        self.entries[parent].children.push(id);
        self.cursor = id;
    }

    /// Closes every open entry up to and including the root, and hands back
    /// the root value.
    pub(crate) fn finish<P>(
        mut self,
        index: &HierarchyIndex,
        provider: &P,
        records: &mut [FileRecord<V>],
    ) -> Option<V>
    where
        P: MetadataProvider<Value = V> + ?Sized,
    {
        self.close_until(index, provider, records, None);
        self.entries[0].value.take()
    }

    fn close_until<P>(
        &mut self,
        index: &HierarchyIndex,
        provider: &P,
        records: &mut [FileRecord<V>],
        stop: Option<usize>,
    ) where
        P: MetadataProvider<Value = V> + ?Sized,
    {
        let mut current = Some(self.cursor);
        while let Some(entry) = current {
            if Some(entry) == stop {
                break;
            }
            self.close(index, provider, records, entry);
            current = self.entries[entry].parent;
        }
    }

    /// Checks the lower bounds of every child relationship of `entry`, then
    /// folds the valid child values into its value.
    fn close<P>(
        &mut self,
        index: &HierarchyIndex,
        provider: &P,
        records: &mut [FileRecord<V>],
        entry: usize,
    ) where
        P: MetadataProvider<Value = V> + ?Sized,
    {
        if self.entries[entry].closed {
            return;
        }
        self.entries[entry].closed = true;

        let node = self.entries[entry].node;
        let record = self.entries[entry].record;

        for &child_node in &index.node(node).children {
            let descriptor = match &index.node(child_node).descriptor {
                Some(d) => d,
                None => continue,
            };

            let child_entries: Vec<usize> = self.entries[entry]
                .children
                .iter()
                .copied()
                .filter(|&c| self.entries[c].node == child_node)
                .collect();

            if let Some(message) = descriptor.check_lower_bounds(child_entries.len()) {
                records[record].push_error(message);
            }

            let values: Vec<V> = child_entries
                .into_iter()
                .filter_map(|c| self.entries[c].value.take())
                .collect();

            if let Some(value) = self.entries[entry].value.as_mut() {
                provider.set_children(value, descriptor, values);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::{ColumnDescriptor, HierarchyDescriptor};
    use crate::definition::FormatDefinition;

    /// Values are the list of identifiers folded into them, for inspection.
    struct Tree {
        columns: Vec<ColumnDescriptor>,
        order: Vec<HierarchyDescriptor>,
        line: Vec<HierarchyDescriptor>,
    }

    impl MetadataProvider for Tree {
        type Value = Vec<String>;

        fn columns_for(&self, _record_type: &str) -> Option<&[ColumnDescriptor]> {
            Some(&self.columns)
        }

        fn children_for(&self, record_type: &str) -> &[HierarchyDescriptor] {
            match record_type {
                "Order" => &self.order,
                "Line" => &self.line,
                _ => &[],
            }
        }

        fn create_instance(&self, _record_type: &str) -> Vec<String> {
            Vec::new()
        }

        fn get_column(&self, _value: &Vec<String>, _column: &ColumnDescriptor) -> String {
            String::new()
        }

        fn set_column(&self, _: &mut Vec<String>, _: &ColumnDescriptor, _: &str) -> Result<(), String> {
            Ok(())
        }

        fn set_children(
            &self,
            value: &mut Vec<String>,
            descriptor: &HierarchyDescriptor,
            children: Vec<Vec<String>>,
        ) {
            for child in children {
                value.push(format!("{}{:?}", descriptor.record_identifier, child));
            }
        }
    }

    fn setup() -> (HierarchyIndex, Tree) {
        let tree = Tree {
            columns: vec![ColumnDescriptor::new("kind")],
            order: vec![
                HierarchyDescriptor::collection("L", "Line")
                    .mandatory()
                    .with_min_count(2),
                HierarchyDescriptor::single("N", "Note"),
            ],
            line: vec![HierarchyDescriptor::collection("T", "Tax")],
        };
        let format = FormatDefinition::delimited("Order").with_content_identifier("O");
        let index = HierarchyIndex::build(&format, &tree).unwrap();
        (index, tree)
    }

    fn records(n: usize) -> Vec<FileRecord<Vec<String>>> {
        (1..=n).map(|i| FileRecord::new(i, String::new())).collect()
    }

    #[test]
    fn placement_rules() {
        let (index, tree) = setup();
        let (l, t, n) = (
            index.lookup("L").unwrap(),
            index.lookup("T").unwrap(),
            index.lookup("N").unwrap(),
        );
        let mut records = records(4);
        let mut linker = HierarchyLinker::new(index.root(), 0, Some(Vec::new()));

        assert_eq!(linker.place(&index, t), Err(Misplaced::NotADirectDescendant));
        assert_eq!(linker.place(&index, l), Ok(0));
        linker.attach(&index, &tree, &mut records, 0, l, 1, Some(Vec::new()));

        assert_eq!(linker.place(&index, l), Ok(0));
        assert_eq!(linker.place(&index, t), Ok(1));
        linker.attach(&index, &tree, &mut records, 1, t, 2, Some(Vec::new()));

        // From T (level 2) back up to N (level 1) under the root.
        assert_eq!(linker.place(&index, n), Ok(0));
        assert_eq!(linker.place(&index, index.root()), Err(Misplaced::NotInTraversedHierarchy));
    }

    #[test]
    fn peers_must_share_a_parent() {
        let (index, tree) = setup();
        let (l, t) = (index.lookup("L").unwrap(), index.lookup("T").unwrap());
        let n = index.lookup("N").unwrap();
        let mut records = records(3);
        let mut linker = HierarchyLinker::new(index.root(), 0, Some(Vec::new()));

        linker.attach(&index, &tree, &mut records, 0, n, 1, Some(Vec::new()));
        assert_eq!(linker.place(&index, l), Ok(0));
        assert_eq!(linker.place(&index, t), Err(Misplaced::NotADirectDescendant));
    }

    #[test]
    fn closing_folds_children_and_checks_lower_bounds() {
        let (index, tree) = setup();
        let (l, t) = (index.lookup("L").unwrap(), index.lookup("T").unwrap());
        let mut records = records(3);
        let mut linker = HierarchyLinker::new(index.root(), 0, Some(Vec::new()));

        linker.attach(&index, &tree, &mut records, 0, l, 1, Some(Vec::new()));
        linker.attach(&index, &tree, &mut records, 1, t, 2, Some(vec!["x".to_string()]));

        let value = linker.finish(&index, &tree, &mut records).unwrap();
        assert_eq!(value, vec![r#"L["T[\"x\"]"]"#.to_string()]);
        assert!(records[0].has_errors());
        assert!(records[0].messages[0].text.contains("at least 2"));
        assert!(!records[1].has_errors());
    }

    #[test]
    fn upper_bounds() {
        let (index, tree) = setup();
        let n = index.lookup("N").unwrap();
        let mut records = records(2);
        let mut linker = HierarchyLinker::new(index.root(), 0, Some(Vec::new()));

        assert!(linker.check_upper_bound(&index, 0, n).is_none());
        linker.attach(&index, &tree, &mut records, 0, n, 1, Some(Vec::new()));
        assert!(linker
            .check_upper_bound(&index, 0, n)
            .unwrap()
            .contains("does not support multiple records"));
    }
}
