//! The tree of record identifiers a hierarchical format allows.
//!
//! Built once per [`Layout`](crate::Layout) from the format definition and the
//! metadata provider's child descriptors. Nodes live in an arena and refer to
//! each other by [`NodeId`].

use std::collections::{HashMap, HashSet};

use crate::column::HierarchyDescriptor;
use crate::definition::FormatDefinition;
use crate::error::ConfigError;
use crate::metadata::MetadataProvider;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
pub struct HierarchyNode {
    pub record_identifier: String,
    pub record_type: String,
    /// 0 for the content root.
    pub level: usize,
    pub parent: Option<NodeId>,
    /// Children in declaration order.
    pub children: Vec<NodeId>,
    /// The relationship that declared this node; `None` for the root.
    pub descriptor: Option<HierarchyDescriptor>,
}

#[derive(Debug, Clone)]
pub struct HierarchyIndex {
    nodes: Vec<HierarchyNode>,
    by_identifier: HashMap<String, NodeId>,
}

impl HierarchyIndex {
    const ROOT: NodeId = NodeId(0);

    pub fn build<P>(format: &FormatDefinition, provider: &P) -> Result<HierarchyIndex, ConfigError>
    where
        P: MetadataProvider + ?Sized,
    {
        let root_type = format.content.record_type.clone();
        let root_identifier = format.content_identifier().unwrap_or_default().to_string();

        let mut index = HierarchyIndex {
            nodes: vec![HierarchyNode {
                record_identifier: root_identifier.clone(),
                record_type: root_type,
                level: 0,
                parent: None,
                children: Vec::new(),
                descriptor: None,
            }],
            by_identifier: HashMap::new(),
        };

        if !format.is_hierarchical() {
            return Ok(index);
        }

        index.by_identifier.insert(root_identifier, Self::ROOT);

        // Header and trailer identifiers may not reappear inside the tree.
        let reserved: HashSet<&str> = format
            .header_identifier()
            .into_iter()
            .chain(format.trailer_identifier())
            .collect();

        index.walk(Self::ROOT, provider, &reserved)?;

        tracing::debug!(nodes = index.nodes.len(), "built record hierarchy");
        Ok(index)
    }

    fn walk<P>(
        &mut self,
        parent: NodeId,
        provider: &P,
        reserved: &HashSet<&str>,
    ) -> Result<(), ConfigError>
    where
        P: MetadataProvider + ?Sized,
    {
        let parent_type = self.nodes[parent.0].record_type.clone();
        let level = self.nodes[parent.0].level + 1;

        for descriptor in provider.children_for(&parent_type) {
            let identifier = descriptor.record_identifier.as_str();

            if reserved.contains(identifier) || self.by_identifier.contains_key(identifier) {
                return Err(ConfigError::DuplicateRecordIdentifier(identifier.to_string()));
            }

            if provider.columns_for(&descriptor.child_type).is_none() {
                return Err(ConfigError::UnknownRecordType(descriptor.child_type.clone()));
            }

            if descriptor.is_collection
                && descriptor.max_count > 0
                && descriptor.min_count > descriptor.max_count
            {
                return Err(ConfigError::InvalidCardinality {
                    record_type: parent_type,
                    identifier: identifier.to_string(),
                    min: descriptor.min_count,
                    max: descriptor.max_count,
                });
            }

            let id = NodeId(self.nodes.len());
            self.nodes.push(HierarchyNode {
                record_identifier: identifier.to_string(),
                record_type: descriptor.child_type.clone(),
                level,
                parent: Some(parent),
                children: Vec::new(),
                descriptor: Some(descriptor.clone()),
            });
            self.nodes[parent.0].children.push(id);
            self.by_identifier.insert(identifier.to_string(), id);

            self.walk(id, provider, reserved)?;
        }

        Ok(())
    }

    #[inline(always)]
    pub fn root(&self) -> NodeId {
        Self::ROOT
    }

    #[inline(always)]
    pub fn node(&self, id: NodeId) -> &HierarchyNode {
        &self.nodes[id.0]
    }

    #[inline(always)]
    pub fn lookup(&self, identifier: &str) -> Option<NodeId> {
        self.by_identifier.get(identifier).copied()
    }

    /// Nodes in pre-order, paired with their ids.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &HierarchyNode)> {
        let mut stack = vec![Self::ROOT];
        std::iter::from_fn(move || {
            let id = stack.pop()?;
            let node = &self.nodes[id.0];
            stack.extend(node.children.iter().rev().copied());
            Some((id, node))
        })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
