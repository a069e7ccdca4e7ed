// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Flat syntax tree
//!
//! Parsed statements live in one node array. Each node stores its type, its
//! role in the parent ([`AttributeKey`]), its location, a parent link and a
//! contiguous range of children. Children are ordered by location and every
//! parent location covers the locations of its children.
//!
//! Node ids are only stable within one [`ParsedScript`].

use crate::scanner::ScannedScript;
use serde::Serialize;
use sqlscript_ir::{AttributeKey, Diagnostic, Location, NodeId, NodeType, StatementId};
use std::collections::VecDeque;
use std::ops::Range;
use std::sync::Arc;

/// A node of the flat syntax tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Node {
    pub node_type: NodeType,
    pub attribute_key: AttributeKey,
    pub location: Location,
    /// `None` for statement roots
    pub parent: Option<NodeId>,
    pub children_begin: u32,
    pub children_count: u32,
    /// Name id, enum value or boolean, depending on the node type
    pub value: u32,
}

impl Node {
    /// Ids of the children
    pub fn child_ids(&self) -> Range<NodeId> {
        self.children_begin..self.children_begin + self.children_count
    }
}

/// Statement classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatementType {
    Select,
    CreateTable,
    CreateTableAs,
    CreateView,
    Insert,
    Delete,
    Drop,
    /// Statement the parser could not recognize
    Invalid,
}

impl StatementType {
    /// Whether the statement declares a table or view
    pub fn declares_table(&self) -> bool {
        matches!(
            self,
            StatementType::CreateTable | StatementType::CreateTableAs | StatementType::CreateView
        )
    }
}

/// Value of `OBJECT_SQL_COLUMN_CONSTRAINT` and `OBJECT_SQL_TABLE_CONSTRAINT` nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u32)]
pub enum ConstraintKind {
    NotNull = 0,
    Null = 1,
    PrimaryKey = 2,
    Unique = 3,
    Default = 4,
    References = 5,
    Check = 6,
}

impl ConstraintKind {
    pub fn from_u32(value: u32) -> Option<Self> {
        use ConstraintKind::*;
        [NotNull, Null, PrimaryKey, Unique, Default, References, Check]
            .into_iter()
            .find(|k| *k as u32 == value)
    }
}

/// A top-level statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Statement {
    pub statement_type: StatementType,
    pub root: NodeId,
    pub location: Location,
    /// Nodes of the statement are `nodes_begin..nodes_begin + nodes_count`
    pub nodes_begin: NodeId,
    pub nodes_count: u32,
}

impl Statement {
    pub fn node_ids(&self) -> Range<NodeId> {
        self.nodes_begin..self.nodes_begin + self.nodes_count
    }
}

/// Output of the parser
#[derive(Debug, Clone, Serialize)]
pub struct ParsedScript {
    /// Scanner output the tree refers to
    #[serde(skip)]
    pub scanned: Arc<ScannedScript>,
    pub nodes: Vec<Node>,
    pub statements: Vec<Statement>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ParsedScript {
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id as usize)
    }

    /// Children of a node
    pub fn children(&self, id: NodeId) -> &[Node] {
        match self.node(id) {
            Some(node) => {
                let range = node.child_ids();
                &self.nodes[range.start as usize..range.end as usize]
            }
            None => &[],
        }
    }

    /// Child with the given attribute key
    pub fn attribute(&self, id: NodeId, key: AttributeKey) -> Option<NodeId> {
        let node = self.node(id)?;
        node.child_ids()
            .find(|child| self.nodes[*child as usize].attribute_key == key)
    }

    /// Boolean attribute, false if absent
    pub fn flag(&self, id: NodeId, key: AttributeKey) -> bool {
        self.attribute(id, key)
            .and_then(|child| self.node(child))
            .is_some_and(|n| n.value != 0)
    }

    /// Source text of a node
    pub fn node_text(&self, id: NodeId) -> &str {
        self.node(id)
            .map(|n| self.scanned.text_at(n.location))
            .unwrap_or_default()
    }

    /// Normalized text of a `Name` node
    pub fn name_text(&self, id: NodeId) -> &str {
        match self.node(id) {
            Some(node) if node.node_type == NodeType::Name => self.scanned.names.text(node.value),
            _ => "",
        }
    }

    /// Normalized names of an array of `Name` nodes
    pub fn name_path(&self, id: NodeId) -> Vec<String> {
        match self.node(id) {
            Some(node) if node.node_type == NodeType::Array => node
                .child_ids()
                .filter(|c| self.nodes[*c as usize].node_type == NodeType::Name)
                .map(|c| self.name_text(c).to_string())
                .collect(),
            Some(node) if node.node_type == NodeType::Name => {
                vec![self.name_text(id).to_string()]
            }
            _ => Vec::new(),
        }
    }

    /// Walk from a node up to its statement root, the node itself first
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(Some(id), move |current| {
            self.node(*current).and_then(|n| n.parent)
        })
        .filter(move |n| (*n as usize) < self.nodes.len())
    }

    /// Statement owning a node
    pub fn statement_of(&self, id: NodeId) -> Option<StatementId> {
        self.statements
            .iter()
            .position(|s| s.node_ids().contains(&id))
            .map(|s| s as StatementId)
    }

    /// Statement whose location contains `offset`
    pub fn statement_at(&self, offset: u32) -> Option<StatementId> {
        self.statements
            .iter()
            .position(|s| s.location.contains(offset))
            .map(|s| s as StatementId)
    }

    /// Descend from a statement root to the deepest node containing `offset`
    ///
    /// At each level the first child containing the offset wins.
    pub fn innermost_node_at(&self, statement_id: StatementId, offset: u32) -> Option<NodeId> {
        let statement = self.statements.get(statement_id as usize)?;
        let mut current = statement.root;
        if !self.nodes[current as usize].location.contains(offset) {
            return None;
        }
        'descend: loop {
            for child in self.nodes[current as usize].child_ids() {
                if self.nodes[child as usize].location.contains(offset) {
                    current = child;
                    continue 'descend;
                }
            }
            return Some(current);
        }
    }
}

/// Index into the builder's pending nodes
pub(crate) type PendingId = usize;

#[derive(Debug, Clone)]
struct PendingNode {
    node_type: NodeType,
    attribute_key: AttributeKey,
    location: Location,
    value: u32,
    children: Vec<PendingId>,
}

fn push_flat(p: &PendingNode, parent: Option<NodeId>, nodes: &mut Vec<Node>) -> NodeId {
    nodes.push(Node {
        node_type: p.node_type,
        attribute_key: p.attribute_key,
        location: p.location,
        parent,
        children_begin: 0,
        children_count: 0,
        value: p.value,
    });
    (nodes.len() - 1) as NodeId
}

/// Collects nodes while a statement is parsed, then lays them out flat
#[derive(Debug, Default)]
pub(crate) struct TreeBuilder {
    pending: Vec<PendingNode>,
}

impl TreeBuilder {
    pub(crate) fn leaf(&mut self, node_type: NodeType, location: Location, value: u32) -> PendingId {
        self.pending.push(PendingNode {
            node_type,
            attribute_key: AttributeKey::None,
            location,
            value,
            children: Vec::new(),
        });
        self.pending.len() - 1
    }

    /// Array of items, covering `location` and all items
    pub(crate) fn array(&mut self, location: Option<Location>, items: Vec<PendingId>) -> PendingId {
        let location = self.cover(location, &items);
        self.pending.push(PendingNode {
            node_type: NodeType::Array,
            attribute_key: AttributeKey::None,
            location,
            value: 0,
            children: items,
        });
        self.pending.len() - 1
    }

    /// Object with attribute children, covering `location` and all children
    pub(crate) fn object(
        &mut self,
        node_type: NodeType,
        location: Location,
        attributes: Vec<(AttributeKey, PendingId)>,
    ) -> PendingId {
        let mut children = Vec::with_capacity(attributes.len());
        for (key, child) in attributes {
            self.pending[child].attribute_key = key;
            children.push(child);
        }
        let location = self.cover(Some(location), &children);
        self.pending.push(PendingNode {
            node_type,
            attribute_key: AttributeKey::None,
            location,
            value: 0,
            children,
        });
        self.pending.len() - 1
    }

    pub(crate) fn set_value(&mut self, id: PendingId, value: u32) {
        self.pending[id].value = value;
    }

    pub(crate) fn location(&self, id: PendingId) -> Location {
        self.pending[id].location
    }

    fn cover(&self, location: Option<Location>, children: &[PendingId]) -> Location {
        let mut iter = children.iter().map(|c| self.pending[*c].location);
        let first = match location {
            Some(location) => location,
            None => iter.next().unwrap_or_default(),
        };
        iter.fold(first, |acc, loc| acc.merge(&loc))
    }

    /// Append the subtree under `root` to `nodes` and reset the builder
    ///
    /// Nodes are laid out breadth first so that siblings are contiguous.
    pub(crate) fn flatten(&mut self, root: PendingId, nodes: &mut Vec<Node>) -> NodeId {
        let root_id = nodes.len() as NodeId;
        let pending = std::mem::take(&mut self.pending);
        push_flat(&pending[root], None, nodes);

        let mut queue = VecDeque::from([(root, root_id)]);
        while let Some((pending_id, flat_id)) = queue.pop_front() {
            let mut children = pending[pending_id].children.clone();
            children.sort_by_key(|c| pending[*c].location.offset);
            let begin = nodes.len() as u32;
            for child in children {
                let child_id = push_flat(&pending[child], Some(flat_id), nodes);
                queue.push_back((child, child_id));
            }
            let end = nodes.len() as u32;
            let node = &mut nodes[flat_id as usize];
            node.children_begin = begin;
            node.children_count = end - begin;
        }
        root_id
    }
}
