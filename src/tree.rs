//! Data tree representation.
//!
//! A [`DataTree`] holds value-bearing nodes in an arena, each bound to one
//! node of the shared [`Schema`]. Navigation goes through [`NodeRef`], a
//! cheap copyable handle that borrows the tree.
//!
//! Consecutive siblings bound to the same list schema node are the instances
//! of that list. The builder always emits a list's instances as one run, and
//! [`NodeRef::instances`] returns that run.

use crate::error::BuildError;
use crate::schema::{NodeKind, Schema, SchemaId, SchemaNode};
use std::fmt;
use std::sync::Arc;

/// Leaf name used as the identity key of list instances.
pub const DEFAULT_LIST_KEY: &str = "Id";

/// Index of a node inside its [`DataTree`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Scalar carried by a leaf node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeafValue {
    Int(i64),
    Str(String),
}

impl LeafValue {
    pub fn type_name(&self) -> &str {
        match self {
            LeafValue::Int(_) => "int",
            LeafValue::Str(_) => "string",
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            LeafValue::Int(v) => Some(*v),
            LeafValue::Str(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            LeafValue::Str(s) => Some(s),
            LeafValue::Int(_) => None,
        }
    }

    /// Compares against the textual form used in path predicates: integers
    /// by parsed value, strings exactly.
    pub fn matches_text(&self, text: &str) -> bool {
        match self {
            LeafValue::Int(v) => text.parse::<i64>().is_ok_and(|parsed| parsed == *v),
            LeafValue::Str(s) => s == text,
        }
    }

    /// Returns a short preview of the value, at most `max_len` characters long.
    pub fn preview(&self, max_len: usize) -> String {
        let preview = match self {
            LeafValue::Int(v) => v.to_string(),
            LeafValue::Str(s) => format!("\"{}\"", s),
        };

        if preview.chars().count() <= max_len {
            preview
        } else if max_len < 3 {
            preview.chars().take(max_len).collect()
        } else {
            let kept: String = preview.chars().take(max_len - 3).collect();
            format!("{}...", kept)
        }
    }
}

impl fmt::Display for LeafValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LeafValue::Int(v) => write!(f, "{}", v),
            LeafValue::Str(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct DataNode {
    schema: SchemaId,
    parent: Option<NodeId>,
    first_child: Option<NodeId>,
    last_child: Option<NodeId>,
    prev: Option<NodeId>,
    next: Option<NodeId>,
    value: Option<LeafValue>,
}

/// A data tree built against a schema.
#[derive(Debug, Clone)]
pub struct DataTree {
    schema: Arc<Schema>,
    nodes: Vec<DataNode>,
}

impl DataTree {
    pub(crate) fn new(schema: Arc<Schema>) -> Self {
        Self {
            schema,
            nodes: Vec::new(),
        }
    }

    /// Appends a node as the last child of `parent`.
    pub(crate) fn alloc(
        &mut self,
        schema: SchemaId,
        value: Option<LeafValue>,
        parent: Option<NodeId>,
    ) -> Result<NodeId, BuildError> {
        self.nodes
            .try_reserve(1)
            .map_err(|_| BuildError::OutOfMemory)?;

        let id = NodeId(self.nodes.len());
        let mut node = DataNode {
            schema,
            parent,
            first_child: None,
            last_child: None,
            prev: None,
            next: None,
            value,
        };

        if let Some(parent_id) = parent {
            match self.nodes[parent_id.0].last_child {
                Some(last) => {
                    self.nodes[last.0].next = Some(id);
                    node.prev = Some(last);
                }
                None => self.nodes[parent_id.0].first_child = Some(id),
            }
            self.nodes[parent_id.0].last_child = Some(id);
        }

        self.nodes.push(node);
        Ok(id)
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn schema_arc(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// The root container. Always the first node of the arena.
    pub fn root(&self) -> NodeRef<'_> {
        NodeRef {
            tree: self,
            id: NodeId(0),
        }
    }

    pub fn get(&self, id: NodeId) -> Option<NodeRef<'_>> {
        (id.0 < self.nodes.len()).then_some(NodeRef { tree: self, id })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Checks if two trees hold the same shape and values, node by node.
    pub fn semantic_equals(&self, other: &DataTree) -> bool {
        self.root().semantic_equals(&other.root())
    }
}

/// Borrowed handle to one node of a [`DataTree`].
#[derive(Clone, Copy)]
pub struct NodeRef<'a> {
    tree: &'a DataTree,
    id: NodeId,
}

impl<'a> NodeRef<'a> {
    fn raw(&self) -> &'a DataNode {
        &self.tree.nodes[self.id.0]
    }

    fn at(&self, id: Option<NodeId>) -> Option<NodeRef<'a>> {
        id.map(|id| NodeRef {
            tree: self.tree,
            id,
        })
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn tree(&self) -> &'a DataTree {
        self.tree
    }

    pub fn schema_id(&self) -> SchemaId {
        self.raw().schema
    }

    pub fn schema_node(&self) -> &'a SchemaNode {
        self.tree.schema.node(self.raw().schema)
    }

    pub fn name(&self) -> &'a str {
        self.schema_node().name()
    }

    pub fn kind(&self) -> NodeKind {
        self.schema_node().kind()
    }

    /// The leaf value; `None` for containers and list instances.
    pub fn value(&self) -> Option<&'a LeafValue> {
        self.raw().value.as_ref()
    }

    pub fn parent(&self) -> Option<NodeRef<'a>> {
        self.at(self.raw().parent)
    }

    pub fn first_child(&self) -> Option<NodeRef<'a>> {
        self.at(self.raw().first_child)
    }

    pub fn next_sibling(&self) -> Option<NodeRef<'a>> {
        self.at(self.raw().next)
    }

    pub fn prev_sibling(&self) -> Option<NodeRef<'a>> {
        self.at(self.raw().prev)
    }

    pub fn children(&self) -> NodeChildren<'a> {
        NodeChildren {
            next: self.first_child(),
        }
    }

    /// First child bound to the given schema node.
    pub fn child_by_schema(&self, schema: SchemaId) -> Option<NodeRef<'a>> {
        self.children().find(|child| child.schema_id() == schema)
    }

    /// The run of consecutive children that are instances of `list`.
    pub fn instances(&self, list: SchemaId) -> impl Iterator<Item = NodeRef<'a>> {
        self.children()
            .skip_while(move |child| child.schema_id() != list)
            .take_while(move |child| child.schema_id() == list)
    }

    /// First leaf child with the given name.
    pub fn leaf(&self, name: &str) -> Option<NodeRef<'a>> {
        self.children()
            .find(|child| child.schema_node().is_leaf() && child.name() == name)
    }

    /// Canonical query path of this node, keying list instances by their
    /// integer `Id` leaf.
    ///
    /// Returns `None` when some list instance on the way has no integer `Id`
    /// or shares it with an earlier sibling, since no query would select it.
    pub fn path(&self) -> Option<String> {
        self.path_with_key(DEFAULT_LIST_KEY)
    }

    /// Same as [`NodeRef::path`] with list instances keyed by the integer
    /// leaf `key`.
    pub fn path_with_key(&self, key: &str) -> Option<String> {
        self.render_path(|node| node.keyed_segment(key))
    }

    /// Path for display. Instances without a unique integer `key` are shown
    /// by their 1-based position in the list as `Name[#N]`, which is not
    /// valid query syntax.
    pub fn display_path(&self, key: &str) -> String {
        self.render_path(|node| {
            Some(
                node.keyed_segment(key)
                    .unwrap_or_else(|| format!("{}[#{}]", node.name(), node.position())),
            )
        })
        .unwrap_or_default()
    }

    fn render_path(
        &self,
        instance_segment: impl Fn(&NodeRef<'a>) -> Option<String>,
    ) -> Option<String> {
        let mut segments = Vec::new();
        let mut cursor = Some(*self);
        while let Some(node) = cursor {
            let segment = if node.kind() == NodeKind::List {
                instance_segment(&node)?
            } else {
                node.name().to_string()
            };
            segments.push(segment);
            cursor = node.parent();
        }
        segments.reverse();
        Some(segments.join("/"))
    }

    /// `Name[key=K]` when this instance is the first sibling carrying `K`.
    fn keyed_segment(&self, key: &str) -> Option<String> {
        let value = self.leaf(key)?.value()?.as_int()?;
        let parent = self.parent()?;
        let first = parent.instances(self.schema_id()).find(|instance| {
            instance
                .leaf(key)
                .and_then(|leaf| leaf.value())
                .and_then(LeafValue::as_int)
                == Some(value)
        })?;
        (first == *self).then(|| format!("{}[{}={}]", self.name(), key, value))
    }

    /// 1-based index among the instances of this node's list.
    fn position(&self) -> usize {
        self.parent()
            .and_then(|parent| {
                parent
                    .instances(self.schema_id())
                    .position(|instance| instance == *self)
            })
            .map_or(1, |index| index + 1)
    }

    /// Checks if two subtrees are equal in names, kinds, values, and child order.
    pub fn semantic_equals(&self, other: &NodeRef<'_>) -> bool {
        if self.name() != other.name() || self.kind() != other.kind() {
            return false;
        }
        if self.value() != other.value() {
            return false;
        }

        let mut mine = self.children();
        let mut theirs = other.children();
        loop {
            match (mine.next(), theirs.next()) {
                (None, None) => return true,
                (Some(a), Some(b)) => {
                    if !a.semantic_equals(&b) {
                        return false;
                    }
                }
                _ => return false,
            }
        }
    }
}

impl PartialEq for NodeRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.tree, other.tree) && self.id == other.id
    }
}

impl Eq for NodeRef<'_> {}

impl fmt::Debug for NodeRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRef")
            .field("id", &self.id)
            .field("name", &self.name())
            .field("value", &self.value())
            .finish()
    }
}

/// Iterator over the children of a data node.
pub struct NodeChildren<'a> {
    next: Option<NodeRef<'a>>,
}

impl<'a> Iterator for NodeChildren<'a> {
    type Item = NodeRef<'a>;

    fn next(&mut self) -> Option<NodeRef<'a>> {
        let current = self.next?;
        self.next = current.next_sibling();
        Some(current)
    }
}
