//! Schema model and its loader.
//!
//! A schema document is a JSON object whose single top-level member is the
//! schema root. Every position in the schema is an object carrying an `@attr`
//! member that declares what the position is, followed by its nested
//! positions in declaration order:
//!
//! ```
//! use mdrepo::schema::{load_schema, NodeKind, ValueType};
//!
//! let schema = load_schema(r#"{
//!     "Data": {
//!         "@attr": {"mtype": "container"},
//!         "Name": {"@attr": {"mtype": "leaf", "dtype": "string"}}
//!     }
//! }"#).unwrap();
//!
//! let root = schema.root();
//! assert_eq!(schema.node(root).name(), "Data");
//! let name = schema.find_child(root, "Name").unwrap();
//! assert_eq!(schema.node(name).kind(), NodeKind::Leaf(ValueType::String));
//! ```
//!
//! Nodes live in an arena owned by [`Schema`] and are addressed by
//! [`SchemaId`]. The schema is immutable once loaded.

use crate::error::SchemaError;
use serde_json::{Map, Value};
use std::fmt;
use std::fs;
use std::path::Path;

const ATTR_KEY: &str = "@attr";

/// Index of a node inside its [`Schema`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchemaId(usize);

impl SchemaId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Scalar type carried by a leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Integer,
    String,
}

impl ValueType {
    fn parse(dtype: &str) -> Option<Self> {
        match dtype {
            "int" => Some(ValueType::Integer),
            "string" => Some(ValueType::String),
            _ => None,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Integer => f.write_str("int"),
            ValueType::String => f.write_str("string"),
        }
    }
}

/// What a schema position describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Named children, JSON object shaped
    Container,
    /// Repeated instances sharing this node's shape, JSON array shaped
    List,
    /// Terminal scalar of the given type
    Leaf(ValueType),
}

impl NodeKind {
    pub fn type_name(&self) -> &str {
        match self {
            NodeKind::Container => "container",
            NodeKind::List => "list",
            NodeKind::Leaf(_) => "leaf",
        }
    }
}

/// One named position in the schema tree.
#[derive(Debug, Clone)]
pub struct SchemaNode {
    name: String,
    kind: NodeKind,
    parent: Option<SchemaId>,
    first_child: Option<SchemaId>,
    last_child: Option<SchemaId>,
    prev: Option<SchemaId>,
    next: Option<SchemaId>,
}

impl SchemaNode {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn parent(&self) -> Option<SchemaId> {
        self.parent
    }

    pub fn first_child(&self) -> Option<SchemaId> {
        self.first_child
    }

    pub fn prev_sibling(&self) -> Option<SchemaId> {
        self.prev
    }

    pub fn next_sibling(&self) -> Option<SchemaId> {
        self.next
    }

    pub fn is_container(&self) -> bool {
        self.kind == NodeKind::Container
    }

    pub fn is_list(&self) -> bool {
        self.kind == NodeKind::List
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf(_))
    }

    pub fn value_type(&self) -> Option<ValueType> {
        match self.kind {
            NodeKind::Leaf(value_type) => Some(value_type),
            _ => None,
        }
    }
}

/// An immutable, loaded schema tree.
#[derive(Debug, Clone)]
pub struct Schema {
    nodes: Vec<SchemaNode>,
}

impl Schema {
    /// The schema root. Always the first node of the arena.
    pub fn root(&self) -> SchemaId {
        SchemaId(0)
    }

    /// Returns the node for `id`.
    ///
    /// Panics if `id` was not produced by this schema.
    pub fn node(&self, id: SchemaId) -> &SchemaNode {
        &self.nodes[id.0]
    }

    pub fn get(&self, id: SchemaId) -> Option<&SchemaNode> {
        self.nodes.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterates the children of `id` in declaration order.
    pub fn children(&self, id: SchemaId) -> Children<'_> {
        Children {
            schema: self,
            next: self.node(id).first_child,
        }
    }

    pub fn find_child(&self, id: SchemaId, name: &str) -> Option<SchemaId> {
        self.children(id).find(|&child| self.node(child).name == name)
    }

    /// Finds a sibling of `id` by name, searching forward first and then
    /// backward along the sibling chain.
    pub fn find_sibling(&self, id: SchemaId, name: &str) -> Option<SchemaId> {
        let mut cursor = self.node(id).next;
        while let Some(sib) = cursor {
            if self.node(sib).name == name {
                return Some(sib);
            }
            cursor = self.node(sib).next;
        }

        let mut cursor = self.node(id).prev;
        while let Some(sib) = cursor {
            if self.node(sib).name == name {
                return Some(sib);
            }
            cursor = self.node(sib).prev;
        }
        None
    }

    /// Leaf children of `id`, in declaration order.
    pub fn leaf_children(&self, id: SchemaId) -> impl Iterator<Item = SchemaId> + '_ {
        self.children(id).filter(move |&child| self.node(child).is_leaf())
    }

    fn push(&mut self, name: &str, kind: NodeKind, parent: Option<SchemaId>) -> SchemaId {
        let id = SchemaId(self.nodes.len());
        self.nodes.push(SchemaNode {
            name: name.to_string(),
            kind,
            parent,
            first_child: None,
            last_child: None,
            prev: None,
            next: None,
        });

        if let Some(parent_id) = parent {
            match self.nodes[parent_id.0].last_child {
                Some(last) => {
                    self.nodes[last.0].next = Some(id);
                    self.nodes[id.0].prev = Some(last);
                }
                None => self.nodes[parent_id.0].first_child = Some(id),
            }
            self.nodes[parent_id.0].last_child = Some(id);
        }
        id
    }
}

/// Iterator over the children of a schema node.
pub struct Children<'a> {
    schema: &'a Schema,
    next: Option<SchemaId>,
}

impl Iterator for Children<'_> {
    type Item = SchemaId;

    fn next(&mut self) -> Option<SchemaId> {
        let current = self.next?;
        self.next = self.schema.node(current).next;
        Some(current)
    }
}

/// Loads a schema from its JSON text.
///
/// # Errors
///
/// - `SchemaError::Json` if the text is not valid JSON
/// - `SchemaError::MissingRoot` if the document has no top-level member
/// - `SchemaError::RootNotContainer` if the root is a list or a leaf
/// - `SchemaError::InvalidNodeType` if a position has no recognized `mtype`
/// - `SchemaError::InvalidDataType` if a leaf has no recognized `dtype`
/// - `SchemaError::LeafWithChildren` if a leaf declares nested positions
pub fn load_schema(text: &str) -> Result<Schema, SchemaError> {
    let document: Value =
        serde_json::from_str(text).map_err(|e| SchemaError::Json { source: e })?;

    let (root_name, root_value) = document
        .as_object()
        .and_then(|members| members.iter().next())
        .ok_or(SchemaError::MissingRoot)?;

    let mut schema = Schema { nodes: Vec::new() };
    let root = build_position(&mut schema, root_name, root_value, None)?;
    if !schema.node(root).is_container() {
        return Err(SchemaError::RootNotContainer {
            name: root_name.to_string(),
        });
    }
    tracing::debug!(root = %root_name, nodes = schema.len(), "schema loaded");
    Ok(schema)
}

/// Reads and loads a schema file.
pub fn load_schema_file(path: &Path) -> Result<Schema, SchemaError> {
    let text = fs::read_to_string(path).map_err(|e| SchemaError::io(path, e))?;
    load_schema(&text)
}

fn build_position(
    schema: &mut Schema,
    name: &str,
    value: &Value,
    parent: Option<SchemaId>,
) -> Result<SchemaId, SchemaError> {
    let members = value
        .as_object()
        .ok_or_else(|| SchemaError::invalid_node_type(name))?;
    let kind = parse_kind(name, members)?;
    let id = schema.push(name, kind, parent);
    tracing::debug!(name, kind = kind.type_name(), "schema position");

    let mut nested = members.iter().filter(|(key, _)| key.as_str() != ATTR_KEY);
    if let NodeKind::Leaf(_) = kind {
        if nested.next().is_some() {
            return Err(SchemaError::LeafWithChildren {
                name: name.to_string(),
            });
        }
        return Ok(id);
    }

    for (child_name, child_value) in nested {
        build_position(schema, child_name, child_value, Some(id))?;
    }
    Ok(id)
}

fn parse_kind(name: &str, members: &Map<String, Value>) -> Result<NodeKind, SchemaError> {
    let attr = members.get(ATTR_KEY).and_then(Value::as_object);
    let mtype = attr.and_then(|a| a.get("mtype")).and_then(Value::as_str);

    match mtype {
        Some("container") => Ok(NodeKind::Container),
        Some("list") => Ok(NodeKind::List),
        Some("leaf") => attr
            .and_then(|a| a.get("dtype"))
            .and_then(Value::as_str)
            .and_then(ValueType::parse)
            .map(NodeKind::Leaf)
            .ok_or_else(|| SchemaError::invalid_data_type(name)),
        _ => Err(SchemaError::invalid_node_type(name)),
    }
}
