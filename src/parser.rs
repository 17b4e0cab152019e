//! Schema-validated data tree builder.
//!
//! This module turns a JSON data document into a [`DataTree`], checking the
//! shape and leaf types of every member against the [`Schema`] as it goes.
//! The document is an object whose single member is named after the schema
//! root:
//!
//! ```
//! use mdrepo::parser::parse_data;
//! use mdrepo::schema::load_schema;
//! use std::sync::Arc;
//!
//! let schema = Arc::new(load_schema(r#"{
//!     "Data": {
//!         "@attr": {"mtype": "container"},
//!         "Value": {"@attr": {"mtype": "leaf", "dtype": "int"}}
//!     }
//! }"#).unwrap());
//!
//! let tree = parse_data(&schema, r#"{"Data": {"Value": 100}}"#).unwrap();
//! assert_eq!(tree.root().name(), "Data");
//! ```
//!
//! A failed build never yields a partial tree: the arena under construction
//! is dropped together with the error.

use crate::error::BuildError;
use crate::schema::{NodeKind, Schema, SchemaId, ValueType};
use crate::tree::{DataTree, LeafValue, NodeId};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Parses a JSON data document against `schema`.
///
/// # Arguments
///
/// * `schema` - The schema to validate against; the tree keeps a handle to it
/// * `text` - The JSON text of the data document
///
/// # Returns
///
/// Returns the built DataTree, or a BuildError describing the first
/// violation found.
///
/// # Errors
///
/// - `BuildError::Json` if the text is not valid JSON
/// - any shape or type error reported by [`parse_value`]
pub fn parse_data(schema: &Arc<Schema>, text: &str) -> Result<DataTree, BuildError> {
    let document: Value =
        serde_json::from_str(text).map_err(|e| BuildError::Json { source: e })?;
    parse_value(schema, &document)
}

/// Builds a data tree from an already parsed JSON document.
///
/// The document must be an object with exactly one member, named after the
/// schema root, holding the root container. This is the entry point for
/// documents embedded in a larger envelope, where only one sub-object is
/// relevant.
///
/// Members are built in document order. Each member is matched by name
/// against the children of the current schema node and dispatched on that
/// node's kind: containers recurse, lists turn every array element into a
/// sibling instance, and leaves check their JSON type. Integer leaves accept
/// any JSON number; floats truncate toward zero.
///
/// # Arguments
///
/// * `schema` - The schema to validate against
/// * `document` - The parsed JSON document
///
/// # Returns
///
/// Returns the built DataTree. On error no partial tree is returned.
///
/// # Errors
///
/// - `BuildError::NotAnObject` if a container position is not an object
/// - `BuildError::NotAnArray` if a list position is not an array
/// - `BuildError::UnknownField` if a member names no schema child
/// - `BuildError::TypeMismatch` if a leaf value has the wrong JSON type
/// - `BuildError::EmptyDocument` if the document has no members
///
/// # Examples
///
/// ```
/// use mdrepo::{load_schema, parse_value};
/// use serde_json::json;
/// use std::sync::Arc;
///
/// let schema = Arc::new(load_schema(r#"{
///     "Data": {
///         "@attr": {"mtype": "container"},
///         "Name": {"@attr": {"mtype": "leaf", "dtype": "string"}}
///     }
/// }"#).unwrap());
///
/// let envelope = json!({"msg_body": {"Data": {"Name": "vc1000"}}});
/// let tree = parse_value(&schema, &envelope["msg_body"]).unwrap();
/// assert_eq!(tree.len(), 2);
/// ```
pub fn parse_value(schema: &Arc<Schema>, document: &Value) -> Result<DataTree, BuildError> {
    let members = document
        .as_object()
        .ok_or_else(|| BuildError::not_an_object("(document)"))?;
    let root = schema.root();
    let root_name = schema.node(root).name();

    let mut entries = members.iter();
    let (name, value) = entries.next().ok_or(BuildError::EmptyDocument)?;
    if name != root_name {
        return Err(BuildError::unknown_field(name, "(document)"));
    }
    if let Some((extra, _)) = entries.next() {
        return Err(BuildError::unknown_field(extra, "(document)"));
    }

    let mut builder = Builder {
        schema: schema.as_ref(),
        tree: DataTree::new(Arc::clone(schema)),
    };
    builder.build_container(root, value, None)?;
    tracing::debug!(root = root_name, nodes = builder.tree.len(), "data tree built");
    Ok(builder.tree)
}

struct Builder<'s> {
    schema: &'s Schema,
    tree: DataTree,
}

impl Builder<'_> {
    fn build_container(
        &mut self,
        schema_id: SchemaId,
        value: &Value,
        parent: Option<NodeId>,
    ) -> Result<NodeId, BuildError> {
        let schema_node = self.schema.node(schema_id);
        let members = value
            .as_object()
            .ok_or_else(|| BuildError::not_an_object(schema_node.name()))?;

        let id = self.tree.alloc(schema_id, None, parent)?;
        self.build_members(schema_id, members, id)?;
        Ok(id)
    }

    fn build_members(
        &mut self,
        schema_id: SchemaId,
        members: &Map<String, Value>,
        id: NodeId,
    ) -> Result<(), BuildError> {
        let schema = self.schema;
        for (name, value) in members {
            let child = schema
                .find_child(schema_id, name)
                .ok_or_else(|| BuildError::unknown_field(name, schema.node(schema_id).name()))?;

            match schema.node(child).kind() {
                NodeKind::Container => {
                    self.build_container(child, value, Some(id))?;
                }
                NodeKind::List => self.build_list(child, value, id)?,
                NodeKind::Leaf(value_type) => {
                    self.build_leaf(child, value_type, value, id)?;
                }
            }
        }
        Ok(())
    }

    /// Every array element becomes a sibling bound to the list's own schema node.
    fn build_list(
        &mut self,
        schema_id: SchemaId,
        value: &Value,
        parent: NodeId,
    ) -> Result<(), BuildError> {
        let name = self.schema.node(schema_id).name();
        let elements = value
            .as_array()
            .ok_or_else(|| BuildError::not_an_array(name))?;
        tracing::debug!(list = name, instances = elements.len(), "building list");

        for element in elements {
            self.build_container(schema_id, element, Some(parent))?;
        }
        Ok(())
    }

    fn build_leaf(
        &mut self,
        schema_id: SchemaId,
        value_type: ValueType,
        value: &Value,
        parent: NodeId,
    ) -> Result<NodeId, BuildError> {
        let name = self.schema.node(schema_id).name();
        let leaf = match value_type {
            ValueType::String => value.as_str().map(|s| LeafValue::Str(s.to_string())),
            ValueType::Integer => coerce_int(value).map(LeafValue::Int),
        }
        .ok_or_else(|| BuildError::type_mismatch(name, value_type))?;

        self.tree.alloc(schema_id, Some(leaf), Some(parent))
    }
}

/// Coerces a JSON number to i64. Integers convert exactly; floats and
/// out-of-range unsigned values truncate toward zero and saturate.
fn coerce_int(value: &Value) -> Option<i64> {
    let Value::Number(number) = value else {
        return None;
    };
    number
        .as_i64()
        .or_else(|| number.as_u64().map(|u| i64::try_from(u).unwrap_or(i64::MAX)))
        .or_else(|| number.as_f64().map(|f| f as i64))
}
