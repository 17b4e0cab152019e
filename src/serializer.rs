//! Canonical JSON output for data trees.
//!
//! The output is compact: one object whose single member maps the node's
//! schema name to its body. Members appear in tree order, list instances
//! are emitted as one array per run of same-schema siblings.
//!
//! String values are written verbatim between quotes. No escaping is
//! performed, so a value containing `"` or control characters produces
//! invalid JSON.

use crate::error::SerializeError;
use crate::schema::NodeKind;
use crate::tree::{DataTree, LeafValue, NodeRef};

const INITIAL_CAPACITY: usize = 256;

/// Serializes a whole tree.
///
/// # Examples
///
/// ```
/// use mdrepo::{dump, load_schema, parse_data};
/// use std::sync::Arc;
///
/// let schema = Arc::new(load_schema(r#"{
///     "Data": {
///         "@attr": {"mtype": "container"},
///         "Name": {"@attr": {"mtype": "leaf", "dtype": "string"}}
///     }
/// }"#).unwrap());
/// let tree = parse_data(&schema, r#"{ "Data": { "Name": "vc1000" } }"#).unwrap();
///
/// assert_eq!(dump(&tree).unwrap(), r#"{"Data":{"Name":"vc1000"}}"#);
/// ```
pub fn dump(tree: &DataTree) -> Result<String, SerializeError> {
    dump_node(tree.root())
}

/// Serializes the subtree rooted at `node` as `{"<name>": <body>}`.
///
/// For a list instance the body is that instance's object.
pub fn dump_node(node: NodeRef<'_>) -> Result<String, SerializeError> {
    let mut out = JsonBuffer::with_capacity(INITIAL_CAPACITY)?;
    out.push('{')?;
    write_key(&mut out, node.name())?;
    write_value(&mut out, node)?;
    out.push('}')?;
    Ok(out.into_string())
}

fn write_key(out: &mut JsonBuffer, name: &str) -> Result<(), SerializeError> {
    out.push('"')?;
    out.push_str(name)?;
    out.push_str("\":")
}

fn write_value(out: &mut JsonBuffer, node: NodeRef<'_>) -> Result<(), SerializeError> {
    match node.kind() {
        NodeKind::Container | NodeKind::List => write_body(out, node),
        NodeKind::Leaf(_) => write_leaf(out, node),
    }
}

fn write_body(out: &mut JsonBuffer, node: NodeRef<'_>) -> Result<(), SerializeError> {
    out.push('{')?;
    let mut first = true;
    let mut previous = None;

    for child in node.children() {
        let schema_id = child.schema_id();
        let continues_run = child.kind() == NodeKind::List && previous == Some(schema_id);
        previous = Some(schema_id);
        if continues_run {
            continue;
        }

        if !first {
            out.push(',')?;
        }
        first = false;
        write_key(out, child.name())?;

        if child.kind() == NodeKind::List {
            out.push('[')?;
            for (i, instance) in node.instances(schema_id).enumerate() {
                if i > 0 {
                    out.push(',')?;
                }
                write_body(out, instance)?;
            }
            out.push(']')?;
        } else {
            write_value(out, child)?;
        }
    }

    out.push('}')
}

fn write_leaf(out: &mut JsonBuffer, node: NodeRef<'_>) -> Result<(), SerializeError> {
    match node.value() {
        Some(LeafValue::Int(v)) => out.push_str(&v.to_string()),
        Some(LeafValue::Str(s)) => {
            out.push('"')?;
            out.push_str(s)?;
            out.push('"')
        }
        None => Err(SerializeError::UnsupportedLeafType {
            name: node.name().to_string(),
        }),
    }
}

/// Output buffer that doubles its capacity on overflow, or grows to the
/// exact need when doubling is not enough.
struct JsonBuffer {
    buf: String,
}

impl JsonBuffer {
    fn with_capacity(capacity: usize) -> Result<Self, SerializeError> {
        let mut buf = String::new();
        buf.try_reserve_exact(capacity)
            .map_err(|_| SerializeError::OutOfMemory)?;
        Ok(Self { buf })
    }

    fn push_str(&mut self, s: &str) -> Result<(), SerializeError> {
        let needed = self.buf.len() + s.len();
        if needed > self.buf.capacity() {
            let target = (self.buf.capacity() * 2).max(needed);
            self.buf
                .try_reserve_exact(target - self.buf.len())
                .map_err(|_| SerializeError::OutOfMemory)?;
        }
        self.buf.push_str(s);
        Ok(())
    }

    fn push(&mut self, c: char) -> Result<(), SerializeError> {
        let mut utf8 = [0u8; 4];
        self.push_str(c.encode_utf8(&mut utf8))
    }

    fn into_string(self) -> String {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_doubles_capacity() {
        let mut out = JsonBuffer::with_capacity(4).unwrap();
        out.push_str("abcd").unwrap();
        let before = out.buf.capacity();
        out.push('e').unwrap();
        assert!(out.buf.capacity() >= before * 2);
        assert_eq!(out.into_string(), "abcde");
    }

    #[test]
    fn test_buffer_grows_to_exact_need() {
        let mut out = JsonBuffer::with_capacity(2).unwrap();
        let long = "x".repeat(100);
        out.push_str(&long).unwrap();
        assert!(out.buf.capacity() >= 100);
        assert_eq!(out.into_string(), long);
    }
}
