//! Path queries over data trees.
//!
//! # Path Syntax
//!
//! - `Data` - matches the root container by schema name
//! - `Data/Name` - matches child `Name` of the root
//! - `Data/ChildList[Id=22]` - matches the first `ChildList` instance whose
//!   `Id` leaf equals 22
//! - `Data/ChildList[Id=22]/SubChildList[Id=222]/StrLeaf` - predicates can
//!   appear on any segment
//!
//! Integer leaves compare by parsed value, string leaves by exact text.
//! There is no positional index syntax; list instances are told apart only
//! by their predicate.
//!
//! # Examples
//!
//! ```
//! use mdrepo::query::PathQuery;
//!
//! let query = PathQuery::parse("Data/ChildList[Id=1]/Value").unwrap();
//! assert_eq!(query.segments.len(), 3);
//! assert_eq!(query.segments[1].name, "ChildList");
//! assert_eq!(query.segments[1].predicate.as_ref().unwrap().value, "1");
//! ```

use crate::error::QueryError;
use crate::tree::{DataTree, NodeRef};
use std::fmt;

/// A `[Key=Value]` filter on a segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    pub key: String,
    pub value: String,
}

/// A single step of a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSegment {
    pub name: String,
    pub predicate: Option<Predicate>,
}

impl PathSegment {
    fn parse(path: &str, text: &str) -> Result<Self, QueryError> {
        let (name, predicate) = match text.find('[') {
            Some(open) => {
                let inner = text[open + 1..]
                    .strip_suffix(']')
                    .ok_or_else(|| QueryError::malformed(path, "predicate must close the segment"))?;
                if inner.contains('[') || inner.contains(']') {
                    return Err(QueryError::malformed(path, "nested brackets in predicate"));
                }
                let (key, value) = inner
                    .split_once('=')
                    .ok_or_else(|| QueryError::malformed(path, "missing '=' in predicate"))?;
                if key.is_empty() {
                    return Err(QueryError::malformed(path, "empty predicate key"));
                }
                let predicate = Predicate {
                    key: key.to_string(),
                    value: value.to_string(),
                };
                (&text[..open], Some(predicate))
            }
            None => {
                if text.contains(']') {
                    return Err(QueryError::malformed(path, "unbalanced ']'"));
                }
                (text, None)
            }
        };

        if name.is_empty() {
            return Err(QueryError::malformed(path, "empty segment name"));
        }

        Ok(Self {
            name: name.to_string(),
            predicate,
        })
    }

    /// Checks the node's schema name and, if present, the predicate against
    /// the node's leaf children.
    pub fn matches(&self, node: &NodeRef<'_>) -> bool {
        if node.name() != self.name {
            return false;
        }

        match &self.predicate {
            None => true,
            Some(predicate) => node
                .leaf(&predicate.key)
                .and_then(|leaf| leaf.value())
                .is_some_and(|value| value.matches_text(&predicate.value)),
        }
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.predicate {
            Some(p) => write!(f, "{}[{}={}]", self.name, p.key, p.value),
            None => f.write_str(&self.name),
        }
    }
}

/// A compiled path query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathQuery {
    pub segments: Vec<PathSegment>,
}

impl PathQuery {
    /// Compiles a path. The empty path compiles to a query that never
    /// matches.
    pub fn parse(path: &str) -> Result<Self, QueryError> {
        if path.is_empty() {
            return Ok(Self {
                segments: Vec::new(),
            });
        }

        let segments = split_segments(path)?
            .into_iter()
            .map(|text| PathSegment::parse(path, text))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { segments })
    }

    /// Walks `tree` from the root, taking the first matching child at every
    /// step. There is no backtracking once a segment is consumed.
    pub fn resolve<'a>(&self, tree: &'a DataTree) -> Result<NodeRef<'a>, QueryError> {
        let not_found = || QueryError::not_found(self.to_string());

        let (first, rest) = self.segments.split_first().ok_or_else(not_found)?;
        let root = tree.root();
        if !first.matches(&root) {
            return Err(not_found());
        }

        rest.iter().try_fold(root, |current, segment| {
            current
                .children()
                .find(|child| segment.matches(child))
                .ok_or_else(not_found)
        })
    }
}

impl fmt::Display for PathQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}

/// Resolves `path` against `tree`.
///
/// # Errors
///
/// - `QueryError::NotFound` if any segment has no match, or the path is empty
/// - `QueryError::MalformedPath` if the path does not follow the grammar
pub fn resolve<'a>(tree: &'a DataTree, path: &str) -> Result<NodeRef<'a>, QueryError> {
    PathQuery::parse(path)?.resolve(tree)
}

/// Splits on `/` outside of predicate brackets.
fn split_segments(path: &str) -> Result<Vec<&str>, QueryError> {
    let mut segments = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (i, c) in path.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| QueryError::malformed(path, "unbalanced ']'"))?;
            }
            '/' if depth == 0 => {
                segments.push(&path[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }

    if depth != 0 {
        return Err(QueryError::malformed(path, "unterminated predicate"));
    }
    segments.push(&path[start..]);
    Ok(segments)
}
