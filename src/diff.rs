//! Structural diff between two data trees of the same schema.
//!
//! The comparison walks the schema, not the data: at every container level
//! the leaves declared directly under the schema node are compared, then
//! container children are descended and list children are reconciled by
//! key. Records come out in preorder, a level's own record first and its
//! children after it in declaration order.
//!
//! # Examples
//!
//! ```
//! use mdrepo::{diff, load_schema, parse_data, ChangeKind};
//! use std::sync::Arc;
//!
//! let schema = Arc::new(load_schema(r#"{
//!     "Data": {
//!         "@attr": {"mtype": "container"},
//!         "Value": {"@attr": {"mtype": "leaf", "dtype": "int"}}
//!     }
//! }"#).unwrap());
//!
//! let run = parse_data(&schema, r#"{"Data": {"Value": 100}}"#).unwrap();
//! let edit = parse_data(&schema, r#"{"Data": {"Value": 200}}"#).unwrap();
//! let result = diff(&schema, &run, &edit).unwrap();
//!
//! assert_eq!(result.records.len(), 1);
//! assert_eq!(result.records[0].kind, ChangeKind::Modify);
//! assert_eq!(result.stats.modified, 1);
//! ```

use crate::error::DiffError;
use crate::schema::{NodeKind, Schema, SchemaId};
use crate::tree::{DataTree, LeafValue, NodeRef, DEFAULT_LIST_KEY};
use serde::Serialize;
use std::collections::HashSet;

/// The type of change recorded for a container or list instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// Present in the edit tree only
    Add,
    /// Present in the running tree only
    Delete,
    /// Present in both with at least one differing leaf
    Modify,
}

/// One leaf whose value differs between the trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeafDiff<'a> {
    pub run: Option<NodeRef<'a>>,
    pub edit: Option<NodeRef<'a>>,
}

impl<'a> LeafDiff<'a> {
    /// Name of the schema leaf this entry is about.
    pub fn name(&self) -> &'a str {
        self.run
            .or(self.edit)
            .map(|leaf| leaf.name())
            .unwrap_or_default()
    }

    pub fn old_value(&self) -> Option<&'a LeafValue> {
        self.run.and_then(|leaf| leaf.value())
    }

    pub fn new_value(&self) -> Option<&'a LeafValue> {
        self.edit.and_then(|leaf| leaf.value())
    }
}

/// A difference at one container or list-instance level.
///
/// `run` is absent for `Add`, `edit` is absent for `Delete`, and only
/// `Modify` records carry leaf diffs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffRecord<'a> {
    pub kind: ChangeKind,
    pub run: Option<NodeRef<'a>>,
    pub edit: Option<NodeRef<'a>>,
    pub leaf_diffs: Vec<LeafDiff<'a>>,
    path: String,
}

impl DiffRecord<'_> {
    /// Path of the node this record is about, with list instances keyed by
    /// the configured list key.
    ///
    /// An instance whose key is shared with an earlier sibling is shown by
    /// position as `Name[#N]` (see [`NodeRef::display_path`]).
    pub fn path(&self) -> &str {
        &self.path
    }
}

/// Statistics about the diff.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DiffStats {
    /// Number of added containers or list instances
    pub added: usize,
    /// Number of deleted containers or list instances
    pub removed: usize,
    /// Number of modified containers or list instances
    pub modified: usize,
    /// Number of differing leaves across all modify records
    pub leaves: usize,
}

impl DiffStats {
    /// Creates a new DiffStats with all counts at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of records.
    pub fn total_changes(&self) -> usize {
        self.added + self.removed + self.modified
    }

    /// Returns true if there are no changes.
    pub fn is_empty(&self) -> bool {
        self.total_changes() == 0
    }
}

/// The complete diff result, borrowing both compared trees.
#[derive(Debug, Clone, Default)]
pub struct Diff<'a> {
    /// Records in preorder over the schema
    pub records: Vec<DiffRecord<'a>>,
    /// Summary statistics
    pub stats: DiffStats,
}

impl Diff<'_> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if there are no changes.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Configuration for the diff algorithm.
#[derive(Debug, Clone)]
pub struct DiffConfig {
    /// Integer leaf that identifies list instances
    pub list_key: String,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            list_key: DEFAULT_LIST_KEY.to_string(),
        }
    }
}

/// Computes the diff between a running and an edit tree with the default
/// configuration.
///
/// Shorthand for [`compute_diff`] with [`DiffConfig::default`], which keys
/// list instances by their integer `Id` leaf.
pub fn diff<'a>(
    schema: &Schema,
    run: &'a DataTree,
    edit: &'a DataTree,
) -> Result<Diff<'a>, DiffError> {
    compute_diff(schema, run, edit, &DiffConfig::default())
}

/// Computes the diff between a running and an edit tree.
///
/// This is the main entry point for the diff algorithm. It walks the schema
/// from its root and compares the two trees level by level. A level present
/// on one side only becomes a single Add or Delete record for its whole
/// subtree. A level present on both sides becomes a Modify record when at
/// least one of its own leaves differs. List instances are paired by the
/// integer leaf named in `config.list_key`, so reordering instances is not a
/// change.
///
/// # Arguments
///
/// * `schema` - The schema both trees were built from
/// * `run` - The running (old) tree
/// * `edit` - The edit (new) tree
/// * `config` - Configuration options for the diff
///
/// # Returns
///
/// Returns a Diff whose records are in preorder over the schema, together
/// with summary statistics. The records borrow nodes from both trees.
///
/// # Errors
///
/// - `DiffError::SchemaMismatch` if either tree was built from another schema
/// - `DiffError::InvalidKey` if a compared list instance lacks an integer key
///
/// Any error aborts the whole comparison; no partial diff is returned.
///
/// # Examples
///
/// ```
/// use mdrepo::{compute_diff, load_schema, parse_data, ChangeKind, DiffConfig};
/// use std::sync::Arc;
///
/// let schema = Arc::new(load_schema(r#"{
///     "Data": {
///         "@attr": {"mtype": "container"},
///         "ChildList": {
///             "@attr": {"mtype": "list"},
///             "Id": {"@attr": {"mtype": "leaf", "dtype": "int"}}
///         }
///     }
/// }"#).unwrap());
///
/// let run = parse_data(&schema, r#"{"Data": {"ChildList": [{"Id": 1}, {"Id": 2}]}}"#).unwrap();
/// let edit = parse_data(&schema, r#"{"Data": {"ChildList": [{"Id": 1}, {"Id": 3}]}}"#).unwrap();
/// let result = compute_diff(&schema, &run, &edit, &DiffConfig::default()).unwrap();
///
/// assert_eq!(result.records[0].kind, ChangeKind::Delete);
/// assert_eq!(result.records[0].path(), "Data/ChildList[Id=2]");
/// assert_eq!(result.records[1].kind, ChangeKind::Add);
/// assert_eq!(result.records[1].path(), "Data/ChildList[Id=3]");
/// ```
pub fn compute_diff<'a>(
    schema: &Schema,
    run: &'a DataTree,
    edit: &'a DataTree,
    config: &DiffConfig,
) -> Result<Diff<'a>, DiffError> {
    if !std::ptr::eq(run.schema(), schema) || !std::ptr::eq(edit.schema(), schema) {
        return Err(DiffError::SchemaMismatch);
    }

    let mut differ = Differ {
        schema,
        config,
        records: Vec::new(),
    };
    differ.compare_container(schema.root(), Some(run.root()), Some(edit.root()))?;

    let mut stats = DiffStats::new();
    for record in &differ.records {
        match record.kind {
            ChangeKind::Add => stats.added += 1,
            ChangeKind::Delete => stats.removed += 1,
            ChangeKind::Modify => stats.modified += 1,
        }
        stats.leaves += record.leaf_diffs.len();
    }

    Ok(Diff {
        records: differ.records,
        stats,
    })
}

struct Differ<'s, 'a> {
    schema: &'s Schema,
    config: &'s DiffConfig,
    records: Vec<DiffRecord<'a>>,
}

impl<'a> Differ<'_, 'a> {
    fn compare_container(
        &mut self,
        schema_id: SchemaId,
        run: Option<NodeRef<'a>>,
        edit: Option<NodeRef<'a>>,
    ) -> Result<(), DiffError> {
        let (run_node, edit_node) = match (run, edit) {
            (None, None) => return Ok(()),
            (None, Some(_)) => {
                self.push(ChangeKind::Add, run, edit, Vec::new());
                return Ok(());
            }
            (Some(_), None) => {
                self.push(ChangeKind::Delete, run, edit, Vec::new());
                return Ok(());
            }
            (Some(r), Some(e)) => (r, e),
        };

        self.compare_self(schema_id, run_node, edit_node);

        let schema = self.schema;
        for child in schema.children(schema_id) {
            match schema.node(child).kind() {
                NodeKind::Container => self.compare_container(
                    child,
                    run_node.child_by_schema(child),
                    edit_node.child_by_schema(child),
                )?,
                NodeKind::List => self.compare_list(child, run_node, edit_node)?,
                NodeKind::Leaf(_) => {}
            }
        }
        Ok(())
    }

    fn compare_self(&mut self, schema_id: SchemaId, run: NodeRef<'a>, edit: NodeRef<'a>) {
        let mut leaf_diffs = Vec::new();
        for leaf in self.schema.leaf_children(schema_id) {
            let run_leaf = run.child_by_schema(leaf);
            let edit_leaf = edit.child_by_schema(leaf);
            if run_leaf.is_none() && edit_leaf.is_none() {
                continue;
            }

            let old_value = run_leaf.and_then(|l| l.value());
            let new_value = edit_leaf.and_then(|l| l.value());
            if old_value != new_value {
                leaf_diffs.push(LeafDiff {
                    run: run_leaf,
                    edit: edit_leaf,
                });
            }
        }

        if !leaf_diffs.is_empty() {
            self.push(ChangeKind::Modify, Some(run), Some(edit), leaf_diffs);
        }
    }

    /// Pairs instances by key. Run order drives delete and modify records;
    /// edit-only instances are appended afterwards as adds.
    ///
    /// Keys of every edit instance are read up front, so a keyless edit
    /// instance fails the diff even when the run list is empty.
    fn compare_list(
        &mut self,
        list: SchemaId,
        run_parent: NodeRef<'a>,
        edit_parent: NodeRef<'a>,
    ) -> Result<(), DiffError> {
        let edit_keyed = edit_parent
            .instances(list)
            .map(|instance| self.list_key(list, instance).map(|key| (key, instance)))
            .collect::<Result<Vec<_>, DiffError>>()?;

        let mut run_keys = HashSet::new();
        for run_instance in run_parent.instances(list) {
            let key = self.list_key(list, run_instance)?;
            run_keys.insert(key);

            let matched = edit_keyed
                .iter()
                .find(|(edit_key, _)| *edit_key == key)
                .map(|(_, instance)| *instance);
            self.compare_container(list, Some(run_instance), matched)?;
        }

        for (key, edit_instance) in &edit_keyed {
            if !run_keys.contains(key) {
                self.compare_container(list, None, Some(*edit_instance))?;
            }
        }
        Ok(())
    }

    fn list_key(&self, list: SchemaId, instance: NodeRef<'a>) -> Result<i64, DiffError> {
        instance
            .leaf(&self.config.list_key)
            .and_then(|leaf| leaf.value())
            .and_then(LeafValue::as_int)
            .ok_or_else(|| DiffError::InvalidKey {
                list: self.schema.node(list).name().to_string(),
                key: self.config.list_key.clone(),
            })
    }

    fn push(
        &mut self,
        kind: ChangeKind,
        run: Option<NodeRef<'a>>,
        edit: Option<NodeRef<'a>>,
        leaf_diffs: Vec<LeafDiff<'a>>,
    ) {
        let path = edit
            .or(run)
            .map(|node| node.display_path(&self.config.list_key))
            .unwrap_or_default();
        self.records.push(DiffRecord {
            kind,
            run,
            edit,
            leaf_diffs,
            path,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_data;
    use crate::schema::load_schema;
    use std::sync::Arc;

    const MODEL: &str = r#"{
        "Data": {
            "@attr": {"mtype": "container"},
            "Name": {"@attr": {"mtype": "leaf", "dtype": "string"}},
            "Value": {"@attr": {"mtype": "leaf", "dtype": "int"}},
            "ChildList": {
                "@attr": {"mtype": "list"},
                "Id": {"@attr": {"mtype": "leaf", "dtype": "int"}},
                "Value": {"@attr": {"mtype": "leaf", "dtype": "int"}}
            }
        }
    }"#;

    fn schema() -> Arc<Schema> {
        Arc::new(load_schema(MODEL).unwrap())
    }

    #[test]
    fn test_diff_stats_new() {
        let stats = DiffStats::new();
        assert_eq!(stats.added, 0);
        assert_eq!(stats.removed, 0);
        assert_eq!(stats.modified, 0);
        assert!(stats.is_empty());
    }

    #[test]
    fn test_diff_stats_total_changes() {
        let stats = DiffStats {
            added: 2,
            removed: 1,
            modified: 3,
            leaves: 7,
        };
        assert_eq!(stats.total_changes(), 6);
        assert!(!stats.is_empty());
    }

    #[test]
    fn test_leaf_present_on_one_side_differs() {
        let schema = schema();
        let run = parse_data(&schema, r#"{"Data": {"Name": "a"}}"#).unwrap();
        let edit = parse_data(&schema, r#"{"Data": {"Name": "a", "Value": 1}}"#).unwrap();

        let result = diff(&schema, &run, &edit).unwrap();
        assert_eq!(result.records.len(), 1);
        let leaf = result.records[0].leaf_diffs[0];
        assert!(leaf.run.is_none());
        assert_eq!(leaf.name(), "Value");
        assert_eq!(leaf.new_value(), Some(&LeafValue::Int(1)));
    }

    #[test]
    fn test_invalid_key() {
        let schema = schema();
        let run = parse_data(&schema, r#"{"Data": {"ChildList": [{"Value": 1}]}}"#).unwrap();
        let edit = parse_data(&schema, r#"{"Data": {"ChildList": [{"Id": 1}]}}"#).unwrap();

        let err = diff(&schema, &run, &edit).unwrap_err();
        assert!(matches!(err, DiffError::InvalidKey { .. }));
    }

    #[test]
    fn test_custom_list_key() {
        let schema = schema();
        let run = parse_data(&schema, r#"{"Data": {"ChildList": [{"Value": 1}]}}"#).unwrap();
        let edit = parse_data(&schema, r#"{"Data": {"ChildList": [{"Value": 2}]}}"#).unwrap();
        let config = DiffConfig {
            list_key: "Value".to_string(),
        };

        let result = compute_diff(&schema, &run, &edit, &config).unwrap();
        assert_eq!(result.stats.removed, 1);
        assert_eq!(result.stats.added, 1);
    }

    #[test]
    fn test_record_path() {
        let schema = schema();
        let run = parse_data(&schema, r#"{"Data": {"ChildList": [{"Id": 4}]}}"#).unwrap();
        let edit = parse_data(&schema, r#"{"Data": {}}"#).unwrap();

        let result = diff(&schema, &run, &edit).unwrap();
        assert_eq!(result.records[0].kind, ChangeKind::Delete);
        assert_eq!(result.records[0].path(), "Data/ChildList[Id=4]");
    }
}
