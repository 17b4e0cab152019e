//! MDREPO - Schema-governed structured data repository.
//!
//! This library loads a schema describing containers, keyed lists, and typed
//! leaves, builds data trees from JSON against it, addresses nodes with path
//! queries, diffs two trees by list key, and writes canonical JSON back out.
//!
//! # Example
//!
//! ```
//! use mdrepo::{diff, dump, load_schema, parse_data, resolve, LeafValue};
//! use std::sync::Arc;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let schema = Arc::new(load_schema(r#"{
//!     "Data": {
//!         "@attr": {"mtype": "container"},
//!         "ChildList": {
//!             "@attr": {"mtype": "list"},
//!             "Id": {"@attr": {"mtype": "leaf", "dtype": "int"}},
//!             "Name": {"@attr": {"mtype": "leaf", "dtype": "string"}}
//!         }
//!     }
//! }"#)?);
//!
//! let run = parse_data(&schema, r#"{"Data": {"ChildList": [{"Id": 1, "Name": "a"}]}}"#)?;
//! let edit = parse_data(&schema, r#"{"Data": {"ChildList": [{"Id": 1, "Name": "b"}]}}"#)?;
//!
//! // Address a list instance by key
//! let name = resolve(&run, "Data/ChildList[Id=1]/Name")?;
//! assert_eq!(name.value(), Some(&LeafValue::Str("a".to_string())));
//!
//! // Compare the trees
//! let changes = diff(&schema, &run, &edit)?;
//! assert_eq!(changes.stats.modified, 1);
//!
//! // Write canonical JSON
//! assert_eq!(dump(&edit)?, r#"{"Data":{"ChildList":[{"Id":1,"Name":"b"}]}}"#);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

pub mod diff;
pub mod error;
pub mod output;
pub mod parser;
pub mod query;
pub mod repo;
pub mod schema;
pub mod serializer;
pub mod tree;

// Re-export commonly used types for convenience
pub use diff::{
    compute_diff, diff, ChangeKind, Diff, DiffConfig, DiffRecord, DiffStats, LeafDiff,
};
pub use error::{
    BuildError, DiffError, OutputError, QueryError, RepoError, SchemaError, SerializeError,
};
pub use output::{format_diff, OutputFormat, OutputOptions};
pub use parser::{parse_data, parse_value};
pub use query::{resolve, PathQuery, PathSegment, Predicate};
pub use repo::{RepoState, Repository};
pub use schema::{load_schema, load_schema_file, NodeKind, Schema, SchemaId, SchemaNode, ValueType};
pub use serializer::{dump, dump_node};
pub use tree::{DataTree, LeafValue, NodeId, NodeRef, DEFAULT_LIST_KEY};
