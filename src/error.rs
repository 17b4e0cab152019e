//! Error types for every stage of the repository pipeline.

use crate::schema::ValueType;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("Invalid node type at schema position {name}")]
    InvalidNodeType { name: String },

    #[error("Invalid data type for leaf {name}")]
    InvalidDataType { name: String },

    #[error("Leaf {name} cannot declare nested positions")]
    LeafWithChildren { name: String },

    #[error("Schema document has no root position")]
    MissingRoot,

    #[error("Schema root {name} must be a container")]
    RootNotContainer { name: String },

    #[error("Invalid JSON in schema: {source}")]
    Json {
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to read schema {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Expected an object for {name}")]
    NotAnObject { name: String },

    #[error("Expected an array for list {name}")]
    NotAnArray { name: String },

    #[error("Unknown field {field} under {parent}")]
    UnknownField { field: String, parent: String },

    #[error("Leaf {name} expects a {expected} value")]
    TypeMismatch { name: String, expected: ValueType },

    #[error("Data document has no root member")]
    EmptyDocument,

    #[error("Out of memory while building data tree")]
    OutOfMemory,

    #[error("Invalid JSON in data: {source}")]
    Json {
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("No node found at {path}")]
    NotFound { path: String },

    #[error("Malformed path {path}: {reason}")]
    MalformedPath { path: String, reason: String },
}

#[derive(Debug, thiserror::Error)]
pub enum DiffError {
    #[error("Trees were not built from the compared schema")]
    SchemaMismatch,

    #[error("List instance of {list} has no integer {key} key")]
    InvalidKey { list: String, key: String },
}

#[derive(Debug, thiserror::Error)]
pub enum SerializeError {
    #[error("Out of memory while serializing")]
    OutOfMemory,

    #[error("Leaf {name} has no serializable value")]
    UnsupportedLeafType { name: String },
}

#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("Failed to serialize to JSON: {source}")]
    JsonSerializationError {
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Diff(#[from] DiffError),

    #[error(transparent)]
    Serialize(#[from] SerializeError),

    #[error("Repository is not initialized")]
    Uninitialized,

    #[error("Failed to read data {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to persist data to {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SchemaError {
    pub fn invalid_node_type(name: impl Into<String>) -> Self {
        Self::InvalidNodeType { name: name.into() }
    }

    pub fn invalid_data_type(name: impl Into<String>) -> Self {
        Self::InvalidDataType { name: name.into() }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl BuildError {
    pub fn not_an_object(name: impl Into<String>) -> Self {
        Self::NotAnObject { name: name.into() }
    }

    pub fn not_an_array(name: impl Into<String>) -> Self {
        Self::NotAnArray { name: name.into() }
    }

    pub fn unknown_field(field: impl Into<String>, parent: impl Into<String>) -> Self {
        Self::UnknownField {
            field: field.into(),
            parent: parent.into(),
        }
    }

    pub fn type_mismatch(name: impl Into<String>, expected: ValueType) -> Self {
        Self::TypeMismatch {
            name: name.into(),
            expected,
        }
    }
}

impl QueryError {
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound { path: path.into() }
    }

    pub fn malformed(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedPath {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl RepoError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn persist(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Persist {
            path: path.into(),
            source,
        }
    }

    /// True when the error is a routine path miss rather than a failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Query(QueryError::NotFound { .. }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_field_display() {
        let err = BuildError::unknown_field("Bogus", "Data");
        assert_eq!(err.to_string(), "Unknown field Bogus under Data");
    }

    #[test]
    fn test_type_mismatch_display() {
        let err = BuildError::type_mismatch("Value", ValueType::Integer);
        assert_eq!(err.to_string(), "Leaf Value expects a int value");
    }

    #[test]
    fn test_query_not_found_display() {
        let err = QueryError::not_found("Data/Missing");
        assert!(err.to_string().contains("Data/Missing"));
    }

    #[test]
    fn test_repo_error_from_build_error() {
        let build_err = BuildError::not_an_array("ChildList");
        let repo_err: RepoError = build_err.into();
        assert!(matches!(repo_err, RepoError::Build(_)));
        assert!(repo_err.to_string().contains("ChildList"));
    }

    #[test]
    fn test_repo_error_is_not_found() {
        let err: RepoError = QueryError::not_found("Data/X").into();
        assert!(err.is_not_found());
        assert!(!RepoError::Uninitialized.is_not_found());
    }
}
