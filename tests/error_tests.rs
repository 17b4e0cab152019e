use mdrepo::{
    BuildError, DiffError, QueryError, RepoError, SchemaError, SerializeError, ValueType,
};
use std::error::Error;
use std::io;

#[test]
fn test_schema_error_messages() {
    assert_eq!(
        SchemaError::invalid_node_type("Data").to_string(),
        "Invalid node type at schema position Data"
    );
    assert_eq!(
        SchemaError::invalid_data_type("Value").to_string(),
        "Invalid data type for leaf Value"
    );
    assert_eq!(
        SchemaError::MissingRoot.to_string(),
        "Schema document has no root position"
    );
    assert_eq!(
        SchemaError::RootNotContainer {
            name: "Data".to_string()
        }
        .to_string(),
        "Schema root Data must be a container"
    );
}

#[test]
fn test_schema_io_error_has_source() {
    let err = SchemaError::io("model.json", io::Error::new(io::ErrorKind::NotFound, "gone"));
    assert!(err.to_string().contains("model.json"));
    assert!(err.source().is_some());
}

#[test]
fn test_build_error_messages() {
    assert_eq!(
        BuildError::not_an_object("Settings").to_string(),
        "Expected an object for Settings"
    );
    assert_eq!(
        BuildError::not_an_array("ChildList").to_string(),
        "Expected an array for list ChildList"
    );
    assert_eq!(
        BuildError::type_mismatch("Name", ValueType::String).to_string(),
        "Leaf Name expects a string value"
    );
}

#[test]
fn test_query_error_messages() {
    let err = QueryError::malformed("Data/[", "empty segment name");
    assert_eq!(err.to_string(), "Malformed path Data/[: empty segment name");
}

#[test]
fn test_diff_error_messages() {
    let err = DiffError::InvalidKey {
        list: "ChildList".to_string(),
        key: "Id".to_string(),
    };
    assert_eq!(
        err.to_string(),
        "List instance of ChildList has no integer Id key"
    );
}

#[test]
fn test_repo_error_is_transparent() {
    let err: RepoError = SerializeError::UnsupportedLeafType {
        name: "Value".to_string(),
    }
    .into();
    assert_eq!(err.to_string(), "Leaf Value has no serializable value");

    let err: RepoError = DiffError::SchemaMismatch.into();
    assert!(matches!(err, RepoError::Diff(DiffError::SchemaMismatch)));
}

#[test]
fn test_repo_persist_error() {
    let err = RepoError::persist(
        "/tmp/data.json",
        io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
    );
    assert!(err.to_string().starts_with("Failed to persist data to /tmp/data.json"));
    assert!(!err.is_not_found());
}
