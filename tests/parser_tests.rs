use mdrepo::{load_schema, parse_data, parse_value, BuildError, LeafValue, NodeKind, Schema};
use serde_json::json;
use std::sync::Arc;

fn schema() -> Arc<Schema> {
    let text = std::fs::read_to_string("tests/fixtures/model.json").unwrap();
    Arc::new(load_schema(&text).unwrap())
}

#[test]
fn test_parse_leaves() {
    let schema = schema();
    let tree = parse_data(&schema, r#"{"Data": {"Name": "vc1000", "Value": 100}}"#).unwrap();

    let root = tree.root();
    assert_eq!(root.name(), "Data");
    assert_eq!(root.kind(), NodeKind::Container);
    assert!(root.value().is_none());

    let children: Vec<_> = root.children().collect();
    assert_eq!(children.len(), 2);
    assert_eq!(children[0].name(), "Name");
    assert_eq!(children[0].value(), Some(&LeafValue::Str("vc1000".to_string())));
    assert_eq!(children[1].name(), "Value");
    assert_eq!(children[1].value(), Some(&LeafValue::Int(100)));
    assert_eq!(children[1].parent(), Some(root));
}

#[test]
fn test_parse_nested_container() {
    let schema = schema();
    let tree = parse_data(&schema, r#"{"Data": {"Settings": {"Mode": "fast"}}}"#).unwrap();

    let settings = tree.root().first_child().unwrap();
    assert_eq!(settings.name(), "Settings");
    assert_eq!(settings.kind(), NodeKind::Container);
    let mode = settings.leaf("Mode").unwrap();
    assert_eq!(mode.value().and_then(LeafValue::as_str), Some("fast"));
}

#[test]
fn test_list_instances_are_siblings() {
    let schema = schema();
    let tree = parse_data(
        &schema,
        r#"{"Data": {"Name": "n", "ChildList": [{"Id": 1}, {"Id": 2}, {"Id": 3}], "Value": 5}}"#,
    )
    .unwrap();

    let root = tree.root();
    let names: Vec<&str> = root.children().map(|c| c.name()).collect();
    assert_eq!(names, vec!["Name", "ChildList", "ChildList", "ChildList", "Value"]);

    let list = tree.schema().find_child(tree.schema().root(), "ChildList").unwrap();
    let ids: Vec<i64> = root
        .instances(list)
        .map(|instance| {
            assert_eq!(instance.kind(), NodeKind::List);
            instance.leaf("Id").unwrap().value().unwrap().as_int().unwrap()
        })
        .collect();
    assert_eq!(ids, vec![1, 2, 3]);
}

#[test]
fn test_empty_list_adds_no_nodes() {
    let schema = schema();
    let tree = parse_data(&schema, r#"{"Data": {"ChildList": []}}"#).unwrap();
    assert!(tree.root().first_child().is_none());
    assert_eq!(tree.len(), 1);
}

#[test]
fn test_member_order_is_document_order() {
    let schema = schema();
    let tree = parse_data(&schema, r#"{"Data": {"Value": 1, "Name": "x"}}"#).unwrap();
    let names: Vec<&str> = tree.root().children().map(|c| c.name()).collect();
    assert_eq!(names, vec!["Value", "Name"]);
}

#[test]
fn test_unknown_field() {
    let schema = schema();
    let err = parse_data(&schema, r#"{"Data": {"Bogus": 1}}"#).unwrap_err();
    match err {
        BuildError::UnknownField { field, parent } => {
            assert_eq!(field, "Bogus");
            assert_eq!(parent, "Data");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn test_unknown_field_inside_list_instance() {
    let schema = schema();
    let err = parse_data(&schema, r#"{"Data": {"ChildList": [{"Id": 1, "Mode": "x"}]}}"#)
        .unwrap_err();
    assert!(matches!(
        err,
        BuildError::UnknownField { ref parent, .. } if parent == "ChildList"
    ));
}

#[test]
fn test_wrong_root_name() {
    let schema = schema();
    let err = parse_data(&schema, r#"{"Other": {}}"#).unwrap_err();
    assert!(matches!(err, BuildError::UnknownField { ref field, .. } if field == "Other"));
}

#[test]
fn test_extra_top_level_member() {
    let schema = schema();
    let err = parse_data(&schema, r#"{"Data": {}, "Extra": {}}"#).unwrap_err();
    assert!(matches!(err, BuildError::UnknownField { ref field, .. } if field == "Extra"));
}

#[test]
fn test_empty_document() {
    let schema = schema();
    assert!(matches!(
        parse_data(&schema, "{}"),
        Err(BuildError::EmptyDocument)
    ));
}

#[test]
fn test_document_not_an_object() {
    let schema = schema();
    assert!(matches!(
        parse_data(&schema, "[1, 2]"),
        Err(BuildError::NotAnObject { .. })
    ));
}

#[test]
fn test_container_not_an_object() {
    let schema = schema();
    let err = parse_data(&schema, r#"{"Data": {"Settings": [1]}}"#).unwrap_err();
    assert!(matches!(err, BuildError::NotAnObject { ref name } if name == "Settings"));
}

#[test]
fn test_list_not_an_array() {
    let schema = schema();
    let err = parse_data(&schema, r#"{"Data": {"ChildList": {"Id": 1}}}"#).unwrap_err();
    assert!(matches!(err, BuildError::NotAnArray { ref name } if name == "ChildList"));
}

#[test]
fn test_list_element_not_an_object() {
    let schema = schema();
    let err = parse_data(&schema, r#"{"Data": {"ChildList": [1]}}"#).unwrap_err();
    assert!(matches!(err, BuildError::NotAnObject { ref name } if name == "ChildList"));
}

#[test]
fn test_type_mismatch() {
    let schema = schema();

    let err = parse_data(&schema, r#"{"Data": {"Value": "100"}}"#).unwrap_err();
    assert!(matches!(err, BuildError::TypeMismatch { ref name, .. } if name == "Value"));

    let err = parse_data(&schema, r#"{"Data": {"Name": 7}}"#).unwrap_err();
    assert!(matches!(err, BuildError::TypeMismatch { ref name, .. } if name == "Name"));

    let err = parse_data(&schema, r#"{"Data": {"Value": null}}"#).unwrap_err();
    assert!(matches!(err, BuildError::TypeMismatch { .. }));
}

#[test]
fn test_float_truncates() {
    let schema = schema();
    let tree = parse_data(&schema, r#"{"Data": {"Value": 2.75}}"#).unwrap();
    let value = tree.root().leaf("Value").unwrap();
    assert_eq!(value.value(), Some(&LeafValue::Int(2)));
}

#[test]
fn test_invalid_json() {
    let schema = schema();
    assert!(matches!(
        parse_data(&schema, r#"{"Data": "#),
        Err(BuildError::Json { .. })
    ));
}

#[test]
fn test_parse_value_from_envelope() {
    let schema = schema();
    let envelope = json!({
        "msg_type": "update",
        "msg_body": {"Data": {"Name": "vc1000", "ChildList": [{"Id": 7}]}}
    });

    let tree = parse_value(&schema, &envelope["msg_body"]).unwrap();
    assert_eq!(tree.root().name(), "Data");
    assert_eq!(tree.len(), 4);
}

#[test]
fn test_tree_shares_schema() {
    let schema = schema();
    let tree = parse_data(&schema, r#"{"Data": {}}"#).unwrap();
    assert!(Arc::ptr_eq(tree.schema_arc(), &schema));
}
