use ragkeep_core::{metadata, MetadataFilter, Value};

#[test]
fn metadata_filter_requires_every_pair() {
    let filter = MetadataFilter::equals("namespace", "x").and("file_name", "a.txt");

    assert!(filter.matches(&metadata([
        ("namespace", Value::from("x")),
        ("file_name", Value::from("a.txt")),
        ("file_size", Value::from(10)),
    ])));
    assert!(!filter.matches(&metadata([
        ("namespace", Value::from("x")),
        ("file_name", Value::from("b.txt")),
    ])));
}

#[test]
fn metadata_filter_excludes_missing_keys() {
    let filter = MetadataFilter::equals("namespace", "x");
    assert!(!filter.matches(&metadata([("file_name", "a.txt")])));
}

#[test]
fn metadata_filter_compares_values_exactly() {
    let filter = MetadataFilter::equals("file_size", 1000);
    assert!(filter.matches(&metadata([("file_size", 1000)])));
    assert!(!filter.matches(&metadata([("file_size", "1000")])));
}

#[test]
fn empty_metadata_filter_matches_everything() {
    let filter = MetadataFilter::new();
    assert!(filter.is_empty());
    assert!(filter.matches(&metadata(Vec::<(String, Value)>::new())));
}

#[test]
fn metadata_filter_deserializes_from_json_object() {
    let filter: MetadataFilter =
        serde_json::from_value(serde_json::json!({"namespace": "x", "file_id": "f1"})).unwrap();
    assert_eq!(filter.len(), 2);
    assert_eq!(filter, MetadataFilter::equals("namespace", "x").and("file_id", "f1"));

    let json = serde_json::to_string(&filter).unwrap();
    assert_eq!(json, r#"{"namespace":"x","file_id":"f1"}"#);
}
