//! Loading metadata from JSON and validating object graphs with it.

use pretty_assertions::assert_eq;
use serde_json::json;
use trellis_validator::prelude::*;

const METADATA: &str = r#"{
    "Organization": {
        "constraints": [{"type": "not_blank"}],
        "properties": {
            "name": [
                {"type": "not_blank"},
                {"type": "length", "max": 20, "groups": ["Strict"]}
            ],
            "authors": [
                {"type": "count", "min": 1},
                {"type": "valid", "class": "Author"}
            ]
        }
    },
    "Author": {
        "properties": {
            "firstName": [{"type": "not_blank", "groups": ["Second"]}],
            "lastName": [{"type": "length", "min": 10, "groups": ["First"]}],
            "email": [{"type": "regex", "pattern": "^[^@]+@[^@]+$", "message": "Bad email."}]
        }
    }
}"#;

fn validator() -> Validator {
    Validator::new(MetadataRegistry::from_json_str(METADATA).unwrap())
}

fn describe(violations: &[Violation]) -> Vec<(String, String)> {
    violations
        .iter()
        .map(|v| (v.property_path.to_string(), v.cause.code.to_string()))
        .collect()
}

#[test]
fn default_layer_runs_unlabelled_constraints_only() {
    let data = json!({
        "name": "",
        "authors": [
            {"firstName": "", "lastName": "x", "email": "nope"},
            {"firstName": "Ann", "lastName": "y", "email": "ann@example.org"}
        ]
    });

    let violations = validator().validate_object(
        &data,
        "Organization",
        &GroupLayer::default(),
        &PropertyPath::new().property("data"),
    );

    assert_eq!(
        describe(&violations),
        vec![
            ("data.name".into(), "is_blank".into()),
            ("data.authors[0].email".into(), "regex_failed".into()),
        ]
    );
    assert_eq!(violations[1].message, "Bad email.");
}

#[test]
fn layers_select_their_own_constraints() {
    let data = json!({
        "name": "An organization with a very long name",
        "authors": [{"firstName": "", "lastName": "short", "email": "a@b"}]
    });
    let v = validator();

    let first = v.validate_object(&data, "Organization", &GroupLayer::single("First"), &PropertyPath::new());
    assert_eq!(describe(&first), vec![("authors[0].lastName".into(), "too_short".into())]);

    let combined = v.validate_object(
        &data,
        "Organization",
        &GroupLayer::new(["Second", "Strict"]),
        &PropertyPath::new(),
    );
    assert_eq!(
        describe(&combined),
        vec![
            ("name".into(), "too_long".into()),
            ("authors[0].firstName".into(), "is_blank".into()),
        ]
    );
}

#[test]
fn class_level_constraints_apply_to_the_whole_object() {
    let violations = validator().validate_object(
        &json!({}),
        "Organization",
        &GroupLayer::default(),
        &PropertyPath::new(),
    );
    assert_eq!(
        describe(&violations),
        vec![
            (String::new(), "is_blank".into()),
            ("name".into(), "is_blank".into()),
        ]
    );
}

#[test]
fn empty_collection_fails_count() {
    let violations = validator().validate_object(
        &json!({"name": "Acme", "authors": []}),
        "Organization",
        &GroupLayer::default(),
        &PropertyPath::new(),
    );
    assert_eq!(describe(&violations), vec![("authors".into(), "too_few".into())]);
}

#[test]
fn violations_serialize_with_string_paths() {
    let violations = validator().validate_object(
        &json!({"name": ""}),
        "Organization",
        &GroupLayer::default(),
        &PropertyPath::new(),
    );
    let json = serde_json::to_value(&violations[0]).unwrap();
    assert_eq!(json["property_path"], "name");
    assert_eq!(json["cause"]["constraint"], "not_blank");
    assert_eq!(json["cause"]["severity"], "error");
}
