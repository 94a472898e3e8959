//! End-to-end submissions: binding, group plans, evaluation and mapping.

use std::sync::Arc;

use mockall::{mock, predicate::*};
use pretty_assertions::assert_eq;
use serde_json::json;
use trellis_form::prelude::*;
use trellis_validator::{ClassMetadata, Constraint, GroupLayer, MetadataRegistry, Violation};

mock! {
    pub Evaluator {}

    impl ConstraintEvaluator for Evaluator {
        fn evaluate(&self, form: &FormNode, layer: &GroupLayer) -> Vec<Violation>;
    }
}

fn error_paths(form: &FormNode) -> Vec<String> {
    form.get_errors(true)
        .iter()
        .map(|v| v.property_path.to_string())
        .collect()
}

// ============================================================================
// STATIC GROUPS
// ============================================================================

#[test]
fn static_group_is_evaluated_once() {
    let mut evaluator = MockEvaluator::new();
    evaluator
        .expect_evaluate()
        .with(always(), eq(GroupLayer::single("group")))
        .times(1)
        .returning(|_, _| Vec::new());

    let config = FormConfig::compound()
        .validation_groups(ValidationGroups::groups(["group"]))
        .with_field("firstName", FormConfig::field());
    let mut form = FormFactory::new()
        .with_evaluator(Arc::new(evaluator))
        .create("form", config)
        .unwrap();

    form.submit(json!({})).unwrap();

    assert!(form.get_errors(true).is_empty());
    assert!(form.is_valid());
}

#[test]
fn evaluator_sees_bound_data() {
    let mut evaluator = MockEvaluator::new();
    evaluator
        .expect_evaluate()
        .withf(|form, _| form.data() == &json!({"firstName": "Ann"}))
        .times(1)
        .returning(|_, _| vec![Violation::new("custom", "custom", "nope").at("children[firstName]".parse().unwrap())]);

    let config = FormConfig::compound().with_field("firstName", FormConfig::field());
    let mut form = FormFactory::new()
        .with_evaluator(Arc::new(evaluator))
        .create("form", config)
        .unwrap();

    form.submit(json!({"firstName": "Ann"})).unwrap();

    assert_eq!(form.get("firstName").unwrap().get_errors(false).len(), 1);
}

// ============================================================================
// GROUP SEQUENCES
// ============================================================================

#[test]
fn group_sequence_stops_at_first_failing_group() {
    let config = FormConfig::compound()
        .validation_groups(ValidationGroups::sequence(["First", "Second"]))
        .with_field(
            "field",
            FormConfig::field().constraints([
                Constraint::min_length(10).in_groups(["First"]),
                Constraint::not_blank().in_groups(["Second"]),
            ]),
        );
    let mut form = FormFactory::new()
        .with_metadata(MetadataRegistry::new())
        .create("form", config)
        .unwrap();

    form.submit(json!({"field": "wrong"})).unwrap();

    let errors = form.get_errors(true);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].is_caused_by("length"));
    assert_eq!(
        form.validation_report().unwrap().layers_evaluated,
        vec![GroupLayer::single("First")]
    );
}

#[test]
fn group_sequence_across_class_metadata_and_field_constraints() {
    let metadata = MetadataRegistry::new()
        .with(
            "Author",
            ClassMetadata::new()
                .add_property_constraint("firstName", Constraint::not_blank().in_groups(["Second"])),
        )
        .unwrap();
    let config = FormConfig::compound()
        .data_class("Author")
        .validation_groups(ValidationGroups::sequence(["First", "Second"]))
        .with_field("firstName", FormConfig::field())
        .with_field(
            "lastName",
            FormConfig::field().constraint(Constraint::min_length(10).in_groups(["First"])),
        )
        .with_field(
            "australian",
            FormConfig::field().constraint(Constraint::not_blank().in_groups(["Second"])),
        );
    let mut form = FormFactory::new()
        .with_metadata(metadata)
        .create("form", config)
        .unwrap();

    form.submit(json!({"firstName": "", "lastName": "wrong_1", "australian": ""}))
        .unwrap();

    let errors = form.get_errors(true);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].is_caused_by("length"));
    assert_eq!(errors[0].property_path.to_string(), "children[lastName].data");
}

#[test]
fn later_groups_run_once_earlier_groups_pass() {
    let mut evaluator = MockEvaluator::new();
    let mut seq = mockall::Sequence::new();
    evaluator
        .expect_evaluate()
        .with(always(), eq(GroupLayer::single("First")))
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _| Vec::new());
    evaluator
        .expect_evaluate()
        .with(always(), eq(GroupLayer::single("Second")))
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _| vec![Violation::new("not_blank", "is_blank", "blank")]);

    let config = FormConfig::compound().validation_groups(ValidationGroups::sequence(["First", "Second", "Third"]));
    let mut form = FormFactory::new()
        .with_evaluator(Arc::new(evaluator))
        .create("form", config)
        .unwrap();

    form.submit(json!({})).unwrap();

    let report = form.validation_report().unwrap();
    assert_eq!(report.layers_evaluated.len(), 2);
    assert_eq!(form.get_errors(false).len(), 1);
}

#[test]
fn dynamic_groups_follow_submitted_data() {
    let config = FormConfig::compound()
        .validation_groups(ValidationGroups::dynamic(|form| {
            if form.data()["kind"] == "company" {
                ValidationGroups::groups(["Company"])
            } else {
                ValidationGroups::groups(["Person"])
            }
        }))
        .with_field("kind", FormConfig::field())
        .with_field(
            "vat",
            FormConfig::field().constraint(Constraint::not_blank().in_groups(["Company"])),
        );
    let mut form = FormFactory::new()
        .with_metadata(MetadataRegistry::new())
        .create("form", config)
        .unwrap();

    form.submit(json!({"kind": "person", "vat": ""})).unwrap();
    assert!(form.is_valid());

    form.submit(json!({"kind": "company", "vat": ""})).unwrap();
    assert_eq!(error_paths(&form), vec!["children[vat].data"]);
}

#[test]
fn nested_validation_groups_govern_their_subtree() {
    let config = FormConfig::compound()
        .with_field("name", FormConfig::field().constraint(Constraint::not_blank()))
        .with_field(
            "address",
            FormConfig::compound()
                .validation_groups(ValidationGroups::groups(["Strict"]))
                .with_field(
                    "city",
                    FormConfig::field().constraint(Constraint::not_blank().in_groups(["Strict"])),
                )
                .with_field("zip", FormConfig::field().constraint(Constraint::not_blank())),
        );
    let mut form = FormFactory::new()
        .with_metadata(MetadataRegistry::new())
        .create("person", config)
        .unwrap();

    form.submit(json!({"name": "Ann", "address": {"city": "", "zip": ""}})).unwrap();

    // zip only belongs to the default group, which the address scope does not run.
    assert_eq!(error_paths(&form), vec!["children[address].children[city].data"]);
    assert_eq!(form.node_at(&["address", "city"]).unwrap().get_errors(false).len(), 1);
    assert_eq!(
        form.validation_report().unwrap().layers_evaluated,
        vec![GroupLayer::default(), GroupLayer::single("Strict")]
    );
}

#[test]
fn nested_group_sequence_stops_independently() {
    let config = FormConfig::compound()
        .validation_groups(ValidationGroups::sequence(["First", "Second"]))
        .with_field(
            "name",
            FormConfig::field().constraint(Constraint::min_length(3).in_groups(["First"])),
        )
        .with_field(
            "address",
            FormConfig::compound()
                .validation_groups(ValidationGroups::sequence(["Shape", "Content"]))
                .with_field(
                    "city",
                    FormConfig::field().constraints([
                        Constraint::max_length(3).in_groups(["Shape"]),
                        Constraint::regex("^[A-Z]").unwrap().in_groups(["Content"]),
                    ]),
                ),
        );
    let mut form = FormFactory::new()
        .with_metadata(MetadataRegistry::new())
        .create("person", config)
        .unwrap();

    form.submit(json!({"name": "Al", "address": {"city": "paris"}})).unwrap();

    let mut codes: Vec<_> = form
        .get_errors(true)
        .iter()
        .map(|v| v.cause.code.to_string())
        .collect();
    codes.sort();
    assert_eq!(codes, vec!["too_long", "too_short"]);
    assert_eq!(
        form.validation_report().unwrap().layers_evaluated,
        vec![GroupLayer::single("First"), GroupLayer::single("Shape")]
    );
}

// ============================================================================
// COLLECTIONS
// ============================================================================

fn organization_metadata() -> MetadataRegistry {
    MetadataRegistry::new()
        .with(
            "Author",
            ClassMetadata::new().add_property_constraint("firstName", Constraint::not_blank()),
        )
        .unwrap()
        .with(
            "Organization",
            ClassMetadata::new().add_property_constraint("authors", Constraint::valid_as("Author")),
        )
        .unwrap()
}

fn organization_form(reindex: bool) -> FormNode {
    let author = FormConfig::compound()
        .data_class("Author")
        .with_field("firstName", FormConfig::field())
        .with_field("lastName", FormConfig::field());
    let config = FormConfig::compound()
        .data_class("Organization")
        .with_field(
            "authors",
            FormConfig::collection(
                CollectionConfig::new(author)
                    .allow_add(true)
                    .allow_delete(true)
                    .reindex_on_submit(reindex),
            ),
        );
    FormFactory::new()
        .with_metadata(organization_metadata())
        .create_with_data("organization", config, json!({"authors": []}))
        .unwrap()
}

fn authors_with_gap() -> serde_json::Value {
    json!({
        "authors": {
            "0": {"firstName": "", "lastName": "lastName1"},
            "2": {"firstName": "", "lastName": "lastName3"},
            "3": {"firstName": "", "lastName": "lastName3"}
        }
    })
}

#[test]
fn collection_gaps_shift_data_paths() {
    let mut form = organization_form(false);

    form.submit(authors_with_gap()).unwrap();

    let authors = form.get("authors").unwrap();
    assert!(authors.has("0"));
    assert!(!authors.has("1"));
    assert!(authors.has("2"));
    assert!(authors.has("3"));

    let mut paths = error_paths(&form);
    paths.sort();
    assert_eq!(
        paths,
        vec![
            "data.authors[0].firstName",
            "data.authors[1].firstName",
            "data.authors[2].firstName",
        ]
    );
    // data.authors[1] names no entry, so it lands on the root.
    assert_eq!(form.get_errors(false).len(), 1);
    assert_eq!(form.validation_report().unwrap().unmapped, 1);
    // Keys are matched as stored, so data.authors[2] lands on the entry keyed
    // "2" and the entry keyed "3" receives nothing.
    assert_eq!(
        form.node_at(&["authors", "2", "firstName"])
            .unwrap()
            .get_errors(false)[0]
            .property_path
            .to_string(),
        "data.authors[2].firstName"
    );
    assert!(form.node_at(&["authors", "3", "firstName"]).unwrap().get_errors(false).is_empty());
}

#[test]
fn reindexing_realigns_data_paths() {
    let mut form = organization_form(true);

    form.submit(authors_with_gap()).unwrap();

    let authors = form.get("authors").unwrap();
    assert_eq!(authors.child_keys().collect::<Vec<_>>(), vec!["0", "1", "2"]);
    assert!(!authors.has("3"));

    let mut paths = error_paths(&form);
    paths.sort();
    assert_eq!(
        paths,
        vec![
            "data.authors[0].firstName",
            "data.authors[1].firstName",
            "data.authors[2].firstName",
        ]
    );
    assert!(form.get_errors(false).is_empty());
    for key in ["0", "1", "2"] {
        let first_name = form.node_at(&["authors", key, "firstName"]).unwrap();
        assert_eq!(first_name.get_errors(false).len(), 1, "entry {key}");
    }
}

#[test]
fn unknown_entry_without_allow_add_aborts_submission() {
    let config = FormConfig::compound().with_field(
        "tags",
        FormConfig::collection(CollectionConfig::new(FormConfig::field())),
    );
    let mut form = FormFactory::new()
        .with_metadata(MetadataRegistry::new())
        .create_with_data("post", config, json!({"tags": ["a"]}))
        .unwrap();

    let err = form.submit(json!({"tags": ["a", "b"]})).unwrap_err();

    assert_eq!(err.code(), "FORM_EXTRA_ENTRY");
    assert!(!form.is_submitted());
    assert!(form.validation_report().is_none());
}

// ============================================================================
// OPTIONS
// ============================================================================

#[test]
fn valid_constraint_is_kept_in_constraints_option() {
    let form = FormFactory::new()
        .create("form", FormConfig::compound().constraint(Constraint::valid()))
        .unwrap();
    assert_eq!(form.config().constraints, vec![Constraint::valid()]);
}

#[test]
fn extra_fields_are_rejected_unless_allowed() {
    let config = FormConfig::compound().with_field("name", FormConfig::field());
    let factory = FormFactory::new().with_metadata(MetadataRegistry::new());

    let mut strict = factory.create("form", config.clone()).unwrap();
    strict.submit(json!({"name": "x", "admin": true})).unwrap();
    let errors = strict.get_errors(false);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].message, "This form should not contain extra fields.");

    let mut lenient = factory.create("form", config.allow_extra_fields(true)).unwrap();
    lenient.submit(json!({"name": "x", "admin": true})).unwrap();
    assert!(lenient.is_valid());
}

#[test]
fn unsynchronized_field_gets_its_own_error() {
    let config = FormConfig::compound().with_field("age", FormConfig::field().sync(SyncStrategy::Number));
    let mut form = FormFactory::new()
        .with_metadata(MetadataRegistry::new())
        .create("form", config)
        .unwrap();

    form.submit(json!({"age": "ten"})).unwrap();

    let age = form.get("age").unwrap();
    assert_eq!(age.get_errors(false).len(), 1);
    assert_eq!(age.get_errors(false)[0].message, "This value is not valid.");
    assert!(!form.is_valid());
}

#[test]
fn malformed_dynamic_groups_fail_submission() {
    let config = FormConfig::compound().validation_groups(ValidationGroups::dynamic(|_| {
        ValidationGroups::sequence(Vec::<String>::new())
    }));
    let mut form = FormFactory::new()
        .with_metadata(MetadataRegistry::new())
        .create("form", config)
        .unwrap();

    let err = form.submit(json!({})).unwrap_err();
    assert_eq!(err.code(), "FORM_INVALID_GROUPS");
}

#[test]
fn report_serializes() {
    let config = FormConfig::compound()
        .validation_groups(ValidationGroups::sequence(["First", "Second"]))
        .with_field(
            "field",
            FormConfig::field().constraint(Constraint::min_length(10).in_groups(["First"])),
        );
    let mut form = FormFactory::new()
        .with_metadata(MetadataRegistry::new())
        .create("form", config)
        .unwrap();
    form.submit(json!({"field": "wrong"})).unwrap();

    insta::assert_json_snapshot!(form.validation_report().unwrap(), @r###"
    {
      "layers_evaluated": [
        [
          "First"
        ]
      ],
      "violations": 1,
      "unmapped": 0
    }
    "###);
}
