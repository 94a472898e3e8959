//! Constraint evaluation over a bound form tree.

use std::sync::Arc;

use trellis_validator::{GroupLayer, MetadataRegistry, PropertyPath, Validator, Violation};

use crate::node::FormNode;

/// Evaluates constraints for one group layer.
///
/// Implementations receive the root of a group scope (the tree's root, or a
/// descendant that sets its own `validation_groups`) and return violations
/// addressed by property path relative to it (see
/// [`ViolationMapper`](crate::ViolationMapper) for the notations it maps).
/// Descendants that set their own groups are scopes of their own and are
/// evaluated by a separate call.
pub trait ConstraintEvaluator: Send + Sync {
    fn evaluate(&self, form: &FormNode, layer: &GroupLayer) -> Vec<Violation>;
}

/// Reference evaluator backed by [`Validator`] and class metadata.
///
/// For each enabled node, in tree order:
///
/// - an unsynchronized node yields `"This value is not valid."` at its form
///   path;
/// - a submitted tree root with a `data_class` has its data validated against
///   that class under `data`;
/// - a submitted node's `constraints` are checked against its data under
///   `children[..].data`, with `Valid` cascading into the data;
/// - a submitted compound node that received unknown keys yields
///   `"This form should not contain extra fields."` unless
///   `allow_extra_fields` is set.
///
/// Descendants with their own `validation_groups` are skipped; they are
/// evaluated as scopes of their own. The structural checks do not depend on
/// groups, so they are reported by the first layer evaluated.
#[derive(Debug, Clone, Default)]
pub struct FormValidator {
    validator: Validator,
}

impl FormValidator {
    #[must_use]
    pub fn new(metadata: MetadataRegistry) -> Self {
        Self {
            validator: Validator::new(metadata),
        }
    }

    #[must_use]
    pub fn shared(metadata: Arc<MetadataRegistry>) -> Self {
        Self {
            validator: Validator::shared(metadata),
        }
    }

    #[must_use]
    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    fn visit(
        &self,
        node: &FormNode,
        form_path: PropertyPath,
        layer: &GroupLayer,
        out: &mut Vec<Violation>,
    ) {
        if node.is_disabled() {
            return;
        }
        if !form_path.is_empty() && node.config().validation_groups.is_some() {
            return;
        }

        if !node.synchronized {
            out.push(
                Violation::new("form", "not_synchronized", "This value is not valid.")
                    .at(form_path.clone())
                    .with_value(node.view_data().clone()),
            );
        } else if node.is_submitted() {
            let data_path = form_path.clone().property("data");
            let config = node.config();

            let tree_root = form_path.is_empty() && node.is_root();
            if let Some(class) = config.data_class.as_deref().filter(|_| tree_root) {
                out.extend(
                    self.validator
                        .validate_object(node.data(), class, layer, &data_path),
                );
            }

            out.extend(self.validator.validate_value(
                node.data(),
                &config.constraints,
                config.data_class.as_deref(),
                layer,
                &data_path,
            ));

            if !config.allow_extra_fields && !node.extra_data().is_empty() {
                let extra: Vec<&str> = node.extra_data().keys().map(String::as_str).collect();
                out.push(
                    Violation::new(
                        "form",
                        "extra_fields",
                        "This form should not contain extra fields.",
                    )
                    .at(form_path.clone())
                    .with_param("extra_fields", extra.join(", ")),
                );
            }
        }

        for (key, child) in &node.children {
            self.visit(
                child,
                form_path.clone().property("children").index(key),
                layer,
                out,
            );
        }
    }
}

impl ConstraintEvaluator for FormValidator {
    fn evaluate(&self, form: &FormNode, layer: &GroupLayer) -> Vec<Violation> {
        let mut out = Vec::new();
        self.visit(form, PropertyPath::new(), layer, &mut out);
        tracing::debug!(form = %form.path_display(), %layer, violations = out.len(), "layer evaluated");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FormConfig;
    use crate::groups::ValidationGroups;
    use crate::sync::SyncStrategy;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use trellis_validator::{ClassMetadata, Constraint};

    fn paths(violations: &[Violation]) -> Vec<String> {
        violations
            .iter()
            .map(|v| format!("{} {}", v.property_path, v.cause.code))
            .collect()
    }

    #[test]
    fn form_constraints_use_form_paths() {
        let config = FormConfig::compound()
            .with_field("name", FormConfig::field().constraint(Constraint::not_blank()))
            .with_field(
                "nick",
                FormConfig::field().constraint(Constraint::min_length(3).in_groups(["Strict"])),
            );
        let mut form = FormNode::build("person", config).unwrap();
        form.submit(json!({"name": "", "nick": "x"})).unwrap();

        let evaluator = FormValidator::default();
        assert_eq!(
            paths(&evaluator.evaluate(&form, &GroupLayer::default())),
            vec!["children[name].data is_blank"]
        );
        assert_eq!(
            paths(&evaluator.evaluate(&form, &GroupLayer::single("Strict"))),
            vec!["children[nick].data too_short"]
        );
    }

    #[test]
    fn root_data_class_is_validated_under_data() {
        let metadata = MetadataRegistry::new()
            .with(
                "Person",
                ClassMetadata::new().add_property_constraint("name", Constraint::not_blank()),
            )
            .unwrap();
        let config = FormConfig::compound()
            .data_class("Person")
            .with_field("name", FormConfig::field());
        let mut form = FormNode::build("person", config).unwrap();
        form.submit(json!({"name": ""})).unwrap();

        let violations = FormValidator::new(metadata).evaluate(&form, &GroupLayer::default());
        assert_eq!(paths(&violations), vec!["data.name is_blank"]);
    }

    #[test]
    fn valid_constraint_cascades_into_node_data() {
        let metadata = MetadataRegistry::new()
            .with(
                "Address",
                ClassMetadata::new().add_property_constraint("city", Constraint::not_blank()),
            )
            .unwrap();
        let config = FormConfig::compound().with_field(
            "address",
            FormConfig::compound()
                .data_class("Address")
                .constraint(Constraint::valid())
                .with_field("city", FormConfig::field()),
        );
        let mut form = FormNode::build("person", config).unwrap();
        form.submit(json!({"address": {"city": ""}})).unwrap();

        let violations = FormValidator::new(metadata).evaluate(&form, &GroupLayer::default());
        assert_eq!(paths(&violations), vec!["children[address].data.city is_blank"]);
    }

    #[test]
    fn structural_problems_are_reported() {
        let config = FormConfig::compound()
            .with_field("age", FormConfig::field().sync(SyncStrategy::Number))
            .with_field("off", FormConfig::field().disabled(true).constraint(Constraint::not_null()));
        let mut form = FormNode::build("person", config).unwrap();
        form.submit(json!({"age": "old", "color": "red"})).unwrap();

        let violations = FormValidator::default().evaluate(&form, &GroupLayer::single("Other"));
        assert_eq!(
            paths(&violations),
            vec![" extra_fields", "children[age] not_synchronized"]
        );
        assert_eq!(violations[0].cause.param("extra_fields"), Some("color"));
        assert_eq!(violations[1].cause.invalid_value, json!("old"));
    }

    #[test]
    fn unsubmitted_nodes_are_skipped() {
        let config = FormConfig::compound()
            .with_field("a", FormConfig::field().constraint(Constraint::not_blank()))
            .with_field("b", FormConfig::field().constraint(Constraint::not_blank()));
        let mut form = FormNode::build("pair", config).unwrap();
        form.submit_partial(json!({"a": ""})).unwrap();

        let violations = FormValidator::default().evaluate(&form, &GroupLayer::default());
        assert_eq!(paths(&violations), vec!["children[a].data is_blank"]);
    }

    #[test]
    fn nested_group_scopes_are_evaluated_separately() {
        let config = FormConfig::compound()
            .with_field("name", FormConfig::field().constraint(Constraint::not_blank()))
            .with_field(
                "address",
                FormConfig::compound()
                    .validation_groups(ValidationGroups::groups(["Strict"]))
                    .with_field(
                        "city",
                        FormConfig::field().constraint(Constraint::not_blank().in_groups(["Strict"])),
                    ),
            );
        let mut form = FormNode::build("person", config).unwrap();
        form.submit(json!({"name": "", "address": {"city": ""}})).unwrap();
        let evaluator = FormValidator::default();

        assert_eq!(
            paths(&evaluator.evaluate(&form, &GroupLayer::single("Strict"))),
            Vec::<String>::new()
        );
        let address = form.get("address").unwrap();
        assert_eq!(
            paths(&evaluator.evaluate(address, &GroupLayer::single("Strict"))),
            vec!["children[city].data is_blank"]
        );
    }
}
