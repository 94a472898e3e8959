//! Validation after submission, and the factory that wires it in.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use trellis_validator::{GroupLayer, MetadataRegistry, Violation};

use crate::config::FormConfig;
use crate::error::FormError;
use crate::evaluator::{ConstraintEvaluator, FormValidator};
use crate::groups::GroupResolver;
use crate::mapper::ViolationMapper;
use crate::node::FormNode;

/// Outcome of the last validation run on a root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    /// Layers the evaluator was invoked with, in order: the root's plan
    /// first, then the plans of nested group scopes in tree order.
    pub layers_evaluated: Vec<GroupLayer>,
    /// Violations returned by the last evaluated layer of every scope.
    pub violations: usize,
    /// Violations whose path did not resolve and went to the root.
    pub unmapped: usize,
}

impl ValidationReport {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.violations == 0
    }
}

impl FormNode {
    /// Validates the tree and maps the violations onto it.
    ///
    /// The root and every submitted descendant that sets its own
    /// `validation_groups` form group scopes. Each scope resolves its own
    /// plan, is evaluated layer by layer and stops at its first failing
    /// layer; nodes belong to the nearest enclosing scope.
    pub(crate) fn validate(&mut self) -> Result<(), FormError> {
        let Some(evaluator) = self.evaluator.clone() else {
            return Ok(());
        };

        let mut scopes = vec![Vec::new()];
        collect_group_scopes(self, &mut scopes);

        let mut report = ValidationReport::default();
        let mut violations = Vec::new();
        for keys in &scopes {
            let Some(scope) = self.node_at(keys.as_slice()) else {
                continue;
            };
            let prefix = scope.property_path();
            let found = evaluate_scope(scope, evaluator.as_ref(), &mut report.layers_evaluated)?;
            violations.extend(found.into_iter().map(|mut violation| {
                violation.property_path = prefix.join(&violation.property_path);
                violation
            }));
        }

        report.violations = violations.len();
        let mapper = ViolationMapper;
        for violation in violations {
            if !mapper.map(self, violation).is_resolved() {
                report.unmapped += 1;
            }
        }

        tracing::debug!(
            form = %self.path_display(),
            scopes = scopes.len(),
            layers = report.layers_evaluated.len(),
            violations = report.violations,
            unmapped = report.unmapped,
            "validation finished"
        );
        self.report = Some(report);
        Ok(())
    }
}

/// Key paths of submitted, enabled descendants with their own groups.
fn collect_group_scopes(node: &FormNode, scopes: &mut Vec<Vec<String>>) {
    for child in node.children.values() {
        if child.is_disabled() || !child.is_submitted() {
            continue;
        }
        if child.config.validation_groups.is_some() {
            scopes.push(child.path.clone());
        }
        collect_group_scopes(child, scopes);
    }
}

/// Runs one scope's plan; violations are relative to `scope`.
fn evaluate_scope(
    scope: &FormNode,
    evaluator: &dyn ConstraintEvaluator,
    layers: &mut Vec<GroupLayer>,
) -> Result<Vec<Violation>, FormError> {
    let plan = GroupResolver::resolve(scope)?;
    for layer in &plan {
        layers.push(layer.clone());
        let violations = evaluator.evaluate(scope, layer);
        if !violations.is_empty() {
            if plan.is_sequenced() {
                tracing::debug!(form = %scope.path_display(), %layer, "group sequence stopped");
            }
            return Ok(violations);
        }
    }
    Ok(Vec::new())
}

/// Creates root nodes that validate themselves on submission.
#[derive(Clone, Default)]
pub struct FormFactory {
    evaluator: Option<Arc<dyn ConstraintEvaluator>>,
}

impl FormFactory {
    /// A factory whose forms are not validated.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates submitted forms with `evaluator`.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_evaluator(mut self, evaluator: Arc<dyn ConstraintEvaluator>) -> Self {
        self.evaluator = Some(evaluator);
        self
    }

    /// Validates submitted forms with a [`FormValidator`] over `metadata`.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_metadata(self, metadata: MetadataRegistry) -> Self {
        self.with_evaluator(Arc::new(FormValidator::new(metadata)))
    }

    /// Builds a root node.
    pub fn create(&self, name: impl Into<String>, config: FormConfig) -> Result<FormNode, FormError> {
        let mut form = FormNode::build(name, config)?;
        if let Some(evaluator) = &self.evaluator {
            form.set_evaluator(Arc::clone(evaluator));
        }
        Ok(form)
    }

    /// Builds a root node bound to initial data.
    pub fn create_with_data(
        &self,
        name: impl Into<String>,
        config: FormConfig,
        data: Value,
    ) -> Result<FormNode, FormError> {
        let mut form = self.create(name, config)?;
        form.set_data(data)?;
        Ok(form)
    }
}

impl std::fmt::Debug for FormFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormFactory")
            .field("evaluator", &self.evaluator.is_some())
            .finish()
    }
}
