//! Graph validation for one group layer.

use std::sync::Arc;

use serde_json::Value;

use crate::constraint::{Constraint, ConstraintKind};
use crate::group::GroupLayer;
use crate::metadata::{ClassMetadata, MetadataRegistry};
use crate::path::PropertyPath;
use crate::violation::Violation;

/// Validates JSON values against constraints and class metadata.
///
/// A single call evaluates exactly one [`GroupLayer`]; sequencing layers is
/// the caller's job. Violations are returned in traversal order: class-level
/// constraints first, then properties in declaration order, depth-first.
#[derive(Debug, Clone, Default)]
pub struct Validator {
    metadata: Arc<MetadataRegistry>,
}

impl Validator {
    #[must_use]
    pub fn new(metadata: MetadataRegistry) -> Self {
        Self {
            metadata: Arc::new(metadata),
        }
    }

    /// Builds a validator over a registry shared with other owners.
    #[must_use]
    pub fn shared(metadata: Arc<MetadataRegistry>) -> Self {
        Self { metadata }
    }

    #[must_use]
    pub fn metadata(&self) -> &MetadataRegistry {
        &self.metadata
    }

    /// Validates `value` against the metadata of `class`.
    ///
    /// Unknown classes have no constraints.
    #[must_use]
    pub fn validate_object(
        &self,
        value: &Value,
        class: &str,
        layer: &GroupLayer,
        path: &PropertyPath,
    ) -> Vec<Violation> {
        let mut out = Vec::new();
        self.collect_object(value, class, layer, path, &mut out);
        out
    }

    /// Validates `value` against an explicit constraint list.
    ///
    /// `context_class` is used by `Valid` markers that do not name a class.
    #[must_use]
    pub fn validate_value(
        &self,
        value: &Value,
        constraints: &[Constraint],
        context_class: Option<&str>,
        layer: &GroupLayer,
        path: &PropertyPath,
    ) -> Vec<Violation> {
        let mut out = Vec::new();
        self.collect_value(value, constraints, context_class, layer, path, &mut out);
        out
    }

    fn collect_value(
        &self,
        value: &Value,
        constraints: &[Constraint],
        context_class: Option<&str>,
        layer: &GroupLayer,
        path: &PropertyPath,
        out: &mut Vec<Violation>,
    ) {
        for constraint in constraints.iter().filter(|c| c.selected_by(layer)) {
            if let ConstraintKind::Valid { class } = &constraint.kind {
                match class.as_deref().or(context_class) {
                    Some(class) => self.cascade(value, class, layer, path, out),
                    None => tracing::trace!(%path, "cascade marker without class, skipping"),
                }
            } else if let Some(violation) = constraint.check(value) {
                out.push(violation.at(path.clone()));
            }
        }
    }

    fn cascade(
        &self,
        value: &Value,
        class: &str,
        layer: &GroupLayer,
        path: &PropertyPath,
        out: &mut Vec<Violation>,
    ) {
        match value {
            Value::Array(items) => {
                for (index, item) in items.iter().enumerate() {
                    self.collect_object(item, class, layer, &path.clone().index(index), out);
                }
            }
            Value::Object(_) => self.collect_object(value, class, layer, path, out),
            _ => {}
        }
    }

    fn collect_object(
        &self,
        value: &Value,
        class: &str,
        layer: &GroupLayer,
        path: &PropertyPath,
        out: &mut Vec<Violation>,
    ) {
        let Some(metadata) = self.metadata.get(class) else {
            tracing::trace!(class, "no metadata registered");
            return;
        };
        self.collect_class(value, class, metadata, layer, path, out);
    }

    fn collect_class(
        &self,
        value: &Value,
        class: &str,
        metadata: &ClassMetadata,
        layer: &GroupLayer,
        path: &PropertyPath,
        out: &mut Vec<Violation>,
    ) {
        self.collect_value(value, &metadata.constraints, Some(class), layer, path, out);

        for (property, constraints) in &metadata.properties {
            let field = value.get(property).unwrap_or(&Value::Null);
            let field_path = path.clone().property(property.clone());
            self.collect_value(field, constraints, None, layer, &field_path, out);
        }
    }
}
