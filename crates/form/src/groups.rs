//! Validation group selection.
//!
//! A node's `validation_groups` option decides which constraints run when its
//! tree is validated. [`GroupResolver`] turns that option into a [`GroupPlan`]:
//! the ordered layers the evaluator is invoked with.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use trellis_validator::{GroupLayer, GroupSequence, group::check_group_name};

use crate::error::FormError;
use crate::node::FormNode;

// ============================================================================
// VALIDATION GROUPS
// ============================================================================

/// Where a node's validation groups come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationGroups {
    /// One layer holding every listed group.
    Static(Vec<String>),

    /// One layer per group, in order; evaluation stops at the first layer
    /// that yields a violation.
    Sequence(GroupSequence),

    /// Selected from the node's current state, after binding.
    #[serde(skip)]
    Dynamic(DynamicGroups),
}

impl ValidationGroups {
    /// Static groups from names.
    pub fn groups<I, S>(groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Static(groups.into_iter().map(Into::into).collect())
    }

    /// Sequenced groups from names.
    pub fn sequence<I, S>(groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Sequence(GroupSequence::new(groups))
    }

    /// Groups chosen by `select` each time the tree is validated.
    pub fn dynamic<F>(select: F) -> Self
    where
        F: Fn(&FormNode) -> ValidationGroups + Send + Sync + 'static,
    {
        Self::Dynamic(DynamicGroups(Arc::new(select)))
    }

    /// Rejects blank group names and empty sequences.
    ///
    /// Dynamic selections can only be checked once they are resolved.
    pub fn check(&self) -> Result<(), trellis_validator::ValidatorError> {
        match self {
            Self::Static(groups) => groups.iter().try_for_each(|g| check_group_name(g)),
            Self::Sequence(sequence) => sequence.check(),
            Self::Dynamic(_) => Ok(()),
        }
    }
}

/// A group selector evaluated against the bound tree.
#[derive(Clone)]
pub struct DynamicGroups(Arc<dyn Fn(&FormNode) -> ValidationGroups + Send + Sync>);

impl DynamicGroups {
    /// Runs the selector.
    #[must_use]
    pub fn select(&self, node: &FormNode) -> ValidationGroups {
        (self.0)(node)
    }
}

impl fmt::Debug for DynamicGroups {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DynamicGroups(..)")
    }
}

impl PartialEq for DynamicGroups {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

// ============================================================================
// GROUP PLAN
// ============================================================================

/// Ordered layers to evaluate, first to last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupPlan {
    layers: Vec<GroupLayer>,
}

impl GroupPlan {
    /// The layers in evaluation order. Never empty.
    #[must_use]
    pub fn layers(&self) -> &[GroupLayer] {
        &self.layers
    }

    pub fn iter(&self) -> impl Iterator<Item = &GroupLayer> {
        self.layers.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Always `false`; a plan has at least the default layer.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Whether the plan has more than one layer.
    #[must_use]
    pub fn is_sequenced(&self) -> bool {
        self.layers.len() > 1
    }
}

impl Default for GroupPlan {
    fn default() -> Self {
        Self {
            layers: vec![GroupLayer::default()],
        }
    }
}

impl<'a> IntoIterator for &'a GroupPlan {
    type Item = &'a GroupLayer;
    type IntoIter = std::slice::Iter<'a, GroupLayer>;

    fn into_iter(self) -> Self::IntoIter {
        self.layers.iter()
    }
}

// ============================================================================
// RESOLVER
// ============================================================================

/// Computes a node's [`GroupPlan`].
///
/// The plan is computed fresh for every validation run; nothing is cached on
/// the node.
#[derive(Debug, Clone, Copy, Default)]
pub struct GroupResolver;

impl GroupResolver {
    /// How many dynamic selections may chain before resolution gives up.
    pub const MAX_DYNAMIC_DEPTH: usize = 8;

    /// Resolves the plan from the node's `validation_groups` option.
    ///
    /// - unset or empty static groups: the default group;
    /// - static groups: one layer with all of them;
    /// - a sequence: one single-group layer per entry;
    /// - dynamic: the selector's result, resolved recursively.
    pub fn resolve(node: &FormNode) -> Result<GroupPlan, FormError> {
        let Some(groups) = &node.config().validation_groups else {
            return Ok(GroupPlan::default());
        };
        Self::resolve_groups(node, groups.clone(), 0)
    }

    fn resolve_groups(
        node: &FormNode,
        groups: ValidationGroups,
        depth: usize,
    ) -> Result<GroupPlan, FormError> {
        let invalid = |reason: String| FormError::InvalidGroups {
            path: node.path_display(),
            reason,
        };

        match groups {
            ValidationGroups::Static(groups) => {
                groups
                    .iter()
                    .try_for_each(|g| check_group_name(g))
                    .map_err(|e| invalid(e.to_string()))?;
                Ok(GroupPlan {
                    layers: vec![GroupLayer::new(groups)],
                })
            }
            ValidationGroups::Sequence(sequence) => {
                sequence.check().map_err(|e| invalid(e.to_string()))?;
                Ok(GroupPlan {
                    layers: sequence.layers().collect(),
                })
            }
            ValidationGroups::Dynamic(select) => {
                if depth >= Self::MAX_DYNAMIC_DEPTH {
                    return Err(FormError::DynamicGroupsDepth {
                        path: node.path_display(),
                        depth,
                    });
                }
                let selected = select.select(node);
                tracing::trace!(path = %node.path_display(), depth, ?selected, "dynamic groups selected");
                Self::resolve_groups(node, selected, depth + 1)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FormConfig;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn node_with(groups: Option<ValidationGroups>) -> FormNode {
        let mut config = FormConfig::compound();
        config.validation_groups = groups;
        FormNode::build("form", config).unwrap()
    }

    #[test]
    fn unset_groups_resolve_to_default() {
        let plan = GroupResolver::resolve(&node_with(None)).unwrap();
        assert_eq!(plan, GroupPlan::default());
        assert!(!plan.is_sequenced());
    }

    #[test]
    fn empty_static_groups_resolve_to_default() {
        let node = node_with(Some(ValidationGroups::Static(Vec::new())));
        let plan = GroupResolver::resolve(&node).unwrap();
        assert_eq!(plan.layers(), &[GroupLayer::default()]);
    }

    #[test]
    fn static_groups_form_one_layer() {
        let node = node_with(Some(ValidationGroups::groups(["a", "b"])));
        let plan = GroupResolver::resolve(&node).unwrap();
        assert_eq!(plan.layers(), &[GroupLayer::new(["a", "b"])]);
    }

    #[test]
    fn sequence_forms_one_layer_per_group() {
        let node = node_with(Some(ValidationGroups::sequence(["First", "Second"])));
        let plan = GroupResolver::resolve(&node).unwrap();
        assert_eq!(
            plan.layers(),
            &[GroupLayer::single("First"), GroupLayer::single("Second")]
        );
        assert!(plan.is_sequenced());
    }

    #[test]
    fn dynamic_groups_see_bound_data() {
        let mut config = FormConfig::field();
        config.validation_groups = Some(ValidationGroups::dynamic(|node| {
            if node.data() == &json!("company") {
                ValidationGroups::sequence(["Company", "Strict"])
            } else {
                ValidationGroups::groups(["Person"])
            }
        }));
        let mut node = FormNode::build("kind", config).unwrap();

        node.submit(json!("person")).unwrap();
        assert_eq!(
            GroupResolver::resolve(&node).unwrap().layers(),
            &[GroupLayer::single("Person")]
        );

        node.submit(json!("company")).unwrap();
        assert_eq!(GroupResolver::resolve(&node).unwrap().len(), 2);
    }

    #[test]
    fn malformed_groups_are_rejected() {
        let node = node_with(None);
        let err = GroupResolver::resolve_groups(&node, ValidationGroups::sequence(Vec::<String>::new()), 0)
            .unwrap_err();
        assert_eq!(err.code(), "FORM_INVALID_GROUPS");

        let err = GroupResolver::resolve_groups(&node, ValidationGroups::groups(["ok", ""]), 0)
            .unwrap_err();
        assert_eq!(err.code(), "FORM_INVALID_GROUPS");
    }

    #[test]
    fn endless_dynamic_selection_is_bounded() {
        fn again(_: &FormNode) -> ValidationGroups {
            ValidationGroups::dynamic(again)
        }
        let mut config = FormConfig::compound();
        config.validation_groups = Some(ValidationGroups::dynamic(again));
        let node = FormNode::build("form", config).unwrap();

        let err = GroupResolver::resolve(&node).unwrap_err();
        assert_eq!(
            err,
            FormError::DynamicGroupsDepth {
                path: "form".into(),
                depth: GroupResolver::MAX_DYNAMIC_DEPTH,
            }
        );
    }

    #[test]
    fn config_shapes() {
        let groups: ValidationGroups = serde_json::from_value(json!({"sequence": ["First", "Second"]})).unwrap();
        assert_eq!(groups, ValidationGroups::sequence(["First", "Second"]));
        let groups: ValidationGroups = serde_json::from_value(json!({"static": ["group"]})).unwrap();
        assert_eq!(groups, ValidationGroups::groups(["group"]));
        assert!(serde_json::from_value::<ValidationGroups>(json!({"sequence": "First"})).is_err());
    }
}
