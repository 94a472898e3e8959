//! Attaching evaluator violations to form nodes.
//!
//! Violations arrive addressed by property path relative to the validated
//! root. Two notations are understood and may be combined:
//!
//! - form-addressed, `children[a].children[b]`, optionally followed by
//!   `.data` and further data segments;
//! - data-addressed, `data.a[0].b`, where every segment names a child key.
//!
//! The empty path and a bare `data` address the root. Index segments match
//! the child key as it is currently stored in the tree, so without
//! reindexing a dense data index can point at a different entry, or at none.

use trellis_validator::{PathElement, PropertyPath, Violation};

use crate::node::FormNode;

/// Where a violation ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapOutcome {
    /// The path resolved; the violation sits on the node at this key path
    /// (after bubbling).
    Attached(Vec<String>),
    /// The path did not resolve; the violation sits on the root.
    Fallback,
}

impl MapOutcome {
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Attached(_))
    }
}

/// Maps violations onto a form tree. Mapping is total: every violation is
/// attached somewhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct ViolationMapper;

impl ViolationMapper {
    /// Resolves `path` to a key path below `root`, or `None` if any segment
    /// does not match the tree.
    #[must_use]
    pub fn resolve(&self, root: &FormNode, path: &PropertyPath) -> Option<Vec<String>> {
        let mut node = root;
        let mut keys = Vec::new();
        let mut rest = path.elements();

        while let [PathElement::Property(children), PathElement::Index(key), tail @ ..] = rest {
            if children != "children" {
                break;
            }
            node = node.children.get(key)?;
            keys.push(key.clone());
            rest = tail;
        }

        let data_segments = match rest {
            [] => return Some(keys),
            [PathElement::Property(data), tail @ ..] if data == "data" => tail,
            _ => return None,
        };

        for element in data_segments {
            if node.config.is_field() {
                // The remaining segments address inside the field's value.
                break;
            }
            let child = node
                .children
                .get(element.key())
                .filter(|child| child.config.mapped)?;
            keys.push(element.key().to_owned());
            node = child;
        }
        Some(keys)
    }

    /// Attaches `violation` to the node its path addresses, or to the root.
    ///
    /// Resolved violations then move up while the target node bubbles its
    /// errors, stopping at the root.
    pub fn map(&self, root: &mut FormNode, violation: Violation) -> MapOutcome {
        let Some(mut keys) = self.resolve(root, &violation.property_path) else {
            tracing::warn!(
                form = %root.path_display(),
                path = %violation.property_path,
                code = %violation.cause.code,
                "violation path does not match the form tree, attaching to root"
            );
            root.add_error(violation);
            return MapOutcome::Fallback;
        };

        while !keys.is_empty()
            && root
                .node_at(keys.as_slice())
                .is_some_and(|node| node.config.bubbles_errors())
        {
            keys.pop();
        }

        match root.node_at_mut(keys.as_slice()) {
            Some(target) => target.add_error(violation),
            None => root.add_error(violation),
        }
        MapOutcome::Attached(keys)
    }
}
