//! Validation groups.
//!
//! A *group* is a label that selects which constraints run during one
//! evaluation pass. Constraints declared without groups belong to
//! [`DEFAULT_GROUP`]. A [`GroupLayer`] is the set of groups evaluated together
//! in a single pass; a [`GroupSequence`] orders groups into successive layers
//! with stop-on-first-failure semantics (the sequencing itself is driven by the
//! caller, see `trellis-form`).

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use smallvec::SmallVec;

use crate::error::ValidatorError;

/// Group that unlabelled constraints belong to.
pub const DEFAULT_GROUP: &str = "Default";

/// Checks that a group name is usable.
pub fn check_group_name(name: &str) -> Result<(), ValidatorError> {
    if name.trim().is_empty() {
        return Err(ValidatorError::InvalidGroup {
            name: name.to_owned(),
            reason: "must not be blank".into(),
        });
    }
    Ok(())
}

// ============================================================================
// GROUP LAYER
// ============================================================================

/// A set of groups evaluated together in one pass.
///
/// Never empty: constructing a layer from no groups yields the default group.
/// Insertion order is kept (and duplicates dropped) so layers print the way
/// they were declared.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct GroupLayer(SmallVec<[String; 2]>);

impl<'de> Deserialize<'de> for GroupLayer {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<String>::deserialize(deserializer).map(Self::new)
    }
}

impl GroupLayer {
    /// Builds a layer from group names.
    pub fn new<I, S>(groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut layer: SmallVec<[String; 2]> = SmallVec::new();
        for group in groups {
            let group = group.into();
            if !layer.contains(&group) {
                layer.push(group);
            }
        }
        if layer.is_empty() {
            layer.push(DEFAULT_GROUP.to_owned());
        }
        Self(layer)
    }

    /// A layer with exactly one group.
    pub fn single(group: impl Into<String>) -> Self {
        Self::new([group])
    }

    /// Whether `group` is part of this layer.
    #[must_use]
    pub fn contains(&self, group: &str) -> bool {
        self.0.iter().any(|g| g == group)
    }

    /// Whether any of `groups` is part of this layer.
    ///
    /// An empty `groups` slice stands for the default group.
    #[must_use]
    pub fn selects<S: AsRef<str>>(&self, groups: &[S]) -> bool {
        if groups.is_empty() {
            return self.contains(DEFAULT_GROUP);
        }
        groups.iter().any(|g| self.contains(g.as_ref()))
    }

    /// Iterate over group names in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Number of groups in the layer.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false`; present for API symmetry with `len`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for GroupLayer {
    fn default() -> Self {
        Self::single(DEFAULT_GROUP)
    }
}

impl fmt::Display for GroupLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, group) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(group)?;
        }
        Ok(())
    }
}

impl<S: Into<String>> FromIterator<S> for GroupLayer {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}

// ============================================================================
// GROUP SEQUENCE
// ============================================================================

/// An ordered list of groups evaluated one at a time.
///
/// Each group becomes its own [`GroupLayer`]. The caller stops at the first
/// layer that produces a violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupSequence(Vec<String>);

impl GroupSequence {
    /// Creates a sequence from group names, in evaluation order.
    pub fn new<I, S>(groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(groups.into_iter().map(Into::into).collect())
    }

    /// The groups in evaluation order.
    #[must_use]
    pub fn groups(&self) -> &[String] {
        &self.0
    }

    /// One single-group layer per entry, in order.
    pub fn layers(&self) -> impl Iterator<Item = GroupLayer> + '_ {
        self.0.iter().map(|g| GroupLayer::single(g.clone()))
    }

    /// Number of groups in the sequence.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the sequence has no groups.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Rejects empty sequences and blank group names.
    pub fn check(&self) -> Result<(), ValidatorError> {
        if self.0.is_empty() {
            return Err(ValidatorError::InvalidGroup {
                name: String::new(),
                reason: "group sequence must contain at least one group".into(),
            });
        }
        self.0.iter().try_for_each(|g| check_group_name(g))
    }
}
