//! The form tree.
//!
//! A [`FormNode`] owns its children in an ordered map. Instead of a parent
//! pointer every node stores its key path from the root, which is all that
//! path reconstruction needs and which reindexing rewrites in place.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::{Map, Value};
use trellis_validator::{PropertyPath, Violation};

use crate::config::{FormConfig, FormKind};
use crate::error::FormError;
use crate::evaluator::ConstraintEvaluator;
use crate::extension::ValidationReport;

/// Binding state of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FormState {
    /// Built, no data yet.
    #[default]
    Unbound,
    /// Initial data was set.
    Bound,
    /// A submission was applied.
    Submitted,
}

/// One node of a form tree.
#[derive(Clone)]
pub struct FormNode {
    pub(crate) name: String,
    pub(crate) path: Vec<String>,
    pub(crate) config: FormConfig,
    pub(crate) children: IndexMap<String, FormNode>,
    pub(crate) data: Value,
    pub(crate) view: Value,
    pub(crate) extra_data: Map<String, Value>,
    pub(crate) errors: Vec<Violation>,
    pub(crate) state: FormState,
    pub(crate) synchronized: bool,
    pub(crate) evaluator: Option<Arc<dyn ConstraintEvaluator>>,
    pub(crate) report: Option<ValidationReport>,
}

impl FormNode {
    /// Builds a root node and its static children.
    pub fn build(name: impl Into<String>, config: FormConfig) -> Result<Self, FormError> {
        config.check()?;
        Self::create(name.into(), config, Vec::new())
    }

    pub(crate) fn create(
        name: String,
        config: FormConfig,
        path: Vec<String>,
    ) -> Result<Self, FormError> {
        check_name(&name)?;

        let mut node = Self {
            name,
            path,
            config,
            children: IndexMap::new(),
            data: Value::Null,
            view: Value::Null,
            extra_data: Map::new(),
            errors: Vec::new(),
            state: FormState::Unbound,
            synchronized: true,
            evaluator: None,
            report: None,
        };

        if let FormKind::Compound { fields } = &node.config.kind {
            let fields = fields.clone();
            for (key, field) in fields {
                let child = Self::create(key.clone(), field, node.child_path(&key))?;
                node.children.insert(key, child);
            }
        }
        Ok(node)
    }

    // ========================================================================
    // TREE
    // ========================================================================

    /// Adds a child built from `config` and returns it.
    ///
    /// When this node already holds data, the child is bound to its slice.
    pub fn add(&mut self, name: impl Into<String>, config: FormConfig) -> Result<&mut Self, FormError> {
        let name = name.into();
        if self.config.is_field() {
            return Err(FormError::NotCompound {
                path: self.path_display(),
            });
        }
        if self.children.contains_key(&name) {
            return Err(FormError::AlreadyExists {
                parent: self.path_display(),
                name,
            });
        }
        config.check()?;

        let mut child = Self::create(name.clone(), config, self.child_path(&name))?;
        if self.state == FormState::Bound && child.config.mapped {
            let slice = self.data_slice(&name).cloned().unwrap_or(Value::Null);
            child.set_data(slice)?;
        }
        tracing::debug!(parent = %self.path_display(), child = %name, "child added");
        Ok(self.children.entry(name).or_insert(child))
    }

    /// Removes a child and returns it.
    ///
    /// Collections only allow this with `allow_delete`.
    pub fn remove(&mut self, key: &str) -> Result<Self, FormError> {
        if self.config.as_collection().is_some_and(|c| !c.allow_delete) {
            return Err(FormError::DeleteNotAllowed {
                collection: self.path_display(),
                key: key.to_owned(),
            });
        }
        let child = self
            .children
            .shift_remove(key)
            .ok_or_else(|| FormError::NotFound {
                parent: self.path_display(),
                name: key.to_owned(),
            })?;
        tracing::debug!(parent = %self.path_display(), child = %key, "child removed");
        Ok(child)
    }

    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.children.contains_key(key)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Self> {
        self.children.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Self> {
        self.children.get_mut(key)
    }

    /// Children in order.
    pub fn children(&self) -> impl Iterator<Item = &Self> {
        self.children.values()
    }

    /// Child keys in order.
    pub fn child_keys(&self) -> impl Iterator<Item = &str> {
        self.children.keys().map(String::as_str)
    }

    #[must_use]
    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Descendant at a key path relative to this node.
    #[must_use]
    pub fn node_at<S: AsRef<str>>(&self, keys: &[S]) -> Option<&Self> {
        keys.iter()
            .try_fold(self, |node, key| node.children.get(key.as_ref()))
    }

    /// Mutable descendant at a key path relative to this node.
    pub fn node_at_mut<S: AsRef<str>>(&mut self, keys: &[S]) -> Option<&mut Self> {
        keys.iter()
            .try_fold(self, |node, key| node.children.get_mut(key.as_ref()))
    }

    // ========================================================================
    // IDENTITY
    // ========================================================================

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Key path from the root; empty for the root itself.
    #[must_use]
    pub fn path(&self) -> &[String] {
        &self.path
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.path.is_empty()
    }

    /// Human-readable location: the root's name, or `a.b.c` below it.
    #[must_use]
    pub fn path_display(&self) -> String {
        if self.path.is_empty() {
            self.name.clone()
        } else {
            self.path.join(".")
        }
    }

    /// Form-addressed property path of this node, `children[a].children[b]`.
    #[must_use]
    pub fn property_path(&self) -> PropertyPath {
        self.path
            .iter()
            .fold(PropertyPath::new(), |path, key| path.property("children").index(key))
    }

    #[must_use]
    pub fn config(&self) -> &FormConfig {
        &self.config
    }

    // ========================================================================
    // DATA & STATE
    // ========================================================================

    /// Bound data.
    #[must_use]
    pub fn data(&self) -> &Value {
        &self.data
    }

    /// Last submitted (or rendered) value.
    #[must_use]
    pub fn view_data(&self) -> &Value {
        &self.view
    }

    /// Submitted keys of a compound node that matched no child.
    #[must_use]
    pub fn extra_data(&self) -> &Map<String, Value> {
        &self.extra_data
    }

    #[must_use]
    pub fn state(&self) -> FormState {
        self.state
    }

    #[must_use]
    pub fn is_submitted(&self) -> bool {
        self.state == FormState::Submitted
    }

    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.config.disabled
    }

    /// Whether the submitted value could be converted into bound data,
    /// for this node and every descendant.
    #[must_use]
    pub fn is_synchronized(&self) -> bool {
        self.synchronized && self.children.values().all(Self::is_synchronized)
    }

    /// Submitted and free of errors anywhere in the subtree.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.is_submitted() && (self.is_disabled() || self.get_errors(true).is_empty())
    }

    // ========================================================================
    // ERRORS
    // ========================================================================

    /// Errors attached to this node; with `recursive`, followed by each
    /// child's errors in child order.
    #[must_use]
    pub fn get_errors(&self, recursive: bool) -> Vec<&Violation> {
        let mut errors: Vec<&Violation> = self.errors.iter().collect();
        if recursive {
            for child in self.children.values() {
                errors.extend(child.get_errors(true));
            }
        }
        errors
    }

    /// Attaches a violation to this node.
    pub fn add_error(&mut self, violation: Violation) {
        self.errors.push(violation);
    }

    /// Report of the last validation run, if this node ran one.
    #[must_use]
    pub fn validation_report(&self) -> Option<&ValidationReport> {
        self.report.as_ref()
    }

    /// Whether submissions of this node run validation.
    #[must_use]
    pub fn has_evaluator(&self) -> bool {
        self.evaluator.is_some()
    }

    pub(crate) fn set_evaluator(&mut self, evaluator: Arc<dyn ConstraintEvaluator>) {
        self.evaluator = Some(evaluator);
    }

    pub(crate) fn clear_errors(&mut self) {
        self.errors.clear();
        self.report = None;
        for child in self.children.values_mut() {
            child.clear_errors();
        }
    }

    // ========================================================================
    // HELPERS
    // ========================================================================

    pub(crate) fn child_path(&self, key: &str) -> Vec<String> {
        let mut path = self.path.clone();
        path.push(key.to_owned());
        path
    }

    /// Rewrites this subtree's key paths below `path`.
    pub(crate) fn rebase(&mut self, path: Vec<String>) {
        for (key, child) in &mut self.children {
            let mut child_path = path.clone();
            child_path.push(key.clone());
            child.rebase(child_path);
        }
        self.path = path;
    }

    fn data_slice(&self, key: &str) -> Option<&Value> {
        match &self.data {
            Value::Object(map) => map.get(key),
            Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        }
    }
}

impl fmt::Debug for FormNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormNode")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("children", &self.children.keys().collect::<Vec<_>>())
            .field("data", &self.data)
            .field("errors", &self.errors.len())
            .field("state", &self.state)
            .field("synchronized", &self.synchronized)
            .field("evaluator", &self.evaluator.is_some())
            .finish_non_exhaustive()
    }
}

/// Node names: a letter, digit or underscore, then letters, digits,
/// underscores, hyphens and colons.
pub(crate) fn check_name(name: &str) -> Result<(), FormError> {
    let invalid = |reason: &str| FormError::InvalidName {
        name: name.to_owned(),
        reason: reason.to_owned(),
    };

    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return Err(invalid("must not be empty"));
    };
    if !(first.is_ascii_alphanumeric() || first == '_') {
        return Err(invalid("must start with a letter, digit or underscore"));
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | ':')) {
        return Err(invalid(
            "may only contain letters, digits, underscores, hyphens and colons",
        ));
    }
    Ok(())
}
