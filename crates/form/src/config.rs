//! Form definitions.
//!
//! A [`FormConfig`] describes one node: its shape ([`FormKind`]), how its
//! data is validated and how submitted values are bound. Definitions nest, so
//! a whole tree can be loaded from a single JSON document.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use trellis_validator::Constraint;

use crate::error::FormError;
use crate::groups::ValidationGroups;
use crate::sync::{DataSync, SyncStrategy};

/// The shape of a node.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FormKind {
    /// A single value.
    Field,

    /// A fixed set of named children; data is an object.
    Compound {
        #[serde(default)]
        fields: IndexMap<String, FormConfig>,
    },

    /// A resizable list of entries built from one prototype; data is an array.
    Collection(CollectionConfig),
}

/// Options of a collection node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionConfig {
    /// Definition every entry is built from.
    pub entry: Box<FormConfig>,

    /// Submitted keys without an entry create one.
    #[serde(default)]
    pub allow_add: bool,

    /// Entries whose key is not submitted are removed.
    #[serde(default)]
    pub allow_delete: bool,

    /// Surviving entries are renamed `0..n-1` after submission.
    #[serde(default)]
    pub reindex_on_submit: bool,

    /// Blank submitted entries count as absent (requires `allow_delete`).
    #[serde(default)]
    pub delete_empty: bool,
}

impl CollectionConfig {
    #[must_use]
    pub fn new(entry: FormConfig) -> Self {
        Self {
            entry: Box::new(entry),
            allow_add: false,
            allow_delete: false,
            reindex_on_submit: false,
            delete_empty: false,
        }
    }

    #[must_use = "builder methods must be chained or built"]
    pub fn allow_add(mut self, allow: bool) -> Self {
        self.allow_add = allow;
        self
    }

    #[must_use = "builder methods must be chained or built"]
    pub fn allow_delete(mut self, allow: bool) -> Self {
        self.allow_delete = allow;
        self
    }

    #[must_use = "builder methods must be chained or built"]
    pub fn reindex_on_submit(mut self, reindex: bool) -> Self {
        self.reindex_on_submit = reindex;
        self
    }

    #[must_use = "builder methods must be chained or built"]
    pub fn delete_empty(mut self, delete: bool) -> Self {
        self.delete_empty = delete;
        self
    }
}

/// Definition of one form node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormConfig {
    #[serde(flatten)]
    pub kind: FormKind,

    /// Metadata class the root's data is validated against.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_class: Option<String>,

    /// Constraints on this node's data, in addition to class metadata.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<Constraint>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_groups: Option<ValidationGroups>,

    /// Whether the node's data is written into its parent's data.
    #[serde(default = "default_true")]
    pub mapped: bool,

    /// Disabled nodes ignore submitted values and are not validated.
    #[serde(default)]
    pub disabled: bool,

    /// Submitted value used in place of null (or an empty string on fields).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub empty_data: Option<Value>,

    /// Whether errors attached here move to the parent.
    ///
    /// Unset means: fields keep their errors, compound and collection nodes
    /// pass them up.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_bubbling: Option<bool>,

    /// Whether unknown submitted keys are tolerated on compound nodes.
    #[serde(default)]
    pub allow_extra_fields: bool,

    #[serde(default, skip_serializing_if = "SyncStrategy::is_identity")]
    pub sync: SyncStrategy,
}

fn default_true() -> bool {
    true
}

impl FormConfig {
    /// A node of the given kind with default options.
    #[must_use]
    pub fn new(kind: FormKind) -> Self {
        Self {
            kind,
            data_class: None,
            constraints: Vec::new(),
            validation_groups: None,
            mapped: true,
            disabled: false,
            empty_data: None,
            error_bubbling: None,
            allow_extra_fields: false,
            sync: SyncStrategy::Identity,
        }
    }

    #[must_use]
    pub fn field() -> Self {
        Self::new(FormKind::Field)
    }

    #[must_use]
    pub fn compound() -> Self {
        Self::new(FormKind::Compound {
            fields: IndexMap::new(),
        })
    }

    #[must_use]
    pub fn collection(collection: CollectionConfig) -> Self {
        Self::new(FormKind::Collection(collection))
    }

    /// Loads a definition from JSON and checks it.
    pub fn from_json_str(json: &str) -> Result<Self, FormError> {
        let config: Self = serde_json::from_str(json)?;
        config.check()?;
        Ok(config)
    }

    /// Adds a static child definition to a compound (builder-style).
    ///
    /// Has no effect on fields and collections.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_field(mut self, name: impl Into<String>, field: FormConfig) -> Self {
        if let FormKind::Compound { fields } = &mut self.kind {
            fields.insert(name.into(), field);
        }
        self
    }

    #[must_use = "builder methods must be chained or built"]
    pub fn data_class(mut self, class: impl Into<String>) -> Self {
        self.data_class = Some(class.into());
        self
    }

    #[must_use = "builder methods must be chained or built"]
    pub fn constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    #[must_use = "builder methods must be chained or built"]
    pub fn constraints(mut self, constraints: impl IntoIterator<Item = Constraint>) -> Self {
        self.constraints.extend(constraints);
        self
    }

    #[must_use = "builder methods must be chained or built"]
    pub fn validation_groups(mut self, groups: ValidationGroups) -> Self {
        self.validation_groups = Some(groups);
        self
    }

    #[must_use = "builder methods must be chained or built"]
    pub fn mapped(mut self, mapped: bool) -> Self {
        self.mapped = mapped;
        self
    }

    #[must_use = "builder methods must be chained or built"]
    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    #[must_use = "builder methods must be chained or built"]
    pub fn empty_data(mut self, data: Value) -> Self {
        self.empty_data = Some(data);
        self
    }

    #[must_use = "builder methods must be chained or built"]
    pub fn error_bubbling(mut self, bubbling: bool) -> Self {
        self.error_bubbling = Some(bubbling);
        self
    }

    #[must_use = "builder methods must be chained or built"]
    pub fn allow_extra_fields(mut self, allow: bool) -> Self {
        self.allow_extra_fields = allow;
        self
    }

    #[must_use = "builder methods must be chained or built"]
    pub fn sync(mut self, sync: SyncStrategy) -> Self {
        self.sync = sync;
        self
    }

    /// Attaches a custom synchronization collaborator.
    #[must_use = "builder methods must be chained or built"]
    pub fn sync_with(self, sync: impl DataSync + 'static) -> Self {
        self.sync(SyncStrategy::custom(sync))
    }

    /// Whether the node is a single value.
    #[must_use]
    pub fn is_field(&self) -> bool {
        matches!(self.kind, FormKind::Field)
    }

    /// Collection options, if this is a collection.
    #[must_use]
    pub fn as_collection(&self) -> Option<&CollectionConfig> {
        match &self.kind {
            FormKind::Collection(collection) => Some(collection),
            _ => None,
        }
    }

    /// Effective bubbling flag.
    #[must_use]
    pub fn bubbles_errors(&self) -> bool {
        self.error_bubbling.unwrap_or(!self.is_field())
    }

    /// Checks constraints and static validation groups, recursively.
    ///
    /// Malformed groups are reported as [`FormError::InvalidGroups`], the same
    /// error group resolution raises, located by the dotted field path
    /// (`(root)` for the top-level definition).
    pub fn check(&self) -> Result<(), FormError> {
        self.check_at("")
    }

    fn check_at(&self, path: &str) -> Result<(), FormError> {
        self.constraints
            .iter()
            .try_for_each(Constraint::check_definition)?;
        if let Some(groups) = &self.validation_groups {
            groups.check().map_err(|e| FormError::InvalidGroups {
                path: if path.is_empty() { "(root)".to_owned() } else { path.to_owned() },
                reason: e.to_string(),
            })?;
        }

        let nested = |key: &str| {
            if path.is_empty() {
                key.to_owned()
            } else {
                format!("{path}.{key}")
            }
        };
        match &self.kind {
            FormKind::Field => Ok(()),
            FormKind::Compound { fields } => fields
                .iter()
                .try_for_each(|(key, field)| field.check_at(&nested(key))),
            FormKind::Collection(collection) => collection.entry.check_at(&nested("*")),
        }
    }
}
