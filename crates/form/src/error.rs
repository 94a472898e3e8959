use trellis_validator::ValidatorError;

/// Error type for form tree operations.
///
/// These are configuration errors: they abort the call that raised them.
/// Constraint failures never surface here; they are attached to nodes as
/// [`Violation`](trellis_validator::Violation)s.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FormError {
    /// Node name does not meet naming rules.
    #[error("invalid form name `{name}`: {reason}")]
    InvalidName { name: String, reason: String },

    /// A child with the given name already exists.
    #[error("form `{parent}` already has a child named `{name}`")]
    AlreadyExists { parent: String, name: String },

    /// No child with the given name exists.
    #[error("form `{parent}` has no child named `{name}`")]
    NotFound { parent: String, name: String },

    /// Children can only be added to compound and collection nodes.
    #[error("form `{path}` is a field and cannot have children")]
    NotCompound { path: String },

    /// A submitted collection key has no entry and adding is disabled.
    #[error("collection `{collection}` does not allow adding entry `{key}`")]
    ExtraEntry { collection: String, key: String },

    /// An entry was removed explicitly and deleting is disabled.
    #[error("collection `{collection}` does not allow deleting entry `{key}`")]
    DeleteNotAllowed { collection: String, key: String },

    /// Validation groups are malformed.
    #[error("invalid validation groups on `{path}`: {reason}")]
    InvalidGroups { path: String, reason: String },

    /// Dynamic group selection kept returning dynamic selections.
    #[error("dynamic validation groups on `{path}` did not settle after {depth} steps")]
    DynamicGroupsDepth { path: String, depth: usize },

    /// Initial data does not fit the node's shape.
    #[error("invalid data for `{path}`: {reason}")]
    InvalidData { path: String, reason: String },

    /// The data synchronization collaborator rejected initial data.
    #[error("synchronization failed for `{path}`: {reason}")]
    Sync { path: String, reason: String },

    /// Failed to load a form definition from its serialized form.
    #[error("failed to load form definition: {error}")]
    Definition { error: String },

    /// Error raised by the validator layer.
    #[error(transparent)]
    Validator(#[from] ValidatorError),
}

impl FormError {
    /// Broad error category for grouping in logs and metrics.
    #[must_use]
    pub fn category(&self) -> &str {
        match self {
            Self::InvalidName { .. } => "format",
            Self::AlreadyExists { .. } | Self::NotFound { .. } => "lookup",
            Self::NotCompound { .. } | Self::InvalidData { .. } => "shape",
            Self::ExtraEntry { .. } | Self::DeleteNotAllowed { .. } => "collection",
            Self::InvalidGroups { .. } | Self::DynamicGroupsDepth { .. } => "groups",
            Self::Sync { .. } => "sync",
            Self::Definition { .. } => "serialization",
            Self::Validator(inner) => inner.category(),
        }
    }

    /// Machine-readable error code for programmatic handling.
    #[must_use]
    pub fn code(&self) -> &str {
        match self {
            Self::InvalidName { .. } => "FORM_INVALID_NAME",
            Self::AlreadyExists { .. } => "FORM_ALREADY_EXISTS",
            Self::NotFound { .. } => "FORM_NOT_FOUND",
            Self::NotCompound { .. } => "FORM_NOT_COMPOUND",
            Self::ExtraEntry { .. } => "FORM_EXTRA_ENTRY",
            Self::DeleteNotAllowed { .. } => "FORM_DELETE_NOT_ALLOWED",
            Self::InvalidGroups { .. } => "FORM_INVALID_GROUPS",
            Self::DynamicGroupsDepth { .. } => "FORM_DYNAMIC_GROUPS_DEPTH",
            Self::InvalidData { .. } => "FORM_INVALID_DATA",
            Self::Sync { .. } => "FORM_SYNC",
            Self::Definition { .. } => "FORM_DEFINITION",
            Self::Validator(inner) => inner.code(),
        }
    }

    /// Whether the operation might succeed if retried with the same input.
    ///
    /// Every form error is deterministic, so this is always `false`.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        false
    }
}

impl From<serde_json::Error> for FormError {
    fn from(error: serde_json::Error) -> Self {
        Self::Definition {
            error: error.to_string(),
        }
    }
}
