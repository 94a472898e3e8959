/// Error type for validator setup and metadata operations.
///
/// These are programming/configuration errors. Constraint failures are never
/// reported through this type; they become [`Violation`](crate::Violation)s.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidatorError {
    /// A property path string could not be parsed.
    #[error("invalid property path `{path}`: {reason}")]
    InvalidPath { path: String, reason: String },

    /// A constraint definition is malformed (bad regex, inverted bounds, ...).
    #[error("invalid constraint `{constraint}`: {reason}")]
    InvalidConstraint { constraint: String, reason: String },

    /// A group name is empty or otherwise unusable.
    #[error("invalid group name `{name}`: {reason}")]
    InvalidGroup { name: String, reason: String },

    /// No metadata was registered for the requested class.
    #[error("no metadata registered for class `{class}`")]
    UnknownClass { class: String },

    /// Failed to load metadata from its serialized form.
    #[error("failed to load metadata: {error}")]
    Metadata { error: String },
}

impl ValidatorError {
    /// Broad error category for grouping in logs and metrics.
    #[must_use]
    pub fn category(&self) -> &str {
        match self {
            Self::InvalidPath { .. } => "path",
            Self::InvalidConstraint { .. } => "constraint",
            Self::InvalidGroup { .. } => "group",
            Self::UnknownClass { .. } => "lookup",
            Self::Metadata { .. } => "serialization",
        }
    }

    /// Machine-readable error code for programmatic handling.
    #[must_use]
    pub fn code(&self) -> &str {
        match self {
            Self::InvalidPath { .. } => "VALIDATOR_INVALID_PATH",
            Self::InvalidConstraint { .. } => "VALIDATOR_INVALID_CONSTRAINT",
            Self::InvalidGroup { .. } => "VALIDATOR_INVALID_GROUP",
            Self::UnknownClass { .. } => "VALIDATOR_UNKNOWN_CLASS",
            Self::Metadata { .. } => "VALIDATOR_METADATA",
        }
    }

    /// All validator errors are deterministic; retrying with the same input
    /// yields the same result.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        false
    }
}

impl From<serde_json::Error> for ValidatorError {
    fn from(error: serde_json::Error) -> Self {
        Self::Metadata {
            error: error.to_string(),
        }
    }
}
