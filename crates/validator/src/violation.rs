//! Violation types.
//!
//! A [`Violation`] is one constraint failure, addressed by the property path
//! of the offending value. Violations are plain data; they are produced by an
//! evaluator and later attached to whatever structure consumes them.
//!
//! All string fields use `Cow<'static, str>` so that static codes and messages
//! do not allocate.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::path::PropertyPath;

/// Severity level of a violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Must be fixed (default).
    #[default]
    Error,
    /// Should be addressed but is reported alongside errors.
    Warning,
    /// Informational.
    Info,
}

/// What produced a violation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViolationCause {
    /// Constraint identity, e.g. `"length"` or `"not_blank"`.
    pub constraint: Cow<'static, str>,

    /// Error code for programmatic handling, e.g. `"too_short"`.
    pub code: Cow<'static, str>,

    /// Severity configured on the constraint.
    #[serde(default)]
    pub severity: Severity,

    /// The value that failed.
    #[serde(default)]
    pub invalid_value: serde_json::Value,

    /// Template parameters, typically 0-3 entries: `[("min", "10")]`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<(Cow<'static, str>, Cow<'static, str>)>,
}

impl ViolationCause {
    /// Creates a cause with error severity and no parameters.
    pub fn new(
        constraint: impl Into<Cow<'static, str>>,
        code: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            constraint: constraint.into(),
            code: code.into(),
            severity: Severity::Error,
            invalid_value: serde_json::Value::Null,
            params: Vec::new(),
        }
    }

    /// Looks up a parameter value by key.
    #[must_use]
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k.as_ref() == key)
            .map(|(_, v)| v.as_ref())
    }
}

/// One validation failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    /// Human-readable message in English.
    pub message: Cow<'static, str>,

    /// Where the failing value lives, relative to the validated root.
    pub property_path: PropertyPath,

    /// Constraint identity and details.
    pub cause: ViolationCause,
}

impl Violation {
    /// Creates a violation at the root path.
    pub fn new(
        constraint: impl Into<Cow<'static, str>>,
        code: impl Into<Cow<'static, str>>,
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            message: message.into(),
            property_path: PropertyPath::new(),
            cause: ViolationCause::new(constraint, code),
        }
    }

    /// Sets the property path.
    #[must_use = "builder methods must be chained or built"]
    pub fn at(mut self, path: PropertyPath) -> Self {
        self.property_path = path;
        self
    }

    /// Sets the offending value.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_value(mut self, value: serde_json::Value) -> Self {
        self.cause.invalid_value = value;
        self
    }

    /// Adds a template parameter.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_param(
        mut self,
        key: impl Into<Cow<'static, str>>,
        value: impl Into<Cow<'static, str>>,
    ) -> Self {
        self.cause.params.push((key.into(), value.into()));
        self
    }

    /// Sets the severity.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.cause.severity = severity;
        self
    }

    /// Whether the cause is the named constraint.
    #[must_use]
    pub fn is_caused_by(&self, constraint: &str) -> bool {
        self.cause.constraint == constraint
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.property_path.is_empty() {
            write!(f, "{}: {}", self.cause.code, self.message)
        } else {
            write!(
                f,
                "[{}] {}: {}",
                self.property_path, self.cause.code, self.message
            )
        }
    }
}
