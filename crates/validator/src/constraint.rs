//! Declarative constraints.
//!
//! A [`Constraint`] is a serializable rule plus the groups it belongs to.
//! Value constraints check a single JSON value; [`ConstraintKind::Valid`] is a
//! cascade marker that tells the [`Validator`](crate::Validator) to descend
//! into the value using class metadata.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ValidatorError;
use crate::group::{GroupLayer, check_group_name};
use crate::violation::{Severity, Violation};

/// The rule a [`Constraint`] applies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConstraintKind {
    /// Value must not be null, `false`, an empty string or an empty collection.
    NotBlank,

    /// Value must not be null.
    NotNull,

    /// String length (in chars) must be within bounds. Null is skipped.
    Length {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<usize>,
    },

    /// Numeric value must be within inclusive bounds. Null is skipped.
    Range {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<f64>,
    },

    /// String must match the pattern. Null is skipped.
    Regex { pattern: String },

    /// Array or object must hold a bounded number of entries. Null is skipped.
    Count {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<usize>,
    },

    /// Value must be one of the listed choices. Null is skipped.
    Choice { choices: Vec<Value> },

    /// Cascade into the value. Objects are validated against the metadata of
    /// `class`; arrays have each element validated that way.
    Valid {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        class: Option<String>,
    },
}

impl ConstraintKind {
    /// Stable identity used as [`ViolationCause::constraint`](crate::ViolationCause).
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::NotBlank => "not_blank",
            Self::NotNull => "not_null",
            Self::Length { .. } => "length",
            Self::Range { .. } => "range",
            Self::Regex { .. } => "regex",
            Self::Count { .. } => "count",
            Self::Choice { .. } => "choice",
            Self::Valid { .. } => "valid",
        }
    }
}

/// A rule plus the groups it is evaluated in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    #[serde(flatten)]
    pub kind: ConstraintKind,

    /// Groups this constraint belongs to; empty means the default group.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,

    /// Overrides the built-in message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default)]
    pub severity: Severity,
}

impl Constraint {
    /// Wraps a kind with default groups, message and severity.
    #[must_use]
    pub fn new(kind: ConstraintKind) -> Self {
        Self {
            kind,
            groups: Vec::new(),
            message: None,
            severity: Severity::Error,
        }
    }

    #[must_use]
    pub fn not_blank() -> Self {
        Self::new(ConstraintKind::NotBlank)
    }

    #[must_use]
    pub fn not_null() -> Self {
        Self::new(ConstraintKind::NotNull)
    }

    #[must_use]
    pub fn length(min: Option<usize>, max: Option<usize>) -> Self {
        Self::new(ConstraintKind::Length { min, max })
    }

    #[must_use]
    pub fn min_length(min: usize) -> Self {
        Self::length(Some(min), None)
    }

    #[must_use]
    pub fn max_length(max: usize) -> Self {
        Self::length(None, Some(max))
    }

    #[must_use]
    pub fn range(min: Option<f64>, max: Option<f64>) -> Self {
        Self::new(ConstraintKind::Range { min, max })
    }

    /// Pattern constraint; the pattern is compiled up front to reject typos.
    pub fn regex(pattern: impl Into<String>) -> Result<Self, ValidatorError> {
        let constraint = Self::new(ConstraintKind::Regex {
            pattern: pattern.into(),
        });
        constraint.check_definition()?;
        Ok(constraint)
    }

    #[must_use]
    pub fn count(min: Option<usize>, max: Option<usize>) -> Self {
        Self::new(ConstraintKind::Count { min, max })
    }

    #[must_use]
    pub fn choice(choices: Vec<Value>) -> Self {
        Self::new(ConstraintKind::Choice { choices })
    }

    /// Cascade marker; the class is taken from the surrounding context.
    #[must_use]
    pub fn valid() -> Self {
        Self::new(ConstraintKind::Valid { class: None })
    }

    /// Cascade marker validating against the metadata of `class`.
    #[must_use]
    pub fn valid_as(class: impl Into<String>) -> Self {
        Self::new(ConstraintKind::Valid {
            class: Some(class.into()),
        })
    }

    /// Restricts the constraint to the given groups.
    #[must_use = "builder methods must be chained or built"]
    pub fn in_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups = groups.into_iter().map(Into::into).collect();
        self
    }

    #[must_use = "builder methods must be chained or built"]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    #[must_use = "builder methods must be chained or built"]
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Whether this constraint runs for `layer`.
    ///
    /// A `Valid` marker without explicit groups cascades in every layer; the
    /// constraints it reaches are filtered by their own groups.
    #[must_use]
    pub fn selected_by(&self, layer: &GroupLayer) -> bool {
        (self.is_cascade() && self.groups.is_empty()) || layer.selects(&self.groups)
    }

    /// Whether this is the `Valid` cascade marker.
    #[must_use]
    pub fn is_cascade(&self) -> bool {
        matches!(self.kind, ConstraintKind::Valid { .. })
    }

    /// Rejects definitions that can never be evaluated sensibly.
    pub fn check_definition(&self) -> Result<(), ValidatorError> {
        let invalid = |reason: String| ValidatorError::InvalidConstraint {
            constraint: self.kind.name().to_owned(),
            reason,
        };

        self.groups.iter().try_for_each(|g| check_group_name(g))?;

        match &self.kind {
            ConstraintKind::Length {
                min: Some(min),
                max: Some(max),
            }
            | ConstraintKind::Count {
                min: Some(min),
                max: Some(max),
            } if min > max => Err(invalid(format!("min {min} exceeds max {max}"))),
            ConstraintKind::Range {
                min: Some(min),
                max: Some(max),
            } if min > max => Err(invalid(format!("min {min} exceeds max {max}"))),
            ConstraintKind::Regex { pattern } => regex::Regex::new(pattern)
                .map(|_| ())
                .map_err(|e| invalid(e.to_string())),
            _ => Ok(()),
        }
    }

    /// Checks a single value.
    ///
    /// Returns the violation at the root path; callers position it with
    /// [`Violation::at`]. The cascade marker never fails here.
    #[must_use]
    pub fn check(&self, value: &Value) -> Option<Violation> {
        let failure = match &self.kind {
            ConstraintKind::NotBlank => {
                is_blank(value).then(|| Failure::new("is_blank", "This value should not be blank."))
            }
            ConstraintKind::NotNull => value
                .is_null()
                .then(|| Failure::new("is_null", "This value should not be null.")),
            ConstraintKind::Length { min, max } => check_length(value, *min, *max),
            ConstraintKind::Range { min, max } => check_range(value, *min, *max),
            ConstraintKind::Regex { pattern } => check_regex(value, pattern),
            ConstraintKind::Count { min, max } => check_count(value, *min, *max),
            ConstraintKind::Choice { choices } => (!value.is_null() && !choices.contains(value))
                .then(|| {
                    Failure::new(
                        "no_such_choice",
                        "The value you selected is not a valid choice.",
                    )
                }),
            ConstraintKind::Valid { .. } => None,
        }?;

        let message: Cow<'static, str> = match &self.message {
            Some(custom) => Cow::Owned(custom.clone()),
            None => failure.message,
        };

        let mut violation = Violation::new(self.kind.name(), failure.code, message)
            .with_value(value.clone())
            .with_severity(self.severity);
        violation.cause.params = failure.params;
        Some(violation)
    }
}

/// Whether a value counts as blank.
#[must_use]
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}

struct Failure {
    code: &'static str,
    message: Cow<'static, str>,
    params: Vec<(Cow<'static, str>, Cow<'static, str>)>,
}

impl Failure {
    fn new(code: &'static str, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            code,
            message: message.into(),
            params: Vec::new(),
        }
    }

    fn param(mut self, key: &'static str, value: impl ToString) -> Self {
        self.params.push((Cow::Borrowed(key), Cow::Owned(value.to_string())));
        self
    }
}

fn scalar_text(value: &Value) -> Option<Cow<'_, str>> {
    match value {
        Value::String(s) => Some(Cow::Borrowed(s)),
        Value::Number(n) => Some(Cow::Owned(n.to_string())),
        Value::Bool(b) => Some(Cow::Owned(b.to_string())),
        _ => None,
    }
}

fn check_length(value: &Value, min: Option<usize>, max: Option<usize>) -> Option<Failure> {
    let text = scalar_text(value)?;
    let actual = text.chars().count();
    if let Some(min) = min.filter(|&min| actual < min) {
        return Some(
            Failure::new(
                "too_short",
                format!("This value is too short. It should have {min} characters or more."),
            )
            .param("min", min)
            .param("actual", actual),
        );
    }
    if let Some(max) = max.filter(|&max| actual > max) {
        return Some(
            Failure::new(
                "too_long",
                format!("This value is too long. It should have {max} characters or less."),
            )
            .param("max", max)
            .param("actual", actual),
        );
    }
    None
}

fn check_range(value: &Value, min: Option<f64>, max: Option<f64>) -> Option<Failure> {
    let number = match value {
        Value::Null => return None,
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    let Some(number) = number else {
        return Some(Failure::new(
            "invalid_number",
            "This value should be a valid number.",
        ));
    };
    if let Some(min) = min.filter(|&min| number < min) {
        return Some(
            Failure::new("too_low", format!("This value should be {min} or more."))
                .param("min", min),
        );
    }
    if let Some(max) = max.filter(|&max| number > max) {
        return Some(
            Failure::new("too_high", format!("This value should be {max} or less."))
                .param("max", max),
        );
    }
    None
}

fn check_regex(value: &Value, pattern: &str) -> Option<Failure> {
    let text = scalar_text(value)?;
    let matched = regex::Regex::new(pattern).is_ok_and(|re| re.is_match(&text));
    (!matched).then(|| Failure::new("regex_failed", "This value is not valid.").param("pattern", pattern))
}

fn check_count(value: &Value, min: Option<usize>, max: Option<usize>) -> Option<Failure> {
    let actual = match value {
        Value::Array(a) => a.len(),
        Value::Object(o) => o.len(),
        _ => return None,
    };
    if let Some(min) = min.filter(|&min| actual < min) {
        return Some(
            Failure::new(
                "too_few",
                format!("This collection should contain {min} elements or more."),
            )
            .param("min", min)
            .param("actual", actual),
        );
    }
    if let Some(max) = max.filter(|&max| actual > max) {
        return Some(
            Failure::new(
                "too_many",
                format!("This collection should contain {max} elements or less."),
            )
            .param("max", max)
            .param("actual", actual),
        );
    }
    None
}
