//! Data synchronization between submitted values and bound data.
//!
//! A [`DataSync`] turns what a client submitted into the value the node binds
//! (`sync_in`), renders bound data back into its submitted shape (`sync_out`)
//! and assembles a collection from its entries (`rebuild_indices`).

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A value could not be synchronized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{reason}")]
pub struct SyncError {
    pub reason: String,
}

impl SyncError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Converts between submitted and bound values.
pub trait DataSync: fmt::Debug + Send + Sync {
    /// Submitted value to bound data.
    fn sync_in(&self, raw: &Value) -> Result<Value, SyncError>;

    /// Bound data to its submitted representation.
    fn sync_out(&self, data: &Value) -> Result<Value, SyncError>;

    /// Assembles collection data from entries, in tree order.
    ///
    /// The result is dense: entry `i` lands at position `i` regardless of
    /// the entry's key in the tree.
    fn rebuild_indices(&self, entries: Vec<Value>) -> Value {
        Value::Array(entries)
    }
}

/// Passes values through unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IdentitySync;

impl DataSync for IdentitySync {
    fn sync_in(&self, raw: &Value) -> Result<Value, SyncError> {
        Ok(raw.clone())
    }

    fn sync_out(&self, data: &Value) -> Result<Value, SyncError> {
        Ok(data.clone())
    }
}

/// Parses submitted strings as numbers.
///
/// Blank input binds to null. Numbers are accepted as they are.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NumberSync;

impl DataSync for NumberSync {
    fn sync_in(&self, raw: &Value) -> Result<Value, SyncError> {
        match raw {
            Value::Null => Ok(Value::Null),
            Value::Number(_) => Ok(raw.clone()),
            Value::String(s) if s.trim().is_empty() => Ok(Value::Null),
            Value::String(s) => {
                let trimmed = s.trim();
                if let Ok(int) = trimmed.parse::<i64>() {
                    return Ok(Value::from(int));
                }
                trimmed
                    .parse::<f64>()
                    .ok()
                    .and_then(serde_json::Number::from_f64)
                    .map(Value::Number)
                    .ok_or_else(|| SyncError::new(format!("`{s}` is not a number")))
            }
            other => Err(SyncError::new(format!("expected a number, got {other}"))),
        }
    }

    fn sync_out(&self, data: &Value) -> Result<Value, SyncError> {
        match data {
            Value::Null => Ok(Value::String(String::new())),
            Value::Number(n) => Ok(Value::String(n.to_string())),
            other => Err(SyncError::new(format!("expected a number, got {other}"))),
        }
    }
}

/// Which [`DataSync`] a node uses.
///
/// The built-in strategies are loadable from configuration by name; custom
/// collaborators are attached in code.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStrategy {
    #[default]
    Identity,
    Number,
    #[serde(skip)]
    Custom(Arc<dyn DataSync>),
}

impl SyncStrategy {
    /// Wraps a custom collaborator.
    pub fn custom(sync: impl DataSync + 'static) -> Self {
        Self::Custom(Arc::new(sync))
    }

    /// The collaborator to call.
    #[must_use]
    pub fn get(&self) -> &dyn DataSync {
        match self {
            Self::Identity => &IdentitySync,
            Self::Number => &NumberSync,
            Self::Custom(sync) => sync.as_ref(),
        }
    }

    /// Whether this is the pass-through strategy.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        matches!(self, Self::Identity)
    }
}
