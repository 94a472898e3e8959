//! Binding initial data and submitted values onto a form tree.
//!
//! Submission runs in two passes. The first walks the tree read-only and
//! rejects input the configuration forbids (unknown collection keys without
//! `allow_add`, invalid entry names), so a failing submission leaves the tree
//! untouched. The second applies the input.

use std::borrow::Cow;

use serde_json::{Map, Value};
use trellis_validator::is_blank;

use crate::config::FormKind;
use crate::error::FormError;
use crate::node::{FormNode, FormState, check_name};

impl FormNode {
    // ========================================================================
    // INITIAL DATA
    // ========================================================================

    /// Binds initial data to this node and its descendants.
    ///
    /// Collections rebuild their entries from the data: arrays give keys
    /// `0..n-1`, objects keep their keys.
    pub fn set_data(&mut self, data: Value) -> Result<(), FormError> {
        let data = match self.config.kind {
            FormKind::Field => data,
            FormKind::Compound { .. } => {
                if !(data.is_object() || data.is_null()) {
                    return Err(self.invalid_data("expected an object or null"));
                }
                for (key, child) in &mut self.children {
                    if child.config.mapped {
                        child.set_data(data.get(key).cloned().unwrap_or(Value::Null))?;
                    }
                }
                if data.is_null() {
                    data
                } else {
                    self.merge_children_data(data)
                }
            }
            FormKind::Collection(_) => {
                let entries = collection_entries(&data)
                    .ok_or_else(|| self.invalid_data("expected an array, an object or null"))?;
                self.rebuild_entries(entries)?;
                self.collection_data()
            }
        };

        self.view = self
            .config
            .sync
            .get()
            .sync_out(&data)
            .map_err(|e| FormError::Sync {
                path: self.path_display(),
                reason: e.reason,
            })?;
        self.data = data;
        self.extra_data.clear();
        self.errors.clear();
        self.synchronized = true;
        self.state = FormState::Bound;
        Ok(())
    }

    /// `data` with each mapped, bound child's data written under its key.
    ///
    /// Children normalize their slice (collections become dense arrays), so
    /// the parent's object must carry the normalized form.
    fn merge_children_data(&self, data: Value) -> Value {
        let mut map = match data {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        for (key, child) in &self.children {
            if child.config.mapped && child.state != FormState::Unbound {
                map.insert(key.clone(), child.data.clone());
            }
        }
        Value::Object(map)
    }

    /// Dense data of a collection, in child order.
    fn collection_data(&self) -> Value {
        let entries: Vec<Value> = self
            .children
            .values()
            .filter(|child| child.config.mapped)
            .map(|child| child.data.clone())
            .collect();
        self.config.sync.get().rebuild_indices(entries)
    }

    fn rebuild_entries(&mut self, entries: Vec<(String, &Value)>) -> Result<(), FormError> {
        let Some(entry) = self.config.as_collection().map(|c| (*c.entry).clone()) else {
            return Ok(());
        };
        self.children.clear();
        for (key, value) in entries {
            let mut child = FormNode::create(key.clone(), entry.clone(), self.child_path(&key))?;
            child.set_data(value.clone())?;
            self.children.insert(key, child);
        }
        Ok(())
    }

    fn invalid_data(&self, reason: &str) -> FormError {
        FormError::InvalidData {
            path: self.path_display(),
            reason: reason.to_owned(),
        }
    }

    // ========================================================================
    // SUBMISSION
    // ========================================================================

    /// Submits a value. Fields of compound nodes missing from `raw` are
    /// submitted as null.
    ///
    /// Errors from the previous submission are discarded first. When the node
    /// carries a constraint evaluator the tree is validated afterwards.
    pub fn submit(&mut self, raw: Value) -> Result<(), FormError> {
        self.submit_with(raw, true)
    }

    /// Like [`submit`](Self::submit), but fields missing from `raw` keep
    /// their data and stay unsubmitted.
    pub fn submit_partial(&mut self, raw: Value) -> Result<(), FormError> {
        self.submit_with(raw, false)
    }

    fn submit_with(&mut self, raw: Value, clear_missing: bool) -> Result<(), FormError> {
        self.check_submission(&raw, clear_missing)?;
        self.clear_errors();
        self.bind(raw, clear_missing)?;
        tracing::debug!(form = %self.path_display(), synchronized = self.is_synchronized(), "submitted");

        if self.has_evaluator() {
            self.validate()?;
        }
        Ok(())
    }

    /// Read-only pass: fails where [`bind`](Self::bind) would have to.
    fn check_submission(&self, raw: &Value, clear_missing: bool) -> Result<(), FormError> {
        if self.config.disabled {
            return Ok(());
        }
        let raw = self.effective_raw(raw);

        match &self.config.kind {
            FormKind::Field => Ok(()),
            FormKind::Compound { .. } => {
                for (key, child) in &self.children {
                    match raw.get(key) {
                        Some(value) => child.check_submission(value, clear_missing)?,
                        None if clear_missing => {
                            child.check_submission(&Value::Null, clear_missing)?;
                        }
                        None => {}
                    }
                }
                Ok(())
            }
            FormKind::Collection(collection) => {
                let Some(entries) = collection_entries(&raw) else {
                    return Ok(());
                };
                let delete_empty = collection.delete_empty && collection.allow_delete;
                for (key, value) in entries {
                    if delete_empty && is_empty_entry(value) {
                        continue;
                    }
                    if let Some(child) = self.children.get(&key) {
                        child.check_submission(value, clear_missing)?;
                    } else if collection.allow_add {
                        let prototype = FormNode::create(
                            key.clone(),
                            (*collection.entry).clone(),
                            self.child_path(&key),
                        )?;
                        prototype.check_submission(value, clear_missing)?;
                    } else {
                        check_name(&key)?;
                        return Err(FormError::ExtraEntry {
                            collection: self.path_display(),
                            key,
                        });
                    }
                }
                Ok(())
            }
        }
    }

    fn bind(&mut self, raw: Value, clear_missing: bool) -> Result<(), FormError> {
        if self.config.disabled {
            self.state = FormState::Submitted;
            return Ok(());
        }
        let raw = self.effective_raw(&raw).into_owned();

        self.extra_data.clear();
        self.synchronized = true;
        match self.config.kind {
            FormKind::Field => {
                self.view = raw.clone();
                self.sync_in(raw);
            }
            FormKind::Compound { .. } => self.bind_compound(raw, clear_missing)?,
            FormKind::Collection(_) => self.bind_collection(raw, clear_missing)?,
        }
        self.state = FormState::Submitted;
        Ok(())
    }

    fn bind_compound(&mut self, raw: Value, clear_missing: bool) -> Result<(), FormError> {
        let mut submitted = match raw {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                tracing::debug!(form = %self.path_display(), "compound node expects an object");
                self.view = other;
                self.mark_unsynchronized();
                return Ok(());
            }
        };
        self.view = Value::Object(submitted.clone());

        for (key, child) in &mut self.children {
            match submitted.shift_remove(key) {
                Some(value) => child.bind(value, clear_missing)?,
                None if clear_missing => child.bind(Value::Null, clear_missing)?,
                None => {}
            }
        }
        self.extra_data = submitted;

        let data = self.merge_children_data(self.data.clone());
        self.sync_in(data);
        Ok(())
    }

    fn bind_collection(&mut self, raw: Value, clear_missing: bool) -> Result<(), FormError> {
        let Some(collection) = self.config.as_collection() else {
            return Ok(());
        };
        let allow_add = collection.allow_add;
        let allow_delete = collection.allow_delete;
        let reindex = collection.reindex_on_submit;
        let delete_empty = collection.delete_empty && allow_delete;

        self.view = raw.clone();
        let Some(entries) = collection_entries(&raw) else {
            tracing::debug!(form = %self.path_display(), "collection expects an array, an object or null");
            self.mark_unsynchronized();
            return Ok(());
        };
        let entries: Vec<(String, &Value)> = entries
            .into_iter()
            .filter(|(_, value)| !(delete_empty && is_empty_entry(value)))
            .collect();

        if allow_delete {
            let before = self.children.len();
            self.children
                .retain(|key, _| entries.iter().any(|(submitted, _)| submitted == key));
            let removed = before - self.children.len();
            if removed > 0 {
                tracing::debug!(form = %self.path_display(), removed, "entries removed");
            }
        }

        for (key, value) in entries {
            if let Some(child) = self.children.get_mut(&key) {
                child.bind(value.clone(), clear_missing)?;
            } else if allow_add {
                let entry = self
                    .config
                    .as_collection()
                    .map(|c| (*c.entry).clone())
                    .ok_or_else(|| self.invalid_data("collection without entry definition"))?;
                let mut child = FormNode::create(key.clone(), entry, self.child_path(&key))?;
                child.bind(value.clone(), clear_missing)?;
                tracing::debug!(form = %self.path_display(), key = %key, "entry added");
                self.children.insert(key, child);
            } else {
                return Err(FormError::ExtraEntry {
                    collection: self.path_display(),
                    key,
                });
            }
        }

        if reindex {
            self.reindex();
        }

        self.data = self.collection_data();
        Ok(())
    }

    /// Renames children to `0..n-1` in their current order.
    fn reindex(&mut self) {
        let children = std::mem::take(&mut self.children);
        let mut renamed = 0usize;
        for (position, (old_key, mut child)) in children.into_iter().enumerate() {
            let key = position.to_string();
            if key != old_key {
                renamed += 1;
            }
            child.name.clone_from(&key);
            child.rebase(self.child_path(&key));
            self.children.insert(key, child);
        }
        tracing::debug!(form = %self.path_display(), renamed, "entries reindexed");
    }

    fn sync_in(&mut self, value: Value) {
        match self.config.sync.get().sync_in(&value) {
            Ok(data) => self.data = data,
            Err(error) => {
                tracing::debug!(form = %self.path_display(), %error, "submitted value could not be synchronized");
                self.mark_unsynchronized();
            }
        }
    }

    fn mark_unsynchronized(&mut self) {
        self.synchronized = false;
        self.data = Value::Null;
    }

    /// `empty_data` replaces null, and the empty string on fields.
    fn effective_raw<'a>(&self, raw: &'a Value) -> Cow<'a, Value> {
        let is_empty = match raw {
            Value::Null => true,
            Value::String(s) => s.is_empty() && self.config.is_field(),
            _ => false,
        };
        match &self.config.empty_data {
            Some(empty) if is_empty => Cow::Owned(empty.clone()),
            _ => Cow::Borrowed(raw),
        }
    }
}

/// Keyed entries of a collection value, or `None` if it is not one.
fn collection_entries(value: &Value) -> Option<Vec<(String, &Value)>> {
    match value {
        Value::Array(items) => Some(
            items
                .iter()
                .enumerate()
                .map(|(index, item)| (index.to_string(), item))
                .collect(),
        ),
        Value::Object(map) => Some(map.iter().map(|(k, v)| (k.clone(), v)).collect()),
        Value::Null => Some(Vec::new()),
        _ => None,
    }
}

/// Blank, or a container holding only empty entries.
fn is_empty_entry(value: &Value) -> bool {
    match value {
        Value::Array(items) => items.iter().all(is_empty_entry),
        Value::Object(map) => map.values().all(is_empty_entry),
        other => is_blank(other),
    }
}
