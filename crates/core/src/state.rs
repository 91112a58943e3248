// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-unit status record.
//!
//! Each worker owns exactly one [`UnitState`] and is its only writer. The
//! orchestrator receives a copy once the unit has finished, so readers never
//! observe a partially written record.

use crate::oplog::{ConsistencySummary, OplogTimestamp};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Well-known state keys.
pub mod keys {
    pub const RUNNING: &str = "running";
    pub const COMPLETED: &str = "completed";
    pub const FILE: &str = "file";
    pub const COUNT: &str = "count";
    pub const FIRST_TS: &str = "first_ts";
    pub const LAST_TS: &str = "last_ts";
}

/// A single state value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StateValue {
    Bool(bool),
    Int(u64),
    Path(PathBuf),
    Timestamp(OplogTimestamp),
    Null,
}

impl From<Option<OplogTimestamp>> for StateValue {
    fn from(ts: Option<OplogTimestamp>) -> Self {
        ts.map_or(StateValue::Null, StateValue::Timestamp)
    }
}

/// Key/value status of one unit of work.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct UnitState {
    values: BTreeMap<String, StateValue>,
}

impl UnitState {
    pub fn new() -> Self {
        let mut state = Self::default();
        state.set(keys::RUNNING, StateValue::Bool(false));
        state.set(keys::COMPLETED, StateValue::Bool(false));
        state
    }

    pub fn set(&mut self, key: &str, value: StateValue) {
        self.values.insert(key.to_string(), value);
    }

    pub fn get(&self, key: &str) -> Option<&StateValue> {
        self.values.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn running(&self) -> bool {
        matches!(self.get(keys::RUNNING), Some(StateValue::Bool(true)))
    }

    pub fn completed(&self) -> bool {
        matches!(self.get(keys::COMPLETED), Some(StateValue::Bool(true)))
    }

    pub fn file(&self) -> Option<&Path> {
        match self.get(keys::FILE) {
            Some(StateValue::Path(path)) => Some(path),
            _ => None,
        }
    }

    pub fn count(&self) -> Option<u64> {
        match self.get(keys::COUNT) {
            Some(StateValue::Int(count)) => Some(*count),
            _ => None,
        }
    }

    pub fn first_ts(&self) -> Option<OplogTimestamp> {
        self.timestamp(keys::FIRST_TS)
    }

    pub fn last_ts(&self) -> Option<OplogTimestamp> {
        self.timestamp(keys::LAST_TS)
    }

    fn timestamp(&self, key: &str) -> Option<OplogTimestamp> {
        match self.get(key) {
            Some(StateValue::Timestamp(ts)) => Some(*ts),
            _ => None,
        }
    }

    pub fn set_running(&mut self, running: bool) {
        self.set(keys::RUNNING, StateValue::Bool(running));
    }

    /// Mark the unit completed.
    ///
    /// Completion is recorded at most once and only while not running;
    /// returns false when the call was refused.
    pub fn mark_completed(&mut self) -> bool {
        if self.running() || self.completed() {
            return false;
        }
        self.set(keys::COMPLETED, StateValue::Bool(true));
        true
    }

    /// Publish the consistency summary. All three keys are written together;
    /// absent timestamps are stored as null.
    pub fn set_summary(&mut self, summary: &ConsistencySummary) {
        self.set(keys::COUNT, StateValue::Int(summary.count));
        self.set(keys::FIRST_TS, summary.first_ts.into());
        self.set(keys::LAST_TS, summary.last_ts.into());
    }

    /// Returns true if any consistency key is present.
    pub fn has_summary(&self) -> bool {
        [keys::COUNT, keys::FIRST_TS, keys::LAST_TS]
            .iter()
            .any(|key| self.contains(key))
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
