// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Consistency data derived from a captured operation log.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Position in the operation log: seconds since the epoch plus an ordinal
/// for operations within the same second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OplogTimestamp {
    pub time: u32,
    pub inc: u32,
}

impl OplogTimestamp {
    pub fn new(time: u32, inc: u32) -> Self {
        Self { time, inc }
    }
}

impl fmt::Display for OplogTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({}, {})", self.time, self.inc)
    }
}

/// Record count and timestamp range covered by a captured oplog.
///
/// Timestamps are absent when the capture contains no entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsistencySummary {
    pub count: u64,
    pub first_ts: Option<OplogTimestamp>,
    pub last_ts: Option<OplogTimestamp>,
}

impl ConsistencySummary {
    /// Short description used in completion log lines,
    /// e.g. `"42 oplog changes, end ts: Timestamp(1700000000, 3)"`.
    pub fn describe(&self) -> String {
        match self.last_ts {
            Some(ts) => format!("{} oplog changes, end ts: {}", self.count, ts),
            None => format!("{} oplog changes", self.count),
        }
    }
}

#[cfg(test)]
#[path = "oplog_tests.rs"]
mod tests;
