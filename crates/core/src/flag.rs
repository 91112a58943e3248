// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Boolean configuration flags that may arrive as text.
//!
//! Truth table for text values (after trimming, case-insensitive):
//!
//! | input                  | result   |
//! |------------------------|----------|
//! | `""`                   | disabled |
//! | `"false"`              | disabled |
//! | anything else          | enabled  |
//!
//! Boolean values are taken as-is. Any other value (a number, a table) is
//! enabled, so `oplog_enabled = 0` turns capture on just like `"0"` does.

use serde::{Deserialize, Serialize};

/// Parse a textual flag using the table above.
pub fn parse_flag(text: &str) -> bool {
    let text = text.trim();
    !(text.is_empty() || text.eq_ignore_ascii_case("false"))
}

/// A flag given either as a boolean or as free text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlagValue {
    Bool(bool),
    Text(String),
    Other(toml::Value),
}

impl FlagValue {
    /// Resolve to a definite boolean.
    pub fn enabled(&self) -> bool {
        match self {
            FlagValue::Bool(value) => *value,
            FlagValue::Text(text) => parse_flag(text),
            FlagValue::Other(_) => true,
        }
    }
}

impl Default for FlagValue {
    fn default() -> Self {
        FlagValue::Bool(true)
    }
}

impl From<bool> for FlagValue {
    fn from(value: bool) -> Self {
        FlagValue::Bool(value)
    }
}

impl From<&str> for FlagValue {
    fn from(text: &str) -> Self {
        FlagValue::Text(text.to_string())
    }
}

#[cfg(test)]
#[path = "flag_tests.rs"]
mod tests;
