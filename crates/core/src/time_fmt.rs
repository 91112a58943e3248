// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared human-readable duration formatting.

use std::time::Duration;

/// Format a duration as seconds with two decimals: `"12.34"`.
pub fn format_seconds(duration: Duration) -> String {
    format!("{:.2}", duration.as_secs_f64())
}

#[cfg(test)]
#[path = "time_fmt_tests.rs"]
mod tests;
