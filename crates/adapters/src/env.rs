// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the adapters crate.

use std::time::Duration;

fn parse_duration_ms(var: &str) -> Option<Duration> {
    std::env::var(var)
        .ok()
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_millis)
}

/// Value exported as `GZIP` to the archive chain (default: `-1`, fastest).
pub fn archive_gzip_level() -> String {
    std::env::var("CB_ARCHIVE_GZIP_LEVEL")
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "-1".to_string())
}

/// How long to wait for a killed child to be reaped (default: 5000ms).
pub fn kill_grace() -> Duration {
    parse_duration_ms("CB_KILL_GRACE_MS").unwrap_or(Duration::from_secs(5))
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
