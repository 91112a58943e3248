// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dotted tool versions with a total ordering.
//!
//! A version string is split on `.`, `-`, `+` and `_`, and each piece is
//! further split into runs of digits and non-digits. Numeric segments compare
//! numerically, text segments compare lexically, and a text segment always
//! sorts below a numeric one. Missing trailing segments count as `0`, so:
//!
//! - `3.6 == 3.6.0`
//! - `3.2.0 < 3.6.1 < 3.10.0`
//! - `3.6.0-rc1 < 3.6.0` (the `rc` text segment sorts below the implied `0`)

use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Segment {
    // Variant order matters: text sorts below numbers.
    Text(String),
    Num(u64),
}

static ZERO: Segment = Segment::Num(0);

/// Version of an external tool binary.
#[derive(Debug, Clone)]
pub struct Version {
    raw: String,
    segments: Vec<Segment>,
}

impl Version {
    /// Parse a version string. Never fails: unrecognized text becomes text
    /// segments and an empty string equals `0`.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        // Tools print `r3.6.3` or `v4.2.0`
        let body = match trimmed.strip_prefix(['r', 'v']) {
            Some(rest) if rest.starts_with(|c: char| c.is_ascii_digit()) => rest,
            _ => trimmed,
        };

        let mut segments = Vec::new();
        for piece in body.split(['.', '-', '+', '_']) {
            let mut rest = piece;
            while !rest.is_empty() {
                let numeric = rest.starts_with(|c: char| c.is_ascii_digit());
                let end = rest
                    .find(|c: char| c.is_ascii_digit() != numeric)
                    .unwrap_or(rest.len());
                let (run, tail) = rest.split_at(end);
                segments.push(match run.parse::<u64>() {
                    Ok(n) if numeric => Segment::Num(n),
                    _ => Segment::Text(run.to_ascii_lowercase()),
                });
                rest = tail;
            }
        }

        Self {
            raw: trimmed.to_string(),
            segments,
        }
    }

    /// The string this version was parsed from.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns true if `self >= minimum`.
    pub fn at_least(&self, minimum: &Version) -> bool {
        self >= minimum
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.segments.len().max(other.segments.len());
        for i in 0..len {
            let left = self.segments.get(i).unwrap_or(&ZERO);
            let right = other.segments.get(i).unwrap_or(&ZERO);
            match left.cmp(right) {
                Ordering::Equal => continue,
                unequal => return unequal,
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl FromStr for Version {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<&str> for Version {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

#[cfg(test)]
#[path = "version_tests.rs"]
mod tests;
