// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Classification of the dump tool's diagnostic stream

use chrono::{DateTime, NaiveDateTime};

/// Prefix of a line reporting a terminal dump failure.
pub const FAILURE_MARKER: &str = "Failed: ";

const PASSWORD_PROMPTS: [&str; 2] = ["Enter Password:", "reading password from standard input"];

/// What to do with one line of diagnostic output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineEvent {
    /// Blank or timestamp-only line.
    Skip,
    /// Progress message, without its timestamp.
    Info(String),
    /// The tool is waiting for the password on stdin.
    PasswordPrompt,
    /// Terminal failure with its capitalized reason.
    Fatal(String),
}

/// Classify a diagnostic line.
///
/// Lines have the form `<timestamp>\t<message>`. Password prompts are only
/// recognized while `expect_password` is set; otherwise they are ordinary
/// messages.
pub fn classify_line(line: &str, expect_password: bool) -> LineEvent {
    let line = line.trim_end();
    if line.trim().is_empty() {
        return LineEvent::Skip;
    }

    if expect_password && PASSWORD_PROMPTS.iter().any(|p| line.contains(p)) {
        return LineEvent::PasswordPrompt;
    }

    let message = match line.split_once('\t') {
        Some((_, message)) => message,
        None if is_timestamp(line) => return LineEvent::Skip,
        None => line,
    };

    if let Some(reason) = line
        .strip_prefix(FAILURE_MARKER)
        .or_else(|| message.strip_prefix(FAILURE_MARKER))
    {
        return LineEvent::Fatal(capitalize(reason.trim()));
    }

    if message.trim().is_empty() {
        return LineEvent::Skip;
    }
    LineEvent::Info(message.to_string())
}

fn is_timestamp(text: &str) -> bool {
    let text = text.trim();
    DateTime::parse_from_rfc3339(text).is_ok()
        || DateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f%z").is_ok()
        || NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f").is_ok()
        || NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f").is_ok()
}

// Uppercase the first character, keep the rest as written.
fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
#[path = "stream_tests.rs"]
mod tests;
