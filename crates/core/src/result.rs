// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Terminal result of a unit of work.

use serde::{Deserialize, Serialize};

/// Terminal value returned by every worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupResult {
    pub success: bool,
    pub message: String,
    pub error: Option<String>,
    /// Backup directory for archive units, endpoint for backup units.
    #[serde(rename = "directory")]
    pub directory_or_uri: String,
    pub exit_code: i32,
}

impl BackupResult {
    pub fn new(
        success: bool,
        message: impl Into<String>,
        error: Option<String>,
        directory_or_uri: impl Into<String>,
        exit_code: i32,
    ) -> Self {
        Self {
            success,
            message: message.into(),
            error,
            directory_or_uri: directory_or_uri.into(),
            exit_code,
        }
    }
}
