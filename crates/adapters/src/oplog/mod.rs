// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Operation-log collaborator
//!
//! The dump tool writes the oplog entries it observed during the backup to
//! an artifact next to the dump. Parsing that artifact belongs to another
//! component; backup workers only need its record count and timestamp range,
//! which they reach through [`OplogAdapter`] and [`OplogFile`].

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeOplogAdapter, FakeOplogFile, OplogOpen};

use cb_core::{ConsistencySummary, OplogTimestamp};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from oplog operations
#[derive(Debug, Error)]
pub enum OplogError {
    #[error("oplog file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("failed to read oplog {}: {message}", .path.display())]
    Read { path: PathBuf, message: String },
}

/// A captured oplog artifact.
pub trait OplogFile: Send {
    /// Parse the artifact. Must succeed before the accessors are meaningful.
    fn load(&mut self) -> Result<(), OplogError>;

    fn count(&self) -> u64;

    fn first_ts(&self) -> Option<OplogTimestamp>;

    /// Absent when the artifact holds no entries.
    fn last_ts(&self) -> Option<OplogTimestamp>;

    fn summary(&self) -> ConsistencySummary {
        ConsistencySummary {
            count: self.count(),
            first_ts: self.first_ts(),
            last_ts: self.last_ts(),
        }
    }
}

/// Opens oplog artifacts written by the dump tool.
pub trait OplogAdapter: Clone + Send + Sync + 'static {
    type File: OplogFile;

    /// Open the artifact at `path`; `gzip` is set when the dump compressed it.
    fn open(&self, path: &Path, gzip: bool) -> Self::File;
}
