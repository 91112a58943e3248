// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake oplog adapter for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{OplogAdapter, OplogError, OplogFile};
use cb_core::{ConsistencySummary, OplogTimestamp};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Recorded `open` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OplogOpen {
    pub path: PathBuf,
    pub gzip: bool,
}

struct FakeOplogState {
    summary: ConsistencySummary,
    load_error: Option<String>,
    opens: Vec<OplogOpen>,
}

/// Fake oplog adapter for testing
#[derive(Clone)]
pub struct FakeOplogAdapter {
    inner: Arc<Mutex<FakeOplogState>>,
}

impl Default for FakeOplogAdapter {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeOplogState {
                summary: ConsistencySummary::default(),
                load_error: None,
                opens: Vec::new(),
            })),
        }
    }
}

impl FakeOplogAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adapter whose files load successfully with `summary`.
    pub fn with_summary(summary: ConsistencySummary) -> Self {
        let adapter = Self::default();
        adapter.inner.lock().summary = summary;
        adapter
    }

    /// Adapter whose files fail to load with `message`.
    pub fn failing(message: &str) -> Self {
        let adapter = Self::default();
        adapter.inner.lock().load_error = Some(message.to_string());
        adapter
    }

    /// Get all recorded `open` calls
    pub fn opens(&self) -> Vec<OplogOpen> {
        self.inner.lock().opens.clone()
    }
}

impl OplogAdapter for FakeOplogAdapter {
    type File = FakeOplogFile;

    fn open(&self, path: &Path, gzip: bool) -> FakeOplogFile {
        let mut inner = self.inner.lock();
        inner.opens.push(OplogOpen {
            path: path.to_path_buf(),
            gzip,
        });
        FakeOplogFile {
            path: path.to_path_buf(),
            summary: inner.summary,
            load_error: inner.load_error.clone(),
            loaded: false,
        }
    }
}

/// Oplog file handed out by [`FakeOplogAdapter`]
#[derive(Debug)]
pub struct FakeOplogFile {
    path: PathBuf,
    summary: ConsistencySummary,
    load_error: Option<String>,
    loaded: bool,
}

impl OplogFile for FakeOplogFile {
    fn load(&mut self) -> Result<(), OplogError> {
        if let Some(message) = &self.load_error {
            return Err(OplogError::Read {
                path: self.path.clone(),
                message: message.clone(),
            });
        }
        self.loaded = true;
        Ok(())
    }

    fn count(&self) -> u64 {
        if self.loaded {
            self.summary.count
        } else {
            0
        }
    }

    fn first_ts(&self) -> Option<OplogTimestamp> {
        self.summary.first_ts.filter(|_| self.loaded)
    }

    fn last_ts(&self) -> Option<OplogTimestamp> {
        self.summary.last_ts.filter(|_| self.loaded)
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
