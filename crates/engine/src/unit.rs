// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pooled unit-of-work contract

use async_trait::async_trait;
use cb_core::{BackupResult, UnitId, UnitState};
use tokio_util::sync::CancellationToken;

/// Exit code for failures that did not come from an external process:
/// fatal configuration, unmet preconditions, or a unit that never ran.
pub const FAILURE_EXIT_CODE: i32 = 1;

/// Lifecycle every pooled worker implements.
///
/// The pool calls [`run`](WorkUnit::run) once, then
/// [`close`](WorkUnit::close), then reads [`state`](WorkUnit::state) and
/// [`result`](WorkUnit::result) exactly once each.
#[async_trait]
pub trait WorkUnit: Send + 'static {
    fn id(&self) -> &UnitId;

    /// Perform the work. Returns once the owned process (if any) has exited
    /// or been terminated. Cancellation of `cancel` routes to
    /// [`close`](WorkUnit::close) with `cancel_requested = true`.
    async fn run(&mut self, cancel: CancellationToken);

    /// Terminate the owned process and mark the unit stopped.
    ///
    /// A no-op when no process is active or the unit is already stopped.
    async fn close(&mut self, cancel_requested: bool);

    fn state(&self) -> &UnitState;

    /// Terminal result, reflecting the exit code captured before cleanup.
    fn result(&self) -> BackupResult;
}

/// Identity, status and exit bookkeeping shared by every worker.
#[derive(Debug)]
pub struct UnitCore {
    id: UnitId,
    pub state: UnitState,
    pub exit_code: i32,
    pub error_message: Option<String>,
    pub stopped: bool,
}

impl UnitCore {
    pub fn new(id: impl Into<UnitId>) -> Self {
        Self {
            id: id.into(),
            state: UnitState::new(),
            exit_code: FAILURE_EXIT_CODE,
            error_message: None,
            stopped: false,
        }
    }

    pub fn id(&self) -> &UnitId {
        &self.id
    }

    /// Record a failure that did not come from the process exit status.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.error_message = Some(message.into());
        self.exit_code = FAILURE_EXIT_CODE;
    }

    /// Leave the running state; completion is recorded only for
    /// successful units.
    pub fn finish(&mut self, completed: bool) {
        self.state.set_running(false);
        if completed {
            self.state.mark_completed();
        }
    }

    pub fn result(
        &self,
        success: bool,
        message: impl Into<String>,
        error: Option<String>,
        directory_or_uri: impl Into<String>,
    ) -> BackupResult {
        BackupResult::new(success, message, error, directory_or_uri, self.exit_code)
    }
}

#[cfg(test)]
#[path = "unit_tests.rs"]
mod tests;
