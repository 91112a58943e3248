// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded pool of concurrently running work units

use crate::unit::WorkUnit;
use cb_core::{BackupResult, UnitId, UnitState};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Terminal snapshot of one unit, published once after it finishes.
#[derive(Debug, Clone)]
pub struct UnitReport {
    pub id: UnitId,
    pub state: UnitState,
    pub result: BackupResult,
}

/// Runs submitted units with at most `concurrency` active at once.
///
/// Each unit is moved into its own task and owned there until its report is
/// produced. Shutdown cancels the shared token; units still waiting for a
/// slot never start, running units route the cancellation to
/// [`WorkUnit::close`].
pub struct WorkPool {
    permits: Arc<Semaphore>,
    tasks: JoinSet<UnitReport>,
    cancel: CancellationToken,
    submitted: usize,
}

impl WorkPool {
    pub fn new(concurrency: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(concurrency.max(1))),
            tasks: JoinSet::new(),
            cancel: CancellationToken::new(),
            submitted: 0,
        }
    }

    /// Token cancelled by [`shutdown`](WorkPool::shutdown).
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn submitted(&self) -> usize {
        self.submitted
    }

    pub fn submit<U: WorkUnit>(&mut self, mut unit: U) {
        let permits = Arc::clone(&self.permits);
        let cancel = self.cancel.child_token();
        let span = tracing::info_span!("unit", id = %unit.id());
        self.submitted += 1;

        self.tasks.spawn(
            async move {
                // The semaphore is never closed, so acquire only fails if the
                // pool itself is gone; run without a slot in that case.
                let _permit = tokio::select! {
                    permit = permits.acquire_owned() => permit.ok(),
                    _ = cancel.cancelled() => None,
                };

                if cancel.is_cancelled() {
                    tracing::warn!("unit cancelled before it started");
                } else {
                    unit.run(cancel).await;
                }
                unit.close(false).await;

                let result = unit.result();
                tracing::debug!(success = result.success, exit_code = result.exit_code, "unit finished");
                UnitReport {
                    id: unit.id().clone(),
                    state: unit.state().clone(),
                    result,
                }
            }
            .instrument(span),
        );
    }

    /// Cancel every queued and running unit.
    pub fn shutdown(&self) {
        if !self.cancel.is_cancelled() {
            tracing::info!(units = self.tasks.len(), "shutting down work pool");
        }
        self.cancel.cancel();
    }

    /// Wait for the next unit to finish, in completion order.
    ///
    /// Returns `None` once every submitted unit has reported. A unit whose
    /// task panicked is logged and skipped.
    pub async fn next_report(&mut self) -> Option<UnitReport> {
        while let Some(joined) = self.tasks.join_next().await {
            match joined {
                Ok(report) => return Some(report),
                Err(e) => tracing::error!(error = %e, "work unit task failed"),
            }
        }
        None
    }

    /// Wait for every submitted unit and collect their reports.
    pub async fn join(mut self) -> Vec<UnitReport> {
        let mut reports = Vec::with_capacity(self.tasks.len());
        while let Some(report) = self.next_report().await {
            reports.push(report);
        }
        reports
    }
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;
