// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Backup unit: one dump process per replica set
//!
//! A [`BackupWorker`] builds a version-gated command line, recreates the
//! replica set's dump directory, spawns the dump tool and supervises its
//! diagnostic stream until the process exits or reports a fatal failure. On
//! success with oplog capture enabled it publishes the consistency summary
//! (record count and timestamp range) of the captured oplog.

mod command;
mod stream;

pub use command::{build_command_line, BinaryCapabilities, Capability, CommandLine, CommandLineError};
pub use stream::{classify_line, LineEvent, FAILURE_MARKER};

use crate::unit::{UnitCore, WorkUnit};
use async_trait::async_trait;
use cb_adapters::{env, exit_code_of, OplogAdapter, OplogFile};
use cb_core::{
    format_seconds, keys, BackupResult, ConsistencySummary, DumpConfig, Endpoint, StateValue,
    Timer, UnitId, UnitState, Version,
};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Name of the oplog artifact inside the dump directory.
pub const OPLOG_FILE_NAME: &str = "oplog.bson";

/// Dumps one replica set into `<base_dir>/<replset>/dump`.
pub struct BackupWorker<O: OplogAdapter> {
    core: UnitCore,
    endpoint: Endpoint,
    config: DumpConfig,
    caps: BinaryCapabilities,
    oplog: O,
    timer: Timer,
    timer_name: String,
    backup_dir: PathBuf,
    dump_dir: PathBuf,
    oplog_file: PathBuf,
    oplog_enabled: bool,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    password_pending: bool,
    password_sent: bool,
}

impl<O: OplogAdapter> BackupWorker<O> {
    /// Create a worker for `endpoint`. `version` is the version reported by
    /// the configured dump binary.
    pub fn new(
        endpoint: Endpoint,
        config: DumpConfig,
        version: Version,
        oplog: O,
        timer: Timer,
        base_dir: &Path,
    ) -> Self {
        let caps = BinaryCapabilities::probe(&config.binary, version);
        let backup_dir = base_dir.join(&endpoint.replset);
        let dump_dir = backup_dir.join("dump");
        let oplog_file = dump_dir.join(OPLOG_FILE_NAME);
        let oplog_enabled = config.oplog_enabled.enabled();

        Self {
            core: UnitCore::new(endpoint.replset.as_str()),
            timer_name: format!("BackupWorker-{}", endpoint.replset),
            endpoint,
            config,
            caps,
            oplog,
            timer,
            backup_dir,
            dump_dir,
            oplog_file,
            oplog_enabled,
            child: None,
            stdin: None,
            password_pending: false,
            password_sent: false,
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    pub fn dump_dir(&self) -> &Path {
        &self.dump_dir
    }

    pub fn oplog_file(&self) -> &Path {
        &self.oplog_file
    }

    pub fn exit_code(&self) -> i32 {
        self.core.exit_code
    }

    pub fn error_message(&self) -> Option<&str> {
        self.core.error_message.as_deref()
    }

    /// Whether the password has been written to the dump tool's stdin.
    pub fn password_sent(&self) -> bool {
        self.password_sent
    }

    pub fn timer_name(&self) -> &str {
        &self.timer_name
    }

    fn succeeded(&self) -> bool {
        self.core.exit_code == 0 && self.core.error_message.is_none()
    }

    async fn execute(&mut self, cancel: CancellationToken) {
        tracing::info!("Starting dump backup of {}", self.endpoint);
        self.timer.start(&self.timer_name);
        self.core.state.set_running(true);
        self.core
            .state
            .set(keys::FILE, StateValue::Path(self.oplog_file.clone()));

        let line = match build_command_line(
            &self.endpoint,
            &self.config,
            &self.caps,
            &self.backup_dir,
            self.oplog_enabled,
        ) {
            Ok(line) => line,
            Err(e) => {
                tracing::error!(error = %e, "invalid dump configuration");
                self.core.fail(e.to_string());
                return self.finish(None);
            }
        };

        if let Err(e) = self.prepare_dump_dir().await {
            tracing::error!(dir = %self.dump_dir.display(), error = %e, "failed to prepare dump directory");
            self.core.fail(format!(
                "Error preparing dump directory {}: {}",
                self.dump_dir.display(),
                e
            ));
            return self.finish(None);
        }

        tracing::info!("Running dump command: {}", line.display_masked());
        if let Err(e) = self.spawn(&line) {
            tracing::error!(binary = %line.program.display(), error = %e, "failed to start dump");
            self.core
                .fail(format!("Error starting {}: {}", line.program.display(), e));
            return self.finish(None);
        }

        self.supervise(&cancel).await;

        let summary = if self.succeeded() && self.oplog_enabled {
            self.load_oplog(line.gzip)
        } else {
            None
        };
        self.finish(summary);
    }

    async fn prepare_dump_dir(&self) -> std::io::Result<()> {
        if tokio::fs::metadata(&self.dump_dir).await.is_ok() {
            tokio::fs::remove_dir_all(&self.dump_dir).await?;
        }
        tokio::fs::create_dir_all(&self.dump_dir).await
    }

    fn spawn(&mut self, line: &CommandLine) -> std::io::Result<()> {
        let stdin = if line.stdin_password {
            Stdio::piped()
        } else {
            Stdio::null()
        };
        let mut child = Command::new(&line.program)
            .args(&line.args)
            .stdin(stdin)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        self.stdin = child.stdin.take();
        self.password_pending = line.stdin_password;
        self.password_sent = false;
        self.child = Some(child);
        Ok(())
    }

    /// Follow the diagnostic stream until it closes, a fatal line arrives or
    /// the unit is cancelled, then reap the process.
    async fn supervise(&mut self, cancel: &CancellationToken) {
        let Some(stderr) = self.child.as_mut().and_then(|c| c.stderr.take()) else {
            return self.reap(cancel).await;
        };
        let mut reader = BufReader::new(stderr);
        let mut buf = Vec::new();

        loop {
            buf.clear();
            let read = tokio::select! {
                biased;
                _ = cancel.cancelled() => return self.stop_cancelled().await,
                read = reader.read_until(b'\n', &mut buf) => read,
            };

            match read {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) => {
                    tracing::error!(error = %e, "error reading dump output");
                    break;
                }
            }

            let line = String::from_utf8_lossy(&buf);
            match classify_line(&line, self.password_pending) {
                LineEvent::Skip => {}
                LineEvent::PasswordPrompt => self.send_password().await,
                LineEvent::Info(message) => tracing::info!("{}:\t{}", self.endpoint, message),
                LineEvent::Fatal(reason) => {
                    tracing::error!("Dump error: {}", reason);
                    self.core.fail(reason);
                    self.close(false).await;
                    return;
                }
            }
        }

        self.reap(cancel).await;
    }

    async fn stop_cancelled(&mut self) {
        tracing::warn!("backup of {} cancelled, stopping dump", self.endpoint);
        if self.core.error_message.is_none() {
            self.core.error_message = Some(format!("Backup of {} was cancelled", self.endpoint));
        }
        self.close(true).await;
    }

    // Credentials never reach a log record, not even on failure.
    async fn send_password(&mut self) {
        if self.password_sent {
            return;
        }
        self.password_sent = true;
        let (Some(mut stdin), Some(password)) = (self.stdin.take(), self.config.password.as_deref())
        else {
            return;
        };
        tracing::debug!("received password prompt, writing password to stdin");
        let payload = format!("{}\n", password);
        if stdin.write_all(payload.as_bytes()).await.is_ok() {
            let _ = stdin.flush().await;
        }
    }

    // The process may outlive its diagnostic stream, so cancellation is
    // still honored while waiting for it to exit.
    async fn reap(&mut self, cancel: &CancellationToken) {
        self.stdin = None;
        let Some(child) = self.child.as_mut() else {
            return;
        };
        let waited = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            status = child.wait() => Some(status),
        };
        let Some(status) = waited else {
            return self.stop_cancelled().await;
        };
        self.child = None;
        match status {
            Ok(status) => {
                let code = exit_code_of(status);
                if code != 0 {
                    tracing::error!(exit_code = code, "dump of {} exited with an error", self.endpoint);
                }
                self.core.exit_code = code;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to wait for dump process");
                self.core.fail(format!("Error waiting for dump process: {}", e));
            }
        }
    }

    fn load_oplog(&mut self, gzip: bool) -> Option<ConsistencySummary> {
        let mut file = self.oplog.open(&self.oplog_file, gzip);
        match file.load() {
            Ok(()) => {
                let summary = file.summary();
                self.core.state.set_summary(&summary);
                Some(summary)
            }
            Err(e) => {
                tracing::error!(error = %e, "error loading oplog");
                self.core.fail(format!("Error loading oplog: {}", e));
                None
            }
        }
    }

    fn finish(&mut self, summary: Option<ConsistencySummary>) {
        let succeeded = self.succeeded();
        self.core.finish(succeeded);
        let elapsed = self.timer.stop(&self.timer_name).unwrap_or_default();

        if succeeded {
            let extra = match summary {
                Some(summary) => summary.describe(),
                None => "no oplog".to_string(),
            };
            tracing::info!(
                elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                "Backup {} completed in {} seconds, {}",
                self.endpoint,
                format_seconds(elapsed),
                extra
            );
        } else {
            tracing::error!(
                exit_code = self.core.exit_code,
                elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                "Backup {} failed after {} seconds",
                self.endpoint,
                format_seconds(elapsed)
            );
        }
    }
}

#[async_trait]
impl<O: OplogAdapter> WorkUnit for BackupWorker<O> {
    fn id(&self) -> &UnitId {
        self.core.id()
    }

    async fn run(&mut self, cancel: CancellationToken) {
        let span = tracing::info_span!("backup", replset = %self.endpoint.replset);
        self.execute(cancel).instrument(span).await
    }

    async fn close(&mut self, cancel_requested: bool) {
        if self.core.stopped {
            return;
        }
        self.stdin = None;
        let Some(mut child) = self.child.take() else {
            return;
        };

        tracing::debug!(cancel_requested, "stopping running dump process");
        if let Err(e) = child.start_kill() {
            tracing::warn!(error = %e, "failed to kill dump process");
        }
        match tokio::time::timeout(env::kill_grace(), child.wait()).await {
            Ok(Ok(status)) => {
                tracing::debug!(exit_code = exit_code_of(status), "dump process stopped")
            }
            Ok(Err(e)) => tracing::warn!(error = %e, "failed to reap dump process"),
            Err(_) => tracing::warn!("dump process did not exit within the kill grace period"),
        }
        self.core.stopped = true;
    }

    fn state(&self) -> &UnitState {
        &self.core.state
    }

    fn result(&self) -> BackupResult {
        let success = self.succeeded();
        let message = match (&self.core.error_message, success) {
            (_, true) => "Backup completed".to_string(),
            (Some(error), false) => error.clone(),
            (None, false) if !self.core.state.contains(keys::FILE) => {
                format!("Backup of {} did not run", self.endpoint)
            }
            (None, false) => format!("Dump exited with code {}", self.core.exit_code),
        };
        self.core.result(
            success,
            message,
            self.core.error_message.clone(),
            self.endpoint.to_string(),
        )
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
