// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Archive unit: packages a finished backup directory
//!
//! The `admin` and `config` subtrees of the dump go into side archives next
//! to the output file (`admin_<name>` and `config_<name>`). The main archive
//! holds everything else. All three run as one chain, side archives first.

use crate::unit::{UnitCore, WorkUnit, FAILURE_EXIT_CODE};
use async_trait::async_trait;
use cb_adapters::{env, CommandRunner, RunnerError};
use cb_core::{ArchiveConfig, BackupResult, UnitId, UnitState};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

pub const ADMIN_SUBTREE: &str = "admin";
pub const CONFIG_SUBTREE: &str = "config";

/// Errors from archiving a backup directory
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("cannot archive {}: path has no parent directory or file name", .0.display())]
    InvalidPath(PathBuf),
    #[error(transparent)]
    Command(#[from] RunnerError),
}

impl ArchiveError {
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ArchiveError::Command(e) => e.exit_code(),
            ArchiveError::InvalidPath(_) => None,
        }
    }
}

/// Argument lists for the three archive invocations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchivePlan {
    pub primary: Vec<String>,
    pub admin: Vec<String>,
    pub config: Vec<String>,
}

impl ArchivePlan {
    pub fn new(backup_dir: &Path, output_file: &Path, gzip: bool) -> Result<Self, ArchiveError> {
        let invalid = || ArchiveError::InvalidPath(backup_dir.to_path_buf());
        let base_dir = match backup_dir.parent() {
            Some(parent) if parent.as_os_str().is_empty() => Path::new("."),
            Some(parent) => parent,
            None => return Err(invalid()),
        };
        let base_name = backup_dir.file_name().ok_or_else(invalid)?;
        let output_name = output_file
            .file_name()
            .ok_or_else(|| ArchiveError::InvalidPath(output_file.to_path_buf()))?
            .to_string_lossy();
        let output_dir = output_file.parent().unwrap_or_else(|| Path::new(""));
        let dump_dir = format!("{}/dump/", backup_dir.display());

        let mut primary = strings(&["--exclude", ADMIN_SUBTREE, "--exclude", CONFIG_SUBTREE, "-C"]);
        primary.push(base_dir.display().to_string());
        primary.extend(strings(&["-c", "-f"]));
        primary.push(output_file.display().to_string());
        primary.push("--remove-files".to_string());

        let side = |subtree: &str| {
            let file = output_dir.join(format!("{}_{}", subtree, output_name));
            let mut args = strings(&["-C", dump_dir.as_str(), "-c", "-f"]);
            args.push(file.display().to_string());
            args.extend(strings(&["--remove-files", "--ignore-failed-read"]));
            args
        };
        let mut admin = side(ADMIN_SUBTREE);
        let mut config = side(CONFIG_SUBTREE);

        if gzip {
            for args in [&mut primary, &mut admin, &mut config] {
                args.push("-z".to_string());
            }
        }
        primary.push(base_name.to_string_lossy().into_owned());
        admin.push(ADMIN_SUBTREE.to_string());
        config.push(CONFIG_SUBTREE.to_string());

        Ok(Self {
            primary,
            admin,
            config,
        })
    }
}

fn strings(args: &[&str]) -> Vec<String> {
    args.iter().map(|a| a.to_string()).collect()
}

/// Archives `backup_dir` into `output_file`.
pub struct ArchiveWorker {
    core: UnitCore,
    backup_dir: PathBuf,
    output_file: PathBuf,
    config: ArchiveConfig,
    runner_cancel: Option<CancellationToken>,
    outcome: Option<BackupResult>,
}

impl ArchiveWorker {
    pub fn new(backup_dir: impl Into<PathBuf>, output_file: impl Into<PathBuf>, config: ArchiveConfig) -> Self {
        let backup_dir = backup_dir.into();
        Self {
            core: UnitCore::new(backup_dir.display().to_string()),
            backup_dir,
            output_file: output_file.into(),
            config,
            runner_cancel: None,
            outcome: None,
        }
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    pub fn output_file(&self) -> &Path {
        &self.output_file
    }

    pub fn stopped(&self) -> bool {
        self.core.stopped
    }

    fn finish_with(&mut self, success: bool, message: String, error: Option<String>) {
        let directory = self.backup_dir.display().to_string();
        self.outcome = Some(self.core.result(success, message, error, directory));
    }

    fn check_preconditions(&self) -> Result<(), String> {
        if !self.backup_dir.is_dir() {
            let problem = if self.backup_dir.exists() {
                "is not a directory"
            } else {
                "does not exist"
            };
            return Err(format!(
                "Backup directory: {} {}!",
                self.backup_dir.display(),
                problem
            ));
        }
        if self.output_file.exists() {
            return Err(format!(
                "Output file: {} already exists!",
                self.output_file.display()
            ));
        }
        Ok(())
    }

    async fn execute(&mut self, cancel: CancellationToken) {
        if let Err(message) = self.check_preconditions() {
            tracing::warn!("{}", message);
            return self.finish_with(false, message, None);
        }

        let gzip = self.config.compression.use_gzip(true);
        let plan = match ArchivePlan::new(&self.backup_dir, &self.output_file, gzip) {
            Ok(plan) => plan,
            Err(e) => return self.fail_archive(e),
        };

        if gzip {
            tracing::info!("Archiving and compressing directory: {}", self.backup_dir.display());
        } else {
            tracing::info!("Archiving directory: {}", self.backup_dir.display());
        }

        let stop = CancellationToken::new();
        let mut runner = CommandRunner::new(&self.config.binary, plan.primary)
            .first_aux(plan.admin)
            .second_aux(plan.config)
            .env("GZIP", env::archive_gzip_level())
            .verbose(self.config.verbose)
            .cancel_token(stop.clone());
        tracing::debug!(command = %runner.command_line(), "running archive chain");

        self.runner_cancel = Some(stop);
        self.core.state.set_running(true);

        let outcome = {
            let run = runner.run();
            tokio::pin!(run);
            tokio::select! {
                outcome = &mut run => outcome,
                _ = cancel.cancelled() => {
                    self.close(true).await;
                    run.await
                }
            }
        };

        self.runner_cancel = None;
        self.core.stopped = true;
        self.core.finish(true);

        match outcome {
            Ok(code) => {
                self.core.exit_code = code;
                tracing::info!(output = %self.output_file.display(), "archive complete");
                self.finish_with(true, "Archiving successful.".to_string(), None);
            }
            Err(e) => self.fail_archive(ArchiveError::from(e)),
        }
    }

    fn fail_archive(&mut self, err: ArchiveError) {
        tracing::error!(error = %err, output = %self.output_file.display(), "archiving failed");
        self.core.exit_code = err.exit_code().unwrap_or(FAILURE_EXIT_CODE);
        let message = format!("Failed archiving file: {}!", self.output_file.display());
        self.finish_with(false, message, Some(err.to_string()));
    }
}

#[async_trait]
impl WorkUnit for ArchiveWorker {
    fn id(&self) -> &UnitId {
        self.core.id()
    }

    async fn run(&mut self, cancel: CancellationToken) {
        let span = tracing::info_span!("archive", dir = %self.backup_dir.display());
        self.execute(cancel).instrument(span).await
    }

    async fn close(&mut self, cancel_requested: bool) {
        if self.core.stopped {
            return;
        }
        if let Some(stop) = &self.runner_cancel {
            tracing::debug!(cancel_requested, "stopping running archive command");
            stop.cancel();
            self.core.stopped = true;
        }
    }

    fn state(&self) -> &UnitState {
        &self.core.state
    }

    fn result(&self) -> BackupResult {
        match &self.outcome {
            Some(result) => result.clone(),
            None => self.core.result(
                false,
                format!("Archive of {} did not run", self.backup_dir.display()),
                None,
                self.backup_dir.display().to_string(),
            ),
        }
    }
}

#[cfg(test)]
#[path = "archive_tests.rs"]
mod tests;
