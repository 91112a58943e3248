//! Test helpers for the workspace behavior tests.
//!
//! Provides fake dump tools and fixtures for driving units through a pool.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use cb_adapters::FakeOplogAdapter;
use cb_core::{ConsistencySummary, DumpConfig, Endpoint, OplogTimestamp, Timer, Version};
use cb_engine::{BackupWorker, UnitReport};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const LOG_TS: &str = "2024-03-01T10:15:30.123+0000";

/// Dump tool that writes a small dump tree into its `--out` directory.
pub const WRITES_DUMP: &str = r#"for arg in "$@"; do
  case "$arg" in --out=*) out="${arg#--out=}" ;; esac
done
mkdir -p "$out/admin" "$out/config" "$out/app"
echo version > "$out/admin/system.version.bson"
echo settings > "$out/config/settings.bson"
echo users > "$out/app/users.bson"
echo oplog > "$out/oplog.bson"
exit 0"#;

/// A temporary workspace with a fake dump tool.
pub struct Workspace {
    pub dir: TempDir,
    pub oplog: FakeOplogAdapter,
    pub timer: Timer,
}

impl Workspace {
    pub fn new() -> Self {
        let workspace = Self {
            dir: TempDir::new().unwrap(),
            oplog: FakeOplogAdapter::with_summary(ConsistencySummary {
                count: 7,
                first_ts: Some(OplogTimestamp::new(1_700_000_000, 1)),
                last_ts: Some(OplogTimestamp::new(1_700_000_030, 2)),
            }),
            timer: Timer::new(),
        };
        std::fs::create_dir_all(workspace.backups()).unwrap();
        std::fs::create_dir_all(workspace.archives()).unwrap();
        workspace
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn backups(&self) -> PathBuf {
        self.path("backups")
    }

    pub fn archives(&self) -> PathBuf {
        self.path("archives")
    }

    /// Write an executable dump tool script and return its path.
    pub fn dump_tool(&self, name: &str, body: &str) -> PathBuf {
        let path = self.path(name);
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    pub fn backup_worker(
        &self,
        replset: &str,
        binary: &Path,
        version: &str,
    ) -> BackupWorker<FakeOplogAdapter> {
        let config = DumpConfig {
            binary: binary.to_path_buf(),
            ..DumpConfig::default()
        };
        self.backup_worker_with(replset, config, version)
    }

    pub fn backup_worker_with(
        &self,
        replset: &str,
        config: DumpConfig,
        version: &str,
    ) -> BackupWorker<FakeOplogAdapter> {
        BackupWorker::new(
            Endpoint::new(replset, format!("{}.db.internal", replset), 27017),
            config,
            Version::parse(version),
            self.oplog.clone(),
            self.timer.clone(),
            &self.backups(),
        )
    }
}

/// Shell snippet printing a timestamped diagnostic line.
pub fn log_line(message: &str) -> String {
    format!("printf '%s\\t%s\\n' '{}' '{}' >&2", LOG_TS, message)
}

/// Reports sorted by unit id.
pub fn sorted(mut reports: Vec<UnitReport>) -> Vec<UnitReport> {
    reports.sort_by(|a, b| a.id.cmp(&b.id));
    reports
}
