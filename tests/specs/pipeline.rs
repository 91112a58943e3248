//! Backups followed by archiving of the completed directory tree.

use crate::prelude::*;
use cb_core::{ArchiveConfig, Compression};
use cb_engine::{ArchiveWorker, WorkPool};
use std::process::Command;

fn list(archive: &std::path::Path) -> Vec<String> {
    let output = Command::new("tar").arg("-tf").arg(archive).output().unwrap();
    assert!(output.status.success(), "{:?}", output);
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::to_string)
        .collect()
}

#[tokio::test]
async fn completed_backups_are_archived() {
    let ws = Workspace::new();
    let tool = ws.dump_tool("mongodump", WRITES_DUMP);

    let mut backups = WorkPool::new(2);
    for replset in ["rs0", "rs1"] {
        backups.submit(ws.backup_worker(replset, &tool, "4.2.0"));
    }
    let reports = sorted(backups.join().await);
    assert!(reports.iter().all(|r| r.state.completed()), "{:?}", reports);

    let config = ArchiveConfig {
        compression: Compression::None,
        ..ArchiveConfig::default()
    };
    let mut archives = WorkPool::new(2);
    for report in &reports {
        let backup = ws.backups().join(report.id.as_str());
        let output = ws.archives().join(format!("{}.tar", report.id));
        archives.submit(ArchiveWorker::new(backup, output, config.clone()));
    }
    let archived = sorted(archives.join().await);

    assert_eq!(archived.len(), 2);
    for report in &archived {
        assert!(report.result.success, "{:?}", report);
        assert_eq!(report.result.message, "Archiving successful.");
        assert!(report.state.completed());
    }

    let main = list(&ws.archives().join("rs0.tar"));
    assert!(main.iter().any(|e| e == "rs0/dump/app/users.bson"), "{:?}", main);
    assert!(main.iter().any(|e| e == "rs0/dump/oplog.bson"), "{:?}", main);
    assert!(!main.iter().any(|e| e.contains("/admin") || e.contains("/config")), "{:?}", main);

    let admin = list(&ws.archives().join("admin_rs1.tar"));
    assert!(admin.iter().any(|e| e == "admin/system.version.bson"), "{:?}", admin);
    let config = list(&ws.archives().join("config_rs1.tar"));
    assert!(config.iter().any(|e| e == "config/settings.bson"), "{:?}", config);

    assert!(!ws.backups().join("rs0/dump/app/users.bson").exists());
}
