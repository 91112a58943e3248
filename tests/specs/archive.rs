//! Archive units driven through the pool.

use crate::prelude::*;
use cb_core::{ArchiveConfig, Compression};
use cb_engine::{ArchiveWorker, WorkPool, FAILURE_EXIT_CODE};

#[tokio::test]
async fn existing_output_is_never_overwritten() {
    let ws = Workspace::new();
    let backup = ws.backups().join("rs0");
    std::fs::create_dir_all(backup.join("dump/app")).unwrap();
    std::fs::write(backup.join("dump/app/users.bson"), "users").unwrap();
    let output = ws.archives().join("rs0.tar");
    std::fs::write(&output, "earlier archive").unwrap();

    let mut pool = WorkPool::new(1);
    pool.submit(ArchiveWorker::new(&backup, &output, ArchiveConfig::default()));
    let report = pool.join().await.remove(0);

    assert!(!report.result.success);
    assert_eq!(report.result.exit_code, FAILURE_EXIT_CODE);
    assert_eq!(
        report.result.message,
        format!("Output file: {} already exists!", output.display())
    );
    assert_eq!(std::fs::read_to_string(&output).unwrap(), "earlier archive");
    assert!(backup.join("dump/app/users.bson").exists());
    assert!(!ws.archives().join("admin_rs0.tar").exists());
}

#[tokio::test]
async fn failed_chain_reports_the_tool_output() {
    let ws = Workspace::new();
    let backup = ws.backups().join("rs0");
    std::fs::create_dir_all(backup.join("dump")).unwrap();
    let output = ws.archives().join("rs0.tar.gz");
    let tool = ws.dump_tool("tar", "echo 'tar: write error' >&2\nexit 2");

    let config = ArchiveConfig {
        binary: tool,
        compression: Compression::Gzip,
        verbose: false,
    };
    let mut pool = WorkPool::new(1);
    pool.submit(ArchiveWorker::new(&backup, &output, config));
    let report = pool.join().await.remove(0);

    assert!(!report.result.success);
    assert_eq!(report.result.exit_code, 2);
    assert_eq!(
        report.result.message,
        format!("Failed archiving file: {}!", output.display())
    );
    let error = report.result.error.unwrap();
    assert!(error.contains("command failed with exit code 2!"), "{}", error);
    assert!(error.contains("tar: write error"), "{}", error);
}
