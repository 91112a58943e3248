//! Backup units driven through the pool.

use crate::prelude::*;
use cb_core::{keys, DumpConfig, StateValue};
use cb_engine::{WorkPool, FAILURE_EXIT_CODE};
use serial_test::serial;
use std::time::{Duration, Instant};

#[tokio::test]
async fn replica_sets_back_up_independently() {
    let ws = Workspace::new();
    let good = ws.dump_tool("good-dump", &format!("{}\n{}", log_line("writing app.users to"), WRITES_DUMP));
    let bad = ws.dump_tool(
        "bad-dump",
        &format!("{}\nexec sleep 30", log_line("Failed: error connecting to db server")),
    );

    let mut pool = WorkPool::new(2);
    pool.submit(ws.backup_worker("rs0", &good, "3.6.0"));
    pool.submit(ws.backup_worker("rs1", &bad, "3.6.0"));
    pool.submit(ws.backup_worker("rs2", &good, "3.6.0"));
    let reports = sorted(pool.join().await);

    assert_eq!(reports.len(), 3);
    for report in [&reports[0], &reports[2]] {
        assert!(report.result.success, "{:?}", report);
        assert!(report.state.completed());
        assert_eq!(report.state.count(), Some(7));
    }

    let failed = &reports[1];
    assert_eq!(failed.id, "rs1");
    assert!(!failed.result.success);
    assert_eq!(failed.result.message, "Error connecting to db server");
    assert_eq!(failed.result.exit_code, FAILURE_EXIT_CODE);
    assert_eq!(failed.result.directory_or_uri, "rs1/rs1.db.internal:27017");
    assert!(!failed.state.completed());
    assert!(!failed.state.running());
    assert!(!failed.state.has_summary());

    assert!(ws.backups().join("rs0/dump/app/users.bson").exists());
    assert!(ws.backups().join("rs2/dump/oplog.bson").exists());
}

#[tokio::test]
async fn state_serializes_for_the_orchestrator() {
    let ws = Workspace::new();
    let tool = ws.dump_tool("mongodump", WRITES_DUMP);

    let mut pool = WorkPool::new(1);
    pool.submit(ws.backup_worker("rs0", &tool, "4.2.0"));
    let report = pool.join().await.remove(0);

    let state = serde_json::to_value(&report.state).unwrap();
    assert_eq!(state["running"], false);
    assert_eq!(state["completed"], true);
    assert_eq!(state["count"], 7);
    assert_eq!(
        state["file"],
        ws.backups().join("rs0/dump/oplog.bson").display().to_string()
    );
    assert!(matches!(
        report.state.get(keys::LAST_TS),
        Some(StateValue::Timestamp(_))
    ));

    let result = serde_json::to_value(&report.result).unwrap();
    assert_eq!(result["success"], true);
    assert_eq!(result["directory"], "rs0/rs0.db.internal:27017");
    assert_eq!(result["exit_code"], 0);
}

#[tokio::test]
async fn configuration_loaded_from_toml() {
    let ws = Workspace::new();
    let args = ws.path("args");
    let tool = ws.dump_tool(
        "mongodump",
        &format!("printf '%s\\n' \"$@\" > '{}'\nexit 0", args.display()),
    );
    let config = DumpConfig::from_toml_str(&format!(
        r#"
binary = "{}"
compression = "none"
threads = 4
oplog_enabled = "false"
authdb = "users"
read_pref_tags = "dc:east"
"#,
        tool.display()
    ))
    .unwrap();

    let mut pool = WorkPool::new(1);
    pool.submit(ws.backup_worker_with("rs0", config, "3.4.0"));
    let report = pool.join().await.remove(0);

    assert!(report.result.success, "{:?}", report);
    assert!(!report.state.has_summary());
    assert!(ws.oplog.opens().is_empty());

    let args: Vec<String> = std::fs::read_to_string(&args)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect();
    assert!(!args.iter().any(|a| a == "--oplog" || a == "--gzip"));
    assert!(args.iter().any(|a| a == "--numParallelCollections=4"));
    assert!(args.iter().any(|a| a == "--authenticationDatabase=users"));
    assert!(args
        .iter()
        .any(|a| a == r#"--readPreference={"mode":"secondary","tags":{"dc":"east"}}"#));
}

#[tokio::test]
async fn unsupported_tls_is_fatal_without_spawning() {
    let ws = Workspace::new();
    let marker = ws.path("spawned");
    let tool = ws.dump_tool("mongodump", &format!("touch '{}'", marker.display()));
    let mut config = DumpConfig {
        binary: tool,
        ..DumpConfig::default()
    };
    config.tls.enabled = true;

    let mut pool = WorkPool::new(1);
    pool.submit(ws.backup_worker_with("rs0", config, "2.4.14"));
    let report = pool.join().await.remove(0);

    assert!(!report.result.success);
    assert_eq!(report.result.exit_code, FAILURE_EXIT_CODE);
    assert_eq!(
        report.result.message,
        "dump tool must be >= 2.6.0 to enable TLS encryption"
    );
    assert!(!marker.exists());
}

#[tokio::test]
#[serial]
async fn shutdown_stops_running_dumps() {
    std::env::set_var("CB_KILL_GRACE_MS", "2000");
    let ws = Workspace::new();
    let tool = ws.dump_tool(
        "slow-dump",
        &format!("{}\nexec sleep 30", log_line("writing app.users to")),
    );

    let mut pool = WorkPool::new(1);
    pool.submit(ws.backup_worker("rs0", &tool, "3.6.0"));
    pool.submit(ws.backup_worker("rs1", &tool, "3.6.0"));

    tokio::time::sleep(Duration::from_millis(300)).await;
    let start = Instant::now();
    pool.shutdown();
    let reports = sorted(pool.join().await);
    std::env::remove_var("CB_KILL_GRACE_MS");

    assert!(start.elapsed() < Duration::from_secs(10));
    assert_eq!(reports.len(), 2);
    for report in &reports {
        assert!(!report.result.success);
        assert!(!report.state.completed());
        assert!(!report.state.running());
    }
    assert_eq!(
        reports[0].result.error.as_deref(),
        Some("Backup of rs0/rs0.db.internal:27017 was cancelled")
    );
}
