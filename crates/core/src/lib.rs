// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! cb-core: Core types for consistent replica-set backups

pub mod config;
pub mod flag;
pub mod id;
pub mod oplog;
pub mod result;
pub mod state;
pub mod time_fmt;
pub mod timer;
pub mod version;

pub use config::{
    parse_read_pref_tags, ArchiveConfig, Compression, ConfigError, DumpConfig, Endpoint,
    TlsConfig,
};
pub use flag::{parse_flag, FlagValue};
pub use id::UnitId;
pub use oplog::{ConsistencySummary, OplogTimestamp};
pub use result::BackupResult;
pub use state::{keys, StateValue, UnitState};
pub use time_fmt::format_seconds;
pub use timer::Timer;
pub use version::Version;
