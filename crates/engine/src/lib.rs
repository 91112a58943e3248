// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! cb-engine: pooled backup and archive units

mod archive;
mod backup;
mod pool;
mod unit;

#[cfg(test)]
mod test_helpers;

pub use archive::{ArchiveError, ArchivePlan, ArchiveWorker, ADMIN_SUBTREE, CONFIG_SUBTREE};
pub use backup::{
    build_command_line, classify_line, BackupWorker, BinaryCapabilities, Capability, CommandLine,
    CommandLineError, LineEvent, FAILURE_MARKER, OPLOG_FILE_NAME,
};
pub use pool::{UnitReport, WorkPool};
pub use unit::{UnitCore, WorkUnit, FAILURE_EXIT_CODE};
