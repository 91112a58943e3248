// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resolved configuration snapshots handed to workers.
//!
//! Workers capture these at construction and never re-read them. The types
//! deserialize from TOML so callers can load them from a config file.

use crate::flag::FlagValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// Default dump tool location.
pub const DEFAULT_DUMP_BINARY: &str = "/usr/bin/mongodump";

/// Default archive tool.
pub const DEFAULT_ARCHIVE_BINARY: &str = "tar";

/// Default database port.
pub const DEFAULT_PORT: u16 = 27017;

/// URI scheme for SRV-style endpoint addressing.
pub const SRV_SCHEME: &str = "mongodb+srv://";

/// Errors from configuration values
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown compression method: {0} (expected auto, none or gzip)")]
    UnknownCompression(String),
    #[error("invalid read preference tag '{0}' (expected key:value)")]
    InvalidReadPrefTag(String),
    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Compression mode requested for dump output and archives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    #[default]
    Auto,
    None,
    Gzip,
}

impl Compression {
    /// Whether gzip should be used. `Auto` defers to `auto_default`, which
    /// the caller derives from what the tool supports.
    pub fn use_gzip(self, auto_default: bool) -> bool {
        match self {
            Compression::Auto => auto_default,
            Compression::None => false,
            Compression::Gzip => true,
        }
    }
}

impl FromStr for Compression {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Compression::Auto),
            "none" => Ok(Compression::None),
            "gzip" => Ok(Compression::Gzip),
            _ => Err(ConfigError::UnknownCompression(s.to_string())),
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Compression::Auto => "auto",
            Compression::None => "none",
            Compression::Gzip => "gzip",
        })
    }
}

/// Replica-set endpoint a backup unit dumps from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub replset: String,
    /// Host name, or a full `mongodb+srv://` URI for SRV addressing.
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

impl Endpoint {
    pub fn new(replset: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            replset: replset.into(),
            host: host.into(),
            port,
        }
    }

    /// SRV endpoint from a `mongodb+srv://` URI.
    pub fn srv(replset: impl Into<String>, uri: impl Into<String>) -> Self {
        Self::new(replset, uri, DEFAULT_PORT)
    }

    pub fn is_srv(&self) -> bool {
        self.host.starts_with(SRV_SCHEME)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_srv() {
            write!(f, "{}/{}", self.replset, self.host)
        } else {
            write!(f, "{}/{}:{}", self.replset, self.host, self.port)
        }
    }
}

/// TLS material for connecting to the cluster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TlsConfig {
    pub enabled: bool,
    /// Accept invalid certificates and host names.
    pub insecure: bool,
    pub ca_file: Option<PathBuf>,
    pub crl_file: Option<PathBuf>,
    pub client_cert_file: Option<PathBuf>,
}

/// Settings for one dump invocation.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct DumpConfig {
    pub binary: PathBuf,
    pub compression: Compression,
    /// Parallel collections per dump process; 0 leaves the tool default.
    pub threads: u32,
    pub oplog_enabled: FlagValue,
    pub username: Option<String>,
    pub password: Option<String>,
    pub authdb: Option<String>,
    pub tls: TlsConfig,
    /// Read preference tags as `key:value,key:value`.
    pub read_pref_tags: Option<String>,
    pub verbose: bool,
}

impl Default for DumpConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from(DEFAULT_DUMP_BINARY),
            compression: Compression::default(),
            threads: 0,
            oplog_enabled: FlagValue::default(),
            username: None,
            password: None,
            authdb: None,
            tls: TlsConfig::default(),
            read_pref_tags: None,
            verbose: false,
        }
    }
}

impl DumpConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Parsed read preference tags, empty when none are configured.
    pub fn read_pref_tags(&self) -> Result<BTreeMap<String, String>, ConfigError> {
        match self.read_pref_tags.as_deref() {
            Some(tags) => parse_read_pref_tags(tags),
            None => Ok(BTreeMap::new()),
        }
    }
}

// Hand-written so the password never reaches a log line.
impl fmt::Debug for DumpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DumpConfig")
            .field("binary", &self.binary)
            .field("compression", &self.compression)
            .field("threads", &self.threads)
            .field("oplog_enabled", &self.oplog_enabled)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "****"))
            .field("authdb", &self.authdb)
            .field("tls", &self.tls)
            .field("read_pref_tags", &self.read_pref_tags)
            .field("verbose", &self.verbose)
            .finish()
    }
}

/// Settings for archiving a finished backup directory.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    pub binary: PathBuf,
    pub compression: Compression,
    /// Log tool output even when it succeeds.
    pub verbose: bool,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from(DEFAULT_ARCHIVE_BINARY),
            compression: Compression::default(),
            verbose: false,
        }
    }
}

impl ArchiveConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }
}

/// Parse `key:value,key:value` read preference tags.
pub fn parse_read_pref_tags(tags: &str) -> Result<BTreeMap<String, String>, ConfigError> {
    let mut parsed = BTreeMap::new();
    for entry in tags.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (key, value) = entry
            .split_once(':')
            .map(|(k, v)| (k.trim(), v.trim()))
            .filter(|(k, _)| !k.is_empty())
            .ok_or_else(|| ConfigError::InvalidReadPrefTag(entry.to_string()))?;
        parsed.insert(key.to_string(), value.to_string());
    }
    Ok(parsed)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
