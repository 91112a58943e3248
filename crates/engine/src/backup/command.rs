// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Version-gated dump command line

use cb_core::{ConfigError, DumpConfig, Endpoint, Version};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Network compressors offered to servers that negotiate them.
const NETWORK_COMPRESSORS: &str = "zstd,snappy,zlib";

/// Optional dump tool features and the first version that has them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Tls,
    StdinPassword,
    ReadPreference,
    ParallelCollections,
    Gzip,
    SrvAddressing,
    NetworkCompressors,
}

impl Capability {
    pub fn minimum(self) -> Version {
        Version::parse(match self {
            Capability::Tls => "2.6.0",
            Capability::StdinPassword => "3.0.2",
            Capability::ReadPreference
            | Capability::ParallelCollections
            | Capability::Gzip => "3.2.0",
            Capability::SrvAddressing => "3.6.0",
            Capability::NetworkCompressors => "4.2.0",
        })
    }

    pub fn description(self) -> &'static str {
        match self {
            Capability::Tls => "enable TLS encryption",
            Capability::StdinPassword => "read the password from stdin",
            Capability::ReadPreference => "set read preference",
            Capability::ParallelCollections => "dump collections in parallel",
            Capability::Gzip => "compress dump output",
            Capability::SrvAddressing => "use mongodb+srv:// URIs",
            Capability::NetworkCompressors => "negotiate network compression",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Errors building a dump command line. All of them are fatal for the unit.
#[derive(Debug, Error)]
pub enum CommandLineError {
    #[error("dump tool must be >= {minimum} to {capability}")]
    Unsupported {
        capability: Capability,
        minimum: Version,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// What a specific dump binary can do.
///
/// A binary that is missing or not executable supports nothing, whatever
/// its reported version.
#[derive(Debug, Clone)]
pub struct BinaryCapabilities {
    version: Version,
    usable: bool,
}

impl BinaryCapabilities {
    /// Inspect `binary` on disk and pair it with its reported `version`.
    pub fn probe(binary: &Path, version: Version) -> Self {
        let usable = is_executable(binary);
        if !usable {
            tracing::warn!(
                binary = %binary.display(),
                "dump binary is missing or not executable, disabling version-gated options"
            );
        }
        Self { version, usable }
    }

    /// Capabilities of a binary known to be usable.
    pub fn assume_usable(version: Version) -> Self {
        Self {
            version,
            usable: true,
        }
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    pub fn supports(&self, capability: Capability) -> bool {
        self.usable && self.version.at_least(&capability.minimum())
    }

    fn require(&self, capability: Capability) -> Result<(), CommandLineError> {
        if self.supports(capability) {
            Ok(())
        } else {
            Err(CommandLineError::Unsupported {
                capability,
                minimum: capability.minimum(),
            })
        }
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// A fully built dump invocation.
#[derive(Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: PathBuf,
    pub args: Vec<String>,
    /// The password must be written to stdin when the tool prompts for it.
    pub stdin_password: bool,
    /// Dump output (and so the oplog artifact) is gzip-compressed.
    pub gzip: bool,
}

impl CommandLine {
    /// Command line for logs, with any password argument masked.
    pub fn display_masked(&self) -> String {
        let mut rendered = self.program.display().to_string();
        for arg in &self.args {
            rendered.push(' ');
            if arg.starts_with("--password=") {
                rendered.push_str("--password=****");
            } else {
                rendered.push_str(arg);
            }
        }
        rendered
    }
}

impl fmt::Debug for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandLine")
            .field("command", &self.display_masked())
            .field("stdin_password", &self.stdin_password)
            .field("gzip", &self.gzip)
            .finish()
    }
}

/// Build the dump invocation for `endpoint`, writing into `<backup_dir>/dump`.
pub fn build_command_line(
    endpoint: &Endpoint,
    config: &DumpConfig,
    caps: &BinaryCapabilities,
    backup_dir: &Path,
    oplog_enabled: bool,
) -> Result<CommandLine, CommandLineError> {
    let mut args = Vec::new();

    if endpoint.is_srv() {
        caps.require(Capability::SrvAddressing)?;
        args.push(format!("--host={}", endpoint.host));
    } else {
        args.push(format!("--host={}", endpoint.host));
        args.push(format!("--port={}", endpoint.port));
    }

    if oplog_enabled {
        args.push("--oplog".to_string());
    }
    args.push(format!("--out={}", backup_dir.join("dump").display()));

    if caps.supports(Capability::NetworkCompressors) {
        tracing::info!(
            version = %caps.version(),
            "dump tool supports network compression, enabling {}",
            NETWORK_COMPRESSORS
        );
        args.push(format!("--compressors={}", NETWORK_COMPRESSORS));
    }

    if config.threads > 0 {
        if caps.supports(Capability::ParallelCollections) {
            args.push(format!("--numParallelCollections={}", config.threads));
        } else {
            tracing::warn!(
                threads = config.threads,
                "dump tool must be >= {} to {}, ignoring thread count",
                Capability::ParallelCollections.minimum(),
                Capability::ParallelCollections
            );
        }
    }

    let gzip = config.compression.use_gzip(caps.supports(Capability::Gzip));
    if gzip {
        args.push("--gzip".to_string());
    }

    let tags = config.read_pref_tags()?;
    if caps.supports(Capability::ReadPreference) {
        let mut read_pref = serde_json::json!({ "mode": "secondary" });
        if !tags.is_empty() {
            let tags: serde_json::Map<String, serde_json::Value> = tags
                .into_iter()
                .map(|(key, value)| (key, serde_json::Value::String(value)))
                .collect();
            read_pref["tags"] = serde_json::Value::Object(tags);
        }
        args.push(format!("--readPreference={}", read_pref));
    } else if !tags.is_empty() {
        caps.require(Capability::ReadPreference)?;
    }

    if let Some(authdb) = config.authdb.as_deref().filter(|db| *db != "admin") {
        tracing::debug!(authdb, "using non-default authentication database");
        args.push(format!("--authenticationDatabase={}", authdb));
    }

    let mut stdin_password = false;
    if let (Some(user), Some(password)) = (&config.username, &config.password) {
        args.push(format!("--username={}", user));
        if caps.supports(Capability::StdinPassword) {
            stdin_password = true;
        } else {
            tracing::warn!(
                "dump tool is too old to read the password securely, upgrade to >= {} to resolve this",
                Capability::StdinPassword.minimum()
            );
            args.push(format!("--password={}", password));
        }
    }

    let tls = &config.tls;
    if tls.enabled {
        caps.require(Capability::Tls)?;
        args.push("--ssl".to_string());
        if let Some(ca) = &tls.ca_file {
            args.push(format!("--sslCAFile={}", ca.display()));
        }
        if let Some(crl) = &tls.crl_file {
            args.push(format!("--sslCRLFile={}", crl.display()));
        }
        if let Some(cert) = &tls.client_cert_file {
            args.push(format!("--sslPEMKeyFile={}", cert.display()));
        }
        if tls.insecure {
            args.push("--sslAllowInvalidCertificates".to_string());
            args.push("--sslAllowInvalidHostnames".to_string());
        }
    }

    Ok(CommandLine {
        program: config.binary.clone(),
        args,
        stdin_password,
        gzip,
    })
}

#[cfg(test)]
#[path = "command_tests.rs"]
mod tests;
