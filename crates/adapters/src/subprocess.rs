// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subprocess execution helpers
//!
//! [`CommandRunner`] runs up to three invocations of one program as an
//! all-or-nothing chain, equivalent to `first && second && primary` with the
//! configured environment overrides exported to every step. Each step is
//! spawned directly (no shell), so arguments are never re-parsed.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

/// Errors from running a command chain
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} command failed with exit code {exit_code}! Stderr output:\n{output}")]
    Execution {
        program: String,
        exit_code: i32,
        output: String,
    },
    #[error("error reading {program} output: {source}")]
    Output {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} command was stopped before completion")]
    Cancelled { program: String },
}

impl RunnerError {
    /// Exit code of the failed step, if it ran to exit.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            RunnerError::Execution { exit_code, .. } => Some(*exit_code),
            _ => None,
        }
    }
}

/// Map an exit status to a single code. Signal deaths follow the shell
/// convention of `128 + signal`.
pub fn exit_code_of(status: ExitStatus) -> i32 {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    status.code().unwrap_or(-1)
}

/// Ordered, short-circuiting chain of invocations of one program.
#[derive(Debug)]
pub struct CommandRunner {
    program: PathBuf,
    primary: Vec<String>,
    first_aux: Option<Vec<String>>,
    second_aux: Option<Vec<String>>,
    env: Vec<(String, String)>,
    verbose: bool,
    output: Vec<String>,
    cancel: CancellationToken,
    active: AtomicBool,
}

impl CommandRunner {
    /// Create a runner whose final step invokes `program` with `primary`.
    pub fn new(program: impl Into<PathBuf>, primary: Vec<String>) -> Self {
        Self {
            program: program.into(),
            primary,
            first_aux: None,
            second_aux: None,
            env: Vec::new(),
            verbose: false,
            output: Vec::new(),
            cancel: CancellationToken::new(),
            active: AtomicBool::new(false),
        }
    }

    /// Step that runs before everything else.
    pub fn first_aux(mut self, args: Vec<String>) -> Self {
        self.first_aux = Some(args);
        self
    }

    /// Step that runs after the first auxiliary step and before the primary.
    pub fn second_aux(mut self, args: Vec<String>) -> Self {
        self.second_aux = Some(args);
        self
    }

    /// Export an environment variable to every step.
    pub fn env(mut self, key: impl Into<String>, val: impl Into<String>) -> Self {
        self.env.push((key.into(), val.into()));
        self
    }

    /// Log captured output even when the chain succeeds.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Tie this runner to an external cancellation token.
    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Argument lists in execution order.
    pub fn steps(&self) -> Vec<&[String]> {
        [
            self.first_aux.as_deref(),
            self.second_aux.as_deref(),
            Some(self.primary.as_slice()),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    /// Output accumulated so far, one entry per step that produced any.
    pub fn output(&self) -> &[String] {
        &self.output
    }

    /// Returns true while a step's process is alive.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Human-readable rendering of the chain for logs.
    pub fn command_line(&self) -> String {
        let program = self.program_name();
        let mut parts: Vec<String> = self
            .env
            .iter()
            .map(|(k, v)| format!("export {}={}", k, v))
            .collect();
        for args in self.steps() {
            let mut step = program.clone();
            for arg in args {
                step.push(' ');
                step.push_str(arg);
            }
            parts.push(step);
        }
        parts.join(" && ")
    }

    /// Run the chain. Returns the final exit code (always 0 on success).
    pub async fn run(&mut self) -> Result<i32, RunnerError> {
        let steps: Vec<Vec<String>> = self.steps().into_iter().map(<[String]>::to_vec).collect();

        let mut exit_code = 0;
        for args in steps {
            if self.cancel.is_cancelled() {
                return Err(RunnerError::Cancelled {
                    program: self.program_name(),
                });
            }
            exit_code = self.run_step(&args).await?;
            if exit_code != 0 {
                return Err(RunnerError::Execution {
                    program: self.program_name(),
                    exit_code,
                    output: self.output.join("\n"),
                });
            }
        }

        if self.verbose {
            if self.output.is_empty() {
                tracing::debug!("{} command completed", self.program_name());
            } else {
                tracing::debug!(
                    "{} command completed with output:\n\t{}",
                    self.program_name(),
                    self.output.join("\n")
                );
            }
        }

        Ok(exit_code)
    }

    /// Request termination of the active step and prevent later steps.
    /// Safe to call repeatedly and before `run`.
    pub fn close(&self) {
        if self.is_active() && !self.cancel.is_cancelled() {
            tracing::debug!(command = %self.program.display(), "stopping running command");
        }
        self.cancel.cancel();
    }

    async fn run_step(&mut self, args: &[String]) -> Result<i32, RunnerError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(args)
            .envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|source| RunnerError::Spawn {
            program: self.program_name(),
            source,
        })?;
        self.active.store(true, Ordering::SeqCst);

        // Drain both pipes until the process closes them, killing it if
        // cancellation arrives first. No output is dropped either way.
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let reading = async { tokio::join!(read_stream(stdout), read_stream(stderr)) };
        tokio::pin!(reading);

        let mut killed = false;
        let (stdout, stderr) = loop {
            tokio::select! {
                streams = &mut reading => break streams,
                _ = self.cancel.cancelled(), if !killed => {
                    killed = true;
                    if let Err(e) = child.start_kill() {
                        tracing::warn!(error = %e, "failed to kill command");
                    }
                }
                // A grandchild may still hold the pipes after the kill
                _ = tokio::time::sleep(crate::env::kill_grace()), if killed => {
                    tracing::warn!(command = %self.program.display(), "output still open after kill, abandoning it");
                    break (Ok(String::new()), Ok(String::new()));
                }
            }
        };

        let status = child.wait().await;
        self.active.store(false, Ordering::SeqCst);
        let status = status.map_err(|source| RunnerError::Output {
            program: self.program_name(),
            source,
        })?;

        let stdout = stdout.map_err(|source| RunnerError::Output {
            program: self.program_name(),
            source,
        })?;
        let stderr = stderr.map_err(|source| RunnerError::Output {
            program: self.program_name(),
            source,
        })?;
        self.record_output(&stdout, &stderr);

        Ok(exit_code_of(status))
    }

    // Prefer stdout; fall back to stderr when stdout is empty.
    fn record_output(&mut self, stdout: &str, stderr: &str) {
        let mut output = stdout.trim();
        if output.is_empty() {
            output = stderr.trim();
        }
        if !output.is_empty() {
            self.output.push(output.lines().collect::<Vec<_>>().join("\n\t"));
        }
    }

    fn program_name(&self) -> String {
        self.program.display().to_string()
    }
}

async fn read_stream<R: AsyncRead + Unpin>(stream: Option<R>) -> std::io::Result<String> {
    let mut buf = Vec::new();
    if let Some(mut stream) = stream {
        stream.read_to_end(&mut buf).await?;
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

#[cfg(test)]
#[path = "subprocess_tests.rs"]
mod tests;
