//! Command runner abstraction for git invocations.
//!
//! `CommandRunner` is the seam the converger executes through.
//! `ShellRunner` is the production implementation that spawns `/bin/sh -c`
//! with stderr folded into stdout, so every invocation yields one combined
//! output stream.

use std::path::Path;
use std::process::{Command, Stdio};

use super::identity::Identity;
use crate::error::{ConvergeError, Result};

/// One command line to execute.
#[derive(Debug, Clone, Copy)]
pub struct Invocation<'a> {
    /// Already shell-quoted command line.
    pub line: &'a str,
    pub cwd: Option<&'a Path>,
    pub identity: Option<&'a Identity>,
}

/// What came back from a finished process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Captured {
    pub success: bool,
    pub status: String,
    /// Combined stdout and stderr.
    pub output: String,
}

pub trait CommandRunner: Send + Sync {
    /// Run to completion. Only a failure to spawn is an `Err`; a non-zero
    /// exit is reported through [`Captured::success`].
    fn run(&self, inv: &Invocation<'_>) -> Result<Captured>;
}

/// Production runner: `/bin/sh -c "<line> 2>&1"`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShellRunner;

impl CommandRunner for ShellRunner {
    fn run(&self, inv: &Invocation<'_>) -> Result<Captured> {
        let mut cmd = Command::new("/bin/sh");
        cmd.arg("-c").arg(format!("{} 2>&1", inv.line));
        cmd.env("GIT_TERMINAL_PROMPT", "0");
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        if let Some(dir) = inv.cwd {
            cmd.current_dir(dir);
        }
        if let Some(id) = inv.identity {
            id.apply(&mut cmd);
        }

        let out = cmd.output().map_err(|source| ConvergeError::Spawn {
            command: inv.line.to_string(),
            source,
        })?;

        let mut output = String::from_utf8_lossy(&out.stdout).into_owned();
        // Only the shell itself can still write here.
        if !out.stderr.is_empty() {
            output.push_str(&String::from_utf8_lossy(&out.stderr));
        }

        Ok(Captured {
            success: out.status.success(),
            status: out.status.to_string(),
            output,
        })
    }
}
