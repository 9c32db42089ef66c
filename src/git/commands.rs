//! The git subcommands the converger needs, built as shell command lines.

use std::path::Path;

use super::identity::Identity;
use super::runner::{CommandRunner, Invocation};
use crate::error::{ConvergeError, Result};
use crate::source::shell_escape;

/// Git bound to a runner, an executable, and an optional run-as identity.
pub struct Git<'a, R: CommandRunner> {
    runner: &'a R,
    binary: String,
    identity: Option<&'a Identity>,
}

impl<'a, R: CommandRunner> Git<'a, R> {
    pub fn new(runner: &'a R, binary: &str, identity: Option<&'a Identity>) -> Self {
        Git {
            runner,
            binary: shell_escape(binary),
            identity,
        }
    }

    /// `git <args...>` with every argument quoted.
    pub fn line(&self, args: &[&str]) -> String {
        std::iter::once(self.binary.clone())
            .chain(args.iter().map(|a| shell_escape(a)))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// `git clone <segments...>`. Segments are joined verbatim; the caller
    /// is responsible for escaping.
    pub fn clone_line(&self, segments: &[String]) -> String {
        let mut parts = vec![self.binary.clone(), "clone".to_string()];
        parts.extend(segments.iter().cloned());
        parts.join(" ")
    }

    fn exec(&self, line: &str, cwd: Option<&Path>) -> Result<String> {
        log::debug!(
            "running `{}`{}",
            line,
            cwd.map(|c| format!(" in {}", c.display()))
                .unwrap_or_default()
        );
        let captured = self.runner.run(&Invocation {
            line,
            cwd,
            identity: self.identity,
        })?;
        if !captured.success {
            return Err(ConvergeError::Execution {
                command: line.to_string(),
                status: captured.status,
                output: captured.output.trim().to_string(),
            });
        }
        Ok(captured.output)
    }

    /// Like `exec`, but a non-zero exit yields `None` instead of an error.
    fn try_exec(&self, line: &str, cwd: Option<&Path>) -> Result<Option<String>> {
        let captured = self.runner.run(&Invocation {
            line,
            cwd,
            identity: self.identity,
        })?;
        Ok(captured.success.then_some(captured.output))
    }

    pub fn clone_repo(&self, segments: &[String]) -> Result<()> {
        self.exec(&self.clone_line(segments), None)?;
        Ok(())
    }

    pub fn fetch(&self, repo: &Path, remote: &str) -> Result<()> {
        self.exec(&self.line(&["fetch", "-q", remote]), Some(repo))?;
        Ok(())
    }

    pub fn head(&self, repo: &Path) -> Result<String> {
        let out = self.exec(&self.line(&["rev-parse", "HEAD"]), Some(repo))?;
        Ok(last_line(&out).to_string())
    }

    /// Resolve `rev` to a commit id.
    ///
    /// Resolution order:
    /// 1. Remote branch (`refs/remotes/<remote>/<rev>`)
    /// 2. Tag (`refs/tags/<rev>`)
    /// 3. Any revspec git understands (full or abbreviated commit id)
    ///
    /// Tags are read from the local `refs/tags`, which [`Git::fetch`] fills
    /// without `--force`. Once a tag exists locally, git >= 2.20 refuses to
    /// move it when the remote re-points it ("would clobber existing tag"):
    /// the fetch exits non-zero, so every later pass for that checkout fails
    /// with `Execution` until the local tag is deleted by hand.
    ///
    /// # Errors
    /// `UnresolvedRevision` if none of the candidates names a commit.
    pub fn resolve_revision(&self, repo: &Path, rev: &str, remote: &str) -> Result<String> {
        let candidates = [
            format!("refs/remotes/{}/{}", remote, rev),
            format!("refs/tags/{}", rev),
            rev.to_string(),
        ];
        for cand in &candidates {
            let spec = format!("{}^{{commit}}", cand);
            let line = self.line(&["rev-parse", "-q", "--verify", &spec]);
            if let Some(out) = self.try_exec(&line, Some(repo))? {
                let id = last_line(&out);
                if !id.is_empty() {
                    log::debug!("resolved {} to {} via {}", rev, id, cand);
                    return Ok(id.to_string());
                }
            }
        }
        Err(ConvergeError::UnresolvedRevision {
            revision: rev.to_string(),
            remote: remote.to_string(),
        })
    }

    pub fn reset_hard(&self, repo: &Path, target: &str) -> Result<()> {
        self.exec(&self.line(&["reset", "--hard", target]), Some(repo))?;
        Ok(())
    }
}

/// Last non-empty line, trimmed. Git may print warnings ahead of the answer.
fn last_line(out: &str) -> &str {
    out.lines()
        .map(str::trim)
        .rfind(|l| !l.is_empty())
        .unwrap_or("")
}
