//! Repository converger.
//!
//! Observes a checkout, decides whether it matches a [`DesiredState`], and
//! applies the git operations needed when it does not. All work is blocking
//! and happens on the calling thread. Callers must not converge the same
//! path from two places at once.

mod observe;

use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::error::{ConvergeError, Result};
use crate::git::{CommandRunner, Git, Identity, ShellRunner, resolve_identity};
use crate::resource::{DesiredState, Ensure};
use crate::settings::Settings;
use crate::source::{clone_segments, expand_source};

pub use observe::is_cloned;

pub const DEFAULT_REMOTE: &str = "origin";

/// What a reconciliation pass did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Unchanged,
    Created,
    Updated,
    Destroyed,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Outcome::Unchanged => "unchanged",
            Outcome::Created => "created",
            Outcome::Updated => "updated",
            Outcome::Destroyed => "destroyed",
        })
    }
}

/// The capability a host engine drives: ask, then act.
pub trait Provider {
    fn exists(&self, desired: &DesiredState) -> Result<bool>;
    fn converge(&self, desired: &DesiredState) -> Result<()>;
    fn destroy(&self, desired: &DesiredState) -> Result<()>;
}

/// Values derived from one desired state, computed once per call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub protocol: String,
    pub source: String,
    pub clone_segments: Vec<String>,
    pub identity: Option<Identity>,
}

pub struct Converger<R: CommandRunner = ShellRunner> {
    settings: Settings,
    runner: R,
}

impl Converger<ShellRunner> {
    pub fn new(settings: Settings) -> Self {
        Converger::with_runner(settings, ShellRunner)
    }
}

impl<R: CommandRunner> Converger<R> {
    pub fn with_runner(settings: Settings, runner: R) -> Self {
        Converger { settings, runner }
    }

    /// Validate `desired` and derive everything the git invocations need.
    ///
    /// The resource's `protocol` and `user` win over the settings defaults.
    ///
    /// # Errors
    /// `InvalidInput` for a rejected desired state, `UnknownUser` when the
    /// run-as identity cannot be resolved.
    pub fn plan(&self, desired: &DesiredState) -> Result<Plan> {
        desired.validate()?;
        let protocol = desired
            .protocol
            .as_deref()
            .unwrap_or_else(|| self.settings.protocol())
            .to_string();
        let host = self.settings.host();
        let identity = desired
            .user
            .as_deref()
            .or(self.settings.user.as_deref())
            .map(resolve_identity)
            .transpose()?;
        Ok(Plan {
            source: expand_source(&desired.source, &protocol, host),
            clone_segments: clone_segments(desired, &protocol, host),
            protocol,
            identity,
        })
    }

    fn git<'a>(&'a self, plan: &'a Plan) -> Git<'a, R> {
        Git::new(
            &self.runner,
            self.settings.git_binary(),
            plan.identity.as_ref(),
        )
    }

    /// The exact `git clone` line `converge_create` would run.
    pub fn clone_command(&self, plan: &Plan) -> String {
        self.git(plan).clone_line(&plan.clone_segments)
    }

    /// Fetch `remote`, then compare local `HEAD` with the desired revision.
    ///
    /// For `present`/`absent` there is no revision to compare; a successful
    /// fetch yields `true`.
    ///
    /// # Errors
    /// `Execution` if the fetch or `rev-parse HEAD` fails,
    /// `UnresolvedRevision` if the revision names nothing in the checkout.
    pub fn is_correct_revision(&self, desired: &DesiredState, remote: &str) -> Result<bool> {
        let plan = self.plan(desired)?;
        self.correct_revision(&plan, desired, remote)
    }

    fn correct_revision(&self, plan: &Plan, desired: &DesiredState, remote: &str) -> Result<bool> {
        let git = self.git(plan);
        git.fetch(&desired.path, remote)?;
        let head = git.head(&desired.path)?;

        let Some(rev) = desired.ensure.revision() else {
            return Ok(true);
        };
        let want = git.resolve_revision(&desired.path, rev, remote)?;
        log::debug!(
            "{}: HEAD {} want {} ({})",
            desired.path.display(),
            head,
            want,
            rev
        );
        Ok(head == want)
    }

    fn exists_with(&self, plan: &Plan, desired: &DesiredState) -> Result<bool> {
        if desired.ensure.is_sentinel() {
            return Ok(is_cloned(&desired.path));
        }
        Ok(is_cloned(&desired.path) && self.correct_revision(plan, desired, DEFAULT_REMOTE)?)
    }

    fn create_with(&self, plan: &Plan, desired: &DesiredState) -> Result<()> {
        log::info!("cloning {} into {}", plan.source, desired.path.display());
        self.git(plan).clone_repo(&plan.clone_segments)
    }

    /// Returns whether a clone happened.
    fn revision_with(&self, plan: &Plan, desired: &DesiredState) -> Result<bool> {
        let fresh = !is_cloned(&desired.path);
        if fresh {
            self.create_with(plan, desired)?;
        }
        let Some(rev) = desired.ensure.revision() else {
            return Ok(fresh);
        };

        let git = self.git(plan);
        if !fresh {
            git.fetch(&desired.path, DEFAULT_REMOTE)?;
        }
        let commit = git.resolve_revision(&desired.path, rev, DEFAULT_REMOTE)?;
        log::info!("resetting {} to {} ({})", desired.path.display(), rev, commit);
        git.reset_hard(&desired.path, &commit)?;
        Ok(fresh)
    }

    /// `present`/`absent` only need the checkout to exist; a concrete
    /// revision additionally needs `HEAD` to match it.
    pub fn exists(&self, desired: &DesiredState) -> Result<bool> {
        if desired.ensure.is_sentinel() {
            desired.validate()?;
            return Ok(is_cloned(&desired.path));
        }
        let plan = self.plan(desired)?;
        self.exists_with(&plan, desired)
    }

    /// Clone `source` into `path` with the configured flags and extras.
    pub fn converge_create(&self, desired: &DesiredState) -> Result<()> {
        let plan = self.plan(desired)?;
        self.create_with(&plan, desired)
    }

    /// Clone if needed, then hard-reset the checkout to the desired revision.
    pub fn converge_revision(&self, desired: &DesiredState) -> Result<()> {
        let plan = self.plan(desired)?;
        self.revision_with(&plan, desired).map(|_| ())
    }

    /// Remove `path` and everything under it. A missing path is not an error.
    pub fn converge_destroy(&self, desired: &DesiredState) -> Result<()> {
        let path = &desired.path;
        if path.as_os_str().is_empty() || !path.is_absolute() {
            return Err(ConvergeError::InvalidInput(format!(
                "path must be absolute: {}",
                path.display()
            )));
        }
        log::info!("removing {}", path.display());
        remove_all(path)
    }

    /// Run one full pass: observe, then act only when the checkout differs.
    ///
    /// The run-as identity is only resolved once a git invocation is needed;
    /// `absent` and an already cloned `present` never touch it.
    pub fn reconcile(&self, desired: &DesiredState) -> Result<Outcome> {
        desired.validate()?;

        let outcome = match &desired.ensure {
            Ensure::Present | Ensure::Absent => {
                let cloned = is_cloned(&desired.path);
                log::debug!(
                    "{}: ensure={} cloned={}",
                    desired.path.display(),
                    desired.ensure,
                    cloned
                );
                match (&desired.ensure, cloned) {
                    (Ensure::Present, false) => {
                        let plan = self.plan(desired)?;
                        self.create_with(&plan, desired)?;
                        Outcome::Created
                    }
                    (Ensure::Absent, true) => {
                        self.converge_destroy(desired)?;
                        Outcome::Destroyed
                    }
                    _ => Outcome::Unchanged,
                }
            }
            Ensure::Revision(_) => {
                let plan = self.plan(desired)?;
                let exists = self.exists_with(&plan, desired)?;
                log::debug!(
                    "{}: ensure={} exists={}",
                    desired.path.display(),
                    desired.ensure,
                    exists
                );
                if exists {
                    Outcome::Unchanged
                } else if self.revision_with(&plan, desired)? {
                    Outcome::Created
                } else {
                    Outcome::Updated
                }
            }
        };
        Ok(outcome)
    }
}

impl<R: CommandRunner> Provider for Converger<R> {
    fn exists(&self, desired: &DesiredState) -> Result<bool> {
        Converger::exists(self, desired)
    }

    fn converge(&self, desired: &DesiredState) -> Result<()> {
        match desired.ensure {
            Ensure::Present => self.converge_create(desired),
            Ensure::Absent => self.converge_destroy(desired),
            Ensure::Revision(_) => self.converge_revision(desired),
        }
    }

    fn destroy(&self, desired: &DesiredState) -> Result<()> {
        self.converge_destroy(desired)
    }
}

fn remove_all(path: &Path) -> Result<()> {
    let res = match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
        Err(e) => Err(e),
    };
    match res {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(source) => Err(ConvergeError::Filesystem {
            path: path.to_path_buf(),
            source,
        }),
    }
}
