//! Crate entry point for **gitstate**.
//!
//! This library converges local git checkouts towards a declared state:
//! cloned or not, and optionally pinned to a branch, tag, or commit.
//! The [`Converger`] is the embeddable part; the `cmd_*` functions back the
//! `gitstate` CLI.

mod apply;
mod check;
mod converge;
mod error;
mod git;
mod paths;
mod progress;
mod resource;
mod settings;
mod show;
mod source;

/// Re-export commonly used types and commands so they can be accessed from `gitstate::*`.
pub use apply::cmd_apply;
pub use apply::jobs::{Resource, gather, group_by_path};
pub use check::cmd_check;
pub use converge::{Converger, DEFAULT_REMOTE, Outcome, Plan, Provider, is_cloned};
pub use error::ConvergeError;
pub use git::{Captured, CommandRunner, Identity, Invocation, ShellRunner, resolve_identity};
pub use paths::gitstate_home;
pub use resource::{DesiredState, Ensure, load_resource, parse_config_pair};
pub use settings::{Settings, load_settings, load_settings_from};
pub use show::cmd_show;
pub use source::{expand_source, shell_escape};
