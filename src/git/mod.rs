//! Git integration layer.
//!
//! Everything shells out to the system `git` executable through a
//! [`CommandRunner`], so the converger can be exercised against a recording
//! runner in tests and against `/bin/sh` in production.

mod commands;
mod identity;
mod runner;

pub use commands::Git;
pub use identity::{Identity, resolve_identity};
pub use runner::{Captured, CommandRunner, Invocation, ShellRunner};

#[cfg(test)]
pub(crate) use runner::mock::MockRunner;
