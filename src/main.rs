//! # gitstate
//!
//! **gitstate** converges local git checkouts to a declared state.
//!
//! Features:
//! - `gitstate apply` clones, resets, or removes checkouts until they match
//! - `gitstate check` reports drift without touching working trees
//! - `gitstate show` prints the resolved source, identity, and clone command
//! - `gitstate home` prints the gitstate home directory
//!
//! This CLI is built with [clap](https://docs.rs/clap).

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use gitstate::{
    DesiredState, Ensure, cmd_apply, cmd_check, cmd_show, gather, gitstate_home, parse_config_pair,
};
use std::path::PathBuf;

/// Command-line interface definition.
#[derive(Parser, Debug)]
#[command(
    name = "gitstate",
    version,
    about = "gitstate - converge local git checkouts to a declared state",
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Clone, reset, or remove checkouts until they match
    Apply(ResourceArgs),
    /// Report which checkouts drift from their declared state
    Check(ResourceArgs),
    /// Print resolved sources and clone commands without running them
    Show(ResourceArgs),
    /// Print the gitstate home directory
    Home,
}

/// Resources come from TOML documents and/or one inline declaration.
#[derive(Args, Debug)]
struct ResourceArgs {
    /// Resource documents, one desired state each
    files: Vec<PathBuf>,

    /// Checkout path of an inline resource
    #[arg(long)]
    path: Option<PathBuf>,

    /// Repository URL, remote, or owner/name short form
    #[arg(long, requires = "path")]
    source: Option<String>,

    /// present, absent, or a branch/tag/commit
    #[arg(long, requires = "path")]
    ensure: Option<String>,

    /// Protocol used to expand owner/name sources
    #[arg(long, requires = "path")]
    protocol: Option<String>,

    /// Raw clone argument (repeatable)
    #[arg(long = "extra", requires = "path", allow_hyphen_values = true)]
    extra: Vec<String>,

    /// Git config override as key=value (repeatable)
    #[arg(short = 'c', long = "config", requires = "path", value_parser = parse_config_pair)]
    config: Vec<(String, String)>,

    /// Run git as this user
    #[arg(long, requires = "path")]
    user: Option<String>,
}

impl ResourceArgs {
    fn inline(&self) -> Option<DesiredState> {
        let path = self.path.clone()?;
        Some(DesiredState {
            path,
            source: self.source.clone().unwrap_or_default(),
            ensure: self.ensure.clone().map(Ensure::from).unwrap_or_default(),
            protocol: self.protocol.clone(),
            extra: self.extra.clone(),
            config: self.config.clone(),
            user: self.user.clone(),
        })
    }
}

/// CLI entry point.
///
/// Parses arguments with `clap` and executes the selected subcommand.
fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.cmd {
        Cmd::Apply(args) => cmd_apply(&gather(&args.files, args.inline())?),
        Cmd::Check(args) => cmd_check(&gather(&args.files, args.inline())?),
        Cmd::Show(args) => cmd_show(&gather(&args.files, args.inline())?),
        Cmd::Home => {
            println!("{}", gitstate_home()?.display());
            Ok(())
        }
    }
}
