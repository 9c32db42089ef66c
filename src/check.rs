use anyhow::{Result, bail};
use colored::Colorize;
use rayon::prelude::*;

use crate::apply::jobs::{Resource, group_by_path};
use crate::converge::Converger;
use crate::settings::load_settings;

/// CLI command: report whether each resource already matches its checkout.
///
/// Runs `exists` only. A revision check fetches `origin`, which updates
/// remote-tracking refs but never the working tree.
///
/// Example output:
/// ```text
/// ✔ /srv/app in sync
/// ✘ /srv/docs drift (ensure v2.0.0)
/// ```
///
/// # Errors
/// Returns an error if any resource drifted or could not be checked.
pub fn cmd_check(resources: &[Resource]) -> Result<()> {
    let converger = Converger::new(load_settings()?);

    let mut results: Vec<(usize, Result<bool, String>)> = group_by_path(resources)
        .par_iter()
        .flat_map_iter(|group| {
            group
                .iter()
                .map(|(idx, r)| (*idx, converger.exists(&r.desired).map_err(|e| e.to_string())))
                .collect::<Vec<_>>()
        })
        .collect();
    results.sort_by_key(|(idx, _)| *idx);

    let mut drift = 0;
    let mut errors = 0;
    for (idx, res) in results {
        let r = &resources[idx];
        match res {
            Ok(true) => println!("{} {} in sync", "✔".green(), r.label),
            Ok(false) => {
                drift += 1;
                println!(
                    "{} {} drift (ensure {})",
                    "✘".yellow(),
                    r.label,
                    r.desired.ensure
                );
            }
            Err(e) => {
                errors += 1;
                println!("{} {} error: {}", "✘".red(), r.label, e);
            }
        }
    }

    if drift + errors > 0 {
        bail!("{} drifted, {} failed", drift, errors);
    }
    Ok(())
}
