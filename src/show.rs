use anyhow::Result;

use crate::apply::jobs::Resource;
use crate::converge::Converger;
use crate::settings::load_settings;

/// CLI command: print each resolved desired state.
///
/// Nothing is executed; this shows what `apply` would run.
///
/// Example output:
/// ```text
/// /srv/app
///   ensure: v7.1.0
///   source: https://github.com/rails/rails
///   user:   deploy (uid 1001)
///   clone:  git clone --depth 1 https://github.com/rails/rails /srv/app
/// ```
///
/// # Errors
/// Returns an error if settings cannot be loaded or a resource is invalid.
pub fn cmd_show(resources: &[Resource]) -> Result<()> {
    let converger = Converger::new(load_settings()?);
    for r in resources {
        let plan = converger.plan(&r.desired)?;
        println!("{}", r.label);
        println!("  ensure: {}", r.desired.ensure);
        println!("  source: {}", plan.source);
        match &plan.identity {
            Some(id) => println!("  user:   {} (uid {})", id.name, id.uid),
            None => println!("  user:   (caller)"),
        }
        println!("  clone:  {}", converger.clone_command(&plan));
    }
    Ok(())
}
