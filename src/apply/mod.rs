pub mod jobs;

use anyhow::{Result, bail};
use indicatif::{MultiProgress, ProgressBar};
use rayon::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::converge::{Converger, Outcome};
use crate::progress::{err_style, outcome_style, spinner_style, waiting_style};
use crate::settings::load_settings;
use jobs::{Resource, group_by_path};

/// Reconcile every given resource against the filesystem.
///
/// High-level flow:
/// 1. Load `settings.toml` (defaults when missing) and build one [`Converger`].
/// 2. Group resources by path (see [`jobs::group_by_path`]).
/// 3. Run groups **in parallel**; resources inside a group run in declaration
///    order, so one path is never touched from two threads.
/// 4. Each resource gets its own spinner; the finished line shows the
///    [`Outcome`] or the error.
///
/// Failures do not stop the other resources.
///
/// # Errors
/// Returns an error if settings cannot be loaded or if any resource failed.
pub fn cmd_apply(resources: &[Resource]) -> Result<()> {
    let settings = load_settings()?;
    let converger = Converger::new(settings);

    let mp = MultiProgress::new();
    let run_style = spinner_style();

    let mut bars: Vec<ProgressBar> = Vec::with_capacity(resources.len());
    for r in resources {
        let pb = mp.add(ProgressBar::new_spinner());
        pb.set_style(waiting_style());
        pb.set_message(format!("waiting {}", r.label));
        bars.push(pb);
    }

    let failed = AtomicUsize::new(0);
    let groups = group_by_path(resources);

    groups.par_iter().for_each(|group| {
        for (idx, res) in group {
            let pb = &bars[*idx];
            pb.set_style(run_style.clone());
            pb.set_message(format!("converging {}", res.label));
            pb.enable_steady_tick(Duration::from_millis(80));

            if !finish(&mp, pb, res, converger.reconcile(&res.desired)) {
                failed.fetch_add(1, Ordering::Relaxed);
            }
        }
    });

    let failed = failed.into_inner();
    if failed > 0 {
        bail!("{} of {} resources failed", failed, resources.len());
    }
    Ok(())
}

/// Log the result above the bars and freeze `pb` on its final line.
/// Returns `false` for a failed resource.
fn finish(
    mp: &MultiProgress,
    pb: &ProgressBar,
    res: &Resource,
    result: crate::error::Result<Outcome>,
) -> bool {
    match result {
        Ok(outcome) => {
            mp.suspend(|| log::info!("{}: {}", res.desired.path.display(), outcome));
            pb.set_style(outcome_style(outcome));
            pb.finish_with_message(format!("{} ({})", res.label, describe(outcome, res)));
            true
        }
        Err(e) => {
            mp.suspend(|| log::error!("{}: {}", res.desired.path.display(), e));
            pb.set_style(err_style());
            pb.finish_with_message(format!("{} (error: {})", res.label, e));
            false
        }
    }
}

fn describe(outcome: Outcome, res: &Resource) -> String {
    match outcome {
        Outcome::Created | Outcome::Updated => format!("{} at {}", outcome, res.desired.ensure),
        Outcome::Unchanged | Outcome::Destroyed => outcome.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConvergeError;
    use crate::resource::DesiredState;
    use indicatif::ProgressDrawTarget;

    fn hidden() -> (MultiProgress, ProgressBar) {
        let mp = MultiProgress::with_draw_target(ProgressDrawTarget::hidden());
        let pb = mp.add(ProgressBar::new_spinner());
        (mp, pb)
    }

    fn res(ensure: &str) -> Resource {
        Resource {
            label: "/srv/app".to_string(),
            desired: DesiredState::new("/srv/app", "a/b").with_ensure(ensure),
        }
    }

    #[test]
    fn finished_bar_shows_the_outcome() {
        let (mp, pb) = hidden();
        assert!(finish(&mp, &pb, &res("v1"), Ok(Outcome::Updated)));
        assert!(pb.is_finished());
        assert_eq!(pb.message(), "/srv/app (updated at v1)");

        let (mp, pb) = hidden();
        assert!(finish(&mp, &pb, &res("absent"), Ok(Outcome::Destroyed)));
        assert_eq!(pb.message(), "/srv/app (destroyed)");
    }

    #[test]
    fn failed_bar_carries_the_error() {
        let (mp, pb) = hidden();
        let err = ConvergeError::InvalidInput("path must be absolute: x".into());
        assert!(!finish(&mp, &pb, &res("present"), Err(err)));
        assert!(pb.is_finished());
        assert!(pb.message().starts_with("/srv/app (error: "));
    }
}
