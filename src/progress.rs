use indicatif::ProgressStyle;

use crate::converge::Outcome;

const TICKS: &[&str] = &["⣾", "⣽", "⣻", "⢿", "⡿", "⣟", "⣯", "⣷"];

/// Yellow braille spinner while a resource is being converged.
pub fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("\x1b[33m{spinner}\x1b[0m {wide_msg}")
        .unwrap()
        .tick_strings(TICKS)
}

/// Grey dot for resources waiting behind another one on the same path.
pub fn waiting_style() -> ProgressStyle {
    ProgressStyle::with_template("\x1b[90m·\x1b[0m \x1b[90m{wide_msg}\x1b[0m").unwrap()
}

/// Final line for a finished resource. Changes are green, no-ops are dimmed.
pub fn outcome_style(outcome: Outcome) -> ProgressStyle {
    let template = match outcome {
        Outcome::Unchanged => "\x1b[90m✔ {wide_msg}\x1b[0m",
        Outcome::Created | Outcome::Updated => "\x1b[32m✔\x1b[0m {wide_msg}",
        Outcome::Destroyed => "\x1b[36m✔\x1b[0m {wide_msg}",
    };
    ProgressStyle::with_template(template).unwrap()
}

pub fn err_style() -> ProgressStyle {
    ProgressStyle::with_template("\x1b[31m✘\x1b[0m {wide_msg}").unwrap()
}
