use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

use crate::resource::DesiredState;

/// `owner/name`: one slash, no `@`, no whitespace.
static SHORT_FORM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@/\s]+/[^/\s]+$").expect("valid short-form regex"));

pub const DEFAULT_PROTOCOL: &str = "https";
pub const DEFAULT_HOST: &str = "github.com";

/// Expand an `owner/name` short form into `<protocol>://<host>/owner/name`.
///
/// Anything else (full URLs, scp-style `git@host:path` remotes, local paths)
/// is returned unchanged.
///
/// ```
/// use gitstate::expand_source;
/// assert_eq!(
///     expand_source("rails/rails", "https", "github.com"),
///     "https://github.com/rails/rails"
/// );
/// ```
pub fn expand_source(source: &str, protocol: &str, host: &str) -> String {
    if SHORT_FORM.is_match(source) {
        format!("{}://{}/{}", protocol, host, source)
    } else {
        source.to_string()
    }
}

/// Quote a string for `/bin/sh`. Safe strings are returned bare.
pub fn shell_escape(s: &str) -> String {
    if s.is_empty() {
        return "''".to_string();
    }
    if s.chars().all(|c| {
        c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ',' | ':' | '+' | '/' | '@' | '=')
    }) {
        return s.to_string();
    }
    format!("'{}'", s.replace('\'', "'\\''"))
}

pub fn escape_path(path: &Path) -> String {
    shell_escape(&path.to_string_lossy())
}

/// `-c key=value` flags, joined in declaration order. No dedup.
pub fn config_flags(config: &[(String, String)]) -> String {
    config
        .iter()
        .map(|(k, v)| format!("-c {}={}", k, v))
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}

pub fn extra_args(extra: &[String]) -> String {
    extra.join(" ").trim().to_string()
}

/// Segments following `clone` on the command line: config flags, extra args,
/// expanded source, escaped destination. Empty segments are dropped.
pub fn clone_segments(desired: &DesiredState, protocol: &str, host: &str) -> Vec<String> {
    [
        config_flags(&desired.config),
        extra_args(&desired.extra),
        expand_source(&desired.source, protocol, host),
        escape_path(&desired.path),
    ]
    .into_iter()
    .filter(|s| !s.is_empty())
    .collect()
}
