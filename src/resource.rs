use anyhow::{Context, Result};
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConvergeError;

/// What a resource asks for: existence only, removal, or a concrete revision.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "String")]
pub enum Ensure {
    #[default]
    Present,
    Absent,
    /// A commit hash, tag, or branch name, resolved by git.
    Revision(String),
}

impl Ensure {
    /// `present` and `absent` only care whether the checkout exists.
    pub fn is_sentinel(&self) -> bool {
        matches!(self, Ensure::Present | Ensure::Absent)
    }

    pub fn revision(&self) -> Option<&str> {
        match self {
            Ensure::Revision(r) => Some(r),
            _ => None,
        }
    }
}

impl From<String> for Ensure {
    fn from(s: String) -> Self {
        match s.as_str() {
            "present" => Ensure::Present,
            "absent" => Ensure::Absent,
            _ => Ensure::Revision(s),
        }
    }
}

impl From<&str> for Ensure {
    fn from(s: &str) -> Self {
        Ensure::from(s.to_string())
    }
}

impl fmt::Display for Ensure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ensure::Present => f.write_str("present"),
            Ensure::Absent => f.write_str("absent"),
            Ensure::Revision(r) => f.write_str(r),
        }
    }
}

/// Desired state of a single checkout, loaded from a resource document.
///
/// Example TOML:
/// ```toml
/// path     = "/srv/app"
/// source   = "rails/rails"
/// ensure   = "v7.1.0"
/// protocol = "ssh"
/// extra    = ["--depth", "1"]
/// user     = "deploy"
///
/// [config]
/// "http.sslVerify" = "false"
/// ```
///
/// `extra` accepts a single string, a list of strings, or a list mixing
/// strings and lists (nested lists are flattened one level). Unquoted dotted
/// keys under `[config]` are flattened back into `section.key` names.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DesiredState {
    pub path: PathBuf,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub ensure: Ensure,
    #[serde(default)]
    pub protocol: Option<String>,
    #[serde(default, deserialize_with = "deserialize_extra")]
    pub extra: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_config")]
    pub config: Vec<(String, String)>,
    #[serde(default)]
    pub user: Option<String>,
}

impl DesiredState {
    pub fn new(path: impl Into<PathBuf>, source: impl Into<String>) -> Self {
        DesiredState {
            path: path.into(),
            source: source.into(),
            ensure: Ensure::Present,
            protocol: None,
            extra: Vec::new(),
            config: Vec::new(),
            user: None,
        }
    }

    pub fn with_ensure(mut self, ensure: impl Into<Ensure>) -> Self {
        self.ensure = ensure.into();
        self
    }

    /// Reject states that would lead to a nonsensical or dangerous git invocation.
    pub fn validate(&self) -> Result<(), ConvergeError> {
        if self.path.as_os_str().is_empty() || !self.path.is_absolute() {
            return Err(ConvergeError::InvalidInput(format!(
                "path must be absolute: {}",
                self.path.display()
            )));
        }
        if self.ensure != Ensure::Absent && self.source.trim().is_empty() {
            return Err(ConvergeError::InvalidInput(format!(
                "source is required for {}",
                self.path.display()
            )));
        }
        if let Some(rev) = self.ensure.revision() {
            validate_revision(rev)?;
        }
        Ok(())
    }
}

/// Revisions end up as git arguments; refuse anything git could read as a flag.
fn validate_revision(rev: &str) -> Result<(), ConvergeError> {
    if rev.is_empty() {
        return Err(ConvergeError::InvalidInput(
            "revision cannot be empty".to_string(),
        ));
    }
    if rev.starts_with('-') {
        return Err(ConvergeError::InvalidInput(format!(
            "revision cannot start with '-': {}",
            rev
        )));
    }
    if rev.contains("..") {
        return Err(ConvergeError::InvalidInput(format!(
            "revision cannot contain '..': {}",
            rev
        )));
    }
    if rev.chars().any(|c| c.is_control()) {
        return Err(ConvergeError::InvalidInput(
            "revision cannot contain control characters".to_string(),
        ));
    }
    Ok(())
}

/// Load a resource document from disk.
///
/// # Errors
/// - Returns an error if the file cannot be read.
/// - Returns an error if parsing the TOML fails.
pub fn load_resource(path: &Path) -> Result<DesiredState> {
    let txt = fs::read_to_string(path)
        .with_context(|| format!("resource not found: {}", path.display()))?;
    let desired: DesiredState =
        toml::from_str(&txt).with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(desired)
}

/// Parse a `key=value` pair given on the command line.
pub fn parse_config_pair(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((k, v)) if !k.trim().is_empty() => Ok((k.trim().to_string(), v.to_string())),
        _ => Err(format!("expected key=value, got `{}`", s)),
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ExtraArg {
    One(String),
    Many(Vec<String>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ExtraSpec {
    One(String),
    List(Vec<ExtraArg>),
}

fn deserialize_extra<'de, D>(d: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match ExtraSpec::deserialize(d)? {
        ExtraSpec::One(s) => vec![s],
        ExtraSpec::List(items) => items
            .into_iter()
            .flat_map(|a| match a {
                ExtraArg::One(s) => vec![s],
                ExtraArg::Many(v) => v,
            })
            .collect(),
    })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ConfigValue {
    Str(String),
    Bool(bool),
    Int(i64),
    Float(f64),
    Table(BTreeMap<String, ConfigValue>),
}

impl ConfigValue {
    fn flatten_into(self, key: String, out: &mut Vec<(String, String)>) {
        match self {
            ConfigValue::Str(s) => out.push((key, s)),
            ConfigValue::Bool(b) => out.push((key, b.to_string())),
            ConfigValue::Int(i) => out.push((key, i.to_string())),
            ConfigValue::Float(f) => out.push((key, f.to_string())),
            ConfigValue::Table(t) => {
                for (k, v) in t {
                    v.flatten_into(format!("{}.{}", key, k), out);
                }
            }
        }
    }
}

/// Keeps entries in the order the deserializer yields them.
fn deserialize_config<'de, D>(d: D) -> Result<Vec<(String, String)>, D::Error>
where
    D: Deserializer<'de>,
{
    struct ConfigVisitor;

    impl<'de> Visitor<'de> for ConfigVisitor {
        type Value = Vec<(String, String)>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a table of git config keys to values")
        }

        fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut out = Vec::new();
            while let Some((k, v)) = map.next_entry::<String, ConfigValue>()? {
                v.flatten_into(k, &mut out);
            }
            Ok(out)
        }
    }

    d.deserialize_map(ConfigVisitor)
}
