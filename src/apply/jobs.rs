use anyhow::{Result, bail};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::resource::{DesiredState, load_resource};

/// One desired state plus where it came from, for display.
#[derive(Debug, Clone)]
pub struct Resource {
    pub label: String,
    pub desired: DesiredState,
}

/// Load every resource document, then append the inline one (if any).
///
/// # Errors
/// - Returns an error if any document fails to load.
/// - Returns an error if no resource was given at all.
pub fn gather(files: &[PathBuf], inline: Option<DesiredState>) -> Result<Vec<Resource>> {
    let mut out = Vec::with_capacity(files.len() + 1);
    for f in files {
        let desired = load_resource(f)?;
        out.push(Resource {
            label: format!("{} ({})", desired.path.display(), f.display()),
            desired,
        });
    }
    if let Some(desired) = inline {
        out.push(Resource {
            label: desired.path.display().to_string(),
            desired,
        });
    }
    if out.is_empty() {
        bail!("no resources given (pass resource files or --path)");
    }
    Ok(out)
}

/// Group resources that share a path, keeping first-appearance order both
/// between and within groups. Each element carries its original index.
///
/// Resources in one group must run one after another; distinct groups may
/// run in parallel.
pub fn group_by_path(resources: &[Resource]) -> Vec<Vec<(usize, &Resource)>> {
    let mut slot: HashMap<&Path, usize> = HashMap::new();
    let mut groups: Vec<Vec<(usize, &Resource)>> = Vec::new();
    for (idx, r) in resources.iter().enumerate() {
        let g = *slot.entry(r.desired.path.as_path()).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[g].push((idx, r));
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn res(path: &str, ensure: &str) -> Resource {
        Resource {
            label: path.to_string(),
            desired: DesiredState::new(path, "a/b").with_ensure(ensure),
        }
    }

    #[test]
    fn groups_share_a_path_and_keep_order() {
        let rs = vec![
            res("/srv/a", "present"),
            res("/srv/b", "present"),
            res("/srv/a", "v1"),
            res("/srv/c", "absent"),
            res("/srv/a", "absent"),
        ];
        let groups = group_by_path(&rs);
        let idx: Vec<Vec<usize>> = groups
            .iter()
            .map(|g| g.iter().map(|(i, _)| *i).collect())
            .collect();
        assert_eq!(idx, vec![vec![0, 2, 4], vec![1], vec![3]]);
    }

    #[test]
    fn gather_loads_files_and_inline() {
        let td = tempdir().unwrap();
        let f = td.path().join("app.toml");
        fs::write(&f, "path = \"/srv/app\"\nsource = \"a/b\"\n").unwrap();

        let inline = DesiredState::new("/srv/inline", "c/d");
        let got = gather(&[f.clone()], Some(inline)).unwrap();
        assert_eq!(got.len(), 2);
        assert_eq!(got[0].desired.path, PathBuf::from("/srv/app"));
        assert!(got[0].label.contains("app.toml"));
        assert_eq!(got[1].label, "/srv/inline");
    }

    #[test]
    fn gather_requires_something() {
        assert!(gather(&[], None).is_err());
    }
}
