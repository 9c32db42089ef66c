use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use gitstate::{ConvergeError, Converger, DEFAULT_REMOTE, DesiredState, Outcome, Settings, is_cloned};
use tempfile::{TempDir, tempdir};

fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

fn git(dir: &Path, args: &[&str]) -> String {
    let out = Command::new("git")
        .args([
            "-c",
            "user.name=gitstate",
            "-c",
            "user.email=gitstate@example.com",
            "-c",
            "commit.gpgsign=false",
            "-c",
            "tag.gpgsign=false",
        ])
        .args(args)
        .current_dir(dir)
        .output()
        .unwrap();
    assert!(
        out.status.success(),
        "git {:?}: {}",
        args,
        String::from_utf8_lossy(&out.stderr)
    );
    String::from_utf8_lossy(&out.stdout).trim().to_string()
}

fn commit(repo: &Path, content: &str) -> String {
    fs::write(repo.join("README"), content).unwrap();
    git(repo, &["add", "README"]);
    git(repo, &["commit", "-q", "-m", content]);
    git(repo, &["rev-parse", "HEAD"])
}

/// Origin with two commits on `main`; `v1` tags the first.
struct Origin {
    _td: TempDir,
    root: PathBuf,
    repo: PathBuf,
    first: String,
    second: String,
}

fn origin() -> Origin {
    let td = tempdir().unwrap();
    let root = td.path().to_path_buf();
    let repo = root.join("origin");
    fs::create_dir(&repo).unwrap();
    git(&repo, &["init", "-q"]);
    git(&repo, &["symbolic-ref", "HEAD", "refs/heads/main"]);
    let first = commit(&repo, "one");
    git(&repo, &["tag", "v1"]);
    let second = commit(&repo, "two");
    Origin {
        _td: td,
        root,
        repo,
        first,
        second,
    }
}

impl Origin {
    fn desired(&self, name: &str, ensure: &str) -> DesiredState {
        DesiredState::new(self.root.join(name), self.repo.to_string_lossy()).with_ensure(ensure)
    }
}

fn converger() -> Converger {
    Converger::new(Settings::default())
}

fn readme(path: &Path) -> String {
    fs::read_to_string(path.join("README")).unwrap()
}

#[test]
fn absent_path_is_cloned_on_first_pass() {
    if !git_available() {
        return;
    }
    let o = origin();
    let c = converger();
    let d = o.desired("work", "present");

    assert!(!c.exists(&d).unwrap());
    assert_eq!(c.reconcile(&d).unwrap(), Outcome::Created);
    assert!(is_cloned(&d.path));
    assert_eq!(readme(&d.path), "two");

    assert!(c.exists(&d).unwrap());
    assert_eq!(c.reconcile(&d).unwrap(), Outcome::Unchanged);
}

#[test]
fn tag_revision_converges_and_stays_put() {
    if !git_available() {
        return;
    }
    let o = origin();
    let c = converger();
    let d = o.desired("work", "v1");

    assert_eq!(c.reconcile(&d).unwrap(), Outcome::Created);
    assert_eq!(git(&d.path, &["rev-parse", "HEAD"]), o.first);
    assert_eq!(readme(&d.path), "one");
    assert!(c.exists(&d).unwrap());
    assert_eq!(c.reconcile(&d).unwrap(), Outcome::Unchanged);

    c.converge_revision(&d).unwrap();
    c.converge_revision(&d).unwrap();
    assert_eq!(git(&d.path, &["rev-parse", "HEAD"]), o.first);
    assert_eq!(readme(&d.path), "one");
}

#[test]
fn branch_revision_follows_the_remote() {
    if !git_available() {
        return;
    }
    let o = origin();
    let c = converger();

    let pinned = o.desired("work", "v1");
    c.reconcile(&pinned).unwrap();

    let tracking = o.desired("work", "main");
    assert!(!c.exists(&tracking).unwrap());
    assert_eq!(c.reconcile(&tracking).unwrap(), Outcome::Updated);
    assert_eq!(git(&tracking.path, &["rev-parse", "HEAD"]), o.second);
    assert!(c.exists(&tracking).unwrap());

    let third = commit(&o.repo, "three");
    assert!(!c.is_correct_revision(&tracking, DEFAULT_REMOTE).unwrap());
    assert_eq!(c.reconcile(&tracking).unwrap(), Outcome::Updated);
    assert_eq!(git(&tracking.path, &["rev-parse", "HEAD"]), third);
    assert_eq!(readme(&tracking.path), "three");
}

#[test]
fn commit_revision_discards_local_changes() {
    if !git_available() {
        return;
    }
    let o = origin();
    let c = converger();
    let d = o.desired("work", &o.first);

    assert_eq!(c.reconcile(&d).unwrap(), Outcome::Created);
    fs::write(d.path.join("README"), "local edit").unwrap();

    // Content drift alone leaves HEAD where it was.
    assert!(c.exists(&d).unwrap());
    c.converge_revision(&d).unwrap();
    assert_eq!(readme(&d.path), "one");
}

#[test]
fn unknown_revision_is_reported_distinctly() {
    if !git_available() {
        return;
    }
    let o = origin();
    let c = converger();
    c.reconcile(&o.desired("work", "present")).unwrap();

    let d = o.desired("work", "no-such-ref");
    assert!(matches!(
        c.exists(&d),
        Err(ConvergeError::UnresolvedRevision { .. })
    ));
    assert!(matches!(
        c.reconcile(&d),
        Err(ConvergeError::UnresolvedRevision { .. })
    ));
}

#[test]
fn absent_removes_the_checkout() {
    if !git_available() {
        return;
    }
    let o = origin();
    let c = converger();
    c.reconcile(&o.desired("work", "present")).unwrap();

    let d = o.desired("work", "absent");
    assert!(c.exists(&d).unwrap());
    assert_eq!(c.reconcile(&d).unwrap(), Outcome::Destroyed);
    assert!(!is_cloned(&d.path));
    assert!(!d.path.exists());
    assert_eq!(c.reconcile(&d).unwrap(), Outcome::Unchanged);
}

#[test]
fn clone_applies_config_and_extra_arguments() {
    if !git_available() {
        return;
    }
    let o = origin();
    let c = converger();
    let mut d = o.desired("work", "present");
    d.config = vec![("gitstate.marker".into(), "yes".into())];
    d.extra = vec!["--branch".into(), "v1".into()];

    c.converge_create(&d).unwrap();
    assert_eq!(git(&d.path, &["config", "--get", "gitstate.marker"]), "yes");
    assert_eq!(git(&d.path, &["rev-parse", "HEAD"]), o.first);
}

#[test]
fn clone_into_path_with_spaces() {
    if !git_available() {
        return;
    }
    let o = origin();
    let c = converger();
    let d = o.desired("my work", "present");
    assert_eq!(c.reconcile(&d).unwrap(), Outcome::Created);
    assert!(is_cloned(&d.path));
}

#[test]
fn failed_clone_surfaces_git_output() {
    if !git_available() {
        return;
    }
    let td = tempdir().unwrap();
    let c = converger();
    let d = DesiredState::new(td.path().join("work"), td.path().join("missing").to_string_lossy());
    match c.converge_create(&d) {
        Err(ConvergeError::Execution { command, output, .. }) => {
            assert!(command.contains(" clone "));
            assert!(!output.is_empty());
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert!(!is_cloned(&d.path));
}
