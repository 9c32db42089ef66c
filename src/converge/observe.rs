use std::path::Path;

/// `path` is a directory holding a `.git` directory.
///
/// A `.git` *file* (worktrees, submodules) does not count.
pub fn is_cloned(path: &Path) -> bool {
    path.is_dir() && path.join(".git").is_dir()
}
