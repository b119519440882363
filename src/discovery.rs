//! Locates bundles on disk: scanning root directories for git checkouts that
//! carry an `envoy_env/`, and the `ENVOY_BNDL_ROOTS` auto-discovery path.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::bundle::Bundle;

/// How deep `find_git_repos` will descend below a root before giving up on
/// a subtree. Matches the original implementation's bound
/// (`find_git_repos(root_dir, max_depth=5)`), which exists because bundle
/// roots tend to be shallow (`<root>/<namespace>/<name>`).
const MAX_SEARCH_DEPTH: usize = 5;

fn is_git_repo(dir: &Path) -> bool {
    dir.join(".git").exists()
}

fn has_envoy_env(dir: &Path) -> bool {
    dir.join("envoy_env").is_dir()
}

/// Depth-bounded search for git checkouts under `root`, including `root`
/// itself. Stops descending once a directory itself is a git repo — nested
/// checkouts (e.g. a submodule) are not searched further.
pub fn find_git_repos(root: &Path) -> Vec<PathBuf> {
    let mut repos = Vec::new();
    let mut it = WalkDir::new(root).max_depth(MAX_SEARCH_DEPTH).into_iter();

    while let Some(entry) = it.next() {
        let Ok(entry) = entry else { continue };
        if !entry.file_type().is_dir() {
            continue;
        }
        let path = entry.path();
        if is_git_repo(path) {
            repos.push(path.to_path_buf());
            it.skip_current_dir();
        }
    }
    repos
}

/// Discover bundles by scanning every git checkout under each root directory
/// for an `envoy_env/` subdirectory.
pub fn discover_bundles_from_roots(roots: &[PathBuf]) -> Vec<Bundle> {
    let mut bundles = Vec::new();
    for root in roots {
        for repo in find_git_repos(root) {
            if has_envoy_env(&repo) {
                match Bundle::from_path(&repo, None) {
                    Ok(bundle) => bundles.push(bundle),
                    Err(err) => tracing::warn!(path = %repo.display(), error = %err, "skipping invalid bundle"),
                }
            }
        }
    }
    bundles
}

/// Parse an `ENVOY_BNDL_ROOTS`-style value: root directories joined by the
/// platform path separator.
pub fn parse_roots(raw: &str) -> Vec<PathBuf> {
    raw.split(crate::platform::PATH_SEPARATOR)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .collect()
}

/// Discover bundles using `ENVOY_BNDL_ROOTS` from the host environment, or an
/// empty result if it isn't set.
pub fn discover_bundles_auto(host_env: &std::collections::HashMap<String, String>) -> Vec<Bundle> {
    match host_env.get("ENVOY_BNDL_ROOTS") {
        Some(raw) => discover_bundles_from_roots(&parse_roots(raw)),
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::tempdir;

    fn make_repo(path: &Path, with_envoy_env: bool) {
        fs::create_dir_all(path).unwrap();
        fs::create_dir_all(path.join(".git")).unwrap();
        if with_envoy_env {
            fs::create_dir_all(path.join("envoy_env")).unwrap();
            fs::write(path.join("envoy_env").join("commands.json"), "{}").unwrap();
        }
    }

    #[test]
    fn finds_git_repos_under_root() {
        let dir = tempdir().unwrap();
        let repo = dir.path().join("gt").join("maya");
        make_repo(&repo, true);

        let repos = find_git_repos(dir.path());
        assert_eq!(repos, vec![repo]);
    }

    #[test]
    fn root_itself_is_a_valid_git_repo() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("maya");
        make_repo(&root, true);

        let repos = find_git_repos(&root);
        assert_eq!(repos, vec![root]);
    }

    #[test]
    fn does_not_descend_into_nested_checkouts() {
        let dir = tempdir().unwrap();
        let outer = dir.path().join("outer");
        make_repo(&outer, false);
        let inner = outer.join("vendor").join("inner");
        make_repo(&inner, true);

        let repos = find_git_repos(dir.path());
        assert_eq!(repos, vec![outer]);
    }

    #[test]
    fn discover_from_roots_skips_repos_without_envoy_env() {
        let dir = tempdir().unwrap();
        let with_env = dir.path().join("gt").join("maya");
        make_repo(&with_env, true);
        let without_env = dir.path().join("gt").join("nuke");
        make_repo(&without_env, false);

        let bundles = discover_bundles_from_roots(&[dir.path().to_path_buf()]);
        assert_eq!(bundles.len(), 1);
        assert_eq!(bundles[0].name, "maya");
    }

    #[test]
    fn parse_roots_splits_on_path_separator() {
        let raw = format!("/a{}/b", crate::platform::PATH_SEPARATOR);
        assert_eq!(parse_roots(&raw), vec![PathBuf::from("/a"), PathBuf::from("/b")]);
    }

    #[test]
    fn auto_discovery_uses_env_roots_var() {
        let dir = tempdir().unwrap();
        let repo = dir.path().join("gt").join("maya");
        make_repo(&repo, true);

        let mut host = HashMap::new();
        host.insert("ENVOY_BNDL_ROOTS".to_string(), dir.path().to_string_lossy().into_owned());
        let bundles = discover_bundles_auto(&host);
        assert_eq!(bundles.len(), 1);
    }

    #[test]
    fn auto_discovery_empty_without_roots_var() {
        let bundles = discover_bundles_auto(&HashMap::new());
        assert!(bundles.is_empty());
    }
}
