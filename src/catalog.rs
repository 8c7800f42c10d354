// Project discovery: one directory per project under the projects root.
// A project holding a `.bare` directory is a worktree repo; its other
// subdirectories are worktrees.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::model::project::Project;

/// Bare repository directory marking a worktree-style project.
pub const BARE_MARKER: &str = ".bare";

/// Never fails: an unreadable or missing root is an empty catalog.
pub fn load(root: &Path, self_name: &str) -> Vec<Project> {
    let projects: Vec<Project> = subdirectories(root)
        .into_iter()
        .filter(|(name, _)| name != self_name)
        .map(|(name, path)| {
            if path.join(BARE_MARKER).is_dir() {
                let worktrees = subdirectories(&path)
                    .into_iter()
                    .map(|(n, _)| n)
                    .filter(|n| n != BARE_MARKER)
                    .collect();
                Project::with_worktrees(name, path, worktrees)
            } else {
                Project::plain(name, path)
            }
        })
        .collect();
    debug!(root = %root.display(), count = projects.len(), "loaded project catalog");
    projects
}

/// (name, path) of every directory in `dir`, sorted by name.
fn subdirectories(dir: &Path) -> Vec<(String, PathBuf)> {
    let Ok(rd) = std::fs::read_dir(dir) else { return vec![] };
    let mut dirs: Vec<(String, PathBuf)> = rd
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .filter_map(|p| {
            let name = p.file_name()?.to_string_lossy().to_string();
            Some((name, p))
        })
        .collect();
    dirs.sort_by(|a, b| a.0.cmp(&b.0));
    dirs
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::fs;

    fn mkdirs(root: &Path, rels: &[&str]) {
        for rel in rels {
            fs::create_dir_all(root.join(rel)).unwrap();
        }
    }

    #[test]
    fn plain_and_worktree_repos() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        mkdirs(root, &["alpha/src", "beta/.bare", "beta/main", "beta/feat-x"]);
        fs::write(root.join("notes.txt"), "not a project").unwrap();

        let projects = load(root, "dev");
        assert_eq!(
            projects,
            vec![
                Project::plain("alpha", root.join("alpha")),
                Project::with_worktrees(
                    "beta",
                    root.join("beta"),
                    vec!["feat-x".to_string(), "main".to_string()],
                ),
            ]
        );
    }

    #[test]
    fn worktrees_are_sorted_by_name() {
        let dir = tempfile::tempdir().unwrap();
        mkdirs(dir.path(), &["beta/.bare", "beta/main", "beta/feat-x"]);
        let projects = load(dir.path(), "dev");
        assert_eq!(projects[0].worktrees, vec!["feat-x", "main"]);
    }

    #[test]
    fn skips_own_tool_directory() {
        let dir = tempfile::tempdir().unwrap();
        mkdirs(dir.path(), &["dev", "alpha"]);
        let names: Vec<String> = load(dir.path(), "dev").into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["alpha"]);
    }

    #[test]
    fn missing_root_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load(&dir.path().join("nope"), "dev").is_empty());
    }

    #[test]
    fn plain_repo_has_no_worktrees() {
        let dir = tempfile::tempdir().unwrap();
        mkdirs(dir.path(), &["alpha/main", "alpha/docs"]);
        let projects = load(dir.path(), "dev");
        assert!(!projects[0].is_worktree_repo);
        assert!(projects[0].worktrees.is_empty());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn load_is_idempotent(
            layout in proptest::collection::vec(
                ("[a-z]{1,6}", any::<bool>(), proptest::collection::vec("[a-z]{1,6}", 0..4)),
                0..6,
            )
        ) {
            let dir = tempfile::tempdir().unwrap();
            for (name, bare, worktrees) in &layout {
                let project = dir.path().join(name);
                fs::create_dir_all(&project).unwrap();
                if *bare {
                    fs::create_dir_all(project.join(BARE_MARKER)).unwrap();
                }
                for wt in worktrees {
                    fs::create_dir_all(project.join(wt)).unwrap();
                }
            }

            let first = load(dir.path(), "dev");
            let second = load(dir.path(), "dev");
            prop_assert_eq!(first, second);
        }
    }
}
