use std::path::PathBuf;

use crate::registry;

/// Worktree directory the PM agent of a worktree repo runs in.
pub const MAIN_WORKTREE: &str = "main";

/// One top-level directory under the projects root. Rebuilt on every refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub name: String,
    pub path: PathBuf,
    /// Sorted; empty unless `is_worktree_repo`.
    pub worktrees: Vec<String>,
    pub is_worktree_repo: bool,
}

impl Project {
    pub fn plain(name: impl Into<String>, path: PathBuf) -> Self {
        Self { name: name.into(), path, worktrees: Vec::new(), is_worktree_repo: false }
    }

    pub fn with_worktrees(name: impl Into<String>, path: PathBuf, worktrees: Vec<String>) -> Self {
        Self { name: name.into(), path, worktrees, is_worktree_repo: true }
    }

    pub fn pm_session(&self) -> String {
        registry::pm_session_id(&self.name, self.is_worktree_repo)
    }

    /// Working directory of the PM session.
    pub fn pm_dir(&self) -> PathBuf {
        if self.is_worktree_repo {
            self.path.join(MAIN_WORKTREE)
        } else {
            self.path.clone()
        }
    }

    pub fn worktree_dir(&self, worktree: &str) -> PathBuf {
        self.path.join(worktree)
    }

    pub fn has_worktree(&self, worktree: &str) -> bool {
        self.worktrees.iter().any(|w| w == worktree)
    }

    /// Case-insensitive substring match on the repo name or any worktree name.
    /// `query` must already be lowercase.
    pub fn matches(&self, query: &str) -> bool {
        self.name.to_lowercase().contains(query)
            || self.worktrees.iter().any(|w| w.to_lowercase().contains(query))
    }
}

pub fn find<'a>(projects: &'a [Project], name: &str) -> Option<&'a Project> {
    projects.iter().find(|p| p.name == name)
}
