// Tree rows for the sidebar: Project -> Worktree -> Session, each tagged
// with the address an action on that row resolves against.

use std::collections::BTreeSet;

use crate::model::project::Project;
use crate::registry::{self, DiscoveredSession};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeAddress {
    Project { repo: String },
    Worktree { repo: String, worktree: String },
    Session {
        repo: String,
        worktree: Option<String>,
        session_id: String,
        sub_label: Option<String>,
    },
    NewSession { repo: String, worktree: Option<String> },
}

impl NodeAddress {
    pub fn repo(&self) -> &str {
        match self {
            NodeAddress::Project { repo }
            | NodeAddress::Worktree { repo, .. }
            | NodeAddress::Session { repo, .. }
            | NodeAddress::NewSession { repo, .. } => repo,
        }
    }

    pub fn worktree(&self) -> Option<&str> {
        match self {
            NodeAddress::Project { .. } => None,
            NodeAddress::Worktree { worktree, .. } => Some(worktree),
            NodeAddress::Session { worktree, .. } | NodeAddress::NewSession { worktree, .. } => {
                worktree.as_deref()
            }
        }
    }

    fn session(repo: &str, worktree: Option<&str>, found: DiscoveredSession) -> Self {
        NodeAddress::Session {
            repo: repo.to_string(),
            worktree: worktree.map(str::to_string),
            sub_label: found.sub_label().map(str::to_string),
            session_id: found.session_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowKind {
    Project { pm_running: bool },
    Worktree { sessions: usize },
    Session,
    NewSession,
    Placeholder,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeRow {
    pub depth: usize,
    pub label: String,
    pub kind: RowKind,
    /// `None` only for placeholder rows.
    pub address: Option<NodeAddress>,
}

impl TreeRow {
    fn placeholder(label: &str) -> Self {
        Self { depth: 0, label: label.to_string(), kind: RowKind::Placeholder, address: None }
    }
}

pub const NO_PROJECTS: &str = "(no projects found)";
pub const NO_MATCHES: &str = "(no matches)";
pub const NEW_SESSION_LABEL: &str = "+ new session";

/// Build the visible tree. `query` filters case-insensitively on repo or
/// worktree name; an empty query is no filter.
pub fn build_tree(
    projects: &[Project],
    physical: &BTreeSet<String>,
    query: Option<&str>,
) -> Vec<TreeRow> {
    let query = query.map(|q| q.trim().to_lowercase()).filter(|q| !q.is_empty());

    if projects.is_empty() {
        return vec![TreeRow::placeholder(NO_PROJECTS)];
    }

    let mut rows = Vec::new();
    for project in projects {
        let repo_hit = match &query {
            Some(q) => project.name.to_lowercase().contains(q.as_str()),
            None => true,
        };
        if let Some(q) = &query {
            if !project.matches(q) { continue; }
        }

        let pm_running = physical.contains(&registry::encode(&project.pm_session()));
        rows.push(TreeRow {
            depth: 0,
            label: project.name.clone(),
            kind: RowKind::Project { pm_running },
            address: Some(NodeAddress::Project { repo: project.name.clone() }),
        });

        if project.is_worktree_repo {
            for wt in &project.worktrees {
                let wt_hit = match &query {
                    Some(q) => repo_hit || wt.to_lowercase().contains(q.as_str()),
                    None => true,
                };
                if !wt_hit { continue; }
                let sessions = registry::sessions_for_worktree(&project.name, wt, physical);
                rows.push(TreeRow {
                    depth: 1,
                    label: wt.clone(),
                    kind: RowKind::Worktree { sessions: sessions.len() },
                    address: Some(NodeAddress::Worktree {
                        repo: project.name.clone(),
                        worktree: wt.clone(),
                    }),
                });
                push_sessions(&mut rows, 2, &project.name, Some(wt), sessions);
            }
        } else {
            let sessions = registry::sessions_for_repo(&project.name, physical);
            push_sessions(&mut rows, 1, &project.name, None, sessions);
        }
    }

    if rows.is_empty() {
        return vec![TreeRow::placeholder(NO_MATCHES)];
    }
    rows
}

fn push_sessions(
    rows: &mut Vec<TreeRow>,
    depth: usize,
    repo: &str,
    worktree: Option<&str>,
    sessions: Vec<DiscoveredSession>,
) {
    for found in sessions {
        rows.push(TreeRow {
            depth,
            label: found.label.clone(),
            kind: RowKind::Session,
            address: Some(NodeAddress::session(repo, worktree, found)),
        });
    }
    rows.push(TreeRow {
        depth,
        label: NEW_SESSION_LABEL.to_string(),
        kind: RowKind::NewSession,
        address: Some(NodeAddress::NewSession {
            repo: repo.to_string(),
            worktree: worktree.map(str::to_string),
        }),
    });
}

/// Index of the first row carrying an address.
pub fn first_addressable(rows: &[TreeRow]) -> Option<usize> {
    rows.iter().position(|r| r.address.is_some())
}

pub fn position_of(rows: &[TreeRow], address: &NodeAddress) -> Option<usize> {
    rows.iter().position(|r| r.address.as_ref() == Some(address))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn catalog() -> Vec<Project> {
        vec![
            Project::plain("alpha", PathBuf::from("/p/alpha")),
            Project::with_worktrees(
                "beta",
                PathBuf::from("/p/beta"),
                vec!["feat-x".to_string(), "main".to_string()],
            ),
        ]
    }

    fn physical(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn labels(rows: &[TreeRow]) -> Vec<(usize, &str)> {
        rows.iter().map(|r| (r.depth, r.label.as_str())).collect()
    }

    #[test]
    fn unfiltered_tree_decorates_live_sessions() {
        let rows = build_tree(&catalog(), &physical(&["alpha", "beta_feat-x", "beta_feat-x_claude"]), None);
        assert_eq!(
            labels(&rows),
            vec![
                (0, "alpha"),
                (1, "root"),
                (1, NEW_SESSION_LABEL),
                (0, "beta"),
                (1, "feat-x"),
                (2, "root"),
                (2, "claude"),
                (2, NEW_SESSION_LABEL),
                (1, "main"),
                (2, NEW_SESSION_LABEL),
            ]
        );
        assert_eq!(rows[0].kind, RowKind::Project { pm_running: true });
        assert_eq!(rows[3].kind, RowKind::Project { pm_running: false });
        assert_eq!(rows[4].kind, RowKind::Worktree { sessions: 2 });
        assert_eq!(
            rows[6].address,
            Some(NodeAddress::Session {
                repo: "beta".into(),
                worktree: Some("feat-x".into()),
                session_id: "beta/feat-x/claude".into(),
                sub_label: Some("claude".into()),
            })
        );
    }

    #[test]
    fn empty_query_equals_unfiltered() {
        let live = physical(&["beta_main_pi"]);
        assert_eq!(build_tree(&catalog(), &live, Some("")), build_tree(&catalog(), &live, None));
        assert_eq!(build_tree(&catalog(), &live, Some("  ")), build_tree(&catalog(), &live, None));
    }

    #[test]
    fn worktree_query_keeps_only_matching_worktrees() {
        let rows = build_tree(&catalog(), &BTreeSet::new(), Some("FEAT"));
        assert_eq!(labels(&rows), vec![(0, "beta"), (1, "feat-x"), (2, NEW_SESSION_LABEL)]);
    }

    #[test]
    fn repo_query_keeps_all_worktrees() {
        let rows = build_tree(&catalog(), &BTreeSet::new(), Some("bet"));
        let wts: Vec<&str> = rows.iter().filter(|r| r.depth == 1).map(|r| r.label.as_str()).collect();
        assert_eq!(wts, vec!["feat-x", "main"]);
    }

    #[test]
    fn no_matches_yields_single_placeholder() {
        let rows = build_tree(&catalog(), &BTreeSet::new(), Some("zzz"));
        assert_eq!(rows, vec![TreeRow::placeholder(NO_MATCHES)]);
        assert_eq!(first_addressable(&rows), None);
    }

    #[test]
    fn empty_catalog_yields_placeholder() {
        let rows = build_tree(&[], &BTreeSet::new(), None);
        assert_eq!(rows[0].label, NO_PROJECTS);
        assert_eq!(first_addressable(&rows), None);
    }
}
