// Logical session addresses (repo[/worktree[/sub]]) <-> flat tmux session names.
//
// tmux session names cannot nest, so hierarchy separators are flattened to
// DELIMITER. A repo or worktree name that itself contains DELIMITER collides
// with a deeper address; that is an accepted limitation of the naming scheme.

use std::collections::BTreeSet;

use tracing::debug;

use crate::tmux::Multiplexer;

pub const SEPARATOR: char = '/';
pub const DELIMITER: char = '_';
/// Label of the session whose physical name equals the scope prefix exactly.
pub const ROOT_LABEL: &str = "root";
/// Default sub-session of a worktree: its primary agent.
pub const PRIMARY_AGENT: &str = "pi";

pub fn encode(logical: &str) -> String {
    logical.replace(SEPARATOR, &DELIMITER.to_string())
}

pub fn decode(physical: &str) -> String {
    physical.replace(DELIMITER, &SEPARATOR.to_string())
}

/// A user-chosen sub-session name must survive encode/decode as one segment.
pub fn is_valid_label(name: &str) -> bool {
    !name.is_empty() && !name.contains(SEPARATOR) && !name.contains(DELIMITER)
}

pub fn logical_id(repo: &str, worktree: Option<&str>, sub: Option<&str>) -> String {
    let mut id = repo.to_string();
    for part in [worktree, sub].into_iter().flatten() {
        id.push(SEPARATOR);
        id.push_str(part);
    }
    id
}

/// Split a logical id into (repo, worktree, sub).
pub fn split_logical(id: &str) -> (String, Option<String>, Option<String>) {
    let mut parts = id.splitn(3, SEPARATOR);
    let repo = parts.next().unwrap_or_default().to_string();
    let worktree = parts.next().map(str::to_string);
    let sub = parts.next().map(str::to_string);
    (repo, worktree, sub)
}

pub fn pm_session_id(repo: &str, is_worktree_repo: bool) -> String {
    if is_worktree_repo {
        logical_id(repo, Some(crate::model::project::MAIN_WORKTREE), None)
    } else {
        repo.to_string()
    }
}

pub fn worktree_agent_id(repo: &str, worktree: &str) -> String {
    logical_id(repo, Some(worktree), Some(PRIMARY_AGENT))
}

/// True when the last segment of a logical id names the primary agent.
pub fn is_primary_agent(session_id: &str) -> bool {
    session_id.rsplit(SEPARATOR).next() == Some(PRIMARY_AGENT) && session_id.contains(SEPARATOR)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredSession {
    pub session_id: String,
    pub label: String,
}

impl DiscoveredSession {
    /// Sub-session label, `None` for the scope's root session.
    pub fn sub_label(&self) -> Option<&str> {
        if self.label == ROOT_LABEL { None } else { Some(&self.label) }
    }
}

/// Physical sessions living under the logical `scope`, sorted by logical id.
/// Matches are delimiter-bounded: scope `beta/wt` never picks up `beta_wt2`.
pub fn sessions_under(scope: &str, physical: &BTreeSet<String>) -> Vec<DiscoveredSession> {
    let prefix = encode(scope);
    let mut found: Vec<DiscoveredSession> = physical
        .iter()
        .filter_map(|name| {
            if *name == prefix {
                return Some(DiscoveredSession {
                    session_id: scope.to_string(),
                    label: ROOT_LABEL.to_string(),
                });
            }
            let rest = name.strip_prefix(&prefix)?.strip_prefix(DELIMITER)?;
            if rest.is_empty() {
                return None;
            }
            let label = decode(rest);
            Some(DiscoveredSession {
                session_id: format!("{}{}{}", scope, SEPARATOR, label),
                label,
            })
        })
        .collect();
    found.sort_by(|a, b| a.session_id.cmp(&b.session_id));
    found
}

pub fn sessions_for_repo(repo: &str, physical: &BTreeSet<String>) -> Vec<DiscoveredSession> {
    sessions_under(repo, physical)
}

pub fn sessions_for_worktree(
    repo: &str,
    worktree: &str,
    physical: &BTreeSet<String>,
) -> Vec<DiscoveredSession> {
    sessions_under(&logical_id(repo, Some(worktree), None), physical)
}

/// Set-membership queries against the live multiplexer.
pub struct SessionRegistry<'a> {
    mux: &'a dyn Multiplexer,
}

impl<'a> SessionRegistry<'a> {
    pub fn new(mux: &'a dyn Multiplexer) -> Self {
        Self { mux }
    }

    /// One query per refresh. Empty when tmux is unavailable.
    pub fn list_physical_sessions(&self) -> BTreeSet<String> {
        if !self.mux.is_available() {
            return BTreeSet::new();
        }
        let sessions = self.mux.list_sessions();
        debug!(count = sessions.len(), "listed physical sessions");
        sessions
    }

    pub fn exists(&self, logical: &str) -> bool {
        self.mux.is_available() && self.mux.has_session(&encode(logical))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tmux::testing::FakeMux;
    use proptest::prelude::*;

    fn set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn labels_cannot_carry_hierarchy_characters() {
        assert!(is_valid_label("scratch"));
        assert!(is_valid_label("feat-x"));
        assert!(!is_valid_label("my_agent"));
        assert!(!is_valid_label("my/agent"));
        assert!(!is_valid_label(""));
    }

    #[test]
    fn worktree_scope_recovers_root_and_sub_labels() {
        let physical = set(&["beta_feat-x", "beta_feat-x_claude"]);
        let found = sessions_for_worktree("beta", "feat-x", &physical);

        let ids: Vec<&str> = found.iter().map(|s| s.session_id.as_str()).collect();
        assert_eq!(ids, vec!["beta/feat-x", "beta/feat-x/claude"]);
        assert_eq!(found[0].label, ROOT_LABEL);
        assert_eq!(found[0].sub_label(), None);
        assert_eq!(found[1].sub_label(), Some("claude"));
    }

    #[test]
    fn worktree_scope_ignores_names_sharing_an_unbounded_prefix() {
        let physical = set(&["beta_wt", "beta_wt2", "beta_wt2_pi", "beta_wt_pi"]);
        let found = sessions_for_worktree("beta", "wt", &physical);
        let ids: Vec<&str> = found.iter().map(|s| s.session_id.as_str()).collect();
        assert_eq!(ids, vec!["beta/wt", "beta/wt/pi"]);
    }

    #[test]
    fn repo_scope_for_plain_repo() {
        let physical = set(&["alpha", "alpha_claude", "alphabet", "beta_main"]);
        let found = sessions_for_repo("alpha", &physical);
        let ids: Vec<&str> = found.iter().map(|s| s.session_id.as_str()).collect();
        assert_eq!(ids, vec!["alpha", "alpha/claude"]);
    }

    #[test]
    fn canonical_ids() {
        assert_eq!(pm_session_id("alpha", false), "alpha");
        assert_eq!(pm_session_id("beta", true), "beta/main");
        assert_eq!(worktree_agent_id("beta", "feat-x"), "beta/feat-x/pi");
        assert!(is_primary_agent("beta/feat-x/pi"));
        assert!(!is_primary_agent("beta/feat-x/claude"));
        assert!(!is_primary_agent("pi"));
    }

    #[test]
    fn registry_degrades_when_tmux_is_missing() {
        let mux = FakeMux::unavailable();
        let registry = SessionRegistry::new(&mux);
        assert!(registry.list_physical_sessions().is_empty());
        assert!(!registry.exists("beta/main"));
    }

    #[test]
    fn registry_checks_encoded_name() {
        let mux = FakeMux::with_sessions(&["beta_main"]);
        let registry = SessionRegistry::new(&mux);
        assert!(registry.exists("beta/main"));
        assert!(!registry.exists("beta/feat-x"));
    }

    proptest! {
        #[test]
        fn encode_decode_round_trip(
            repo in "[a-zA-Z0-9.-]{1,12}",
            worktree in "[a-zA-Z0-9.-]{1,12}",
            sub in "[a-zA-Z0-9.-]{1,12}",
        ) {
            let logical = logical_id(&repo, Some(&worktree), Some(&sub));
            let decoded = decode(&encode(&logical));
            prop_assert_eq!(split_logical(&decoded), (repo, Some(worktree), Some(sub)));
        }
    }
}
