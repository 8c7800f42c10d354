// Status pane text per selected node, built on a single background thread.
//
// Each focus change bumps a generation. Queued requests from an older
// generation are skipped before they run, and replies from one are dropped
// on arrival.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;

use anyhow::Result;
use tracing::debug;

use crate::dev::{first_line, DevCli};
use crate::model::node::NodeAddress;
use crate::model::project::{self, Project};
use crate::registry::{self, SessionRegistry};
use crate::tmux::Multiplexer;

pub const PROJECT_NOT_FOUND: &str = "Project not found.";
pub const WORKTREE_NOT_FOUND: &str = "Worktree not found.";

pub const NEW_SESSION_HELP: &str = concat!(
    "New session\n",
    "\n",
    "Enter or → starts (or attaches) the default agent here:\n",
    "  worktree  → its pi agent\n",
    "  project   → the PM session\n",
    "\n",
    "For a named sub-session, press Enter on the worktree and pick \"Create sub-session\".",
);

/// Never fails: errors become a single `Error: …` line.
pub fn fetch_status(
    address: &NodeAddress,
    projects: &[Project],
    dev: &dyn DevCli,
    mux: &dyn Multiplexer,
) -> String {
    match collect(address, projects, dev, mux) {
        Ok(text) => text,
        Err(e) => format!("Error: {:#}", e),
    }
}

fn collect(
    address: &NodeAddress,
    projects: &[Project],
    dev: &dyn DevCli,
    mux: &dyn Multiplexer,
) -> Result<String> {
    let Some(project) = project::find(projects, address.repo()) else {
        return Ok(PROJECT_NOT_FOUND.to_string());
    };

    match address {
        NodeAddress::Project { .. } => project_status(project, dev),
        NodeAddress::Worktree { repo, worktree } => {
            if !project.has_worktree(worktree) {
                return Ok(WORKTREE_NOT_FOUND.to_string());
            }
            let mut parts = vec![format!("Worktree: {}/{}", repo, worktree), String::new()];
            parts.extend(agent_sections(&registry::worktree_agent_id(repo, worktree), dev)?);
            Ok(parts.join("\n"))
        }
        NodeAddress::Session { session_id, .. } => {
            let running = SessionRegistry::new(mux).exists(session_id);
            let mut parts = vec![
                format!("Session: {}", session_id),
                format!("Running: {}", if running { "yes" } else { "no" }),
            ];
            if registry::is_primary_agent(session_id) {
                parts.push(String::new());
                parts.extend(agent_sections(session_id, dev)?);
            }
            Ok(parts.join("\n"))
        }
        NodeAddress::NewSession { .. } => Ok(NEW_SESSION_HELP.to_string()),
    }
}

fn project_status(project: &Project, dev: &dyn DevCli) -> Result<String> {
    let mut parts = vec![format!("PM session: {}", project.pm_session()), String::new()];
    if !project.is_worktree_repo {
        parts.push("(non-worktree repo)".to_string());
        return Ok(parts.join("\n"));
    }
    parts.push("Worktrees:".to_string());
    for wt in &project.worktrees {
        let session = registry::worktree_agent_id(&project.name, wt);
        let last = first_line(&dev.last_message(&session)?);
        let req = first_line(&dev.requirements(&session)?);
        parts.push(format!("- {}: {} | req: {}", wt, last, req));
    }
    Ok(parts.join("\n"))
}

fn agent_sections(session: &str, dev: &dyn DevCli) -> Result<Vec<String>> {
    Ok(vec![
        "== last message ==".to_string(),
        dev.last_message(session)?,
        String::new(),
        "== requirements ==".to_string(),
        dev.requirements(session)?,
        String::new(),
        "== queue ==".to_string(),
        dev.queue_status(session)?,
    ])
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReply {
    pub generation: u64,
    pub address: NodeAddress,
    pub text: String,
}

type Fetch = Box<dyn FnOnce() -> String + Send>;

struct Job {
    generation: u64,
    address: NodeAddress,
    fetch: Fetch,
}

/// One long-lived fetch thread; only the newest generation runs and is delivered.
pub struct StatusWorker {
    generation: Arc<AtomicU64>,
    jobs: Sender<Job>,
    rx: Receiver<StatusReply>,
}

impl Default for StatusWorker {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusWorker {
    pub fn new() -> Self {
        let generation = Arc::new(AtomicU64::new(0));
        let (jobs, job_rx) = mpsc::channel::<Job>();
        let (tx, rx) = mpsc::channel();
        let current = Arc::clone(&generation);
        // Exits once the worker (and with it the job sender) is dropped.
        thread::spawn(move || {
            for job in job_rx {
                if job.generation != current.load(Ordering::SeqCst) {
                    debug!(skipped = job.generation, "superseded status request");
                    continue;
                }
                let text = panic::catch_unwind(AssertUnwindSafe(job.fetch))
                    .unwrap_or_else(|_| "Error: status collection panicked".to_string());
                let reply = StatusReply { generation: job.generation, address: job.address, text };
                if tx.send(reply).is_err() {
                    break;
                }
            }
        });
        Self { generation, jobs, rx }
    }

    fn current(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Queue `fetch` for `address`, superseding any earlier request.
    pub fn request<F>(&mut self, address: NodeAddress, fetch: F) -> u64
    where
        F: FnOnce() -> String + Send + 'static,
    {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let job = Job { generation, address, fetch: Box::new(fetch) };
        if self.jobs.send(job).is_err() {
            debug!("status thread gone; request dropped");
        }
        generation
    }

    /// Drop whatever is queued or in flight (e.g. the pane now shows an action result).
    pub fn invalidate(&mut self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Newest reply for the current generation, if it has arrived.
    pub fn poll(&mut self) -> Option<StatusReply> {
        let mut latest = None;
        while let Ok(reply) = self.rx.try_recv() {
            let current = self.current();
            if reply.generation == current {
                latest = Some(reply);
            } else {
                debug!(stale = reply.generation, current, "dropping superseded status");
            }
        }
        latest
    }

    #[cfg(test)]
    pub fn wait(&mut self, timeout: std::time::Duration) -> Option<StatusReply> {
        let deadline = std::time::Instant::now() + timeout;
        while std::time::Instant::now() < deadline {
            if let Some(reply) = self.poll() {
                return Some(reply);
            }
            thread::sleep(std::time::Duration::from_millis(5));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dev::testing::FakeDev;
    use crate::tmux::testing::FakeMux;
    use std::path::PathBuf;
    use std::time::Duration;

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

    fn wt(repo: &str, worktree: &str) -> NodeAddress {
        NodeAddress::Worktree { repo: repo.into(), worktree: worktree.into() }
    }

    #[test]
    fn worktree_repo_project_summarises_each_worktree() {
        let dev = FakeDev::default()
            .reply("pi-status", "beta/feat-x/pi", "\n  assistant: done with tests\nmore")
            .reply("requirements", "beta/feat-x/pi", "R1 passing\nR2 open");
        let mux = FakeMux::with_sessions(&[]);

        let text = fetch_status(&NodeAddress::Project { repo: "beta".into() }, &catalog(), &dev, &mux);
        assert_eq!(
            text,
            "PM session: beta/main\n\nWorktrees:\n\
             - feat-x: assistant: done with tests | req: R1 passing\n\
             - main: (none) | req: (none)"
        );
    }

    #[test]
    fn plain_project_has_placeholder_and_no_dev_calls() {
        let dev = FakeDev::default();
        let mux = FakeMux::with_sessions(&[]);
        let text = fetch_status(&NodeAddress::Project { repo: "alpha".into() }, &catalog(), &dev, &mux);
        assert_eq!(text, "PM session: alpha\n\n(non-worktree repo)");
        assert!(dev.calls().is_empty());
    }

    #[test]
    fn worktree_has_four_sections() {
        let dev = FakeDev::default()
            .reply("pi-status", "beta/feat-x/pi", "last")
            .reply("requirements", "beta/feat-x/pi", "reqs")
            .reply("queue-status", "beta/feat-x/pi", "q1\nq2");
        let mux = FakeMux::with_sessions(&[]);
        let text = fetch_status(&wt("beta", "feat-x"), &catalog(), &dev, &mux);
        assert_eq!(
            text,
            "Worktree: beta/feat-x\n\n== last message ==\nlast\n\n== requirements ==\nreqs\n\n== queue ==\nq1\nq2"
        );
    }

    #[test]
    fn primary_agent_session_gets_sections_others_do_not() {
        let dev = FakeDev::default();
        let mux = FakeMux::with_sessions(&["beta_feat-x_pi"]);
        let pi = NodeAddress::Session {
            repo: "beta".into(),
            worktree: Some("feat-x".into()),
            session_id: "beta/feat-x/pi".into(),
            sub_label: Some("pi".into()),
        };
        let claude = NodeAddress::Session {
            repo: "beta".into(),
            worktree: Some("feat-x".into()),
            session_id: "beta/feat-x/claude".into(),
            sub_label: Some("claude".into()),
        };

        let pi_text = fetch_status(&pi, &catalog(), &dev, &mux);
        assert!(pi_text.starts_with("Session: beta/feat-x/pi\nRunning: yes\n\n== last message =="));

        let claude_text = fetch_status(&claude, &catalog(), &dev, &mux);
        assert_eq!(claude_text, "Session: beta/feat-x/claude\nRunning: no");
    }

    #[test]
    fn new_session_is_static() {
        let dev = FakeDev::default();
        let mux = FakeMux::with_sessions(&[]);
        let addr = NodeAddress::NewSession { repo: "beta".into(), worktree: Some("main".into()) };
        assert_eq!(fetch_status(&addr, &catalog(), &dev, &mux), NEW_SESSION_HELP);
        assert!(dev.calls().is_empty());
    }

    #[test]
    fn stale_address_is_not_found() {
        let dev = FakeDev::default();
        let mux = FakeMux::with_sessions(&[]);
        let gone = NodeAddress::Project { repo: "gamma".into() };
        assert_eq!(fetch_status(&gone, &catalog(), &dev, &mux), "Project not found.");
        assert_eq!(fetch_status(&wt("beta", "old"), &catalog(), &dev, &mux), "Worktree not found.");
    }

    #[test]
    fn failure_renders_single_error_line() {
        let dev = FakeDev { fail_on: Some("queue-status".into()), ..FakeDev::default() };
        let mux = FakeMux::with_sessions(&[]);
        let text = fetch_status(&wt("beta", "feat-x"), &catalog(), &dev, &mux);
        assert_eq!(text, "Error: permission denied");
    }

    #[test]
    fn superseded_reply_is_discarded() {
        let mut worker = StatusWorker::new();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let (started_tx, started_rx) = mpsc::channel::<()>();

        worker.request(wt("beta", "main"), move || {
            let _ = started_tx.send(());
            let _ = release_rx.recv();
            "old".to_string()
        });
        started_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        let current = worker.request(wt("beta", "feat-x"), || "new".to_string());
        release_tx.send(()).unwrap();

        let reply = worker.wait(Duration::from_secs(5)).expect("current reply");
        assert_eq!(reply.generation, current);
        assert_eq!(reply.text, "new");

        thread::sleep(Duration::from_millis(50));
        assert_eq!(worker.poll(), None);
    }

    #[test]
    fn hung_fetches_run_one_at_a_time_and_queued_ones_are_skipped() {
        use std::sync::atomic::AtomicUsize;

        let mut worker = StatusWorker::new();
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let executed = Arc::new(AtomicUsize::new(0));

        let mut last = 0;
        for i in 0..64 {
            let (running, peak, executed) = (running.clone(), peak.clone(), executed.clone());
            last = worker.request(wt("beta", "main"), move || {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                executed.fetch_add(1, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(20));
                running.fetch_sub(1, Ordering::SeqCst);
                format!("fetch {}", i)
            });
        }

        let reply = worker.wait(Duration::from_secs(5)).expect("newest reply");
        assert_eq!(reply.generation, last);
        assert_eq!(reply.text, "fetch 63");
        assert_eq!(peak.load(Ordering::SeqCst), 1);
        assert!(executed.load(Ordering::SeqCst) <= 2);
    }

    #[test]
    fn invalidate_drops_in_flight_reply() {
        let mut worker = StatusWorker::new();
        worker.request(wt("beta", "main"), || "late".to_string());
        worker.invalidate();
        assert_eq!(worker.wait(Duration::from_millis(100)), None);
    }

    #[test]
    fn panicking_fetch_becomes_error_text() {
        let mut worker = StatusWorker::new();
        worker.request(wt("beta", "main"), || panic!("boom"));
        let reply = worker.wait(Duration::from_secs(5)).expect("reply");
        assert!(reply.text.starts_with("Error:"));
    }
}
