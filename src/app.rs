// Navigation state machine and event loop.
// ref: ratatui app patterns — https://ratatui.rs/concepts/application-patterns/

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::{
    action::Action,
    catalog,
    config::Config,
    dev::{self, DevCli, DevTool},
    event::poll_event,
    launcher::{Handoff, Launch, LaunchRequest, Launcher},
    model::node::{self, NodeAddress, TreeRow},
    model::project::{self, Project},
    registry::{self, SessionRegistry, PRIMARY_AGENT},
    status::{self, StatusWorker, PROJECT_NOT_FOUND, WORKTREE_NOT_FOUND},
    tmux::{session::Tmux, Multiplexer},
    tui::Tui,
    ui::{self, input::InputState},
};

const TICK_MS: u64 = 100;
const CLAUDE_LABEL: &str = "claude";
const INVALID_SUB_NAME: &str = "Select a name without '/' or '_'.";
const LOADING: &str = "Loading…";

// ── Modes ─────────────────────────────────────────────────────────────────────

/// Exactly one sub-state at a time; an empty tree is `Browsing` with no cursor.
pub enum Mode {
    Browsing,
    Filtering { input: InputState },
    Prompting { prompt: Prompt, input: InputState },
    Menu { node: NodeAddress, options: Vec<MenuOption> },
    ConfirmingCleanup { target: NodeAddress },
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prompt {
    MessagePm { session: String },
    /// Worktree name still needed; `session` is the PM that receives the request.
    RequestReview { repo: String, session: String },
    MessageWorktree { session: String },
    NewWorktree { repo: String },
    SubSession { repo: String, worktree: String },
}

impl Prompt {
    pub fn title(&self) -> String {
        match self {
            Prompt::MessagePm { session } | Prompt::MessageWorktree { session } => {
                format!("Message {}", session)
            }
            Prompt::RequestReview { repo, .. } => format!("Request review in {}", repo),
            Prompt::NewWorktree { repo } => format!("New worktree in {}", repo),
            Prompt::SubSession { repo, worktree } => format!("New session in {}/{}", repo, worktree),
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Prompt::MessagePm { .. } | Prompt::MessageWorktree { .. } => "message: ",
            Prompt::RequestReview { .. } => "worktree: ",
            Prompt::NewWorktree { .. } => "branch: ",
            Prompt::SubSession { .. } => "name: ",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuOption {
    AttachPm { running: bool },
    CreateWorktree,
    Agent { label: &'static str, running: bool },
    WorktreeRoot { running: bool },
    CreateSubSession,
}

impl MenuOption {
    pub fn label(&self) -> String {
        match self {
            MenuOption::AttachPm { running: true } => "Attach PM session (running)".into(),
            MenuOption::AttachPm { running: false } => "Start PM session".into(),
            MenuOption::CreateWorktree => "Create new worktree".into(),
            MenuOption::Agent { label, running: true } => format!("Attach {} session (running)", label),
            MenuOption::Agent { label, running: false } => format!("Start {} session", label),
            MenuOption::WorktreeRoot { running: true } => "Attach worktree root (running)".into(),
            MenuOption::WorktreeRoot { running: false } => "Start worktree root".into(),
            MenuOption::CreateSubSession => "Create sub-session".into(),
        }
    }
}

fn prompting(prompt: Prompt) -> Mode {
    let input = InputState::new(prompt.label());
    Mode::Prompting { prompt, input }
}

// ── App ──────────────────────────────────────────────────────────────────────

pub struct App {
    pub config: Config,
    pub projects: Vec<Project>,
    physical: BTreeSet<String>,
    pub rows: Vec<TreeRow>,
    /// Index into `rows`; `None` only when no row carries an address.
    pub selected: Option<usize>,
    pub tree_scroll: usize,
    pub mode: Mode,
    /// Right pane: the focused node's status, or the last action's result.
    pub status_text: String,
    /// One-line notice in the status bar, cleared on the next key.
    pub status_message: Option<String>,
    /// Committed filter query.
    pub filter: Option<String>,
    mux: Arc<dyn Multiplexer>,
    dev: Arc<dyn DevCli>,
    worker: StatusWorker,
}

impl App {
    pub fn new(config: Config) -> Self {
        let mux: Arc<dyn Multiplexer> = Arc::new(Tmux::new(config.tmux_bin.clone()));
        let dev: Arc<dyn DevCli> = Arc::new(DevTool::new(config.dev_bin.clone()));
        Self::with_deps(config, mux, dev)
    }

    pub fn with_deps(config: Config, mux: Arc<dyn Multiplexer>, dev: Arc<dyn DevCli>) -> Self {
        let mut app = Self {
            config,
            projects: Vec::new(),
            physical: BTreeSet::new(),
            rows: Vec::new(),
            selected: None,
            tree_scroll: 0,
            mode: Mode::Browsing,
            status_text: String::new(),
            status_message: None,
            filter: None,
            mux,
            dev,
            worker: StatusWorker::new(),
        };
        app.refresh_all();
        app
    }

    /// Returns the hand-off to perform once the terminal is restored, if any.
    pub fn run(&mut self, terminal: &mut Tui) -> Result<Option<Handoff>> {
        loop {
            self.poll_status();
            terminal.draw(|frame| ui::render(frame, self))?;

            let in_input = matches!(self.mode, Mode::Filtering { .. } | Mode::Prompting { .. });
            let Some(action) = poll_event(Duration::from_millis(TICK_MS), in_input)? else {
                continue;
            };
            if action == Action::None {
                continue;
            }
            if action == Action::Quit && matches!(self.mode, Mode::Browsing) {
                return Ok(None);
            }
            self.status_message = None;
            match self.dispatch(action) {
                Ok(Some(handoff)) => return Ok(Some(handoff)),
                Ok(None) => {}
                Err(e) => {
                    warn!(error = %format!("{:#}", e), ?action, "action failed");
                    self.status_message = Some(format!("Error: {}", e));
                }
            }
        }
    }

    /// Commit a finished status fetch if it still belongs to the cursor.
    pub fn poll_status(&mut self) {
        if let Some(reply) = self.worker.poll() {
            if self.cursor_address() == Some(&reply.address) {
                self.status_text = reply.text;
            } else {
                debug!(address = ?reply.address, "status for unfocused node dropped");
            }
        }
    }

    pub fn cursor_address(&self) -> Option<&NodeAddress> {
        self.selected
            .and_then(|i| self.rows.get(i))
            .and_then(|r| r.address.as_ref())
    }

    // ── Refresh ───────────────────────────────────────────────────────────────

    /// Full reload with the filter cleared.
    pub fn refresh_all(&mut self) {
        self.reload(None);
    }

    fn reload(&mut self, filter: Option<String>) {
        self.projects = catalog::load(&self.config.projects_root(), &self.config.self_name());
        self.physical = SessionRegistry::new(self.mux.as_ref()).list_physical_sessions();
        info!(projects = self.projects.len(), sessions = self.physical.len(), "refreshed");
        self.filter = filter.clone();
        self.rebuild(filter);
        self.request_status();
    }

    /// Re-read live sessions only, keeping catalog and filter.
    fn reload_sessions(&mut self) {
        self.physical = SessionRegistry::new(self.mux.as_ref()).list_physical_sessions();
        if self.rebuild(self.filter.clone()) {
            self.request_status();
        }
    }

    /// Rebuild rows, keeping the cursor on the same address when it survives.
    /// Returns whether the focused address changed.
    fn rebuild(&mut self, query: Option<String>) -> bool {
        let previous = self.cursor_address().cloned();
        self.rows = node::build_tree(&self.projects, &self.physical, query.as_deref());
        self.selected = previous
            .as_ref()
            .and_then(|a| node::position_of(&self.rows, a))
            .or_else(|| node::first_addressable(&self.rows));
        self.cursor_address() != previous.as_ref()
    }

    fn request_status(&mut self) {
        let Some(address) = self.cursor_address().cloned() else {
            self.show("");
            return;
        };
        let projects = self.projects.clone();
        let dev = Arc::clone(&self.dev);
        let mux = Arc::clone(&self.mux);
        let target = address.clone();
        self.worker.request(address, move || {
            status::fetch_status(&target, &projects, dev.as_ref(), mux.as_ref())
        });
        self.status_text = LOADING.to_string();
    }

    /// Put an action result in the status pane, superseding any pending fetch.
    fn show(&mut self, text: impl Into<String>) {
        self.worker.invalidate();
        self.status_text = text.into();
    }

    // ── Navigation ────────────────────────────────────────────────────────────

    fn nav_up(&mut self) {
        if let Some(i) = self.selected {
            if i > 0 {
                self.selected = Some(i - 1);
                self.request_status();
            }
        }
    }

    fn nav_down(&mut self) {
        if let Some(i) = self.selected {
            if i + 1 < self.rows.len() {
                self.selected = Some(i + 1);
                self.request_status();
            }
        }
    }

    /// Cursor address and its project, checked against the filesystem.
    /// Vanished entries leave a not-found notice instead.
    fn resolve(&mut self) -> Option<(NodeAddress, Project)> {
        let address = self.cursor_address()?.clone();
        let found = project::find(&self.projects, address.repo())
            .filter(|p| p.path.is_dir())
            .cloned();
        let Some(project) = found else {
            self.show(PROJECT_NOT_FOUND);
            return None;
        };
        if let Some(wt) = address.worktree() {
            if project.is_worktree_repo && !project.worktree_dir(wt).is_dir() {
                self.show(WORKTREE_NOT_FOUND);
                return None;
            }
        }
        Some((address, project))
    }

    // ── Action dispatch ───────────────────────────────────────────────────────

    pub fn dispatch(&mut self, action: Action) -> Result<Option<Handoff>> {
        match &self.mode {
            Mode::Browsing => return self.dispatch_browsing(action),
            Mode::Filtering { .. } => self.dispatch_filter(action),
            Mode::Prompting { .. } => return self.dispatch_prompt(action),
            Mode::Menu { .. } => return self.dispatch_menu(action),
            Mode::ConfirmingCleanup { .. } => self.dispatch_confirm(action)?,
            Mode::Help => {
                if matches!(action, Action::Cancel | Action::Help | Action::Quit) {
                    self.mode = Mode::Browsing;
                }
            }
        }
        Ok(None)
    }

    fn dispatch_browsing(&mut self, action: Action) -> Result<Option<Handoff>> {
        match action {
            Action::NavigateUp => self.nav_up(),
            Action::NavigateDown => self.nav_down(),
            Action::Select => return self.action_select(),
            Action::AttachDefault => return self.action_attach_default(),
            Action::Refresh => self.refresh_all(),
            Action::MessagePm => self.action_message_pm(),
            Action::ReviewLoop => self.action_review_loop()?,
            Action::RequestReview => self.action_request_review()?,
            Action::MessageWorktree => self.action_message_worktree(),
            Action::Cleanup => self.action_cleanup(),
            Action::Filter => {
                let current = self.filter.clone().unwrap_or_default();
                self.mode = Mode::Filtering { input: InputState::with_value("/", current) };
            }
            Action::Help => self.mode = Mode::Help,
            _ => {}
        }
        Ok(None)
    }

    fn dispatch_filter(&mut self, action: Action) {
        match action {
            Action::Cancel => {
                self.mode = Mode::Browsing;
                if self.rebuild(self.filter.clone()) {
                    self.request_status();
                }
            }
            Action::Select => {
                let Mode::Filtering { input } = std::mem::replace(&mut self.mode, Mode::Browsing) else {
                    return;
                };
                let query = input.value().trim().to_string();
                if query.is_empty() {
                    self.refresh_all();
                } else {
                    self.reload(Some(query));
                }
            }
            other => {
                let Mode::Filtering { input } = &mut self.mode else { return };
                if !edit(input, other) {
                    return;
                }
                let query = input.value().to_string();
                if self.rebuild(Some(query)) {
                    self.request_status();
                }
            }
        }
    }

    fn dispatch_prompt(&mut self, action: Action) -> Result<Option<Handoff>> {
        match action {
            Action::Cancel => self.mode = Mode::Browsing,
            Action::Select => return self.commit_prompt(),
            other => {
                if let Mode::Prompting { input, .. } = &mut self.mode {
                    edit(input, other);
                }
            }
        }
        Ok(None)
    }

    fn dispatch_menu(&mut self, action: Action) -> Result<Option<Handoff>> {
        match action {
            Action::Cancel => self.mode = Mode::Browsing,
            Action::MenuDigit(d) => {
                let Mode::Menu { node, options } = &self.mode else { return Ok(None) };
                let chosen = (d as usize).checked_sub(1).and_then(|i| options.get(i)).cloned();
                let Some(option) = chosen else { return Ok(None) };
                let node = node.clone();
                self.mode = Mode::Browsing;
                return self.choose(node, option);
            }
            _ => {}
        }
        Ok(None)
    }

    /// Only `y` runs the cleanup; everything but `n`/Esc is ignored.
    fn dispatch_confirm(&mut self, action: Action) -> Result<()> {
        match action {
            Action::ConfirmYes => {
                let Mode::ConfirmingCleanup { target } = std::mem::replace(&mut self.mode, Mode::Browsing) else {
                    return Ok(());
                };
                let session = cleanup_session(&target);
                info!(session = %session, "cleaning up worktree");
                let out = self.dev.cleanup(&session)?;
                self.refresh_all();
                self.show(outcome(out, format!("Cleaned up {}", session)));
            }
            Action::ConfirmNo | Action::Cancel => {
                self.mode = Mode::Browsing;
                self.status_message = Some("Cleanup canceled.".to_string());
            }
            _ => {}
        }
        Ok(())
    }

    // ── Actions ───────────────────────────────────────────────────────────────

    fn action_select(&mut self) -> Result<Option<Handoff>> {
        let Some((address, project)) = self.resolve() else { return Ok(None) };
        let options = match &address {
            NodeAddress::Project { .. } => self.project_menu(&project),
            NodeAddress::Worktree { worktree, .. } => self.worktree_menu(&project, worktree),
            NodeAddress::Session { .. } | NodeAddress::NewSession { .. } => {
                return self.launch(default_request(&project, &address));
            }
        };
        self.mode = Mode::Menu { node: address, options };
        Ok(None)
    }

    fn action_attach_default(&mut self) -> Result<Option<Handoff>> {
        let Some((address, project)) = self.resolve() else { return Ok(None) };
        self.launch(default_request(&project, &address))
    }

    fn project_menu(&self, project: &Project) -> Vec<MenuOption> {
        let sessions = SessionRegistry::new(self.mux.as_ref());
        vec![
            MenuOption::AttachPm { running: sessions.exists(&project.pm_session()) },
            MenuOption::CreateWorktree,
        ]
    }

    fn worktree_menu(&self, project: &Project, worktree: &str) -> Vec<MenuOption> {
        let sessions = SessionRegistry::new(self.mux.as_ref());
        let running = |sub: Option<&str>| {
            sessions.exists(&registry::logical_id(&project.name, Some(worktree), sub))
        };
        vec![
            MenuOption::Agent { label: PRIMARY_AGENT, running: running(Some(PRIMARY_AGENT)) },
            MenuOption::Agent { label: CLAUDE_LABEL, running: running(Some(CLAUDE_LABEL)) },
            MenuOption::WorktreeRoot { running: running(None) },
            MenuOption::CreateSubSession,
        ]
    }

    fn choose(&mut self, node: NodeAddress, option: MenuOption) -> Result<Option<Handoff>> {
        let Some(project) = project::find(&self.projects, node.repo()).cloned() else {
            self.show(PROJECT_NOT_FOUND);
            return Ok(None);
        };
        let worktree = node.worktree().map(str::to_string);
        match (option, worktree) {
            (MenuOption::AttachPm { .. }, _) => return self.launch(pm_request(&project)),
            (MenuOption::CreateWorktree, _) => {
                self.mode = prompting(Prompt::NewWorktree { repo: project.name });
            }
            (MenuOption::Agent { label, .. }, Some(wt)) => {
                return self.launch(agent_request(&project, &wt, label));
            }
            (MenuOption::WorktreeRoot { .. }, Some(wt)) => {
                return self.launch(root_request(&project, &wt));
            }
            (MenuOption::CreateSubSession, Some(wt)) => {
                self.mode = prompting(Prompt::SubSession { repo: project.name, worktree: wt });
            }
            _ => {}
        }
        Ok(None)
    }

    fn action_message_pm(&mut self) {
        let Some((_, project)) = self.resolve() else { return };
        self.mode = prompting(Prompt::MessagePm { session: project.pm_session() });
    }

    fn action_review_loop(&mut self) -> Result<()> {
        let Some((_, project)) = self.resolve() else { return Ok(()) };
        let session = project.pm_session();
        let out = self.dev.send(&session, dev::REVIEW_LOOP_MESSAGE)?;
        self.show(outcome(out, format!("Sent review loop to {}", session)));
        Ok(())
    }

    fn action_request_review(&mut self) -> Result<()> {
        let Some((address, project)) = self.resolve() else { return Ok(()) };
        let session = project.pm_session();
        match address.worktree() {
            Some(wt) => self.send_review_request(&project.name, wt, &session)?,
            None => {
                self.mode = prompting(Prompt::RequestReview { repo: project.name, session });
            }
        }
        Ok(())
    }

    fn send_review_request(&mut self, repo: &str, worktree: &str, pm: &str) -> Result<()> {
        let text = format!(
            "Run the code-review skill for {}/{}. Report back before merge.",
            repo, worktree
        );
        let out = self.dev.send(pm, &text)?;
        self.show(outcome(out, format!("Requested review of {}/{} from {}", repo, worktree, pm)));
        Ok(())
    }

    fn action_message_worktree(&mut self) {
        let Some((address, project)) = self.resolve() else { return };
        match address.worktree() {
            Some(wt) => {
                let session = registry::worktree_agent_id(&project.name, wt);
                self.mode = prompting(Prompt::MessageWorktree { session });
            }
            None => self.show("Select a worktree to message its agent."),
        }
    }

    fn action_cleanup(&mut self) {
        let Some((address, _)) = self.resolve() else { return };
        match &address {
            NodeAddress::Worktree { .. } | NodeAddress::Session { worktree: Some(_), .. } => {
                self.mode = Mode::ConfirmingCleanup { target: address };
            }
            _ => self.show("Select a worktree to clean up."),
        }
    }

    fn commit_prompt(&mut self) -> Result<Option<Handoff>> {
        let Mode::Prompting { prompt, input } = std::mem::replace(&mut self.mode, Mode::Browsing) else {
            return Ok(None);
        };
        let text = dev::normalize_message(input.value());
        if text.is_empty() {
            return Ok(None);
        }
        match prompt {
            Prompt::MessagePm { session } => {
                let out = self.dev.send(&session, &text)?;
                self.show(outcome(out, format!("Sent to {}", session)));
            }
            Prompt::RequestReview { repo, session } => {
                self.send_review_request(&repo, &text, &session)?;
            }
            Prompt::MessageWorktree { session } => {
                let out = self.dev.send_pi(&session, &text)?;
                self.show(outcome(out, format!("Queued for {}", session)));
            }
            Prompt::NewWorktree { repo } => {
                info!(repo = %repo, branch = %text, "creating worktree");
                let out = self.dev.create_worktree(&repo, &text)?;
                self.reload(self.filter.clone());
                self.show(outcome(out, format!("Created worktree {}/{}", repo, text)));
            }
            Prompt::SubSession { repo, worktree } => {
                if !registry::is_valid_label(&text) {
                    self.show(INVALID_SUB_NAME);
                    return Ok(None);
                }
                let Some(project) = project::find(&self.projects, &repo).cloned() else {
                    self.show(PROJECT_NOT_FOUND);
                    return Ok(None);
                };
                return self.launch(agent_request(&project, &worktree, &text));
            }
        }
        Ok(None)
    }

    fn launch(&mut self, request: LaunchRequest) -> Result<Option<Handoff>> {
        let launcher = Launcher::new(self.mux.as_ref(), &self.config.dev_bin, &self.config.window_prefix);
        match launcher.open(&request)? {
            Launch::Window { name, reused } => {
                self.reload_sessions();
                self.show(if reused {
                    format!("Switched to window {} ({})", name, request.session_id)
                } else {
                    format!("Opened {} in window {}", request.session_id, name)
                });
                Ok(None)
            }
            Launch::Handoff(handoff) => Ok(Some(handoff)),
        }
    }

    /// Confirmation text for the pending cleanup, if any.
    pub fn cleanup_question(&self) -> Option<String> {
        match &self.mode {
            Mode::ConfirmingCleanup { target } => Some(format!(
                "Clean up worktree {}? This removes it and its agent sessions.",
                cleanup_session(target)
            )),
            _ => None,
        }
    }
}

/// Apply a text-editing action; false when the action is not an edit.
fn edit(input: &mut InputState, action: Action) -> bool {
    match action {
        Action::InputChar(c) => input.insert_char(c),
        Action::InputBackspace => input.backspace(),
        Action::InputLeft => input.cursor_left(),
        Action::InputRight => input.cursor_right(),
        _ => return false,
    }
    true
}

/// The tool's own output when it printed any, else a fixed confirmation.
fn outcome(output: String, fallback: String) -> String {
    if output.is_empty() { fallback } else { output }
}

fn cleanup_session(target: &NodeAddress) -> String {
    registry::logical_id(target.repo(), target.worktree(), None)
}

fn pm_request(project: &Project) -> LaunchRequest {
    LaunchRequest {
        session_id: project.pm_session(),
        cwd: project.pm_dir(),
        is_worktree_repo: project.is_worktree_repo,
        sub_label: None,
    }
}

fn agent_request(project: &Project, worktree: &str, label: &str) -> LaunchRequest {
    LaunchRequest {
        session_id: registry::logical_id(&project.name, Some(worktree), Some(label)),
        cwd: project.worktree_dir(worktree),
        is_worktree_repo: project.is_worktree_repo,
        sub_label: Some(label.to_string()),
    }
}

fn root_request(project: &Project, worktree: &str) -> LaunchRequest {
    LaunchRequest {
        session_id: registry::logical_id(&project.name, Some(worktree), None),
        cwd: project.worktree_dir(worktree),
        is_worktree_repo: project.is_worktree_repo,
        sub_label: None,
    }
}

/// What a node opens without a menu: project → PM, worktree → primary agent,
/// session → itself, new-session → the scope's default.
fn default_request(project: &Project, address: &NodeAddress) -> LaunchRequest {
    match address {
        NodeAddress::Project { .. } | NodeAddress::NewSession { worktree: None, .. } => pm_request(project),
        NodeAddress::Worktree { worktree, .. }
        | NodeAddress::NewSession { worktree: Some(worktree), .. } => {
            agent_request(project, worktree, PRIMARY_AGENT)
        }
        NodeAddress::Session { worktree, session_id, sub_label, .. } => LaunchRequest {
            session_id: session_id.clone(),
            cwd: match worktree {
                Some(wt) => project.worktree_dir(wt),
                None => project.pm_dir(),
            },
            is_worktree_repo: project.is_worktree_repo,
            sub_label: sub_label.clone(),
        },
    }
}
