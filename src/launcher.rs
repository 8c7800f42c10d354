// Attach-or-create a physical session for a logical address.
//
// Inside tmux: run the attach in a new named window of the current server,
// with TMUX unset in that window so the inner client does not refuse to nest.
// The caller's window is left alone. Outside tmux: hand the terminal over by
// replacing this process with `dev <session>`.

use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;
use tracing::info;

use crate::registry;
use crate::tmux::Multiplexer;

const CLAUDE: &[&str] = &["claude", "--dangerously-skip-permissions"];
const PI: &[&str] = &["pi"];

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("could not open window {window}: {source}")]
    Window {
        window: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("could not exec {program}: {source}")]
    Exec {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRequest {
    pub session_id: String,
    pub cwd: PathBuf,
    pub is_worktree_repo: bool,
    pub sub_label: Option<String>,
}

/// Non-returning hand-off: the process image is replaced by `program args`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handoff {
    pub program: String,
    pub args: Vec<String>,
}

impl Handoff {
    /// Only returns on failure.
    #[cfg(unix)]
    pub fn exec(self) -> LaunchError {
        use std::os::unix::process::CommandExt;
        info!(program = %self.program, args = ?self.args, "handing terminal to session");
        let source = Command::new(&self.program).args(&self.args).exec();
        LaunchError::Exec { program: self.program, source }
    }

    /// No exec(2): run to completion, then leave with its exit code.
    #[cfg(not(unix))]
    pub fn exec(self) -> LaunchError {
        info!(program = %self.program, args = ?self.args, "handing terminal to session");
        match Command::new(&self.program).args(&self.args).status() {
            Ok(status) => std::process::exit(status.code().unwrap_or(0)),
            Err(source) => LaunchError::Exec { program: self.program, source },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Launch {
    /// Opened in (or switched to) a window of the current tmux server.
    Window { name: String, reused: bool },
    /// Caller must restore the terminal and then `exec` this.
    Handoff(Handoff),
}

/// Agent command for a session. Known labels pick their agent; anything else
/// falls back to the repo kind's default.
pub fn agent_command(is_worktree_repo: bool, sub_label: Option<&str>) -> Vec<String> {
    let cmd = match sub_label {
        Some("pi") => PI,
        Some("claude") => CLAUDE,
        _ if is_worktree_repo => PI,
        _ => CLAUDE,
    };
    cmd.iter().map(|s| s.to_string()).collect()
}

pub fn window_name(prefix: &str, session_id: &str) -> String {
    format!("{}{}", prefix, registry::encode(session_id))
}

pub struct Launcher<'a> {
    mux: &'a dyn Multiplexer,
    dev_bin: &'a str,
    window_prefix: &'a str,
}

impl<'a> Launcher<'a> {
    pub fn new(mux: &'a dyn Multiplexer, dev_bin: &'a str, window_prefix: &'a str) -> Self {
        Self { mux, dev_bin, window_prefix }
    }

    pub fn open(&self, req: &LaunchRequest) -> Result<Launch, LaunchError> {
        if self.mux.inside_client() && self.mux.is_available() {
            return self.open_in_window(req);
        }
        info!(session = %req.session_id, "launching outside tmux");
        Ok(Launch::Handoff(Handoff {
            program: self.dev_bin.to_string(),
            args: vec![req.session_id.clone()],
        }))
    }

    fn open_in_window(&self, req: &LaunchRequest) -> Result<Launch, LaunchError> {
        let name = window_name(self.window_prefix, &req.session_id);

        if self.mux.list_windows().iter().any(|w| *w == name) {
            info!(window = %name, "reselecting existing window");
            self.mux
                .select_window(&name)
                .map_err(|source| LaunchError::Window { window: name.clone(), source })?;
            return Ok(Launch::Window { name, reused: true });
        }

        let command = agent_command(req.is_worktree_repo, req.sub_label.as_deref());
        let attach = attach_or_create(self.mux.program(), &registry::encode(&req.session_id), &req.cwd, &command);
        let shell = detached_shell(&attach);
        info!(window = %name, session = %req.session_id, "opening session window");
        self.mux
            .new_window(&name, &req.cwd, &shell)
            .map_err(|source| LaunchError::Window { window: name.clone(), source })?;

        self.mux.display_message(&format!("cashew: {} opened in window {}", req.session_id, name));
        Ok(Launch::Window { name, reused: false })
    }
}

/// `tmux new-session -A` attaches when the session exists and creates it otherwise.
fn attach_or_create(program: &str, physical: &str, cwd: &Path, command: &[String]) -> Vec<String> {
    let mut argv: Vec<String> = vec![
        program.to_string(),
        "new-session".to_string(),
        "-A".to_string(),
        "-s".to_string(),
        physical.to_string(),
        "-c".to_string(),
        cwd.to_string_lossy().to_string(),
    ];
    argv.extend(command.iter().cloned());
    argv
}

/// Shell line for the new window: drop the inherited client binding, then attach.
fn detached_shell(argv: &[String]) -> String {
    format!("unset TMUX; exec {}", shell_words::join(argv))
}
