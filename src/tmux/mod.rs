pub mod session;

use std::collections::BTreeSet;
use std::path::Path;
use std::process::{Command, Stdio};

use anyhow::Result;

/// The parts of tmux cashew drives. Every query is fallible in the
/// "nothing is running" sense: implementations answer empty/false instead of erroring.
pub trait Multiplexer: Send + Sync {
    /// Binary used when building commands that run inside new windows.
    fn program(&self) -> &str;
    fn is_available(&self) -> bool;
    /// True when this process is itself a client of the multiplexer.
    fn inside_client(&self) -> bool;
    fn list_sessions(&self) -> BTreeSet<String>;
    fn has_session(&self, name: &str) -> bool;
    /// Window names of the current session.
    fn list_windows(&self) -> Vec<String>;
    fn new_window(&self, name: &str, cwd: &Path, shell_command: &str) -> Result<()>;
    fn select_window(&self, name: &str) -> Result<()>;
    fn display_message(&self, text: &str);
}

/// tmux command with pre-set args.
pub fn tmux_cmd(program: &str, args: &[&str]) -> Command {
    let mut cmd = Command::new(program);
    cmd.args(args);
    cmd
}

/// tmux command with stdout/stderr suppressed.
pub fn tmux_silent(program: &str, args: &[&str]) -> Command {
    let mut cmd = Command::new(program);
    cmd.args(args).stdout(Stdio::null()).stderr(Stdio::null());
    cmd
}
