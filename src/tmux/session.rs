// tmux session/window management via CLI
// ref: tmux(1)

use std::collections::BTreeSet;
use std::path::Path;
use std::process::Stdio;
use std::sync::OnceLock;

use anyhow::{bail, Result};
use tracing::{debug, warn};

use super::{tmux_cmd, tmux_silent, Multiplexer};

pub struct Tmux {
    program: String,
    available: OnceLock<bool>,
}

impl Tmux {
    pub fn new(program: impl Into<String>) -> Self {
        Self { program: program.into(), available: OnceLock::new() }
    }
}

impl Multiplexer for Tmux {
    fn program(&self) -> &str {
        &self.program
    }

    /// Probed once per process; a missing binary stays missing.
    fn is_available(&self) -> bool {
        *self.available.get_or_init(|| {
            let ok = tmux_cmd(&self.program, &["-V"])
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .map(|s| s.success())
                .unwrap_or(false);
            if !ok {
                warn!(program = %self.program, "tmux not available; treating every session as stopped");
            }
            ok
        })
    }

    fn inside_client(&self) -> bool {
        std::env::var("TMUX").map(|v| !v.is_empty()).unwrap_or(false)
    }

    fn list_sessions(&self) -> BTreeSet<String> {
        if !self.is_available() {
            return BTreeSet::new();
        }
        let Ok(output) = tmux_cmd(&self.program, &["list-sessions", "-F", "#{session_name}"])
            .stderr(Stdio::null())
            .output()
        else { return BTreeSet::new() };

        // No server running exits non-zero; that is just "no sessions".
        String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect()
    }

    fn has_session(&self, name: &str) -> bool {
        if !self.is_available() {
            return false;
        }
        // `=` forces an exact match instead of tmux's prefix matching.
        let target = format!("={}", name);
        tmux_silent(&self.program, &["has-session", "-t", &target])
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    fn list_windows(&self) -> Vec<String> {
        let Ok(output) = tmux_cmd(&self.program, &["list-windows", "-F", "#{window_name}"])
            .stderr(Stdio::null())
            .output()
        else { return vec![] };

        String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect()
    }

    fn new_window(&self, name: &str, cwd: &Path, shell_command: &str) -> Result<()> {
        debug!(window = name, command = shell_command, "tmux new-window");
        let status = tmux_silent(
            &self.program,
            &["new-window", "-n", name, "-c", &cwd.to_string_lossy(), shell_command],
        )
        .status()?;
        if !status.success() { bail!("tmux new-window failed for {}", name); }
        Ok(())
    }

    fn select_window(&self, name: &str) -> Result<()> {
        let target = format!(":={}", name);
        let status = tmux_silent(&self.program, &["select-window", "-t", &target]).status()?;
        if !status.success() { bail!("tmux select-window failed for {}", name); }
        Ok(())
    }

    fn display_message(&self, text: &str) {
        if let Err(e) = tmux_silent(&self.program, &["display-message", text]).status() {
            warn!(error = %e, "tmux display-message failed");
        }
    }
}
