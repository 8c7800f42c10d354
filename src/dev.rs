// Companion `dev` CLI: worktree creation, cleanup, agent messaging, status queries.
// Output is treated as opaque text; stdout and stderr are folded together.

use std::io::ErrorKind;
use std::process::Command;

use anyhow::{Context, Result};
use tracing::{debug, warn};

/// Standing instruction for the PM agent's review loop.
pub const REVIEW_LOOP_MESSAGE: &str = "Run `dev review-loop` and follow it exactly (run `bash sleep 300` in the foreground; no scripts/nohup/background loops).";

pub trait DevCli: Send + Sync {
    /// Run `dev <args>` and return trimmed stdout+stderr regardless of exit
    /// status. A missing binary is an empty string, not an error.
    fn run(&self, args: &[&str]) -> Result<String>;

    fn send(&self, session: &str, text: &str) -> Result<String> {
        self.run(&["send", session, text, "Enter"])
    }

    fn send_pi(&self, session: &str, text: &str) -> Result<String> {
        self.run(&["send-pi", session, text])
    }

    fn create_worktree(&self, repo: &str, branch: &str) -> Result<String> {
        self.run(&["wt", repo, branch])
    }

    fn cleanup(&self, session: &str) -> Result<String> {
        self.run(&["cleanup", session])
    }

    fn last_message(&self, session: &str) -> Result<String> {
        self.run(&["pi-status", session, "--messages", "1"])
    }

    fn requirements(&self, session: &str) -> Result<String> {
        self.run(&["requirements", session])
    }

    fn queue_status(&self, session: &str) -> Result<String> {
        self.run(&["queue-status", session, "-m"])
    }
}

pub struct DevTool {
    program: String,
}

impl DevTool {
    pub fn new(program: impl Into<String>) -> Self {
        Self { program: program.into() }
    }
}

impl DevCli for DevTool {
    fn run(&self, args: &[&str]) -> Result<String> {
        debug!(program = %self.program, ?args, "running dev");
        let output = match Command::new(&self.program).args(args).output() {
            Ok(output) => output,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(program = %self.program, "dev binary not found");
                return Ok(String::new());
            }
            Err(e) => {
                return Err(e).with_context(|| format!("running {} {}", self.program, args.join(" ")));
            }
        };
        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok(text.trim().to_string())
    }
}

/// First non-blank line, trimmed; `(none)` when there is nothing.
pub fn first_line(output: &str) -> String {
    output
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("(none)")
        .to_string()
}

/// Collapse a typed message onto one line so `send` delivers it as a single input.
pub fn normalize_message(message: &str) -> String {
    message
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_line_skips_blank_lines() {
        assert_eq!(first_line("\n  \n  hello world \nsecond"), "hello world");
        assert_eq!(first_line(""), "(none)");
        assert_eq!(first_line("   \n\t\n"), "(none)");
    }

    #[test]
    fn normalize_joins_lines() {
        assert_eq!(normalize_message("  fix the\nbuild \n\n please "), "fix the build please");
        assert_eq!(normalize_message("\n \n"), "");
    }

    #[test]
    fn missing_binary_is_empty_output() {
        let dev = DevTool::new("cashew-test-no-such-dev");
        assert_eq!(dev.run(&["pi-status", "beta/main/pi"]).unwrap(), "");
    }

    #[cfg(unix)]
    #[test]
    fn folds_stderr_and_ignores_exit_status() {
        let sh = DevTool::new("sh");
        let out = sh.run(&["-c", "echo out; echo err >&2; exit 3"]).unwrap();
        assert_eq!(out, "out\nerr");
    }
}
