// cashew — dev project dashboard TUI
// Projects, worktrees and their agent tmux sessions in one tree.

mod action;
mod app;
mod catalog;
mod config;
mod dev;
mod event;
mod launcher;
mod logging;
mod model;
mod registry;
mod status;
mod tmux;
mod tui;
mod ui;

use anyhow::{Context, Result};
use app::App;
use config::Config;
use tracing::info;

fn main() -> Result<()> {
    let config = Config::load().context("loading config")?;
    logging::init(&config.log_path());
    info!(root = %config.projects_root().display(), "starting cashew");

    let mut terminal = tui::init().context("terminal init failed")?;

    let result = App::new(config).run(&mut terminal);

    // Always restore terminal, even on error
    let _ = tui::restore(&mut terminal);

    if let Some(handoff) = result? {
        return Err(handoff.exec().into());
    }
    Ok(())
}
