// Layout orchestration

pub mod confirm;
pub mod input;
pub mod menu;
pub mod status_pane;
pub mod tree;

use crate::app::{App, Mode};
use crate::model::node::NodeAddress;
use crate::ui::{
    confirm::render_confirm,
    input::render_input,
    menu::render_menu,
    status_pane::{pane_title, render_status_pane},
    tree::{compute_scroll, render_tree},
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};

/// Center a popup of given size within `area`.
pub fn popup_center(area: Rect, w: u16, h: u16) -> Rect {
    let x = area.x + (area.width.saturating_sub(w)) / 2;
    let y = area.y + (area.height.saturating_sub(h)) / 2;
    Rect::new(x, y, w.min(area.width), h.min(area.height))
}

/// Place a popup in the upper third of `area`.
pub fn popup_upper(area: Rect, w: u16, h: u16) -> Rect {
    let x = area.x + (area.width.saturating_sub(w)) / 2;
    let y = area.y + area.height / 3;
    Rect::new(x, y, w.min(area.width), h.min(area.height.saturating_sub(area.height / 3)))
}

pub fn render(frame: &mut Frame, app: &mut App) {
    let area = frame.area();

    let sb_height = status_bar_height(app, area.width);
    let main_area = Rect::new(
        area.x,
        area.y,
        area.width,
        area.height.saturating_sub(sb_height),
    );
    let status_area = Rect::new(
        area.x,
        area.y + area.height.saturating_sub(sb_height),
        area.width,
        sb_height,
    );

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(36), Constraint::Min(0)])
        .split(main_area);

    let visible_height = chunks[0].height.saturating_sub(2) as usize;
    if let Some(selected) = app.selected {
        app.tree_scroll = compute_scroll(selected, visible_height, app.tree_scroll);
    }

    render_tree(
        frame,
        chunks[0],
        &app.rows,
        app.selected,
        app.tree_scroll,
        app.filter.as_deref(),
    );
    render_status_pane(frame, chunks[1], app.cursor_address(), &app.status_text);

    render_status_bar(frame, status_area, app);
    render_overlay(frame, main_area, app);
}

fn render_overlay(frame: &mut Frame, area: Rect, app: &App) {
    match &app.mode {
        Mode::Filtering { input } => render_input(frame, area, input, "Filter"),
        Mode::Prompting { prompt, input } => render_input(frame, area, input, &prompt.title()),
        Mode::Menu { node, options } => {
            let labels: Vec<String> = options.iter().map(|o| o.label()).collect();
            render_menu(frame, area, &pane_title(Some(node)), &labels);
        }
        Mode::ConfirmingCleanup { .. } => {
            if let Some(question) = app.cleanup_question() {
                render_confirm(frame, area, &question);
            }
        }
        Mode::Help => render_help(frame, area),
        Mode::Browsing => {}
    }
}

fn get_mode_label(app: &App) -> &'static str {
    match &app.mode {
        Mode::Browsing => "BROWSE",
        Mode::Filtering { .. } => "FILTER",
        Mode::Prompting { .. } => "INPUT",
        Mode::Menu { .. } => "MENU",
        Mode::ConfirmingCleanup { .. } => "CONFIRM",
        Mode::Help => "HELP",
    }
}

fn build_hints(app: &App) -> String {
    let global = "(p)m msg  (r)eview loop  (w) request review  ·  (/)filter  (l)refresh  (?)help  (q)uit";
    match &app.mode {
        Mode::Browsing => match app.cursor_address() {
            Some(NodeAddress::Project { .. }) => format!("Enter: menu  →: PM session  ·  {}", global),
            Some(NodeAddress::Worktree { .. }) => format!(
                "Enter: menu  →: pi  ·  (s)end to pi  (c)leanup  ·  {}",
                global
            ),
            Some(NodeAddress::Session { worktree: Some(_), .. }) => format!(
                "Enter/→: attach  ·  (s)end to pi  (c)leanup  ·  {}",
                global
            ),
            Some(NodeAddress::Session { .. }) => format!("Enter/→: attach  ·  {}", global),
            Some(NodeAddress::NewSession { .. }) => format!("Enter/→: start  ·  {}", global),
            None => "(/)filter  (l)refresh  (q)uit".to_string(),
        },
        Mode::Filtering { .. } => "Enter: apply  Esc: cancel".to_string(),
        Mode::Prompting { .. } => "Enter: send  Esc: cancel".to_string(),
        Mode::Menu { options, .. } => format!("(1-{}) choose  Esc: cancel", options.len()),
        Mode::ConfirmingCleanup { .. } => "(y)es  (n)o".to_string(),
        Mode::Help => "Esc: close".to_string(),
    }
}

// Split hints at "  ·  " scope separators to fit within `available_width` chars per line.
fn wrap_hints(hints: &str, available_width: usize) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    for group in hints.split("  ·  ") {
        if current.is_empty() {
            current = group.to_string();
            continue;
        }
        let candidate = format!("{}  {}", current, group);
        if candidate.chars().count() <= available_width {
            current = candidate;
        } else {
            lines.push(std::mem::replace(&mut current, group.to_string()));
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

fn status_bar_height(app: &App, width: u16) -> u16 {
    if app.status_message.is_some() {
        return 1;
    }
    let badge_width = get_mode_label(app).len() + 4; // " [LABEL] "
    let available = (width as usize).saturating_sub(badge_width + 1);
    (wrap_hints(&build_hints(app), available).len() as u16).max(1)
}

fn render_status_bar(frame: &mut Frame, area: Rect, app: &App) {
    let mode_text = format!(" [{}] ", get_mode_label(app));
    let badge_width = mode_text.len();
    let badge_style = Style::default().fg(Color::Black).bg(Color::Yellow).bold();
    let ver = concat!(" v", env!("CARGO_PKG_VERSION"), " ");
    let ver_style = Style::default().fg(Color::DarkGray);

    if let Some(msg) = &app.status_message {
        let style = if msg.starts_with("Error:") {
            Style::default().fg(Color::Red)
        } else {
            Style::default().fg(Color::Cyan)
        };
        let left = format!(" {}", msg);
        let pad = (area.width as usize).saturating_sub(badge_width + left.chars().count() + ver.len());
        let spans = vec![
            Span::styled(mode_text, badge_style),
            Span::styled(left, style),
            Span::raw(" ".repeat(pad)),
            Span::styled(ver, ver_style),
        ];
        frame.render_widget(Paragraph::new(Line::from(spans)), area);
        return;
    }

    let available = (area.width as usize).saturating_sub(badge_width + 1);
    let hint_lines = wrap_hints(&build_hints(app), available);
    let hint_style = Style::default().fg(Color::Gray);
    let indent = " ".repeat(badge_width);
    let last = hint_lines.len().saturating_sub(1);

    let lines: Vec<Line> = hint_lines
        .iter()
        .enumerate()
        .map(|(i, hl)| {
            let lead = if i == 0 {
                Span::styled(mode_text.clone(), badge_style)
            } else {
                Span::raw(indent.clone())
            };
            let left = format!(" {}", hl);
            let mut spans = vec![lead];
            if i == last {
                let pad = (area.width as usize)
                    .saturating_sub(badge_width + left.chars().count() + ver.len());
                spans.push(Span::styled(left, hint_style));
                spans.push(Span::raw(" ".repeat(pad)));
                spans.push(Span::styled(ver, ver_style));
            } else {
                spans.push(Span::styled(left, hint_style));
            }
            Line::from(spans)
        })
        .collect();
    frame.render_widget(Paragraph::new(Text::from(lines)), area);
}

fn render_help(frame: &mut Frame, area: Rect) {
    let width = area.width.min(64).max(40);
    let height = area.height.min(30).max(12);
    let popup = popup_center(area, width, height);

    frame.render_widget(Clear, popup);

    const ENTRIES: &[&str] = &[
        " Navigation",
        "  j/k / ↑↓     Move through the tree",
        "  Enter         Project/Worktree: menu  |  Session: attach",
        "  →             Attach default (PM, pi, or the session)",
        "  1-9           Pick a menu option",
        "",
        " Agents",
        "  p             Message the PM session",
        "  r             Send the review loop to the PM",
        "  w             Ask the PM to review a worktree",
        "  s             Message a worktree's pi agent",
        "",
        " Worktrees",
        "  c             Clean up worktree (asks first)",
        "",
        " Global",
        "  /             Filter by project or worktree name",
        "  l             Refresh projects and sessions",
        "  ?             Help",
        "  q             Quit",
    ];

    let lines: Vec<Line> = ENTRIES.iter().map(|e| Line::from(*e)).collect();
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Help ")
        .border_style(Style::default().fg(Color::Cyan));
    let para = Paragraph::new(lines).block(block).wrap(Wrap { trim: false });
    frame.render_widget(para, popup);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Action;
    use crate::config::Config;
    use crate::dev::testing::FakeDev;
    use crate::tmux::testing::FakeMux;
    use ratatui::{backend::TestBackend, Terminal};
    use std::sync::Arc;

    fn screen(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        let width = buffer.area.width as usize;
        buffer
            .content
            .chunks(width)
            .map(|row| row.iter().map(|c| c.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn app() -> (App, tempfile::TempDir) {
        let root = tempfile::tempdir().unwrap();
        for rel in ["alpha", "beta/.bare", "beta/main"] {
            std::fs::create_dir_all(root.path().join(rel)).unwrap();
        }
        let config = Config { projects_dir: Some(root.path().to_path_buf()), ..Config::default() };
        let app = App::with_deps(
            config,
            Arc::new(FakeMux::with_sessions(&["beta_main"])),
            Arc::new(FakeDev::default()),
        );
        (app, root)
    }

    #[test]
    fn renders_tree_pane_and_badge() {
        let (mut app, _root) = app();
        let mut terminal = Terminal::new(TestBackend::new(100, 24)).unwrap();
        terminal.draw(|f| render(f, &mut app)).unwrap();

        let text = screen(&terminal);
        assert!(text.contains("Projects"));
        assert!(text.contains("alpha"));
        assert!(text.contains("beta ●"));
        assert!(text.contains("[BROWSE]"));
    }

    #[test]
    fn renders_menu_overlay() {
        let (mut app, _root) = app();
        app.dispatch(Action::NavigateDown).unwrap();
        app.dispatch(Action::NavigateDown).unwrap();
        app.dispatch(Action::Select).unwrap();
        let mut terminal = Terminal::new(TestBackend::new(100, 24)).unwrap();
        terminal.draw(|f| render(f, &mut app)).unwrap();

        let text = screen(&terminal);
        assert!(text.contains("Attach PM session (running)"));
        assert!(text.contains("Create new worktree"));
        assert!(text.contains("[MENU]"));
    }

    #[test]
    fn hints_wrap_at_separators() {
        let lines = wrap_hints("aaa  ·  bbb  ·  ccc", 8);
        assert_eq!(lines, vec!["aaa  bbb", "ccc"]);
    }
}
