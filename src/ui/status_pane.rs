// Right pane: status text for the focused node or the last action's result.

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph, Wrap},
};
use crate::model::node::NodeAddress;
use crate::registry;

pub fn render_status_pane(frame: &mut Frame, area: Rect, address: Option<&NodeAddress>, text: &str) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" {} ", pane_title(address)))
        .title_style(Style::default().bold());

    let lines: Vec<Line> = text.lines().map(styled_line).collect();
    let para = Paragraph::new(lines).block(block).wrap(Wrap { trim: false });
    frame.render_widget(para, area);
}

pub fn pane_title(address: Option<&NodeAddress>) -> String {
    match address {
        None => "Status".to_string(),
        Some(NodeAddress::Project { repo }) => repo.clone(),
        Some(NodeAddress::Worktree { repo, worktree }) => format!("{} › {}", repo, worktree),
        Some(NodeAddress::Session { session_id, .. }) => {
            let (repo, worktree, sub) = registry::split_logical(session_id);
            [Some(repo), worktree, sub].into_iter().flatten().collect::<Vec<_>>().join(" › ")
        }
        Some(NodeAddress::NewSession { repo, worktree }) => match worktree {
            Some(wt) => format!("{} › {} › new", repo, wt),
            None => format!("{} › new", repo),
        },
    }
}

fn styled_line(line: &str) -> Line<'static> {
    let label = Style::default().fg(Color::Rgb(120, 120, 140));
    if line.starts_with("== ") && line.ends_with(" ==") {
        return Line::from(Span::styled(line.to_string(), Style::default().fg(Color::Yellow).bold()));
    }
    if line.starts_with("Error:") {
        return Line::from(Span::styled(line.to_string(), Style::default().fg(Color::Red)));
    }
    if let Some(rest) = line.strip_prefix("- ") {
        return Line::from(vec![
            Span::styled("  ", label),
            Span::styled(rest.to_string(), Style::default().fg(Color::Cyan)),
        ]);
    }
    for key in ["PM session:", "Worktree:", "Session:", "Running:", "Worktrees:"] {
        if let Some(rest) = line.strip_prefix(key) {
            return Line::from(vec![
                Span::styled(key.to_string(), label),
                Span::styled(rest.to_string(), Style::default().fg(Color::Rgb(100, 200, 255)).bold()),
            ]);
        }
    }
    Line::from(line.to_string())
}
