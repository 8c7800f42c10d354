// Left sidebar: Project -> Worktree -> Session rows using ratatui List.

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, ListState},
};
use crate::model::node::{RowKind, TreeRow};

pub fn render_tree(
    frame: &mut Frame,
    area: Rect,
    rows: &[TreeRow],
    selected: Option<usize>,
    scroll_offset: usize,
    filter: Option<&str>,
) {
    let items: Vec<ListItem> = rows.iter().map(row_item).collect();

    let mut list_state = ListState::default().with_offset(scroll_offset);
    list_state.select(selected);

    let title = match filter {
        Some(q) => format!(" Projects /{} ", q),
        None => " Projects ".to_string(),
    };
    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .title_style(Style::default().bold()),
        )
        .highlight_style(Style::default().fg(Color::Black).bg(Color::Yellow).bold())
        .highlight_symbol("► ");

    frame.render_stateful_widget(list, area, &mut list_state);
}

fn row_item(row: &TreeRow) -> ListItem<'static> {
    let indent = "  ".repeat(row.depth);
    match &row.kind {
        RowKind::Project { pm_running } => {
            let dot = if *pm_running { " ●" } else { "" };
            ListItem::new(format!("{}{}", row.label, dot))
                .style(Style::default().fg(Color::Cyan).bold())
        }
        RowKind::Worktree { sessions } => {
            let badge = if *sessions > 0 { format!(" [{}s]", sessions) } else { String::new() };
            ListItem::new(format!("{}{}{}", indent, row.label, badge))
                .style(Style::default().fg(Color::White))
        }
        RowKind::Session => ListItem::new(format!("{}○ {}", indent, row.label))
            .style(Style::default().fg(Color::Rgb(100, 220, 130))),
        RowKind::NewSession => ListItem::new(format!("{}{}", indent, row.label))
            .style(Style::default().fg(Color::DarkGray)),
        RowKind::Placeholder => ListItem::new(row.label.clone())
            .style(Style::default().fg(Color::Gray).italic()),
    }
}

/// Compute scroll offset to keep selected item visible.
pub fn compute_scroll(selected: usize, visible_height: usize, current_offset: usize) -> usize {
    if visible_height == 0 {
        return current_offset;
    }
    if selected < current_offset {
        selected
    } else if selected >= current_offset + visible_height {
        selected.saturating_sub(visible_height - 1)
    } else {
        current_offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scroll_follows_selection() {
        assert_eq!(compute_scroll(0, 10, 0), 0);
        assert_eq!(compute_scroll(12, 10, 0), 3);
        assert_eq!(compute_scroll(2, 10, 3), 2);
        assert_eq!(compute_scroll(5, 10, 3), 3);
        assert_eq!(compute_scroll(5, 0, 3), 3);
    }
}
