// Numbered option list; a digit picks the option.

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, List, ListItem},
};
use crate::ui::popup_center;

pub fn render_menu(frame: &mut Frame, area: Rect, title: &str, labels: &[String]) {
    let width = area.width.min(50).max(30);
    let height = (labels.len() as u16 + 2).min(area.height);
    let popup = popup_center(area, width, height);

    frame.render_widget(Clear, popup);

    let items: Vec<ListItem> = labels
        .iter()
        .enumerate()
        .map(|(i, label)| {
            ListItem::new(Line::from(vec![
                Span::styled(format!(" {} ", i + 1), Style::default().fg(Color::Yellow).bold()),
                Span::raw(label.clone()),
            ]))
        })
        .collect();
    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!(" {} ", title))
            .border_style(Style::default().fg(Color::Cyan)),
    );

    frame.render_widget(list, popup);
}
