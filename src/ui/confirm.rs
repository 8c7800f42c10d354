// Cleanup confirmation dialog.

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};
use crate::ui::popup_upper;

pub fn render_confirm(frame: &mut Frame, area: Rect, message: &str) {
    let width = 60_u16.min(area.width);
    let popup = popup_upper(area, width, 6);

    frame.render_widget(Clear, popup);

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Confirm ")
        .border_style(Style::default().fg(Color::Red));

    let inner = block.inner(popup);
    frame.render_widget(block, popup);

    let msg_area = Rect::new(inner.x, inner.y, inner.width, inner.height.saturating_sub(1));
    frame.render_widget(Paragraph::new(message).wrap(Wrap { trim: true }), msg_area);

    // Action bar pinned to bottom
    let line = Line::from(vec![
        Span::styled("[y]", Style::default().fg(Color::Green).bold()),
        Span::raw(" Clean up  "),
        Span::styled("[n/Esc]", Style::default().fg(Color::Red).bold()),
        Span::raw(" Cancel"),
    ]);
    let bar = Rect::new(inner.x, inner.y + inner.height.saturating_sub(1), inner.width, 1);
    frame.render_widget(Paragraph::new(line), bar);
}
