use ratatui::Frame;
use ratatui::layout::{Position, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use crate::tui::app::InputKind;
use crate::tui::widgets::color::Palette;
use crate::tui::widgets::help::popup_area;

/// One-line text prompt with the cursor at the end of the input
pub fn render_input_prompt(f: &mut Frame, area: Rect, kind: InputKind, text: &str, palette: &Palette) {
    let popup = popup_area(area, 60, 20);
    let popup = Rect::new(popup.x, popup.y, popup.width, popup.height.max(4));
    f.render_widget(Clear, popup);

    let block = Block::default()
        .borders(Borders::ALL)
        .title(kind.title())
        .style(palette.base);
    let inner = block.inner(popup);

    // Keep the end of long input visible
    let visible_width = usize::from(inner.width.saturating_sub(1));
    let skip = text.chars().count().saturating_sub(visible_width);
    let shown: String = text.chars().skip(skip).collect();

    let lines = vec![
        Line::from(Span::styled(shown.clone(), palette.base)),
        Line::from(Span::styled("Enter: Save • Esc: Cancel", palette.muted)),
    ];
    f.render_widget(Paragraph::new(lines).block(block), popup);

    f.set_cursor_position(Position::new(inner.x + shown.chars().count() as u16, inner.y));
}
