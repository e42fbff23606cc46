use ratatui::Frame;
use ratatui::layout::{Alignment, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use crate::tui::widgets::color::Palette;
use crate::tui::widgets::help::popup_area;

/// Yes/no popup; `what` is e.g. `folder 'Work'`
pub fn render_confirm_delete(f: &mut Frame, area: Rect, what: &str, note: Option<&str>, palette: &Palette) {
    let popup_area = popup_area(area, 50, 35);
    f.render_widget(Clear, popup_area);

    let mut lines = vec![
        Line::from(Span::styled(format!("Delete {}?", what), palette.base)),
        Line::from(""),
    ];
    if let Some(note) = note {
        lines.push(Line::from(Span::styled(note.to_string(), palette.muted)));
        lines.push(Line::from(""));
    }
    lines.push(Line::from(Span::styled("y: Delete • n/Esc: Cancel", palette.highlight)));

    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Confirm Delete")
                .title_alignment(Alignment::Center)
                .style(palette.base),
        )
        .wrap(ratatui::widgets::Wrap { trim: true })
        .alignment(Alignment::Center);

    f.render_widget(paragraph, popup_area);
}
