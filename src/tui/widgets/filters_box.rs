use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::models::Priority;
use crate::tui::widgets::color::Palette;

/// Priority filter choices with the active one highlighted
pub fn render_filters_box(
    f: &mut Frame,
    area: Rect,
    folder: &str,
    priority: Option<Priority>,
    filter_key: &str,
    palette: &Palette,
) {
    let mut spans = vec![Span::styled(format!("Folder: {}   Priority: ", folder), palette.base)];
    let choices = std::iter::once(None).chain(Priority::ALL.into_iter().map(Some));
    for choice in choices {
        let label = choice.map(|p| p.as_str()).unwrap_or("ALL");
        let style = if choice == priority { palette.highlight } else { palette.base };
        spans.push(Span::styled(format!(" {} ", label), style));
        spans.push(Span::raw(" "));
    }

    let paragraph = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("{}: Filter", filter_key))
            .style(palette.base),
    );

    f.render_widget(paragraph, area);
}
