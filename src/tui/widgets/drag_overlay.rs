use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use crate::drag::Overlay;
use crate::tui::widgets::color::{Palette, priority_color};
use crate::tui::widgets::folders::truncate;
use crate::tui::widgets::todo_list::DRAG_HANDLE;

const MAX_WIDTH: u16 = 40;

/// Box of `width` x `height` next to the pointer, kept inside `bounds`
pub(crate) fn overlay_area(pointer_x: u16, pointer_y: u16, width: u16, height: u16, bounds: Rect) -> Rect {
    let width = width.min(bounds.width);
    let height = height.min(bounds.height);
    let max_x = bounds.x + bounds.width - width;
    let max_y = bounds.y + bounds.height - height;
    Rect::new(
        pointer_x.saturating_add(1).clamp(bounds.x, max_x),
        pointer_y.clamp(bounds.y, max_y),
        width,
        height,
    )
}

/// Detached copy of the dragged todo following the pointer.
///
/// `destination` names what a release right now would do.
pub fn render_drag_overlay(f: &mut Frame, overlay: &Overlay<'_>, destination: &str, palette: &Palette) {
    let snapshot = overlay.snapshot;
    let text = format!("{}{} [{}]", DRAG_HANDLE, snapshot.title, snapshot.priority);
    let text_width = u16::try_from(text.chars().count()).unwrap_or(u16::MAX);
    let width = text_width.saturating_add(2).clamp(16, MAX_WIDTH);
    let area = overlay_area(overlay.pointer.x, overlay.pointer.y, width, 3, f.area());

    let border_style = if overlay.target.is_some() { palette.drop_target } else { palette.highlight };
    let block = Block::default()
        .borders(Borders::ALL)
        .title(Span::styled(format!("→ {}", destination), border_style))
        .border_style(border_style)
        .style(palette.base);

    let inner_width = usize::from(width.saturating_sub(2));
    let line = Line::from(vec![
        Span::styled(truncate(&text, inner_width), palette.base.fg(priority_color(snapshot.priority))),
    ]);

    f.render_widget(Clear, area);
    f.render_widget(Paragraph::new(line).block(block), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Config;
    use crate::drag::{DragSnapshot, Point};
    use crate::models::Priority;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    fn draw_overlay(title: String) -> Rect {
        let snapshot = DragSnapshot { todo_id: 1, title, priority: Priority::High, category_id: None };
        let overlay = Overlay { snapshot: &snapshot, pointer: Point::new(10, 5), target: None };
        let palette = Palette::from_theme(&Config::default().get_active_theme());
        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        terminal
            .draw(|f| render_drag_overlay(f, &overlay, "no folder", &palette))
            .unwrap();
        let area = overlay_area(10, 5, MAX_WIDTH, 3, Rect::new(0, 0, 80, 24));
        assert_eq!(terminal.backend().buffer()[(area.x, area.y)].symbol(), "┌");
        area
    }

    #[test]
    fn very_long_titles_use_the_widest_overlay() {
        for len in [100, 65_523, 65_539, 200_000] {
            assert_eq!(draw_overlay("x".repeat(len)).width, MAX_WIDTH);
        }
    }

    #[test]
    fn overlay_stays_on_screen() {
        let bounds = Rect::new(0, 0, 80, 24);
        assert_eq!(overlay_area(10, 5, 20, 3, bounds), Rect::new(11, 5, 20, 3));
        assert_eq!(overlay_area(79, 23, 20, 3, bounds), Rect::new(60, 21, 20, 3));
        assert_eq!(overlay_area(5, 5, 200, 30, bounds), Rect::new(0, 0, 80, 24));
    }
}
