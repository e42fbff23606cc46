use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::Modifier;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::drag::{DropTarget, Region};
use crate::models::Category;
use crate::tui::app::HitMap;
use crate::tui::widgets::color::Palette;

pub struct FolderPane<'a> {
    pub categories: &'a [Category],
    pub selected: usize,
    pub focused: bool,
    /// Folder shown in the main pane
    pub open: Option<i64>,
    /// Folder under a dragged todo
    pub hovered: Option<DropTarget>,
}

/// First row to draw so that `selected` stays on screen
pub(crate) fn scroll_offset(selected: usize, visible_rows: usize) -> usize {
    if visible_rows == 0 {
        return 0;
    }
    selected.saturating_sub(visible_rows - 1)
}

pub(crate) fn truncate(text: &str, max_width: usize) -> String {
    if text.chars().count() <= max_width {
        return text.to_string();
    }
    text.chars().take(max_width.saturating_sub(3)).collect::<String>() + "..."
}

/// Folder list; each drawn row becomes a drop target for its category
pub fn render_folders(f: &mut Frame, area: Rect, pane: &FolderPane<'_>, palette: &Palette, hit: &mut HitMap) {
    let border_style = if pane.focused { palette.highlight } else { palette.base };
    let block = Block::default()
        .borders(Borders::ALL)
        .title(Span::styled(format!("Folders ({})", pane.categories.len()), border_style))
        .style(palette.base);
    let inner = block.inner(area);
    f.render_widget(block, area);

    if pane.categories.is_empty() {
        let hint = Paragraph::new("No folders yet").style(palette.muted);
        f.render_widget(hint, inner);
        return;
    }

    let rows = usize::from(inner.height);
    let offset = scroll_offset(pane.selected, rows);
    let max_width = usize::from(inner.width);

    for (row, (index, category)) in pane.categories.iter().enumerate().skip(offset).take(rows).enumerate() {
        let Some(id) = category.id else { continue };
        let row_area = Rect::new(inner.x, inner.y + row as u16, inner.width, 1);
        hit.drop_regions.register(Region::from(row_area), DropTarget::Category(id));

        let hovered = pane.hovered == Some(DropTarget::Category(id));
        let marker = if hovered {
            "» "
        } else if pane.open == Some(id) {
            "▾ "
        } else {
            "▸ "
        };
        let label = truncate(&format!("{}{} ({})", marker, category.name, category.todo_count), max_width);

        let style = if hovered {
            palette.drop_target.add_modifier(Modifier::REVERSED)
        } else if pane.focused && index == pane.selected {
            palette.highlight
        } else if pane.open == Some(id) {
            palette.base.add_modifier(Modifier::BOLD)
        } else {
            palette.base
        };

        let line = Line::from(Span::styled(format!("{:<width$}", label, width = max_width), style));
        f.render_widget(Paragraph::new(line), row_area);
    }
}
