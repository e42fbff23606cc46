use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::drag::{DropTarget, Region};
use crate::models::Todo;
use crate::tui::app::HitMap;
use crate::tui::widgets::color::{Palette, priority_color};
use crate::tui::widgets::folders::{scroll_offset, truncate};

/// Glyph grabbed to start dragging a todo
pub const DRAG_HANDLE: &str = "⠿ ";
pub const HANDLE_WIDTH: u16 = 2;
pub const BACK_LABEL: &str = "◀ Back to all todos";

pub struct TodoPane<'a> {
    pub title: String,
    pub todos: &'a [&'a Todo],
    pub selected: usize,
    pub focused: bool,
    /// Inside a folder the first row is the back target
    pub show_back: bool,
    pub hovered: Option<DropTarget>,
    /// Todo currently being dragged, drawn dimmed in place
    pub dragging: Option<i64>,
}

fn todo_line(todo: &Todo, max_width: usize, style: Style) -> Line<'static> {
    let check = if todo.completed { "[x] " } else { "[ ] " };
    let priority = format!("{:<6} ", todo.priority.as_str());
    let mut details = String::new();
    if let Some(ref deadline) = todo.deadline {
        details.push_str(&format!("  due {}", deadline));
    }
    if todo.memo.is_some() {
        details.push_str("  ✎");
    }

    let fixed = DRAG_HANDLE.chars().count() + check.len() + priority.len();
    let title = truncate(
        &format!("{}{}", todo.title, details),
        max_width.saturating_sub(fixed),
    );
    let title_style = if todo.completed {
        style.add_modifier(Modifier::CROSSED_OUT)
    } else {
        style
    };

    Line::from(vec![
        Span::styled(DRAG_HANDLE, style.add_modifier(Modifier::BOLD)),
        Span::styled(check, style),
        Span::styled(priority, style.fg(priority_color(todo.priority))),
        Span::styled(title, title_style),
    ])
}

/// Todo list for the current view.
///
/// Registers the back target (inside a folder), each row's drag handle and
/// each row for click selection.
pub fn render_todo_list(f: &mut Frame, area: Rect, pane: &TodoPane<'_>, palette: &Palette, hit: &mut HitMap) {
    let border_style = if pane.focused { palette.highlight } else { palette.base };
    let block = Block::default()
        .borders(Borders::ALL)
        .title(Span::styled(format!("{} ({})", pane.title, pane.todos.len()), border_style))
        .style(palette.base);
    let mut inner = block.inner(area);
    f.render_widget(block, area);

    if pane.show_back && inner.height > 0 {
        let back_area = Rect::new(inner.x, inner.y, inner.width, 1);
        hit.drop_regions.register(Region::from(back_area), DropTarget::Back);
        let style = if pane.hovered == Some(DropTarget::Back) {
            palette.drop_target.add_modifier(Modifier::REVERSED)
        } else {
            palette.muted
        };
        let label = format!("{:<width$}", BACK_LABEL, width = usize::from(inner.width));
        f.render_widget(Paragraph::new(Span::styled(label, style)), back_area);
        inner = Rect::new(inner.x, inner.y + 1, inner.width, inner.height - 1);
    }

    if pane.todos.is_empty() {
        f.render_widget(Paragraph::new("Nothing here. Drag a todo in or press n.").style(palette.muted), inner);
        return;
    }

    let rows = usize::from(inner.height);
    let offset = scroll_offset(pane.selected, rows);
    let max_width = usize::from(inner.width);

    for (row, (index, todo)) in pane.todos.iter().enumerate().skip(offset).take(rows).enumerate() {
        let Some(id) = todo.id else { continue };
        let row_area = Rect::new(inner.x, inner.y + row as u16, inner.width, 1);
        hit.rows.push((Region::from(row_area), id));
        hit.handles.push((
            Region::new(row_area.x, row_area.y, HANDLE_WIDTH.min(row_area.width), 1),
            id,
        ));

        let style = if pane.dragging == Some(id) {
            palette.muted
        } else if pane.focused && index == pane.selected {
            palette.highlight
        } else {
            palette.base
        };
        f.render_widget(Paragraph::new(todo_line(todo, max_width, style)).style(style), row_area);
    }
}
