use ratatui::Frame;
use ratatui::layout::Alignment;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::drag::{DropTarget, Overlay};
use crate::tui::app::{DeleteTarget, Focus, Mode, View};
use crate::tui::widgets::{
    color::Palette,
    confirm_delete::render_confirm_delete,
    drag_overlay::render_drag_overlay,
    filters_box::render_filters_box,
    folders::{FolderPane, render_folders},
    help::render_help,
    input_prompt::render_input_prompt,
    status_bar::render_status_bar,
    todo_list::{TodoPane, render_todo_list},
};
use crate::tui::{App, Layout};
use crate::utils::format_key_binding_for_display;

pub fn render(f: &mut Frame, app: &mut App, layout: &Layout) {
    let palette = Palette::from_theme(&app.config.get_active_theme());

    let outer_block = Block::default()
        .borders(Borders::ALL)
        .title("todofold")
        .title_alignment(Alignment::Center)
        .style(palette.base);
    f.render_widget(outer_block, f.area());

    let header = Line::from(vec![
        Span::styled(format!(" {} ", app.user.name), palette.highlight),
        Span::styled(format!("  {}", app.view_title()), palette.base),
    ]);
    f.render_widget(Paragraph::new(header), layout.header_area);

    // Drop regions are rebuilt by every frame
    app.hit.clear();
    let hovered = app.drag.hovered_target();
    let dragging = app.drag.overlay().map(|o| o.snapshot.todo_id);
    let open = match app.ui.view {
        View::Category(id) => Some(id),
        View::All => None,
    };

    let folders = FolderPane {
        categories: app.board.categories(),
        selected: app.ui.selected_folder,
        focused: app.ui.focus == Focus::Folders,
        open,
        hovered,
    };
    render_folders(f, layout.sidebar_area, &folders, &palette, &mut app.hit);

    let title = app.view_title();
    let filter = app.current_filter();
    let todos = app.board.filtered(filter);
    let pane = TodoPane {
        title,
        todos: &todos,
        selected: app.ui.selected_todo,
        focused: app.ui.focus == Focus::Todos,
        show_back: open.is_some(),
        hovered,
        dragging,
    };
    render_todo_list(f, layout.main_area, &pane, &palette, &mut app.hit);

    let folder_name = open
        .and_then(|id| app.board.category(id))
        .map(|c| c.name.as_str())
        .unwrap_or("All");
    render_filters_box(
        f,
        layout.filters_area,
        folder_name,
        app.ui.priority_filter,
        &format_key_binding_for_display(&app.config.key_bindings.filter_priority),
        &palette,
    );

    let key_hints = get_key_hints(app);
    render_status_bar(f, layout.status_area, app.status.message.as_deref(), &key_hints, &palette);

    // Popups go over the normal content
    match &app.ui.mode {
        Mode::Normal => {}
        Mode::Help => render_help(f, f.area(), &app.config, &palette),
        Mode::Input { kind, text } => render_input_prompt(f, f.area(), *kind, text, &palette),
        Mode::ConfirmDelete(target) => {
            let (what, note) = match *target {
                DeleteTarget::Todo(id) => (
                    app.board
                        .todo(id)
                        .map(|t| format!("todo '{}'", t.title))
                        .unwrap_or_else(|| "todo".to_string()),
                    None,
                ),
                DeleteTarget::Category(id) => (
                    app.board
                        .category(id)
                        .map(|c| format!("folder '{}'", c.name))
                        .unwrap_or_else(|| "folder".to_string()),
                    Some("Its todos stay, without a folder."),
                ),
            };
            render_confirm_delete(f, f.area(), &what, note, &palette);
        }
    }

    // The dragged copy is drawn last so it floats over everything
    if let Some(overlay) = app.drag.overlay() {
        let destination = destination_label(app, &overlay);
        render_drag_overlay(f, &overlay, &destination, &palette);
    }
}

/// What releasing the pointer right now would do
fn destination_label(app: &App, overlay: &Overlay<'_>) -> String {
    match overlay.target {
        Some(DropTarget::Category(id)) if overlay.snapshot.category_id == Some(id) => {
            "own folder".to_string()
        }
        Some(DropTarget::Category(id)) => app
            .board
            .category(id)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| "folder".to_string()),
        Some(DropTarget::Back) | None => "no folder".to_string(),
    }
}

fn get_key_hints(app: &App) -> Vec<String> {
    let keys = &app.config.key_bindings;
    let key = |binding: &str| format_key_binding_for_display(binding);

    if app.drag.is_dragging() {
        return vec![
            "Release: Drop".to_string(),
            "Esc: Cancel drag".to_string(),
        ];
    }

    match app.ui.mode {
        Mode::Help => vec![format!("Esc or {}: Exit help", key(&keys.help))],
        Mode::Input { .. } => vec!["Enter: Save".to_string(), "Esc: Cancel".to_string()],
        Mode::ConfirmDelete(_) => vec!["y: Delete".to_string(), "n/Esc: Cancel".to_string()],
        Mode::Normal => {
            let mut hints = vec![
                format!("{}: Quit", key(&keys.quit)),
                format!("{}: Help", key(&keys.help)),
                format!("{}: New", key(&keys.new_todo)),
                format!("{}: Folder", key(&keys.new_category)),
                format!("{}: Done", key(&keys.toggle_completed)),
                format!("{}: Pane", key(&keys.switch_pane)),
            ];
            if app.ui.view != View::All {
                hints.insert(2, format!("{}: Back", key(&keys.back)));
            }
            hints.push("Drag ⠿: Move".to_string());
            hints
        }
    }
}
