use crossterm::event::{
    self, DisableFocusChange, DisableMouseCapture, EnableFocusChange, EnableMouseCapture, Event, KeyCode,
    KeyEvent, KeyEventKind, MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen, size as terminal_size};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::Rect;
use ratatui::Terminal;
use std::io;
use tracing::{info, warn};

use crate::actions::ActionError;
use crate::drag::{DropTarget, Point};
use crate::tui::app::{Focus, InputKind, Mode};
use crate::tui::error::TuiError;
use crate::tui::layout::Layout;
use crate::tui::App;
use crate::utils::{ParsedKeyBinding, parse_key_binding};

/// Guard that ensures terminal state is restored even on panic
/// If the terminal is left in raw mode, in the alternate screen or with mouse
/// reporting on, the user's shell is unusable.
struct TerminalGuard {
    raw_mode_enabled: bool,
    alternate_screen_enabled: bool,
    mouse_capture_enabled: bool,
}

impl TerminalGuard {
    /// Initialize terminal state and return a guard
    /// The guard will restore terminal state when dropped (even on panic)
    fn new() -> Result<Self, TuiError> {
        enable_raw_mode()?;
        let mut guard = Self {
            raw_mode_enabled: true,
            alternate_screen_enabled: false,
            mouse_capture_enabled: false,
        };

        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        guard.alternate_screen_enabled = true;
        execute!(stdout, EnableMouseCapture, EnableFocusChange)?;
        guard.mouse_capture_enabled = true;

        Ok(guard)
    }

    /// Manually restore terminal state (called on normal exit)
    /// After calling this, the guard will do nothing on drop
    fn restore(&mut self) -> Result<(), TuiError> {
        if self.mouse_capture_enabled {
            execute!(io::stdout(), DisableFocusChange, DisableMouseCapture)?;
            self.mouse_capture_enabled = false;
        }
        if self.alternate_screen_enabled {
            execute!(io::stdout(), LeaveAlternateScreen)?;
            self.alternate_screen_enabled = false;
        }
        if self.raw_mode_enabled {
            disable_raw_mode()?;
            self.raw_mode_enabled = false;
        }
        Ok(())
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        // Ignore errors in drop - we're already in a cleanup path
        if self.mouse_capture_enabled {
            let _ = execute!(io::stdout(), DisableFocusChange, DisableMouseCapture);
        }
        if self.alternate_screen_enabled {
            let _ = execute!(io::stdout(), LeaveAlternateScreen);
        }
        if self.raw_mode_enabled {
            let _ = disable_raw_mode();
        }
    }
}

pub fn run_event_loop(mut app: App) -> Result<(), TuiError> {
    // Check terminal size before entering alternate screen
    // This allows us to show a helpful error message in the normal terminal
    let (width, height) = terminal_size()?;

    let min_width_with_border = Layout::MIN_WIDTH + 2; // +2 for borders
    let min_height_with_border = Layout::MIN_HEIGHT + 2;

    if width < min_width_with_border || height < min_height_with_border {
        return Err(TuiError::RenderError(format!(
            "Terminal size too small. Current: {}x{}, Minimum required: {}x{}. Please resize your terminal window.",
            width, height, min_width_with_border, min_height_with_border
        )));
    }

    let mut guard = TerminalGuard::new()?;

    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)?;
    info!(user = %app.user.name, "tui started");

    loop {
        app.check_status_message_timeout();

        let terminal_size = terminal.size()?;
        let terminal_rect = Rect::new(0, 0, terminal_size.width, terminal_size.height);
        terminal.draw(|f| {
            let layout = Layout::calculate(terminal_rect, app.config.sidebar_width_percent);
            crate::tui::render::render(f, &mut app, &layout);
        })?;

        if event::poll(std::time::Duration::from_millis(16))? && handle_event(&mut app, event::read()?)? {
            break; // Quit requested
        }
    }

    guard.restore()?;
    info!("tui stopped");

    Ok(())
}

/// Apply one terminal event. Returns `true` when the user asked to quit.
pub fn handle_event(app: &mut App, event: Event) -> Result<bool, TuiError> {
    match event {
        // Only process Press events (ignore Release events to prevent double-processing on Windows)
        Event::Key(key_event) if key_event.kind == KeyEventKind::Press => handle_key_event(app, key_event),
        Event::Mouse(mouse_event) => {
            handle_mouse_event(app, mouse_event);
            Ok(false)
        }
        // The release may never arrive once the window loses focus
        Event::FocusLost => {
            app.cancel_drag();
            Ok(false)
        }
        // The next draw picks up the new size and rebuilds the drop regions
        _ => Ok(false),
    }
}

pub fn handle_mouse_event(app: &mut App, mouse_event: MouseEvent) {
    let at = Point::new(mouse_event.column, mouse_event.row);
    match mouse_event.kind {
        MouseEventKind::Down(MouseButton::Left) => {
            if app.ui.mode != Mode::Normal {
                return;
            }
            if let Some(todo_id) = app.hit.handle_at(at) {
                app.begin_drag(todo_id, at);
            } else if app.drag.is_dragging() {
                // The release of the previous gesture was lost
                app.end_drag(at);
            } else {
                handle_click(app, at);
            }
        }
        MouseEventKind::Drag(MouseButton::Left) | MouseEventKind::Moved => app.drag_to(at),
        MouseEventKind::Up(MouseButton::Left) => app.end_drag(at),
        MouseEventKind::ScrollUp if !app.drag.is_dragging() => app.move_selection_up(),
        MouseEventKind::ScrollDown if !app.drag.is_dragging() => app.move_selection_down(),
        _ => {}
    }
}

fn handle_click(app: &mut App, at: Point) {
    match app.hit.drop_regions.resolve(at) {
        Some(DropTarget::Category(id)) => {
            app.ui.focus = Focus::Folders;
            app.open_category(id);
        }
        Some(DropTarget::Back) => app.go_back(),
        None => {
            let Some(todo_id) = app.hit.row_at(at) else { return };
            if let Some(index) = app.visible_todos().iter().position(|t| t.id == Some(todo_id)) {
                app.ui.focus = Focus::Todos;
                app.ui.selected_todo = index;
            }
        }
    }
}

fn handle_key_event(app: &mut App, key_event: KeyEvent) -> Result<bool, TuiError> {
    if app.drag.is_dragging() {
        return handle_dragging_keys(app, key_event);
    }

    match app.ui.mode {
        Mode::Normal => handle_normal_mode(app, key_event),
        Mode::Input { .. } => handle_input_mode(app, key_event),
        Mode::ConfirmDelete(_) => handle_delete_confirmation(app, key_event),
        Mode::Help => handle_help_mode(app, key_event),
    }
}

fn handle_dragging_keys(app: &mut App, key_event: KeyEvent) -> Result<bool, TuiError> {
    if key_event.code == KeyCode::Esc {
        app.cancel_drag();
        app.set_status_message("Move cancelled".to_string());
        return Ok(false);
    }
    let quit_binding = binding(&app.config.key_bindings.quit)?;
    Ok(matches_key_event(key_event, &quit_binding))
}

fn handle_input_mode(app: &mut App, key_event: KeyEvent) -> Result<bool, TuiError> {
    match key_event.code {
        KeyCode::Esc => app.ui.mode = Mode::Normal,
        KeyCode::Enter => report(app.submit_input())?,
        KeyCode::Backspace => {
            if let Mode::Input { text, .. } = &mut app.ui.mode {
                text.pop();
            }
        }
        KeyCode::Char(c) if !crate::utils::has_primary_modifier(key_event.modifiers) => {
            if let Mode::Input { text, .. } = &mut app.ui.mode {
                text.push(c);
            }
        }
        _ => {}
    }
    Ok(false)
}

fn handle_delete_confirmation(app: &mut App, key_event: KeyEvent) -> Result<bool, TuiError> {
    match key_event.code {
        KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => report(app.confirm_delete())?,
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => app.ui.mode = Mode::Normal,
        _ => {}
    }
    Ok(false)
}

fn handle_help_mode(app: &mut App, key_event: KeyEvent) -> Result<bool, TuiError> {
    let help_binding = binding(&app.config.key_bindings.help)?;
    if key_event.code == KeyCode::Esc || matches_key_event(key_event, &help_binding) {
        app.ui.mode = Mode::Normal;
    }
    Ok(false)
}

fn handle_normal_mode(app: &mut App, key_event: KeyEvent) -> Result<bool, TuiError> {
    let keys = app.config.key_bindings.clone();

    if matches_key_event(key_event, &binding(&keys.quit)?) {
        return Ok(true);
    }

    if key_event.code == KeyCode::Esc {
        app.clear_status_message();
    } else if matches_key_event(key_event, &binding(&keys.help)?) {
        app.ui.mode = Mode::Help;
    } else if key_event.code == KeyCode::Up || matches_key_event(key_event, &binding(&keys.list_up)?) {
        app.move_selection_up();
    } else if key_event.code == KeyCode::Down || matches_key_event(key_event, &binding(&keys.list_down)?) {
        app.move_selection_down();
    } else if matches_key_event(key_event, &binding(&keys.switch_pane)?) {
        app.switch_focus();
    } else if matches_key_event(key_event, &binding(&keys.open)?) {
        if app.ui.focus == Focus::Folders {
            if let Some(id) = app.selected_category().and_then(|c| c.id) {
                app.open_category(id);
            }
        }
    } else if matches_key_event(key_event, &binding(&keys.back)?) {
        app.go_back();
    } else if matches_key_event(key_event, &binding(&keys.filter_priority)?) {
        app.cycle_priority_filter();
    } else if matches_key_event(key_event, &binding(&keys.new_todo)?) {
        app.start_input(InputKind::NewTodo);
    } else if matches_key_event(key_event, &binding(&keys.new_category)?) {
        app.start_input(InputKind::NewCategory);
    } else if matches_key_event(key_event, &binding(&keys.edit_memo)?) {
        if let Some(todo_id) = app.selected_todo().and_then(|t| t.id) {
            app.start_input(InputKind::Memo { todo_id });
        }
    } else if matches_key_event(key_event, &binding(&keys.toggle_completed)?) {
        report(app.toggle_selected())?;
    } else if matches_key_event(key_event, &binding(&keys.cycle_priority)?) {
        report(app.cycle_selected_priority())?;
    } else if matches_key_event(key_event, &binding(&keys.delete)?) {
        app.request_delete();
    } else if matches_key_event(key_event, &binding(&keys.cycle_theme)?) {
        if let Err(e) = app.cycle_theme() {
            warn!(error = %e, "could not save theme");
            app.set_status_message(format!("Could not save theme: {}", e));
        }
    }

    Ok(false)
}

/// Action errors the user can act on are already in the status bar; only
/// storage failures end the session.
fn report(result: Result<(), ActionError>) -> Result<(), TuiError> {
    match result {
        Ok(()) => Ok(()),
        Err(e @ ActionError::Storage(_)) => Err(e.into()),
        Err(e) => {
            warn!(error = %e, "action failed");
            Ok(())
        }
    }
}

fn binding(key: &str) -> Result<ParsedKeyBinding, TuiError> {
    parse_key_binding(key).map_err(TuiError::KeyBindingError)
}

fn matches_key_event(key_event: KeyEvent, binding: &ParsedKeyBinding) -> bool {
    // Ctrl on Windows/Linux, Option/Alt on macOS
    let has_primary_mod = crate::utils::has_primary_modifier(key_event.modifiers);
    if binding.requires_ctrl != has_primary_mod {
        return false;
    }

    binding.key_code == key_event.code
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drag::DragState;
    use crate::tui::app::View;
    use crate::tui::app::tests::test_app;
    use crossterm::event::KeyModifiers;
    use ratatui::backend::TestBackend;

    fn mouse_event(kind: MouseEventKind, column: u16, row: u16) -> MouseEvent {
        MouseEvent {
            kind,
            column,
            row,
            modifiers: KeyModifiers::empty(),
        }
    }

    fn key(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::empty()))
    }

    fn draw(app: &mut App) {
        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        terminal
            .draw(|f| {
                let layout = Layout::calculate(f.area(), app.config.sidebar_width_percent);
                crate::tui::render::render(f, app, &layout);
            })
            .unwrap();
    }

    fn todo_id(app: &App, title: &str) -> i64 {
        app.board.todos().iter().find(|t| t.title == title).and_then(|t| t.id).unwrap()
    }

    fn category_id(app: &App, name: &str) -> i64 {
        app.categories().iter().find(|c| c.name == name).and_then(|c| c.id).unwrap()
    }

    fn handle_of(app: &App, id: i64) -> Point {
        let (region, _) = app.hit.handles.iter().find(|(_, todo)| *todo == id).unwrap();
        Point::new(region.x, region.y)
    }

    fn region_of(app: &App, target: DropTarget) -> Point {
        let (region, _) = app.hit.drop_regions.iter().find(|(_, t)| *t == target).unwrap();
        Point::new(region.x + 1, region.y)
    }

    fn drag(app: &mut App, from: Point, to: Point) {
        handle_mouse_event(app, mouse_event(MouseEventKind::Down(MouseButton::Left), from.x, from.y));
        handle_mouse_event(app, mouse_event(MouseEventKind::Drag(MouseButton::Left), to.x, to.y));
        handle_mouse_event(app, mouse_event(MouseEventKind::Up(MouseButton::Left), to.x, to.y));
    }

    #[test]
    fn dropping_on_a_folder_moves_the_todo() {
        let mut app = test_app();
        draw(&mut app);
        let milk = todo_id(&app, "Buy milk");
        let home = category_id(&app, "Home");

        let from = handle_of(&app, milk);
        let to = region_of(&app, DropTarget::Category(home));
        drag(&mut app, from, to);

        assert_eq!(*app.drag.state(), DragState::Idle);
        assert_eq!(app.board.todo(milk).unwrap().category_id, Some(home));
        assert_eq!(app.board.category(home).unwrap().todo_count, 1);
        assert!(app.status.message.as_deref().unwrap().contains("Home"));
        let stored = app.database.find_todo_by_id(milk, app.user.id).unwrap().unwrap();
        assert_eq!(stored.category_id, Some(home));
    }

    #[test]
    fn dropping_on_back_takes_the_todo_out_of_its_folder() {
        let mut app = test_app();
        let work = category_id(&app, "Work");
        app.open_category(work);
        draw(&mut app);
        let report = todo_id(&app, "Write report");

        let from = handle_of(&app, report);
        let to = region_of(&app, DropTarget::Back);
        drag(&mut app, from, to);

        assert_eq!(app.board.todo(report).unwrap().category_id, None);
        assert_eq!(app.board.category(work).unwrap().todo_count, 0);
    }

    #[test]
    fn dropping_on_empty_space_clears_the_folder() {
        let mut app = test_app();
        draw(&mut app);
        let report = todo_id(&app, "Write report");

        let from = handle_of(&app, report);
        drag(&mut app, from, Point::new(0, 0));

        assert_eq!(app.board.todo(report).unwrap().category_id, None);
    }

    #[test]
    fn hovering_a_folder_marks_it_until_escape() {
        let mut app = test_app();
        draw(&mut app);
        let milk = todo_id(&app, "Buy milk");
        let work = category_id(&app, "Work");

        let from = handle_of(&app, milk);
        let to = region_of(&app, DropTarget::Category(work));
        handle_mouse_event(&mut app, mouse_event(MouseEventKind::Down(MouseButton::Left), from.x, from.y));
        handle_mouse_event(&mut app, mouse_event(MouseEventKind::Drag(MouseButton::Left), to.x, to.y));
        assert_eq!(app.drag.hovered_target(), Some(DropTarget::Category(work)));

        // the overlay renders while dragging
        draw(&mut app);

        assert!(!handle_event(&mut app, key(KeyCode::Esc)).unwrap());
        assert_eq!(*app.drag.state(), DragState::Idle);

        // the release after a cancel does nothing
        handle_mouse_event(&mut app, mouse_event(MouseEventKind::Up(MouseButton::Left), to.x, to.y));
        assert_eq!(app.board.todo(milk).unwrap().category_id, None);
    }

    #[test]
    fn losing_focus_cancels_the_drag() {
        let mut app = test_app();
        draw(&mut app);
        let milk = todo_id(&app, "Buy milk");
        let from = handle_of(&app, milk);

        handle_mouse_event(&mut app, mouse_event(MouseEventKind::Down(MouseButton::Left), from.x, from.y));
        assert!(app.drag.is_dragging());
        handle_event(&mut app, Event::FocusLost).unwrap();
        assert!(!app.drag.is_dragging());
    }

    #[test]
    fn clicking_a_folder_opens_it() {
        let mut app = test_app();
        draw(&mut app);
        let home = category_id(&app, "Home");
        let at = region_of(&app, DropTarget::Category(home));

        handle_mouse_event(&mut app, mouse_event(MouseEventKind::Down(MouseButton::Left), at.x, at.y));
        handle_mouse_event(&mut app, mouse_event(MouseEventKind::Up(MouseButton::Left), at.x, at.y));

        assert_eq!(app.ui.view, View::Category(home));
        assert!(!app.drag.is_dragging());
    }

    #[test]
    fn typing_a_new_folder_name() {
        let mut app = test_app();
        handle_event(&mut app, key(KeyCode::Char('c'))).unwrap();
        for c in "Errands".chars() {
            handle_event(&mut app, key(KeyCode::Char(c))).unwrap();
        }
        handle_event(&mut app, key(KeyCode::Enter)).unwrap();

        assert_eq!(app.ui.mode, Mode::Normal);
        assert!(app.categories().iter().any(|c| c.name == "Errands"));
    }

    #[test]
    fn quit_key_stops_the_loop() {
        let mut app = test_app();
        assert!(handle_event(&mut app, key(KeyCode::Char('q'))).unwrap());
    }

    #[test]
    fn matches_plain_and_ctrl_bindings() {
        let plain = parse_key_binding("q").unwrap();
        assert!(matches_key_event(KeyEvent::new(KeyCode::Char('q'), KeyModifiers::empty()), &plain));
        assert!(!matches_key_event(KeyEvent::new(KeyCode::Char('q'), KeyModifiers::CONTROL), &plain));

        let ctrl = parse_key_binding("Ctrl+s").unwrap();
        assert!(matches_key_event(KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL), &ctrl));
    }
}
