use std::time::Instant;
use tracing::{debug, info, warn};

use crate::actions::{self, Action, ActionError, ActionOutcome};
use crate::config::{Config, ConfigError};
use crate::database::{Database, DatabaseError};
use crate::drag::{Commit, DragSnapshot, DragTracker, DropRegions, Point, Region};
use crate::models::{Category, Priority, Todo, TodoFilter, User};
use crate::reconcile::{Board, MoveOutcome, submit_commit};
use crate::utils::Profile;

/// Which todos the main pane shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    #[default]
    All,
    /// One folder, with a back target above its todos
    Category(i64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Focus {
    Folders,
    #[default]
    Todos,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    NewTodo,
    NewCategory,
    Memo { todo_id: i64 },
}

impl InputKind {
    pub fn title(&self) -> &'static str {
        match self {
            InputKind::NewTodo => "New todo",
            InputKind::NewCategory => "New folder",
            InputKind::Memo { .. } => "Memo",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteTarget {
    Todo(i64),
    Category(i64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Normal,
    Input { kind: InputKind, text: String },
    ConfirmDelete(DeleteTarget),
    Help,
}

#[derive(Debug, Clone)]
pub struct UiState {
    pub view: View,
    pub focus: Focus,
    pub mode: Mode,
    pub priority_filter: Option<Priority>,
    pub selected_folder: usize,
    pub selected_todo: usize,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            view: View::All,
            focus: Focus::Todos,
            mode: Mode::Normal,
            priority_filter: None,
            selected_folder: 0,
            selected_todo: 0,
        }
    }
}

/// Screen positions recorded by the last frame
#[derive(Debug, Default)]
pub struct HitMap {
    pub drop_regions: DropRegions,
    /// Drag handle of each visible todo
    pub handles: Vec<(Region, i64)>,
    /// Full row of each visible todo
    pub rows: Vec<(Region, i64)>,
}

impl HitMap {
    pub fn clear(&mut self) {
        self.drop_regions.clear();
        self.handles.clear();
        self.rows.clear();
    }

    pub fn handle_at(&self, point: Point) -> Option<i64> {
        self.handles
            .iter()
            .find(|(region, _)| region.contains(point))
            .map(|(_, id)| *id)
    }

    pub fn row_at(&self, point: Point) -> Option<i64> {
        self.rows
            .iter()
            .find(|(region, _)| region.contains(point))
            .map(|(_, id)| *id)
    }
}

#[derive(Debug, Clone, Default)]
pub struct StatusState {
    pub message: Option<String>,
    pub message_time: Option<Instant>,
}

pub struct App {
    pub config: Config,
    pub profile: Profile,
    pub database: Database,
    pub user: User,
    pub board: Board,
    pub drag: DragTracker,
    pub hit: HitMap,
    pub ui: UiState,
    pub status: StatusState,
}

impl App {
    pub fn new(config: Config, profile: Profile, database: Database, user: User) -> Result<Self, DatabaseError> {
        let board = Board::load(&database, user.id)?;
        Ok(Self {
            config,
            profile,
            database,
            user,
            board,
            drag: DragTracker::new(),
            hit: HitMap::default(),
            ui: UiState::default(),
            status: StatusState::default(),
        })
    }

    /// Reload todos and folders from the database
    pub fn load_data(&mut self) -> Result<(), DatabaseError> {
        self.board = Board::load(&self.database, self.user.id)?;
        if let View::Category(id) = self.ui.view {
            if self.board.category(id).is_none() {
                self.ui.view = View::All;
            }
        }
        self.clamp_selection();
        Ok(())
    }

    pub fn current_filter(&self) -> TodoFilter {
        TodoFilter {
            category_id: match self.ui.view {
                View::All => None,
                View::Category(id) => Some(id),
            },
            priority: self.ui.priority_filter,
        }
    }

    pub fn visible_todos(&self) -> Vec<&Todo> {
        self.board.filtered(self.current_filter())
    }

    pub fn categories(&self) -> &[Category] {
        self.board.categories()
    }

    pub fn selected_todo(&self) -> Option<&Todo> {
        self.visible_todos().get(self.ui.selected_todo).copied()
    }

    pub fn selected_category(&self) -> Option<&Category> {
        self.categories().get(self.ui.selected_folder)
    }

    pub fn view_title(&self) -> String {
        match self.ui.view {
            View::All => "All todos".to_string(),
            View::Category(id) => self
                .board
                .category(id)
                .map(|c| c.name.clone())
                .unwrap_or_else(|| "Folder".to_string()),
        }
    }

    pub fn clamp_selection(&mut self) {
        let todos = self.visible_todos().len();
        self.ui.selected_todo = self.ui.selected_todo.min(todos.saturating_sub(1));
        let folders = self.categories().len();
        self.ui.selected_folder = self.ui.selected_folder.min(folders.saturating_sub(1));
    }

    pub fn move_selection_up(&mut self) {
        match self.ui.focus {
            Focus::Folders => self.ui.selected_folder = self.ui.selected_folder.saturating_sub(1),
            Focus::Todos => self.ui.selected_todo = self.ui.selected_todo.saturating_sub(1),
        }
    }

    pub fn move_selection_down(&mut self) {
        match self.ui.focus {
            Focus::Folders => self.ui.selected_folder += 1,
            Focus::Todos => self.ui.selected_todo += 1,
        }
        self.clamp_selection();
    }

    pub fn switch_focus(&mut self) {
        self.ui.focus = match self.ui.focus {
            Focus::Folders => Focus::Todos,
            Focus::Todos => Focus::Folders,
        };
    }

    pub fn open_category(&mut self, id: i64) {
        if self.board.category(id).is_none() {
            return;
        }
        debug!(category_id = id, "opening folder");
        self.ui.view = View::Category(id);
        self.ui.selected_todo = 0;
        if let Some(index) = self.categories().iter().position(|c| c.id == Some(id)) {
            self.ui.selected_folder = index;
        }
        self.clamp_selection();
    }

    pub fn go_back(&mut self) {
        self.ui.view = View::All;
        self.ui.selected_todo = 0;
        self.clamp_selection();
    }

    pub fn cycle_priority_filter(&mut self) {
        self.ui.priority_filter = match self.ui.priority_filter {
            None => Some(Priority::High),
            Some(Priority::Low) => None,
            Some(priority) => Some(priority.cycle()),
        };
        self.clamp_selection();
    }

    pub fn set_status_message(&mut self, message: String) {
        self.status.message = Some(message);
        self.status.message_time = Some(Instant::now());
    }

    pub fn clear_status_message(&mut self) {
        self.status.message = None;
        self.status.message_time = None;
    }

    /// Check if status message should be auto-cleared (after 3 seconds)
    pub fn check_status_message_timeout(&mut self) {
        const STATUS_MESSAGE_TIMEOUT_SECS: u64 = 3;
        if let Some(time) = self.status.message_time {
            if time.elapsed().as_secs() >= STATUS_MESSAGE_TIMEOUT_SECS {
                self.clear_status_message();
            }
        }
    }

    /// Start dragging the todo whose handle is under `at`
    pub fn begin_drag(&mut self, todo_id: i64, at: Point) {
        let Some(snapshot) = self.board.todo(todo_id).and_then(DragSnapshot::of) else {
            return;
        };
        if let Some(index) = self.visible_todos().iter().position(|t| t.id == Some(todo_id)) {
            self.ui.selected_todo = index;
        }
        let unfinished = self.drag.press(snapshot, at, &self.hit.drop_regions);
        if let Some(commit) = unfinished {
            self.commit_move(commit);
        }
    }

    pub fn drag_to(&mut self, at: Point) {
        self.drag.pointer_moved(at, &self.hit.drop_regions);
    }

    /// Finish the gesture at `at`, sending the move if there is one
    pub fn end_drag(&mut self, at: Point) {
        if let Some(commit) = self.drag.release(at, &self.hit.drop_regions) {
            self.commit_move(commit);
        }
    }

    pub fn cancel_drag(&mut self) {
        self.drag.cancel();
    }

    /// Send a finished drag to the store and show the result
    pub fn commit_move(&mut self, commit: Commit) {
        let target_name = commit
            .target
            .category_id()
            .and_then(|id| self.board.category(id).map(|c| c.name.clone()));

        match submit_commit(&self.database, self.user.id, &mut self.board, &commit) {
            MoveOutcome::Moved(todo) => {
                let message = match target_name {
                    Some(name) => format!("Moved '{}' to {}", todo.title, name),
                    None => format!("Moved '{}' out of its folder", todo.title),
                };
                self.set_status_message(message);
            }
            MoveOutcome::Rejected(reason) => {
                self.set_status_message(format!("Move refused: {}", reason));
                // the board may be stale, e.g. a folder deleted elsewhere
                if let Err(e) = self.load_data() {
                    warn!(error = %e, "reload after refused move failed");
                }
            }
            MoveOutcome::Failed(message) => self.set_status_message(message),
            MoveOutcome::Ignored => {}
        }
        self.clamp_selection();
    }

    /// Dispatch a form action for the current user and reload
    pub fn run_action(&mut self, action: Action) -> Result<ActionOutcome, ActionError> {
        let outcome = actions::dispatch(&self.database, self.user.id, &action);
        match &outcome {
            Ok(_) => info!(action = action.name(), "action applied"),
            Err(e) => self.set_status_message(e.to_string()),
        }
        self.load_data()?;
        outcome
    }

    pub fn start_input(&mut self, kind: InputKind) {
        let text = match kind {
            InputKind::Memo { todo_id } => self
                .board
                .todo(todo_id)
                .and_then(|t| t.memo.clone())
                .unwrap_or_default(),
            _ => String::new(),
        };
        self.ui.mode = Mode::Input { kind, text };
    }

    /// Submit the open input prompt
    pub fn submit_input(&mut self) -> Result<(), ActionError> {
        let Mode::Input { kind, text } = std::mem::replace(&mut self.ui.mode, Mode::Normal) else {
            return Ok(());
        };

        let action = match kind {
            InputKind::NewTodo => {
                if text.trim().is_empty() {
                    return Ok(());
                }
                Action::Create {
                    title: text.trim().to_string(),
                    category_id: match self.ui.view {
                        View::Category(id) => Some(id),
                        View::All => None,
                    },
                    priority: self.ui.priority_filter.unwrap_or_default(),
                    deadline: None,
                }
            }
            InputKind::NewCategory => {
                if text.trim().is_empty() {
                    return Ok(());
                }
                Action::CreateCategory { name: text.trim().to_string() }
            }
            InputKind::Memo { todo_id } => Action::UpdateTodoMemo { todo_id, memo: text },
        };

        match self.run_action(action) {
            Ok(ActionOutcome::Todo(todo)) if kind == InputKind::NewTodo => {
                self.ui.selected_todo = self
                    .visible_todos()
                    .iter()
                    .position(|t| t.id == todo.id)
                    .unwrap_or(0);
                self.set_status_message(format!("Created '{}'", todo.title));
            }
            Ok(ActionOutcome::Category(category)) => {
                self.set_status_message(format!("Created folder '{}'", category.name));
            }
            Ok(_) => {}
            // already shown in the status bar
            Err(ActionError::Validation(_) | ActionError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }
        Ok(())
    }

    pub fn toggle_selected(&mut self) -> Result<(), ActionError> {
        let Some((id, completed)) = self.selected_todo().and_then(|t| Some((t.id?, t.completed))) else {
            return Ok(());
        };
        self.run_action(Action::Toggle { id, completed }).map(|_| ())
    }

    pub fn cycle_selected_priority(&mut self) -> Result<(), ActionError> {
        let Some((id, priority)) = self.selected_todo().and_then(|t| Some((t.id?, t.priority))) else {
            return Ok(());
        };
        self.run_action(Action::UpdatePriority { id, priority: priority.cycle() })
            .map(|_| ())
    }

    /// Ask for confirmation before deleting the focused item
    pub fn request_delete(&mut self) {
        let target = match self.ui.focus {
            Focus::Todos => self.selected_todo().and_then(|t| t.id).map(DeleteTarget::Todo),
            Focus::Folders => self.selected_category().and_then(|c| c.id).map(DeleteTarget::Category),
        };
        if let Some(target) = target {
            self.ui.mode = Mode::ConfirmDelete(target);
        }
    }

    pub fn confirm_delete(&mut self) -> Result<(), ActionError> {
        let Mode::ConfirmDelete(target) = std::mem::replace(&mut self.ui.mode, Mode::Normal) else {
            return Ok(());
        };
        let action = match target {
            DeleteTarget::Todo(id) => Action::Delete { id },
            DeleteTarget::Category(category_id) => Action::DeleteCategory { category_id },
        };
        if self.run_action(action).is_ok() {
            self.set_status_message("Deleted".to_string());
        }
        Ok(())
    }

    /// Switch to the next theme and persist the choice
    pub fn cycle_theme(&mut self) -> Result<(), ConfigError> {
        let next = self.config.next_theme();
        self.config.set_theme(&next)?;
        let path = Config::get_config_path(self.profile)?;
        self.config.save_to_path(&path)?;
        self.set_status_message(format!("Theme: {}", next));
        Ok(())
    }
}
