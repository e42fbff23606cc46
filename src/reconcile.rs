//! Local copy of a user's todos and folders, kept in step with the store.
//!
//! A move is shown immediately, then either confirmed from the stored todo
//! or rolled back to the category the store last reported.

use tracing::{info, warn};

use crate::actions::{ActionError, ActionOutcome, handle_form};
use crate::database::{Database, DatabaseError};
use crate::drag::Commit;
use crate::models::{Category, Todo, TodoFilter};
use crate::reassign::retry_transient_once;

/// Status text shown when a move could not be stored
pub const MOVE_FAILED_MESSAGE: &str = "could not move item";

#[derive(Debug, Default)]
pub struct Board {
    todos: Vec<Todo>,
    categories: Vec<Category>,
}

/// A move shown locally that the store has not confirmed yet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingMove {
    pub todo_id: i64,
    pub confirmed_category: Option<i64>,
    pub guessed_category: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MoveOutcome {
    Moved(Todo),
    /// The request was refused (missing/foreign row, malformed input)
    Rejected(String),
    /// Storage failed, including after the retry
    Failed(String),
    /// Nothing to do: the todo is not on the board
    Ignored,
}

impl Board {
    pub fn new(todos: Vec<Todo>, categories: Vec<Category>) -> Self {
        Self { todos, categories }
    }

    pub fn load(db: &Database, user_id: i64) -> Result<Self, DatabaseError> {
        Ok(Self::new(
            db.get_todos(user_id, TodoFilter::default())?,
            db.get_categories(user_id)?,
        ))
    }

    pub fn todos(&self) -> &[Todo] {
        &self.todos
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn todo(&self, id: i64) -> Option<&Todo> {
        self.todos.iter().find(|t| t.id == Some(id))
    }

    pub fn category(&self, id: i64) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == Some(id))
    }

    /// Todos matching `filter`, in board order (newest first)
    pub fn filtered(&self, filter: TodoFilter) -> Vec<&Todo> {
        self.todos
            .iter()
            .filter(|t| filter.category_id.is_none() || t.category_id == filter.category_id)
            .filter(|t| filter.priority.is_none_or(|p| t.priority == p))
            .collect()
    }

    /// Show the commit's outcome before the store has answered
    pub fn apply_optimistic(&mut self, commit: &Commit) -> Option<PendingMove> {
        let todo = self.todos.iter_mut().find(|t| t.id == Some(commit.todo_id))?;
        let pending = PendingMove {
            todo_id: commit.todo_id,
            confirmed_category: todo.category_id,
            guessed_category: commit.target.category_id(),
        };
        todo.category_id = pending.guessed_category;
        self.shift_count(pending.confirmed_category, pending.guessed_category);
        Some(pending)
    }

    /// Replace the local todo with the stored one
    pub fn confirm(&mut self, pending: &PendingMove, stored: Todo) {
        if stored.category_id != pending.guessed_category {
            self.shift_count(pending.guessed_category, stored.category_id);
        }
        match self.todos.iter_mut().find(|t| t.id == stored.id) {
            Some(todo) => *todo = stored,
            None => self.todos.insert(0, stored),
        }
    }

    /// Put the todo back where the store last said it was
    pub fn revert(&mut self, pending: &PendingMove) {
        if let Some(todo) = self.todos.iter_mut().find(|t| t.id == Some(pending.todo_id)) {
            todo.category_id = pending.confirmed_category;
            self.shift_count(pending.guessed_category, pending.confirmed_category);
        }
    }

    fn shift_count(&mut self, from: Option<i64>, to: Option<i64>) {
        if from == to {
            return;
        }
        for category in &mut self.categories {
            if from.is_some() && category.id == from {
                category.todo_count = (category.todo_count - 1).max(0);
            }
            if to.is_some() && category.id == to {
                category.todo_count += 1;
            }
        }
    }
}

/// Send a drag commit through the form transport and reconcile the board.
///
/// Transient storage failures are retried once; any failure leaves the todo
/// in its last confirmed category.
pub fn submit_commit(db: &Database, user_id: i64, board: &mut Board, commit: &Commit) -> MoveOutcome {
    let Some(pending) = board.apply_optimistic(commit) else {
        warn!(todo_id = commit.todo_id, "commit for a todo that is not on the board");
        return MoveOutcome::Ignored;
    };

    let body = commit.action().to_form();
    match retry_transient_once(|| handle_form(db, user_id, &body)) {
        Ok(ActionOutcome::Todo(stored)) => {
            info!(todo_id = commit.todo_id, "move confirmed");
            board.confirm(&pending, stored.clone());
            MoveOutcome::Moved(stored)
        }
        Ok(other) => {
            warn!(?other, "unexpected outcome for a move");
            board.revert(&pending);
            MoveOutcome::Failed(MOVE_FAILED_MESSAGE.to_string())
        }
        Err(err @ (ActionError::NotFound(_) | ActionError::Validation(_))) => {
            warn!(todo_id = commit.todo_id, error = %err, "move rejected");
            board.revert(&pending);
            MoveOutcome::Rejected(err.to_string())
        }
        Err(err) => {
            warn!(todo_id = commit.todo_id, error = %err, "move failed");
            board.revert(&pending);
            MoveOutcome::Failed(MOVE_FAILED_MESSAGE.to_string())
        }
    }
}
