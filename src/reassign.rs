//! Moving a todo into a category, or out of every category.
//!
//! Validation and the write happen inside one `IMMEDIATE` transaction, and
//! the write itself re-checks ownership, so readers never see a todo whose
//! category belongs to somebody else.

use rusqlite::{Transaction, TransactionBehavior};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::actions::ActionError;
use crate::database::{Database, DatabaseError, Store};
use crate::models::{CategoryTarget, Todo};

#[derive(Debug, Error)]
pub enum ReassignError {
    /// The todo or the target category is missing or owned by another user.
    /// Both cases read the same so a todo's existence is never leaked.
    #[error("{0} not found")]
    NotFound(String),
    #[error("Storage temporarily unavailable: {0}")]
    TransientIo(DatabaseError),
    #[error("Storage error: {0}")]
    Storage(DatabaseError),
}

impl ReassignError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ReassignError::TransientIo(_))
    }
}

impl From<DatabaseError> for ReassignError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound(what) => ReassignError::NotFound(what),
            err if err.is_transient() => ReassignError::TransientIo(err),
            err => ReassignError::Storage(err),
        }
    }
}

impl From<rusqlite::Error> for ReassignError {
    fn from(err: rusqlite::Error) -> Self {
        DatabaseError::from(err).into()
    }
}

/// Put `todo_id` into `target` on behalf of `user_id` and return the stored todo.
///
/// Reassigning a todo to the category it is already in is a successful write.
pub fn reassign_todo(
    db: &Database,
    user_id: i64,
    todo_id: i64,
    target: CategoryTarget,
) -> Result<Todo, ReassignError> {
    let tx = Transaction::new_unchecked(db.conn(), TransactionBehavior::Immediate)?;
    let todo = apply_reassignment(&Store::new(&tx), user_id, todo_id, target)?;
    tx.commit()?;

    info!(user_id, todo_id, destination = %target, "todo reassigned");
    Ok(todo)
}

/// Same as [`reassign_todo`], retrying once when the storage was busy
pub fn reassign_with_retry(
    db: &Database,
    user_id: i64,
    todo_id: i64,
    target: CategoryTarget,
) -> Result<Todo, ReassignError> {
    retry_transient_once(|| reassign_todo(db, user_id, todo_id, target))
}

/// Errors that may go away when the same request is simply sent again
pub trait Transient: std::fmt::Display {
    fn is_transient(&self) -> bool;
}

impl Transient for ReassignError {
    fn is_transient(&self) -> bool {
        ReassignError::is_transient(self)
    }
}

impl Transient for ActionError {
    fn is_transient(&self) -> bool {
        ActionError::is_transient(self)
    }
}

/// Run `op`, and once more if the first attempt failed transiently
pub(crate) fn retry_transient_once<T, E: Transient>(
    mut op: impl FnMut() -> Result<T, E>,
) -> Result<T, E> {
    match op() {
        Err(err) if err.is_transient() => {
            warn!(error = %err, "transient storage failure, retrying once");
            op()
        }
        other => other,
    }
}

fn apply_reassignment(
    store: &Store<'_>,
    user_id: i64,
    todo_id: i64,
    target: CategoryTarget,
) -> Result<Todo, ReassignError> {
    let current = store
        .find_todo_by_id(todo_id, user_id)?
        .ok_or_else(|| ReassignError::NotFound(format!("Todo {}", todo_id)))?;

    if let Some(category_id) = target.category_id() {
        if store.find_category_by_id(category_id, user_id)?.is_none() {
            debug!(user_id, category_id, "target category not owned by requester");
            return Err(ReassignError::NotFound(format!("Category {}", category_id)));
        }
    }

    if current.category_id == target.category_id() {
        debug!(todo_id, "todo already in target category");
    }

    if store.update_todo_category(todo_id, user_id, target.category_id())? == 0 {
        return Err(ReassignError::NotFound(format!("Todo {}", todo_id)));
    }

    store
        .find_todo_by_id(todo_id, user_id)?
        .ok_or_else(|| ReassignError::NotFound(format!("Todo {}", todo_id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;
    use std::cell::Cell;
    use std::time::Duration;

    struct Fixture {
        db: Database,
        alice: i64,
        bob: i64,
        work: i64,
        home: i64,
        bobs_category: i64,
    }

    fn setup() -> Fixture {
        let db = Database::open_in_memory().expect("Failed to open test DB");
        let alice = db.ensure_user("alice").unwrap().id;
        let bob = db.ensure_user("bob").unwrap().id;
        let work = db.insert_category(&Category::new(alice, "Work".to_string())).unwrap();
        let home = db.insert_category(&Category::new(alice, "Home".to_string())).unwrap();
        let bobs_category = db.insert_category(&Category::new(bob, "Bob's".to_string())).unwrap();
        Fixture { db, alice, bob, work, home, bobs_category }
    }

    fn add_todo(db: &Database, user_id: i64, category_id: Option<i64>) -> i64 {
        let mut todo = Todo::new(user_id, "Task".to_string());
        todo.category_id = category_id;
        db.insert_todo(&todo).unwrap()
    }

    #[test]
    fn moves_todo_into_category() {
        let f = setup();
        let id = add_todo(&f.db, f.alice, None);

        let todo = reassign_todo(&f.db, f.alice, id, CategoryTarget::Category { id: f.work }).unwrap();
        assert_eq!(todo.category_id, Some(f.work));
        assert_eq!(f.db.find_todo_by_id(id, f.alice).unwrap().unwrap().category_id, Some(f.work));
    }

    #[test]
    fn moves_between_categories_and_out() {
        let f = setup();
        let id = add_todo(&f.db, f.alice, Some(f.work));

        let moved = reassign_todo(&f.db, f.alice, id, CategoryTarget::Category { id: f.home }).unwrap();
        assert_eq!(moved.category_id, Some(f.home));

        let cleared = reassign_todo(&f.db, f.alice, id, CategoryTarget::None).unwrap();
        assert_eq!(cleared.category_id, None);
    }

    #[test]
    fn repeating_a_move_is_idempotent() {
        let f = setup();
        let id = add_todo(&f.db, f.alice, None);
        let target = CategoryTarget::Category { id: f.work };

        let first = reassign_todo(&f.db, f.alice, id, target).unwrap();
        let second = reassign_todo(&f.db, f.alice, id, target).unwrap();
        assert_eq!(first.category_id, second.category_id);
        assert_eq!(first.title, second.title);
        assert_eq!(f.db.get_categories(f.alice).unwrap().iter().find(|c| c.id == Some(f.work)).unwrap().todo_count, 1);
    }

    #[test]
    fn uncategorizing_an_uncategorized_todo_succeeds() {
        let f = setup();
        let id = add_todo(&f.db, f.alice, None);

        let todo = reassign_todo(&f.db, f.alice, id, CategoryTarget::None).unwrap();
        assert_eq!(todo.category_id, None);
    }

    #[test]
    fn refreshes_updated_at() {
        let f = setup();
        let id = add_todo(&f.db, f.alice, None);
        f.db.conn()
            .execute("UPDATE todos SET updated_at = '2000-01-01 00:00:00' WHERE id = ?1", [id])
            .unwrap();

        let todo = reassign_todo(&f.db, f.alice, id, CategoryTarget::None).unwrap();
        assert_ne!(todo.updated_at, "2000-01-01 00:00:00");
    }

    #[test]
    fn foreign_todo_is_not_found_and_untouched() {
        let f = setup();
        let id = add_todo(&f.db, f.alice, Some(f.work));

        let err = reassign_todo(&f.db, f.bob, id, CategoryTarget::Category { id: f.bobs_category }).unwrap_err();
        assert!(matches!(err, ReassignError::NotFound(_)));
        assert_eq!(f.db.find_todo_by_id(id, f.alice).unwrap().unwrap().category_id, Some(f.work));
    }

    #[test]
    fn missing_and_foreign_todos_look_the_same() {
        let f = setup();
        let id = add_todo(&f.db, f.alice, None);

        let foreign = reassign_todo(&f.db, f.bob, id, CategoryTarget::None).unwrap_err();
        let missing = reassign_todo(&f.db, f.bob, id + 1000, CategoryTarget::None).unwrap_err();
        assert!(matches!(foreign, ReassignError::NotFound(_)));
        assert!(matches!(missing, ReassignError::NotFound(_)));
    }

    #[test]
    fn foreign_category_is_not_found_and_todo_untouched() {
        let f = setup();
        let id = add_todo(&f.db, f.alice, Some(f.work));

        let err = reassign_todo(&f.db, f.alice, id, CategoryTarget::Category { id: f.bobs_category }).unwrap_err();
        assert!(matches!(err, ReassignError::NotFound(_)));
        assert_eq!(f.db.find_todo_by_id(id, f.alice).unwrap().unwrap().category_id, Some(f.work));
    }

    #[test]
    fn deleted_target_category_is_not_found() {
        let f = setup();
        let id = add_todo(&f.db, f.alice, None);
        assert!(f.db.delete_category(f.home, f.alice).unwrap());

        let err = reassign_todo(&f.db, f.alice, id, CategoryTarget::Category { id: f.home }).unwrap_err();
        assert!(matches!(err, ReassignError::NotFound(_)));
        assert_eq!(f.db.find_todo_by_id(id, f.alice).unwrap().unwrap().category_id, None);
    }

    #[test]
    fn locked_database_is_transient() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("todos.db");
        let path = path.to_str().unwrap();

        let writer = Database::open(path, Duration::from_millis(0)).unwrap();
        let user = writer.ensure_user("alice").unwrap().id;
        let id = add_todo(&writer, user, None);

        let other = Database::open(path, Duration::from_millis(0)).unwrap();
        writer.conn().execute_batch("BEGIN IMMEDIATE").unwrap();

        let err = reassign_todo(&other, user, id, CategoryTarget::None).unwrap_err();
        assert!(err.is_transient(), "expected transient error, got {err:?}");

        writer.conn().execute_batch("COMMIT").unwrap();
        assert!(reassign_with_retry(&other, user, id, CategoryTarget::None).is_ok());
    }

    #[test]
    fn retries_transient_failures_exactly_once() {
        let calls = Cell::new(0);
        let result = retry_transient_once(|| {
            calls.set(calls.get() + 1);
            if calls.get() == 1 {
                Err(ReassignError::TransientIo(DatabaseError::DirectoryError("busy".to_string())))
            } else {
                Ok(calls.get())
            }
        });
        assert_eq!(result.unwrap(), 2);

        let calls = Cell::new(0);
        let result: Result<(), _> = retry_transient_once(|| {
            calls.set(calls.get() + 1);
            Err(ReassignError::TransientIo(DatabaseError::DirectoryError("busy".to_string())))
        });
        assert!(result.unwrap_err().is_transient());
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn action_errors_share_the_retry_policy() {
        let calls = Cell::new(0);
        let result: Result<(), _> = retry_transient_once(|| {
            calls.set(calls.get() + 1);
            Err(ActionError::TransientIo(DatabaseError::DirectoryError("busy".to_string())))
        });
        assert!(matches!(result, Err(ActionError::TransientIo(_))));
        assert_eq!(calls.get(), 2);

        let calls = Cell::new(0);
        let result: Result<(), _> = retry_transient_once(|| {
            calls.set(calls.get() + 1);
            Err(ActionError::Validation("bad".to_string()))
        });
        assert!(result.is_err());
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn not_found_is_not_retried() {
        let calls = Cell::new(0);
        let result: Result<(), _> = retry_transient_once(|| {
            calls.set(calls.get() + 1);
            Err(ReassignError::NotFound("Todo 1".to_string()))
        });
        assert!(result.is_err());
        assert_eq!(calls.get(), 1);
    }
}
