use rusqlite::{Connection, ErrorCode, OptionalExtension};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::models::{Category, Priority, Todo, TodoFilter, User};
use crate::utils::now_timestamp;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    SqliteError(#[from] rusqlite::Error),
    #[error("Failed to create database directory: {0}")]
    DirectoryError(String),
    #[error("{0} not found")]
    NotFound(String),
}

impl DatabaseError {
    /// Whether the failure comes from the database being temporarily
    /// unavailable (locked by another writer, unreadable file) rather than
    /// from the request itself.
    pub fn is_transient(&self) -> bool {
        match self {
            DatabaseError::SqliteError(rusqlite::Error::SqliteFailure(err, _)) => matches!(
                err.code,
                ErrorCode::DatabaseBusy
                    | ErrorCode::DatabaseLocked
                    | ErrorCode::CannotOpen
                    | ErrorCode::SystemIoFailure
            ),
            DatabaseError::DirectoryError(_) => true,
            _ => false,
        }
    }
}

const TODO_COLUMNS: &str =
    "id, user_id, category_id, title, completed, priority, deadline, memo, created_at, updated_at";

/// Row-level access to todos and categories, always scoped to one owner.
///
/// Works on a plain connection as well as on an open transaction, so the
/// same queries back both one-off reads and the reassignment unit of work.
pub struct Store<'c> {
    conn: &'c Connection,
}

impl<'c> Store<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    pub fn find_todo_by_id(&self, id: i64, user_id: i64) -> Result<Option<Todo>, DatabaseError> {
        let sql = format!("SELECT {TODO_COLUMNS} FROM todos WHERE id = ?1 AND user_id = ?2");
        let todo = self
            .conn
            .query_row(&sql, rusqlite::params![id, user_id], row_to_todo)
            .optional()?;
        Ok(todo)
    }

    pub fn find_category_by_id(&self, id: i64, user_id: i64) -> Result<Option<Category>, DatabaseError> {
        let category = self
            .conn
            .query_row(
                "SELECT c.id, c.user_id, c.name, c.created_at, c.updated_at,
                        (SELECT COUNT(*) FROM todos t WHERE t.category_id = c.id)
                 FROM categories c WHERE c.id = ?1 AND c.user_id = ?2",
                rusqlite::params![id, user_id],
                row_to_category,
            )
            .optional()?;
        Ok(category)
    }

    /// Point a todo at a category (or clear it), returning the number of rows written.
    ///
    /// The write re-checks ownership of both rows, so a category that is not
    /// owned by `user_id` can never be stored on the todo.
    pub fn update_todo_category(
        &self,
        id: i64,
        user_id: i64,
        category_id: Option<i64>,
    ) -> Result<usize, DatabaseError> {
        let changed = self.conn.execute(
            "UPDATE todos SET category_id = ?1, updated_at = ?2
             WHERE id = ?3 AND user_id = ?4
               AND (?1 IS NULL OR EXISTS (SELECT 1 FROM categories WHERE id = ?1 AND user_id = ?4))",
            rusqlite::params![category_id, now_timestamp(), id, user_id],
        )?;
        Ok(changed)
    }
}

pub struct Database {
    conn: Connection,
}

impl Database {
    pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

    /// Open (or create) the database at `path`, waiting at most `busy_timeout`
    /// for other writers before giving up with a busy error.
    pub fn open(path: &str, busy_timeout: Duration) -> Result<Self, DatabaseError> {
        let db_path = PathBuf::from(path);

        // Create parent directory if it doesn't exist
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| DatabaseError::DirectoryError(e.to_string()))?;
            }
        }

        let conn = Connection::open(&db_path)?;
        Self::from_connection(conn, busy_timeout)
    }

    /// In-memory database, used by tests and dry runs
    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        Self::from_connection(Connection::open_in_memory()?, Self::DEFAULT_BUSY_TIMEOUT)
    }

    fn from_connection(conn: Connection, busy_timeout: Duration) -> Result<Self, DatabaseError> {
        conn.busy_timeout(busy_timeout)?;
        conn.pragma_update(None, "foreign_keys", true)?;
        let db = Database { conn };
        db.initialize_schema()?;
        Ok(db)
    }

    /// Initialize the database schema (tables and indexes)
    fn initialize_schema(&self) -> Result<(), DatabaseError> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS users (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                name            TEXT NOT NULL UNIQUE,
                created_at      TEXT NOT NULL
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS categories (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id         INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                name            TEXT NOT NULL CHECK (length(name) > 0),
                created_at      TEXT NOT NULL,
                updated_at      TEXT NOT NULL
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS todos (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id         INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                category_id     INTEGER REFERENCES categories(id) ON DELETE SET NULL,
                title           TEXT NOT NULL CHECK (length(title) > 0),
                completed       INTEGER NOT NULL DEFAULT 0,
                priority        TEXT NOT NULL DEFAULT 'MEDIUM'
                                CHECK (priority IN ('HIGH', 'MEDIUM', 'LOW')),
                deadline        TEXT,
                memo            TEXT,
                created_at      TEXT NOT NULL,
                updated_at      TEXT NOT NULL
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_categories_user_id ON categories(user_id)",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_todos_user_category ON todos(user_id, category_id)",
            [],
        )?;

        Ok(())
    }

    /// Get a reference to the underlying connection
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Owner-scoped row access on the plain connection
    pub fn store(&self) -> Store<'_> {
        Store::new(&self.conn)
    }

    /// Look up a user by name, creating it on first use
    pub fn ensure_user(&self, name: &str) -> Result<User, DatabaseError> {
        self.conn.execute(
            "INSERT OR IGNORE INTO users (name, created_at) VALUES (?1, ?2)",
            rusqlite::params![name, now_timestamp()],
        )?;
        let user = self.conn.query_row(
            "SELECT id, name, created_at FROM users WHERE name = ?1",
            rusqlite::params![name],
            |row| {
                Ok(User {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    created_at: row.get(2)?,
                })
            },
        )?;
        Ok(user)
    }

    /// Insert a category and return its ID
    pub fn insert_category(&self, category: &Category) -> Result<i64, DatabaseError> {
        self.conn.execute(
            "INSERT INTO categories (user_id, name, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![
                category.user_id,
                category.name,
                category.created_at,
                category.updated_at
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// All categories of a user with their todo counts, ordered by name
    pub fn get_categories(&self, user_id: i64) -> Result<Vec<Category>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT c.id, c.user_id, c.name, c.created_at, c.updated_at,
                    (SELECT COUNT(*) FROM todos t WHERE t.category_id = c.id)
             FROM categories c WHERE c.user_id = ?1
             ORDER BY c.name ASC, c.id ASC",
        )?;
        let categories = stmt
            .query_map(rusqlite::params![user_id], row_to_category)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(categories)
    }

    pub fn find_category_by_id(&self, id: i64, user_id: i64) -> Result<Option<Category>, DatabaseError> {
        self.store().find_category_by_id(id, user_id)
    }

    /// Delete a category owned by `user_id`
    /// Todos that were in it become uncategorized. Returns false when nothing matched.
    pub fn delete_category(&self, id: i64, user_id: i64) -> Result<bool, DatabaseError> {
        let tx = self.conn.unchecked_transaction()?;

        tx.execute(
            "UPDATE todos SET category_id = NULL, updated_at = ?1
             WHERE category_id = ?2 AND user_id = ?3",
            rusqlite::params![now_timestamp(), id, user_id],
        )?;

        let deleted = tx.execute(
            "DELETE FROM categories WHERE id = ?1 AND user_id = ?2",
            rusqlite::params![id, user_id],
        )?;

        tx.commit()?;
        Ok(deleted > 0)
    }

    /// Insert a todo and return its ID
    /// Fails with `NotFound` when the todo names a category its owner does not own.
    pub fn insert_todo(&self, todo: &Todo) -> Result<i64, DatabaseError> {
        let inserted = self.conn.execute(
            "INSERT INTO todos (user_id, category_id, title, completed, priority, deadline, memo, created_at, updated_at)
             SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9
             WHERE ?2 IS NULL OR EXISTS (SELECT 1 FROM categories WHERE id = ?2 AND user_id = ?1)",
            rusqlite::params![
                todo.user_id,
                todo.category_id,
                todo.title,
                if todo.completed { 1 } else { 0 },
                todo.priority.as_str(),
                todo.deadline,
                todo.memo,
                todo.created_at,
                todo.updated_at
            ],
        )?;
        if inserted == 0 {
            return Err(DatabaseError::NotFound(format!(
                "Category {}",
                todo.category_id.unwrap_or_default()
            )));
        }
        Ok(self.conn.last_insert_rowid())
    }

    /// Todos of a user, newest first, optionally narrowed by category and priority
    pub fn get_todos(&self, user_id: i64, filter: TodoFilter) -> Result<Vec<Todo>, DatabaseError> {
        let sql = format!(
            "SELECT {TODO_COLUMNS} FROM todos
             WHERE user_id = ?1
               AND (?2 IS NULL OR category_id = ?2)
               AND (?3 IS NULL OR priority = ?3)
             ORDER BY created_at DESC, id DESC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let todos = stmt
            .query_map(
                rusqlite::params![user_id, filter.category_id, filter.priority.map(|p| p.as_str())],
                row_to_todo,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(todos)
    }

    pub fn find_todo_by_id(&self, id: i64, user_id: i64) -> Result<Option<Todo>, DatabaseError> {
        self.store().find_todo_by_id(id, user_id)
    }

    /// Set the completion flag. Returns false when the todo is not the user's.
    pub fn set_completed(&self, id: i64, user_id: i64, completed: bool) -> Result<bool, DatabaseError> {
        let changed = self.conn.execute(
            "UPDATE todos SET completed = ?1, updated_at = ?2 WHERE id = ?3 AND user_id = ?4",
            rusqlite::params![if completed { 1 } else { 0 }, now_timestamp(), id, user_id],
        )?;
        Ok(changed > 0)
    }

    pub fn set_priority(&self, id: i64, user_id: i64, priority: Priority) -> Result<bool, DatabaseError> {
        let changed = self.conn.execute(
            "UPDATE todos SET priority = ?1, updated_at = ?2 WHERE id = ?3 AND user_id = ?4",
            rusqlite::params![priority.as_str(), now_timestamp(), id, user_id],
        )?;
        Ok(changed > 0)
    }

    /// Replace the memo; an empty memo is stored as NULL
    pub fn set_memo(&self, id: i64, user_id: i64, memo: &str) -> Result<bool, DatabaseError> {
        let memo = if memo.trim().is_empty() { None } else { Some(memo) };
        let changed = self.conn.execute(
            "UPDATE todos SET memo = ?1, updated_at = ?2 WHERE id = ?3 AND user_id = ?4",
            rusqlite::params![memo, now_timestamp(), id, user_id],
        )?;
        Ok(changed > 0)
    }

    pub fn delete_todo(&self, id: i64, user_id: i64) -> Result<bool, DatabaseError> {
        let deleted = self.conn.execute(
            "DELETE FROM todos WHERE id = ?1 AND user_id = ?2",
            rusqlite::params![id, user_id],
        )?;
        Ok(deleted > 0)
    }
}

/// Helper function to map a row to a Todo
fn row_to_todo(row: &rusqlite::Row) -> Result<Todo, rusqlite::Error> {
    let priority: String = row.get(5)?;
    let priority = priority.parse::<Priority>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(Todo {
        id: Some(row.get(0)?),
        user_id: row.get(1)?,
        category_id: row.get(2)?,
        title: row.get(3)?,
        completed: row.get::<_, i64>(4)? != 0,
        priority,
        deadline: row.get(6)?,
        memo: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

/// Helper function to map a row to a Category (with its todo count in column 5)
fn row_to_category(row: &rusqlite::Row) -> Result<Category, rusqlite::Error> {
    Ok(Category {
        id: Some(row.get(0)?),
        user_id: row.get(1)?,
        name: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
        todo_count: row.get(5)?,
    })
}
