use clap::{Parser, Subcommand};
use std::io::Write;
use thiserror::Error;

use crate::actions::{self, Action, ActionError, ActionOutcome, NULL_CATEGORY};
use crate::database::{Database, DatabaseError};
use crate::models::{CategoryTarget, Priority, Todo, TodoFilter};
use crate::reassign::{ReassignError, reassign_with_retry};
use crate::utils::parse_date;

#[derive(Parser)]
#[command(name = "todofold")]
#[command(about = "Todos in folders - drag them around in the terminal")]
#[command(version)]
pub struct Cli {
    /// Custom config file path
    #[arg(short, long)]
    pub config: Option<String>,

    /// Use development mode (uses separate dev config/database)
    #[arg(long)]
    pub dev: bool,

    /// Act as this local user instead of the one in the config file
    #[arg(short, long)]
    pub user: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Launch interactive TUI (default if no subcommand)
    Tui,
    /// Add a todo
    Add {
        /// Todo title
        title: String,
        /// Category ID to put the todo in
        #[arg(long)]
        category: Option<i64>,
        /// HIGH, MEDIUM or LOW
        #[arg(long)]
        priority: Option<Priority>,
        /// Deadline (YYYY-MM-DD)
        #[arg(long)]
        deadline: Option<String>,
    },
    /// List todos, newest first
    List {
        /// Only todos in this category
        #[arg(long)]
        category: Option<i64>,
        /// Only todos with this priority
        #[arg(long)]
        priority: Option<Priority>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// List categories with their todo counts
    Categories {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Create a category
    AddCategory {
        /// Category name
        name: String,
    },
    /// Move a todo into a category, or out of every category with `null`
    Move {
        /// Todo ID
        todo: i64,
        /// Category ID or `null`
        category: String,
    },
    /// Run a form-encoded action, e.g. `_action=updateCategory&todoId=3&categoryId=null`
    Submit {
        /// URL-encoded form body
        body: String,
    },
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DatabaseError),
    #[error("{0}")]
    ActionError(#[from] ActionError),
    #[error("{0}")]
    ReassignError(#[from] ReassignError),
    #[error("Failed to parse date: {0}")]
    DateParseError(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Failed to write output: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// `null` or a category ID
pub fn parse_category_arg(raw: &str) -> Result<CategoryTarget, CliError> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case(NULL_CATEGORY) {
        return Ok(CategoryTarget::None);
    }
    raw.parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .map(|id| CategoryTarget::Category { id })
        .ok_or_else(|| CliError::InvalidArgument(format!("expected a category ID or 'null', got '{}'", raw)))
}

fn format_todo(todo: &Todo) -> String {
    format!(
        "{:>5}  [{}] {:<6}  {:<10}  {:<8}  {}",
        todo.id.unwrap_or_default(),
        if todo.completed { "x" } else { " " },
        todo.priority.as_str(),
        todo.deadline.as_deref().unwrap_or("-"),
        todo.category_id.map(|id| id.to_string()).unwrap_or_else(|| "-".to_string()),
        todo.title
    )
}

/// Handle the add command
pub fn handle_add(
    db: &Database,
    user_id: i64,
    title: String,
    category: Option<i64>,
    priority: Option<Priority>,
    deadline: Option<String>,
    out: &mut impl Write,
) -> Result<(), CliError> {
    if let Some(ref deadline) = deadline {
        parse_date(deadline)
            .map_err(|e| CliError::DateParseError(format!("Invalid date format '{}': {}", deadline, e)))?;
    }

    let action = Action::Create {
        title,
        category_id: category,
        priority: priority.unwrap_or_default(),
        deadline,
    };
    if let ActionOutcome::Todo(todo) = actions::dispatch(db, user_id, &action)? {
        writeln!(out, "Todo created successfully (ID: {})", todo.id.unwrap_or_default())?;
    }
    Ok(())
}

/// Handle the list command
pub fn handle_list(
    db: &Database,
    user_id: i64,
    filter: TodoFilter,
    json: bool,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let todos = db.get_todos(user_id, filter)?;
    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(&todos)?)?;
        return Ok(());
    }

    writeln!(out, "{:>5}  [ ] {:<6}  {:<10}  {:<8}  TITLE", "ID", "PRIO", "DEADLINE", "CATEGORY")?;
    for todo in &todos {
        writeln!(out, "{}", format_todo(todo))?;
    }
    Ok(())
}

/// Handle the categories command
pub fn handle_categories(db: &Database, user_id: i64, json: bool, out: &mut impl Write) -> Result<(), CliError> {
    let categories = db.get_categories(user_id)?;
    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(&categories)?)?;
        return Ok(());
    }

    for category in &categories {
        writeln!(
            out,
            "{:>5}  {} ({})",
            category.id.unwrap_or_default(),
            category.name,
            category.todo_count
        )?;
    }
    Ok(())
}

/// Handle the add-category command
pub fn handle_add_category(db: &Database, user_id: i64, name: String, out: &mut impl Write) -> Result<(), CliError> {
    if let ActionOutcome::Category(category) = actions::dispatch(db, user_id, &Action::CreateCategory { name })? {
        writeln!(out, "Category created successfully (ID: {})", category.id.unwrap_or_default())?;
    }
    Ok(())
}

/// Handle the move command
pub fn handle_move(
    db: &Database,
    user_id: i64,
    todo_id: i64,
    category: &str,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let target = parse_category_arg(category)?;
    let todo = reassign_with_retry(db, user_id, todo_id, target)?;
    match todo.category_id {
        Some(id) => writeln!(out, "Moved todo {} to category {}", todo_id, id)?,
        None => writeln!(out, "Moved todo {} out of its category", todo_id)?,
    }
    Ok(())
}

/// Handle the submit command; prints the resulting row as JSON
pub fn handle_submit(db: &Database, user_id: i64, body: &str, out: &mut impl Write) -> Result<(), CliError> {
    match actions::handle_form(db, user_id, body)? {
        ActionOutcome::Todo(todo) => writeln!(out, "{}", serde_json::to_string_pretty(&todo)?)?,
        ActionOutcome::Category(category) => writeln!(out, "{}", serde_json::to_string_pretty(&category)?)?,
        ActionOutcome::Deleted => writeln!(out, "Deleted")?,
    }
    Ok(())
}
