use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::utils::now_timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::High, Priority::Medium, Priority::Low];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "HIGH",
            Priority::Medium => "MEDIUM",
            Priority::Low => "LOW",
        }
    }

    /// Next priority in HIGH -> MEDIUM -> LOW -> HIGH order
    pub fn cycle(self) -> Self {
        match self {
            Priority::High => Priority::Medium,
            Priority::Medium => Priority::Low,
            Priority::Low => Priority::High,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown priority '{0}' (expected HIGH, MEDIUM or LOW)")]
pub struct UnknownPriority(pub String);

impl FromStr for Priority {
    type Err = UnknownPriority;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "HIGH" => Ok(Priority::High),
            "MEDIUM" => Ok(Priority::Medium),
            "LOW" => Ok(Priority::Low),
            _ => Err(UnknownPriority(s.to_string())),
        }
    }
}

/// Where a todo should live after a move.
///
/// `None` is the explicit "remove from any category" outcome; it is never
/// the same thing as a missing value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CategoryTarget {
    None,
    Category { id: i64 },
}

impl CategoryTarget {
    pub fn category_id(&self) -> Option<i64> {
        match self {
            CategoryTarget::None => None,
            CategoryTarget::Category { id } => Some(*id),
        }
    }
}

impl From<Option<i64>> for CategoryTarget {
    fn from(id: Option<i64>) -> Self {
        match id {
            Some(id) => CategoryTarget::Category { id },
            None => CategoryTarget::None,
        }
    }
}

impl fmt::Display for CategoryTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategoryTarget::None => f.write_str("null"),
            CategoryTarget::Category { id } => write!(f, "{}", id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Todo {
    pub id: Option<i64>,
    pub user_id: i64,
    pub category_id: Option<i64>,
    pub title: String,
    pub completed: bool,
    pub priority: Priority,
    pub deadline: Option<String>, // YYYY-MM-DD
    pub memo: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Todo {
    pub fn new(user_id: i64, title: String) -> Self {
        let now = now_timestamp();
        Self {
            id: None,
            user_id,
            category_id: None,
            title,
            completed: false,
            priority: Priority::default(),
            deadline: None,
            memo: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: Option<i64>,
    pub user_id: i64,
    pub name: String,
    /// Number of todos in this category, computed when read
    #[serde(default)]
    pub todo_count: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl Category {
    pub fn new(user_id: i64, name: String) -> Self {
        let now = now_timestamp();
        Self {
            id: None,
            user_id,
            name,
            todo_count: 0,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

/// Query-string style filters for listing todos
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TodoFilter {
    pub category_id: Option<i64>,
    pub priority: Option<Priority>,
}
