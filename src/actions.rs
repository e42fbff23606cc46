//! Form-encoded actions and their dispatcher.
//!
//! Every mutation travels as an `application/x-www-form-urlencoded` body
//! whose `_action` field names the operation. The drag-and-drop commit is
//! `_action=updateCategory&todoId=<id>&categoryId=<id|null>`.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use thiserror::Error;
use tracing::{debug, info_span, warn};

use crate::database::{Database, DatabaseError};
use crate::models::{Category, CategoryTarget, Priority, Todo};
use crate::reassign::{ReassignError, reassign_todo};
use crate::utils::parse_date;

/// Characters left as-is when encoding form values
const FORM_VALUE: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.').remove(b'*');

/// Literal used on the wire for "no category"
pub const NULL_CATEGORY: &str = "null";

#[derive(Debug, Error)]
pub enum ActionError {
    #[error("Invalid request: {0}")]
    Validation(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("Storage temporarily unavailable: {0}")]
    TransientIo(DatabaseError),
    #[error("Storage error: {0}")]
    Storage(DatabaseError),
}

impl ActionError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ActionError::TransientIo(_))
    }
}

impl From<DatabaseError> for ActionError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound(what) => ActionError::NotFound(what),
            err if err.is_transient() => ActionError::TransientIo(err),
            err => ActionError::Storage(err),
        }
    }
}

impl From<ReassignError> for ActionError {
    fn from(err: ReassignError) -> Self {
        match err {
            ReassignError::NotFound(what) => ActionError::NotFound(what),
            ReassignError::TransientIo(err) => ActionError::TransientIo(err),
            ReassignError::Storage(err) => ActionError::Storage(err),
        }
    }
}

/// Decoded form fields in wire order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
    fields: Vec<(String, String)>,
}

impl FormData {
    pub fn parse(body: &str) -> Result<Self, ActionError> {
        let mut fields = Vec::new();
        for pair in body.split('&').filter(|p| !p.is_empty()) {
            let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
            fields.push((decode_component(name)?, decode_component(value)?));
        }
        Ok(Self { fields })
    }

    /// First value for `name`, if the field is present at all
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn encode(pairs: &[(&str, &str)]) -> String {
        pairs
            .iter()
            .map(|(name, value)| {
                format!(
                    "{}={}",
                    utf8_percent_encode(name, FORM_VALUE),
                    utf8_percent_encode(value, FORM_VALUE)
                )
            })
            .collect::<Vec<_>>()
            .join("&")
    }

    fn require(&self, name: &str) -> Result<&str, ActionError> {
        self.get(name)
            .ok_or_else(|| ActionError::Validation(format!("missing field '{}'", name)))
    }

    fn require_id(&self, name: &str) -> Result<i64, ActionError> {
        parse_id(name, self.require(name)?)
    }
}

fn decode_component(raw: &str) -> Result<String, ActionError> {
    let spaced = raw.replace('+', " ");
    percent_decode_str(&spaced)
        .decode_utf8()
        .map(|s| s.into_owned())
        .map_err(|_| ActionError::Validation(format!("field is not valid UTF-8: {}", raw)))
}

fn parse_id(name: &str, value: &str) -> Result<i64, ActionError> {
    value
        .trim()
        .parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| ActionError::Validation(format!("invalid {} '{}'", name, value)))
}

/// Decode the target of a category move.
///
/// The tagged `categoryTarget` JSON field wins when present. Otherwise
/// `categoryId` is required: the literal `null` clears the category, an
/// absent field is a validation error.
pub fn parse_category_target(form: &FormData) -> Result<CategoryTarget, ActionError> {
    if let Some(json) = form.get("categoryTarget") {
        let target: CategoryTarget = serde_json::from_str(json)
            .map_err(|e| ActionError::Validation(format!("invalid categoryTarget: {}", e)))?;
        if let Some(id) = target.category_id() {
            if id <= 0 {
                return Err(ActionError::Validation(format!("invalid categoryTarget id '{}'", id)));
            }
        }
        return Ok(target);
    }

    match form.require("categoryId")? {
        NULL_CATEGORY => Ok(CategoryTarget::None),
        raw => parse_id("categoryId", raw).map(|id| CategoryTarget::Category { id }),
    }
}

/// Optional category on create: empty, absent and `null` all mean none
fn parse_optional_category(form: &FormData) -> Result<Option<i64>, ActionError> {
    match form.get("categoryId").map(str::trim) {
        None | Some("") | Some(NULL_CATEGORY) => Ok(None),
        Some(raw) => parse_id("categoryId", raw).map(Some),
    }
}

fn parse_priority(form: &FormData) -> Result<Option<Priority>, ActionError> {
    match form.get("priority").map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => raw
            .parse::<Priority>()
            .map(Some)
            .map_err(|e| ActionError::Validation(e.to_string())),
    }
}

fn non_empty(name: &str, value: &str) -> Result<String, ActionError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ActionError::Validation(format!("{} must not be empty", name)));
    }
    Ok(value.to_string())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    CreateCategory { name: String },
    DeleteCategory { category_id: i64 },
    Create {
        title: String,
        category_id: Option<i64>,
        priority: Priority,
        deadline: Option<String>,
    },
    /// `completed` is the state the client saw; the stored flag becomes its negation
    Toggle { id: i64, completed: bool },
    Delete { id: i64 },
    UpdateCategory { todo_id: i64, target: CategoryTarget },
    UpdateTodoMemo { todo_id: i64, memo: String },
    UpdatePriority { id: i64, priority: Priority },
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::CreateCategory { .. } => "createCategory",
            Action::DeleteCategory { .. } => "deleteCategory",
            Action::Create { .. } => "create",
            Action::Toggle { .. } => "toggle",
            Action::Delete { .. } => "delete",
            Action::UpdateCategory { .. } => "updateCategory",
            Action::UpdateTodoMemo { .. } => "updateTodoMemo",
            Action::UpdatePriority { .. } => "updatePriority",
        }
    }

    pub fn from_form(form: &FormData) -> Result<Self, ActionError> {
        let action = match form.require("_action")? {
            "createCategory" => Action::CreateCategory {
                name: non_empty("categoryName", form.require("categoryName")?)?,
            },
            "deleteCategory" => Action::DeleteCategory {
                category_id: form.require_id("categoryId")?,
            },
            "create" => {
                let deadline = match form.get("deadline").map(str::trim) {
                    None | Some("") => None,
                    Some(raw) => {
                        parse_date(raw).map_err(|e| {
                            ActionError::Validation(format!("invalid deadline '{}': {}", raw, e))
                        })?;
                        Some(raw.to_string())
                    }
                };
                Action::Create {
                    title: non_empty("title", form.require("title")?)?,
                    category_id: parse_optional_category(form)?,
                    priority: parse_priority(form)?.unwrap_or_default(),
                    deadline,
                }
            }
            "toggle" => Action::Toggle {
                id: form.require_id("id")?,
                completed: form.get("completed") == Some("true"),
            },
            "delete" => Action::Delete {
                id: form.require_id("id")?,
            },
            "updateCategory" => Action::UpdateCategory {
                todo_id: form.require_id("todoId")?,
                target: parse_category_target(form)?,
            },
            "updateTodoMemo" => Action::UpdateTodoMemo {
                todo_id: form.require_id("todoId")?,
                memo: form.get("memo").unwrap_or_default().to_string(),
            },
            "updatePriority" => Action::UpdatePriority {
                id: form.require_id("id")?,
                priority: parse_priority(form)?
                    .ok_or_else(|| ActionError::Validation("missing field 'priority'".to_string()))?,
            },
            other => return Err(ActionError::Validation(format!("unknown action '{}'", other))),
        };
        Ok(action)
    }

    /// Encode as a form body that [`Action::from_form`] reads back
    pub fn to_form(&self) -> String {
        match self {
            Action::CreateCategory { name } => {
                FormData::encode(&[("_action", self.name()), ("categoryName", name.as_str())])
            }
            Action::DeleteCategory { category_id } => FormData::encode(&[
                ("_action", self.name()),
                ("categoryId", category_id.to_string().as_str()),
            ]),
            Action::Create { title, category_id, priority, deadline } => {
                let category = category_id.map(|id| id.to_string()).unwrap_or_default();
                FormData::encode(&[
                    ("_action", self.name()),
                    ("title", title.as_str()),
                    ("categoryId", category.as_str()),
                    ("priority", priority.as_str()),
                    ("deadline", deadline.as_deref().unwrap_or_default()),
                ])
            }
            Action::Toggle { id, completed } => FormData::encode(&[
                ("_action", self.name()),
                ("id", id.to_string().as_str()),
                ("completed", if *completed { "true" } else { "false" }),
            ]),
            Action::Delete { id } => {
                FormData::encode(&[("_action", self.name()), ("id", id.to_string().as_str())])
            }
            Action::UpdateCategory { todo_id, target } => FormData::encode(&[
                ("_action", self.name()),
                ("todoId", todo_id.to_string().as_str()),
                ("categoryId", target.to_string().as_str()),
            ]),
            Action::UpdateTodoMemo { todo_id, memo } => FormData::encode(&[
                ("_action", self.name()),
                ("todoId", todo_id.to_string().as_str()),
                ("memo", memo.as_str()),
            ]),
            Action::UpdatePriority { id, priority } => FormData::encode(&[
                ("_action", self.name()),
                ("id", id.to_string().as_str()),
                ("priority", priority.as_str()),
            ]),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    Todo(Todo),
    Category(Category),
    Deleted,
}

/// Parse a form body and run it for `user_id`
pub fn handle_form(db: &Database, user_id: i64, body: &str) -> Result<ActionOutcome, ActionError> {
    let form = FormData::parse(body)?;
    let action = Action::from_form(&form).inspect_err(|err| {
        warn!(user_id, error = %err, "rejected action form");
    })?;
    dispatch(db, user_id, &action)
}

pub fn dispatch(db: &Database, user_id: i64, action: &Action) -> Result<ActionOutcome, ActionError> {
    let span = info_span!("action", name = action.name(), user_id);
    let _guard = span.enter();
    debug!(?action, "dispatching");

    let outcome = match action {
        Action::CreateCategory { name } => {
            let id = db.insert_category(&Category::new(user_id, name.clone()))?;
            let category = db
                .find_category_by_id(id, user_id)?
                .ok_or_else(|| ActionError::NotFound(format!("Category {}", id)))?;
            ActionOutcome::Category(category)
        }
        Action::DeleteCategory { category_id } => {
            if !db.delete_category(*category_id, user_id)? {
                return Err(ActionError::NotFound(format!("Category {}", category_id)));
            }
            ActionOutcome::Deleted
        }
        Action::Create { title, category_id, priority, deadline } => {
            let mut todo = Todo::new(user_id, title.clone());
            todo.category_id = *category_id;
            todo.priority = *priority;
            todo.deadline = deadline.clone();
            let id = db.insert_todo(&todo)?;
            ActionOutcome::Todo(fetch_todo(db, id, user_id)?)
        }
        Action::Toggle { id, completed } => {
            if !db.set_completed(*id, user_id, !completed)? {
                return Err(ActionError::NotFound(format!("Todo {}", id)));
            }
            ActionOutcome::Todo(fetch_todo(db, *id, user_id)?)
        }
        Action::Delete { id } => {
            if !db.delete_todo(*id, user_id)? {
                return Err(ActionError::NotFound(format!("Todo {}", id)));
            }
            ActionOutcome::Deleted
        }
        Action::UpdateCategory { todo_id, target } => {
            ActionOutcome::Todo(reassign_todo(db, user_id, *todo_id, *target)?)
        }
        Action::UpdateTodoMemo { todo_id, memo } => {
            if !db.set_memo(*todo_id, user_id, memo)? {
                return Err(ActionError::NotFound(format!("Todo {}", todo_id)));
            }
            ActionOutcome::Todo(fetch_todo(db, *todo_id, user_id)?)
        }
        Action::UpdatePriority { id, priority } => {
            if !db.set_priority(*id, user_id, *priority)? {
                return Err(ActionError::NotFound(format!("Todo {}", id)));
            }
            ActionOutcome::Todo(fetch_todo(db, *id, user_id)?)
        }
    };
    Ok(outcome)
}

fn fetch_todo(db: &Database, id: i64, user_id: i64) -> Result<Todo, ActionError> {
    db.find_todo_by_id(id, user_id)?
        .ok_or_else(|| ActionError::NotFound(format!("Todo {}", id)))
}
