use thiserror::Error;

use crate::actions::ActionError;
use crate::config::ConfigError;
use crate::database::DatabaseError;

#[derive(Debug, Error)]
pub enum TuiError {
    #[error("IO/Terminal error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Database error: {0}")]
    DatabaseError(#[from] DatabaseError),

    #[error("Action failed: {0}")]
    ActionError(#[from] ActionError),

    #[error("Configuration error: {0}")]
    ConfigError(#[from] ConfigError),

    #[error("Key binding error: {0}")]
    KeyBindingError(String),

    #[error("Render error: {0}")]
    RenderError(String),
}
