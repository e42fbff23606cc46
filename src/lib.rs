pub mod actions;
pub mod cli;
pub mod config;
pub mod database;
pub mod drag;
pub mod logging;
pub mod models;
pub mod reassign;
pub mod reconcile;
pub mod tui;
pub mod utils;

pub use config::Config;
pub use database::Database;
pub use drag::{Commit, DragTracker, DropRegions, DropTarget};
pub use models::{Category, CategoryTarget, Priority, Todo, User};
pub use reassign::{ReassignError, reassign_todo, reassign_with_retry};
pub use utils::Profile;
