pub mod color;
pub mod confirm_delete;
pub mod drag_overlay;
pub mod filters_box;
pub mod folders;
pub mod help;
pub mod input_prompt;
pub mod status_bar;
pub mod todo_list;
