use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Flex, Layout, Rect};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use crate::Config;
use crate::tui::widgets::color::Palette;
use crate::utils::format_key_binding_for_display;

pub fn render_help(f: &mut Frame, area: Rect, config: &Config, palette: &Palette) {
    // Calculate popup area (60% width, 70% height, centered)
    let popup_area = popup_area(area, 60, 70);

    // Clear the background first - this prevents content from showing through
    f.render_widget(Clear, popup_area);

    let paragraph = Paragraph::new(build_help_text(config))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Help - Key Bindings")
                .title_alignment(Alignment::Center)
                .style(palette.base),
        )
        .style(palette.base)
        .wrap(ratatui::widgets::Wrap { trim: true });

    f.render_widget(paragraph, popup_area);
}

/// Helper function to create a centered rect using up certain percentage of the available rect
/// Based on ratatui popup example: https://ratatui.rs/examples/apps/popup/
pub fn popup_area(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let vertical = Layout::vertical([Constraint::Percentage(percent_y)]).flex(Flex::Center);
    let horizontal = Layout::horizontal([Constraint::Percentage(percent_x)]).flex(Flex::Center);
    let [area] = vertical.areas(area);
    let [area] = horizontal.areas(area);
    area
}

fn build_help_text(config: &Config) -> String {
    let keys = &config.key_bindings;
    let key = |binding: &str| format_key_binding_for_display(binding);
    let mut text = String::new();

    text.push_str("Mouse:\n");
    text.push_str("  Drag a todo by its ⠿ handle onto a folder to move it there\n");
    text.push_str("  Drop it on the back row or on empty space to take it out of its folder\n");
    text.push_str("  Click a folder to open it, click the back row to return\n");
    text.push_str("  Esc while dragging: cancel the move\n");
    text.push('\n');

    text.push_str("Navigation:\n");
    text.push_str(&format!("  {} / {}: Move selection\n", key(&keys.list_up), key(&keys.list_down)));
    text.push_str(&format!("  {}: Switch between folders and todos\n", key(&keys.switch_pane)));
    text.push_str(&format!("  {}: Open selected folder\n", key(&keys.open)));
    text.push_str(&format!("  {}: Back to all todos\n", key(&keys.back)));
    text.push_str(&format!("  {}: Cycle priority filter\n", key(&keys.filter_priority)));
    text.push('\n');

    text.push_str("Actions:\n");
    text.push_str(&format!("  {}: New todo (in the open folder)\n", key(&keys.new_todo)));
    text.push_str(&format!("  {}: New folder\n", key(&keys.new_category)));
    text.push_str(&format!("  {}: Toggle done\n", key(&keys.toggle_completed)));
    text.push_str(&format!("  {}: Cycle priority\n", key(&keys.cycle_priority)));
    text.push_str(&format!("  {}: Edit memo\n", key(&keys.edit_memo)));
    text.push_str(&format!("  {}: Delete selected todo or folder\n", key(&keys.delete)));
    text.push('\n');

    text.push_str("General:\n");
    text.push_str(&format!("  {}: Next theme\n", key(&keys.cycle_theme)));
    text.push_str(&format!("  {}: Show/hide help\n", key(&keys.help)));
    text.push_str(&format!("  {}: Quit\n", key(&keys.quit)));

    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn popup_is_centered() {
        let area = popup_area(Rect::new(0, 0, 100, 50), 60, 70);
        assert_eq!((area.width, area.height), (60, 35));
        assert_eq!(area.x, 20);
    }

    #[test]
    fn help_lists_configured_keys() {
        let mut config = Config::default();
        config.key_bindings.new_todo = "a".to_string();
        let text = build_help_text(&config);
        assert!(text.contains("a: New todo"));
        assert!(text.contains("Drag a todo"));
    }
}
