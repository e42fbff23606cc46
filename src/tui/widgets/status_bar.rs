use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::widgets::Paragraph;

use crate::tui::widgets::color::Palette;

const SEPARATOR: &str = " • ";
const ELLIPSIS: &str = "...";

/// Join as many hints as fit in `max_width`, ending in an ellipsis when some are dropped
pub(crate) fn fit_hints(key_hints: &[String], max_width: usize) -> String {
    let mut hints_text = String::new();
    for hint in key_hints {
        let current_len = hints_text.chars().count();
        let would_be_len = if hints_text.is_empty() {
            hint.chars().count()
        } else {
            current_len + SEPARATOR.chars().count() + hint.chars().count()
        };

        if would_be_len > max_width {
            if hints_text.is_empty() {
                // Even the first hint is too long
                hints_text = hint.chars().take(max_width.saturating_sub(ELLIPSIS.len())).collect();
            } else if current_len + ELLIPSIS.len() > max_width {
                hints_text = hints_text.chars().take(max_width.saturating_sub(ELLIPSIS.len())).collect();
            }
            hints_text.push_str(ELLIPSIS);
            break;
        }

        if !hints_text.is_empty() {
            hints_text.push_str(SEPARATOR);
        }
        hints_text.push_str(hint);
    }
    hints_text
}

pub fn render_status_bar(f: &mut Frame, area: Rect, message: Option<&str>, key_hints: &[String], palette: &Palette) {
    let max_width = usize::from(area.width);
    let (content, style) = match message {
        Some(msg) if msg.chars().count() > max_width => (
            msg.chars().take(max_width.saturating_sub(ELLIPSIS.len())).collect::<String>() + ELLIPSIS,
            palette.highlight,
        ),
        Some(msg) => (msg.to_string(), palette.highlight),
        None => (fit_hints(key_hints, max_width), palette.base),
    };

    f.render_widget(Paragraph::new(content).style(style), area);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hints(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn all_hints_fit() {
        assert_eq!(fit_hints(&hints(&["q: Quit", "n: New"]), 40), "q: Quit • n: New");
    }

    #[test]
    fn overflow_ends_with_ellipsis() {
        assert_eq!(fit_hints(&hints(&["q: Quit", "n: New todo"]), 12), "q: Quit...");
        assert_eq!(fit_hints(&hints(&["a very long hint"]), 8), "a ver...");
    }
}
