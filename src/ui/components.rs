//! Shared rendering helpers used by the dashboard views.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Color,
};

use crate::table::StyleHint;
use crate::theme::Theme;

/// Resolve a table style hint to a theme color.
pub fn hint_color(theme: &Theme, hint: StyleHint) -> Color {
    match hint {
        StyleHint::Normal => theme.text,
        StyleHint::Strong => theme.text,
        StyleHint::Dim => theme.text_dim,
        StyleHint::Accent => theme.accent,
        StyleHint::Success => theme.success,
        StyleHint::Warning => theme.warning,
        StyleHint::Danger => theme.danger,
        StyleHint::Info => theme.header,
    }
}

/// A fixed-width text gauge like `████████░░░░` for the storage card.
pub fn usage_bar(percent: u8, width: usize) -> String {
    let filled = (percent as usize * width) / 100;
    let mut bar = String::with_capacity(width * 3);
    for i in 0..width {
        bar.push(if i < filled { '█' } else { '░' });
    }
    bar
}

pub fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_bar_fills_proportionally() {
        assert_eq!(usage_bar(0, 4), "░░░░");
        assert_eq!(usage_bar(50, 4), "██░░");
        assert_eq!(usage_bar(100, 4), "████");
    }

    #[test]
    fn centered_rect_stays_inside_parent() {
        let parent = Rect::new(0, 0, 100, 40);
        let popup = centered_rect(50, 50, parent);
        assert!(popup.width <= parent.width);
        assert!(popup.x >= parent.x && popup.right() <= parent.right());
    }
}
