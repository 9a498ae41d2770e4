//! UI palette, optionally overridden by a `theme.conf` in the filedeck
//! config directory (kitty-style `key #hexcolor` lines).

use ratatui::style::Color;
use std::collections::HashMap;
use std::fs;

#[derive(Debug, Clone)]
pub struct Theme {
    pub accent: Color,      // active borders, highlights
    pub danger: Color,      // destructive actions, errors
    pub success: Color,     // success toasts, shared markers
    pub warning: Color,     // status messages
    pub text: Color,        // primary text
    pub text_dim: Color,    // secondary text
    pub bg_selected: Color, // cursor row background
    pub inactive: Color,    // inactive borders
    pub header: Color,      // table/section headers
}

impl Default for Theme {
    fn default() -> Self {
        // Catppuccin-inspired fallback
        Self {
            accent: Color::Rgb(137, 180, 250),
            danger: Color::Rgb(243, 139, 168),
            success: Color::Rgb(166, 218, 149),
            warning: Color::Rgb(250, 179, 135),
            text: Color::Rgb(205, 214, 244),
            text_dim: Color::Rgb(147, 153, 178),
            bg_selected: Color::Rgb(69, 71, 90),
            inactive: Color::Rgb(88, 91, 112),
            header: Color::Rgb(203, 166, 247),
        }
    }
}

impl Theme {
    pub fn load() -> Self {
        Self::load_user_theme().unwrap_or_default()
    }

    /// Load colors from `~/.config/filedeck/theme.conf` if present.
    fn load_user_theme() -> Option<Self> {
        let path = dirs::config_dir()?.join("filedeck/theme.conf");
        let content = fs::read_to_string(&path).ok()?;
        let colors = parse_palette(&content);
        if colors.is_empty() {
            return None;
        }

        let fallback = Theme::default();
        let pick = |keys: &[&str], fallback: Color| {
            keys.iter()
                .find_map(|k| colors.get(*k))
                .copied()
                .unwrap_or(fallback)
        };

        Some(Self {
            accent: pick(&["accent", "color4"], fallback.accent),
            danger: pick(&["danger", "color1"], fallback.danger),
            success: pick(&["success", "color2"], fallback.success),
            warning: pick(&["warning", "color3"], fallback.warning),
            text: pick(&["text", "foreground"], fallback.text),
            text_dim: pick(&["text_dim", "color8"], fallback.text_dim),
            bg_selected: pick(&["bg_selected", "selection_background"], fallback.bg_selected),
            inactive: pick(&["inactive", "color0"], fallback.inactive),
            header: pick(&["header", "color5"], fallback.header),
        })
    }
}

/// Parse `key value` lines where value is a hex color; comments and
/// non-color lines are skipped.
fn parse_palette(content: &str) -> HashMap<String, Color> {
    let mut colors = HashMap::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut parts = line.splitn(2, char::is_whitespace);
        if let (Some(key), Some(value)) = (parts.next(), parts.next()) {
            if let Some(color) = parse_hex_color(value.trim()) {
                colors.insert(key.to_string(), color);
            }
        }
    }
    colors
}

/// Parse a hex color string (#RRGGBB or #RGB)
fn parse_hex_color(s: &str) -> Option<Color> {
    let s = s.trim().trim_start_matches('#');
    if s.len() == 6 {
        let r = u8::from_str_radix(&s[0..2], 16).ok()?;
        let g = u8::from_str_radix(&s[2..4], 16).ok()?;
        let b = u8::from_str_radix(&s[4..6], 16).ok()?;
        Some(Color::Rgb(r, g, b))
    } else if s.len() == 3 {
        let r = u8::from_str_radix(&s[0..1], 16).ok()? * 17;
        let g = u8::from_str_radix(&s[1..2], 16).ok()? * 17;
        let b = u8::from_str_radix(&s[2..3], 16).ok()? * 17;
        Some(Color::Rgb(r, g, b))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_colors_parse_long_and_short() {
        assert_eq!(parse_hex_color("#ff0000"), Some(Color::Rgb(255, 0, 0)));
        assert_eq!(parse_hex_color("0f0"), Some(Color::Rgb(0, 255, 0)));
        assert_eq!(parse_hex_color("#nope"), None);
    }

    #[test]
    fn palette_skips_comments_and_garbage() {
        let conf = "# a comment\naccent #89b4fa\nbroken line here\ntext #fff\n";
        let colors = parse_palette(conf);
        assert_eq!(colors.len(), 2);
        assert_eq!(colors["accent"], Color::Rgb(0x89, 0xb4, 0xfa));
    }
}
