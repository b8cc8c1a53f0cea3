use crossterm::style::Color;
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::path::PathBuf;
use tracing::warn;

/// Colour names as written in `theme.toml`. Every key is optional so the
/// embedded file and the user override share one shape.
#[derive(Debug, Default, Deserialize)]
struct ThemeLayer {
    enabled: Option<String>,
    disabled: Option<String>,
    conflict: Option<String>,
    heading: Option<String>,
    detail: Option<String>,
    success: Option<String>,
    error: Option<String>,
}

impl ThemeLayer {
    fn over(self, base: ThemeLayer) -> ThemeLayer {
        ThemeLayer {
            enabled: self.enabled.or(base.enabled),
            disabled: self.disabled.or(base.disabled),
            conflict: self.conflict.or(base.conflict),
            heading: self.heading.or(base.heading),
            detail: self.detail.or(base.detail),
            success: self.success.or(base.success),
            error: self.error.or(base.error),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Theme {
    pub enabled: Color,
    pub disabled: Color,
    pub conflict: Color,
    pub heading: Color,
    pub detail: Color,
    pub success: Color,
    pub error: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            enabled: Color::Green,
            disabled: Color::Red,
            conflict: Color::Yellow,
            heading: Color::Blue,
            detail: Color::Grey,
            success: Color::Green,
            error: Color::Red,
        }
    }
}

pub static THEME: Lazy<Theme> = Lazy::new(|| {
    let embedded: ThemeLayer = toml::from_str(include_str!("theme.toml")).unwrap_or_default();
    let layer = match user_layer() {
        Some(user) => user.over(embedded),
        None => embedded,
    };
    build_theme(layer)
});

fn user_layer() -> Option<ThemeLayer> {
    let path = PathBuf::from(std::env::var_os("HOME")?)
        .join(".ccmcp")
        .join("theme.toml");
    let content = std::fs::read_to_string(&path).ok()?;
    match toml::from_str(&content) {
        Ok(layer) => Some(layer),
        Err(e) => {
            warn!(path = %path.display(), reason = %e, "ignoring unreadable theme override");
            None
        }
    }
}

fn build_theme(layer: ThemeLayer) -> Theme {
    let base = Theme::default();
    let pick = |name: Option<String>, fallback: Color| {
        name.as_deref().and_then(parse_color).unwrap_or(fallback)
    };
    Theme {
        enabled: pick(layer.enabled, base.enabled),
        disabled: pick(layer.disabled, base.disabled),
        conflict: pick(layer.conflict, base.conflict),
        heading: pick(layer.heading, base.heading),
        detail: pick(layer.detail, base.detail),
        success: pick(layer.success, base.success),
        error: pick(layer.error, base.error),
    }
}

/// Accepts the basic terminal colour names and `#rrggbb`.
fn parse_color(name: &str) -> Option<Color> {
    let name = name.trim().to_ascii_lowercase();
    if let Some(hex) = name.strip_prefix('#') {
        if hex.len() != 6 {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
        return Some(Color::Rgb {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
        });
    }
    let color = match name.as_str() {
        "green" => Color::Green,
        "red" => Color::Red,
        "yellow" => Color::Yellow,
        "blue" => Color::Blue,
        "magenta" => Color::Magenta,
        "cyan" => Color::Cyan,
        "white" => Color::White,
        "grey" | "gray" => Color::Grey,
        _ => return None,
    };
    Some(color)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_theme_parses() {
        let layer: ThemeLayer = toml::from_str(include_str!("theme.toml")).expect("theme.toml");
        let theme = build_theme(layer);
        assert_eq!(theme.enabled, Color::Green);
        assert_eq!(theme.disabled, Color::Red);
        assert_eq!(theme.detail, Color::Grey);
    }

    #[test]
    fn user_layer_replaces_only_given_keys() {
        let embedded: ThemeLayer = toml::from_str(include_str!("theme.toml")).expect("theme.toml");
        let user: ThemeLayer = toml::from_str("heading = \"Magenta\"").expect("override");
        let theme = build_theme(user.over(embedded));
        assert_eq!(theme.heading, Color::Magenta);
        assert_eq!(theme.conflict, Color::Yellow);
    }

    #[test]
    fn unknown_names_keep_the_default_colour() {
        let layer: ThemeLayer =
            toml::from_str("enabled = \"chartreuse\"\nheading = \"#12ab\"").expect("layer");
        let theme = build_theme(layer);
        assert_eq!(theme.enabled, Color::Green);
        assert_eq!(theme.heading, Color::Blue);
    }

    #[test]
    fn hex_colours_parse() {
        assert_eq!(
            parse_color("#FF8000"),
            Some(Color::Rgb { r: 255, g: 128, b: 0 })
        );
        assert_eq!(parse_color("#zz0000"), None);
    }
}
