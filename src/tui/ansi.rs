use crossterm::style::{Attribute, Color, Colored};

pub fn clear_screen() -> String {
    "\x1b[2J\x1b[H".to_string()
}

fn set_fg(color: Color) -> String {
    format!("\x1b[{}m", Colored::ForegroundColor(color))
}

/// Wraps `text` in colour codes, or returns it untouched when colour is off.
#[derive(Debug, Clone, Copy)]
pub struct Painter {
    pub enabled: bool,
}

impl Painter {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn fg(&self, text: &str, color: Color) -> String {
        if !self.enabled {
            return text.to_string();
        }
        format!("{}{}{}", set_fg(color), text, Attribute::Reset)
    }

    pub fn bold(&self, text: &str, color: Color) -> String {
        if !self.enabled {
            return text.to_string();
        }
        format!("{}{}{}{}", Attribute::Bold, set_fg(color), text, Attribute::Reset)
    }

    /// Selected menu row. Without colour the row gets a `> ` marker instead.
    pub fn highlight(&self, text: &str) -> String {
        if !self.enabled {
            return format!("> {text}");
        }
        format!("{}{}{}", Attribute::Reverse, text, Attribute::Reset)
    }
}
