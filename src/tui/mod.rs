mod ansi;
mod menu;
pub mod render;
mod theme;

pub use ansi::*;
pub use menu::*;
pub use theme::*;
