// State module
// Moves server definitions between the active and disabled stores

mod journal;
mod manager;

pub use journal::*;
pub use manager::*;
