// Store module
// Entry store codec for ~/.claude.json and the disabled-server document

mod codec;
mod error;
pub mod fs;
mod types;

pub use codec::*;
pub use error::*;
pub use types::*;
