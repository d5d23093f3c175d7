#![forbid(unsafe_code)]

mod listing;
mod social;
mod species;
mod trees;

pub use listing::*;
pub use social::*;
pub use species::*;
pub use trees::*;
