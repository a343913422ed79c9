//! File domain entities.

pub mod model;
pub mod state;

pub use model::{File, FileKey};
pub use state::FileState;
