//! Directory domain entities and logical path arithmetic.

pub mod model;

pub use model::{Directory, is_within, rebase};
