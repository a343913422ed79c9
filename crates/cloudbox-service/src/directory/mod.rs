//! Directory lifecycle: create on demand, delete to trash, rename.

pub mod lifecycle;

pub use lifecycle::{DirectoryDeletion, DirectoryLifecycle};
