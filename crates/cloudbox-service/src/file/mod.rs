//! File lifecycle: upload, delete to trash, restore, lookups.

pub mod lifecycle;

pub use lifecycle::FileLifecycle;
