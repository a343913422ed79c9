//! Filesystem implementations.

pub mod local;

pub use local::{DIR_MODE, LocalFilesystem};
