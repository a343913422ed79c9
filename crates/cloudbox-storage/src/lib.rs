//! # cloudbox-storage
//!
//! Maps logical paths onto the root and trash directories and performs
//! the filesystem side of every lifecycle operation.

pub mod blob;
pub mod paths;
pub mod providers;

pub use blob::{BytesBlob, LocalFileBlob};
pub use paths::{
    DELETED_DIRECTORIES, PathPolicy, full_file_path, validate_logical_path, validate_segment,
};
pub use providers::LocalFilesystem;
