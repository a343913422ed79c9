//! # cloudbox-core
//!
//! Core crate for CloudBox. Contains the filesystem and blob source
//! traits, configuration schemas, typed identifiers, and the unified
//! error system.
//!
//! This crate has **no** internal dependencies on other CloudBox crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
