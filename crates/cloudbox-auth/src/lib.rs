//! # cloudbox-auth
//!
//! Credential handling for CloudBox users.
//!
//! ## Modules
//!
//! - `password`: Argon2id password hashing and policy enforcement

pub mod password;

pub use password::{PasswordHasher, PasswordValidator};
