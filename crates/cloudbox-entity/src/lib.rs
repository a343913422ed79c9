//! # cloudbox-entity
//!
//! Domain entity models for CloudBox. Every struct in this crate
//! represents a database table row or a domain value object. Row types
//! derive `sqlx::FromRow`; state enums map to PostgreSQL enum types.

pub mod directory;
pub mod file;
pub mod user;
