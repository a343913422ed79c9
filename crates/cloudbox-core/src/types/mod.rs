//! Core type definitions used across the CloudBox workspace.

pub mod id;

pub use id::*;
