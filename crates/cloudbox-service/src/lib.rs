//! # cloudbox-service
//!
//! Lifecycle coordination for CloudBox. Every operation that changes
//! both the filesystem and the metadata store performs the filesystem
//! step first and commits metadata second. A failure in between is
//! returned to the caller and left for [`Reconciler`] to report.
//!
//! Services follow constructor injection; all dependencies are provided
//! at construction time via `Arc` references.

pub mod directory;
pub mod file;
pub mod gateway;
pub mod reconcile;
pub mod user;

#[cfg(test)]
mod testing;

pub use directory::{DirectoryDeletion, DirectoryLifecycle};
pub use file::FileLifecycle;
pub use gateway::StorageGateway;
pub use reconcile::{ReconcileReport, Reconciler};
pub use user::UserService;
