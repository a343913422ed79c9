//! # cloudbox-database
//!
//! Metadata persistence for CloudBox: the [`MetadataStore`] and
//! [`UserStore`] traits, their PostgreSQL implementation and an
//! in-memory implementation used by tests and local tooling.

pub mod connection;
#[cfg(feature = "memory")]
pub mod memory;
pub mod migration;
pub mod postgres;
pub mod repositories;
pub mod store;

pub use connection::DatabasePool;
#[cfg(feature = "memory")]
pub use memory::{FaultPoint, MemoryMetadataStore, MemoryUserStore};
pub use postgres::{PgMetadataStore, PgUserStore};
pub use store::{CascadeSummary, MetadataStore, RenameSummary, UserStore};
