//! PostgreSQL repositories, one per table.

pub mod directory;
pub mod file;
pub mod user;

pub use directory::DirectoryRepository;
pub use file::FileRepository;
pub use user::UserRepository;
