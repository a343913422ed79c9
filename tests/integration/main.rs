//! End-to-end tests over the memory store and a temporary filesystem.

mod directory_test;
mod file_test;
mod helpers;
mod reconcile_test;
mod user_test;
