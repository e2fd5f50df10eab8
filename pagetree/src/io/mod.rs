//! Session storage and host configuration.

pub mod config;
pub mod file_store;
pub mod store;
