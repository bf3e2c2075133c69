//! Shared infrastructure for the on-call service crates.
//!
//! Keeps the plumbing that is not specific to any one subsystem:
//! Redis connection pooling, SQLite access, logging, layered
//! configuration loading and shutdown signal handling.

pub mod config;
pub mod logging;
pub mod redis;
pub mod shutdown;
pub mod sqlite;

pub use crate::redis::{RedisClient, RedisConfig};
pub use crate::sqlite::SqliteClient;
