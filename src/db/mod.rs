//! Database module for SQLite operations.
//!
//! This module provides:
//! - Database initialization and the embedded schema
//! - SQLite pragma configuration
//! - Repository layer for checkpoint, event, position and snapshot operations

pub mod migrations;
pub mod repo;

pub use migrations::init_db;
pub use repo::{Checkpoint, Repository};
