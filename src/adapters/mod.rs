//! Infrastructure adapters for external systems.

pub mod local;
pub mod memory;
pub mod sqlite;
