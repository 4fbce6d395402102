//! In-memory adapters for resource lookups.

pub mod catalog;

pub use catalog::InMemoryCatalog;
