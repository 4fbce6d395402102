//! SQLite persistence for job records.

pub mod connection;
pub mod job_repository;
pub mod migrations;

pub use connection::{connect, create_pool, create_test_pool, ConnectionError, PoolConfig};
pub use job_repository::SqliteJobPersistence;
pub use migrations::{all_embedded_migrations, Migration, MigrationError, Migrator};
