//! Domain layer for the job coordination core
//!
//! Models, errors and the ports adapters implement.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{GenieError, GenieResult};
