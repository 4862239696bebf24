//! Feature reconciliation and store backends.

pub mod gateway;
pub mod memory;
#[cfg(feature = "database")]
pub mod postgres;

pub use memory::{JournalEntry, MemoryStore};
#[cfg(feature = "database")]
pub use postgres::{PostgresOptions, PostgresStore};
