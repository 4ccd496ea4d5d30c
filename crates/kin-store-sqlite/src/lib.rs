//! SQLite backend for the Kin family store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Every write runs in a single
//! transaction, so a rejected request leaves no partial state behind.

mod encode;
mod normalize;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
