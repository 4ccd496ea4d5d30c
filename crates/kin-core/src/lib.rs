//! Domain types and the storage trait for the Kin genealogy service.
//!
//! People, their parent and spouse links, the shared geo-entities they come
//! from, and the pure logic around them (validation, tree building and
//! pagination). Nothing here knows about HTTP or SQL.

pub mod error;
pub mod family_tree;
pub mod geo;
pub mod page;
pub mod person;
pub mod store;
pub mod tree;
pub mod user;
pub mod validate;

pub use error::{DomainError, Error, Result};
