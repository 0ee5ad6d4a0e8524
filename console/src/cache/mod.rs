//! In-memory caches for entities and catalog templates

pub mod catalog;
pub mod entities;
pub mod tickets;

pub use catalog::Catalog;
pub use entities::{EntityCache, EntityRef, SortBy};
pub use tickets::Tickets;
