//! External collaborators the engine reads from: the destination catalog and
//! the visit-history source.

pub mod catalog;
pub mod visits;

pub use catalog::{DestinationCatalog, InMemoryCatalog};
pub use visits::{InMemoryVisitSource, VisitSource};
