//! Host library store access
//!
//! The store itself is an external collaborator; this module defines the
//! seam ([`LibraryStore`]) and an in-memory implementation.

pub mod memory;
pub mod traits;

pub use memory::{InMemoryLibraryStore, StoredItem};
pub use traits::{LibraryStore, ParentRef};
