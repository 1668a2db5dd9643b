//! Storage abstraction for persisted records.
//!
//! The core never touches a filesystem or database directly; everything
//! goes through the [`KeyValueStore`] trait. The design is agnostic to the
//! backing store (files, an embedded database, or a remote store) as
//! long as read-modify-write is atomic per key.
//!
//! Two backends ship with the crate:
//! - [`MemoryStore`]: mutex-guarded map, used in tests and embedded hosts
//! - [`JsonFileStore`]: one file per key with atomic replace-on-write

pub mod file;
pub mod memory;
pub mod traits;

pub use file::JsonFileStore;
pub use memory::MemoryStore;
pub use traits::KeyValueStore;
