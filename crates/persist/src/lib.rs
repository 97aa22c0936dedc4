//! Persistence: sequential binary records and a file-backed resource manager.
//!
//! # Invariants
//! - Records are little-endian field sequences read back in write order.
//! - A planet record is exactly 40 bytes and stores expanded extents.
//! - Universe metadata carries a schema version; a mismatch fails closed.

pub mod binary;
pub mod definitions;
pub mod entity_record;
pub mod error;
pub mod file_manager;
pub mod planet;

pub use binary::{BinaryReader, BinarySerializable, BinaryWriter, from_bytes, read_new, to_bytes};
pub use definitions::{DefinitionLookup, DefinitionRegistry};
pub use entity_record::ENTITY_RECORD_LEN;
pub use error::PersistError;
pub use file_manager::{
    FileResourceManager, PassiveChunkCache, UNIVERSE_SCHEMA_VERSION, UniverseMeta,
};
pub use planet::{PLANET_RECORD_LEN, Planet};
