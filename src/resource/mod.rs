//! File abstraction layer: file records, their collaborators and in-memory backends.

pub mod paths;
pub mod config;
pub mod kv;
pub mod types;
pub mod collaborators;
pub mod file;
pub mod factory;
pub mod memory;
pub mod manifest;

// Re-export common types
pub use config::{GlobalResourceConfig, StorageConfig, EffectiveConfig};
pub use paths::{normalize_nfc, validate_identifier, name_from_identifier, extension_of};
pub use kv::{Keys, combined_identifier, checksum_for};
pub use types::{Properties, IndexState, FileAction, FileType, ProcessedFile, int_of};
pub use collaborators::{Storage, IndexRepository, MetaDataRepository, Indexer, StorageFactory};
pub use file::FileRecord;
pub use factory::{ResourceServices, ResourceFactory};
pub use memory::{MemoryIndexRepository, MemoryMetaDataRepository, MemoryIndexer, MemoryStorage, MemoryStorageRegistry};
pub use manifest::{Manifest, ManifestStorage, ManifestFile, LoadedManifest, load_manifest};
