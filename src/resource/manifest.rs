//! JSON manifests describing storages and files, loaded into the in-memory collaborators.
//! Used by the `fal-inspect` binary.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use super::collaborators::Storage;
use super::config::{GlobalResourceConfig, StorageConfig};
use super::factory::{ResourceFactory, ResourceServices};
use super::file::FileRecord;
use super::memory::{MemoryIndexRepository, MemoryIndexer, MemoryMetaDataRepository, MemoryStorage, MemoryStorageRegistry};
use super::kv::combined_identifier;
use super::paths::{name_from_identifier, normalize_nfc};
use super::types::Properties;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ManifestStorage {
    pub uid: u64,
    pub name: String,
    #[serde(default)]
    pub public_base_url: Option<String>,
    #[serde(default)]
    pub config: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ManifestFile {
    pub storage: u64,
    pub identifier: String,
    #[serde(default)]
    pub contents: String,
    #[serde(default)]
    pub mime_type: Option<String>,
    /// Metadata row attached when the file is already indexed
    #[serde(default)]
    pub metadata: Properties,
    /// Seed an index record so the file is rehydrated instead of indexed lazily
    #[serde(default)]
    pub indexed: bool,
    #[serde(default)]
    pub missing: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Manifest {
    #[serde(default)]
    pub storages: Vec<ManifestStorage>,
    #[serde(default)]
    pub files: Vec<ManifestFile>,
}

impl Manifest {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).with_context(|| format!("reading manifest {}", path.display()))?;
        serde_json::from_slice(&bytes).with_context(|| format!("parsing manifest {}", path.display()))
    }
}

/// Collaborators populated from a manifest plus one record per manifest file.
pub struct LoadedManifest {
    pub factory: ResourceFactory,
    pub index: Arc<MemoryIndexRepository>,
    pub metadata: Arc<MemoryMetaDataRepository>,
    pub registry: Arc<MemoryStorageRegistry>,
    pub files: Vec<FileRecord>,
}

pub fn load_manifest(manifest: &Manifest, global: GlobalResourceConfig) -> Result<LoadedManifest> {
    let index = Arc::new(MemoryIndexRepository::new());
    let metadata = Arc::new(MemoryMetaDataRepository::new());
    let indexer = Arc::new(MemoryIndexer::new(index.clone(), metadata.clone()));
    let registry = Arc::new(MemoryStorageRegistry::new());

    let mut services = ResourceServices::new(index.clone(), metadata.clone(), indexer, registry.clone(), global);
    let mut storages = Vec::with_capacity(manifest.storages.len());
    for s in &manifest.storages {
        let mut storage = MemoryStorage::new(s.uid, s.name.clone());
        if let Some(base) = &s.public_base_url {
            storage = storage.with_public_base_url(base.clone());
        }
        let storage = Arc::new(storage);
        registry.register(storage.clone());
        storages.push(storage);
        services = services.with_storage_config(s.uid, s.config.clone());
    }

    for f in &manifest.files {
        let storage = storages
            .iter()
            .find(|s| s.uid() == f.storage)
            .with_context(|| format!("file '{}' refers to unknown storage {}", f.identifier, f.storage))?;
        let identifier = normalize_nfc(&f.identifier);
        let mime = f.mime_type.as_deref().unwrap_or("application/octet-stream");
        storage.put(&identifier, f.contents.as_bytes(), mime);
        if f.indexed {
            let mut record = Properties::new();
            record.insert("storage".into(), json!(f.storage));
            record.insert("identifier".into(), json!(identifier));
            record.insert("name".into(), json!(name_from_identifier(&identifier)));
            record.insert("size".into(), json!(f.contents.len()));
            record.insert("mime_type".into(), json!(mime));
            record.insert("missing".into(), json!(0));
            let uid = index.insert(record)?;
            if !f.metadata.is_empty() {
                metadata.set(uid, f.metadata.clone());
            }
        }
    }

    let pre_indexed = index.len();
    let factory = ResourceFactory::new(Arc::new(services));
    let mut files = Vec::with_capacity(manifest.files.len());
    for f in &manifest.files {
        let combined = combined_identifier(f.storage, &normalize_nfc(&f.identifier));
        let file = factory.file_object_by_combined_identifier(&combined)?;
        if f.missing {
            file.set_missing(true)?;
        }
        files.push(file);
    }
    info!(target: "fal::manifest", "loaded {} storages, {} files ({} pre-indexed)", storages.len(), files.len(), pre_indexed);

    Ok(LoadedManifest { factory, index, metadata, registry, files })
}

#[cfg(test)]
mod manifest_tests;
