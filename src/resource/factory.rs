//! Collaborator bundle injected into every file record, and the factory that builds records.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::debug;

use crate::error::{ResourceError, ResourceResult};

use super::collaborators::{IndexRepository, Indexer, MetaDataRepository, Storage, StorageFactory};
use super::config::{EffectiveConfig, GlobalResourceConfig, StorageConfig};
use super::file::FileRecord;
use super::kv::combined_identifier;
use super::paths::{name_from_identifier, normalize_nfc, validate_identifier};
use super::types::Properties;

/// Services and configuration shared by all file records of one installation.
pub struct ResourceServices {
    pub index_repository: Arc<dyn IndexRepository>,
    pub metadata_repository: Arc<dyn MetaDataRepository>,
    pub indexer: Arc<dyn Indexer>,
    pub storage_factory: Arc<dyn StorageFactory>,
    pub global: GlobalResourceConfig,
    storage_configs: HashMap<u64, StorageConfig>,
}

impl ResourceServices {
    pub fn new(
        index_repository: Arc<dyn IndexRepository>,
        metadata_repository: Arc<dyn MetaDataRepository>,
        indexer: Arc<dyn Indexer>,
        storage_factory: Arc<dyn StorageFactory>,
        global: GlobalResourceConfig,
    ) -> Self {
        Self { index_repository, metadata_repository, indexer, storage_factory, global, storage_configs: HashMap::new() }
    }

    pub fn with_storage_config(mut self, storage_uid: u64, config: StorageConfig) -> Self {
        self.storage_configs.insert(storage_uid, config);
        self
    }

    pub fn config_for(&self, storage_uid: u64) -> EffectiveConfig {
        let storage = self.storage_configs.get(&storage_uid).cloned().unwrap_or_default();
        EffectiveConfig::from_layers(&self.global, &storage)
    }
}

/// Builds file records from raw data, storage uids or combined identifiers.
#[derive(Clone)]
pub struct ResourceFactory {
    services: Arc<ResourceServices>,
}

impl ResourceFactory {
    pub fn new(services: Arc<ResourceServices>) -> Self {
        Self { services }
    }

    /// Record for raw file data on a known storage. The identifier is validated and
    /// NFC-normalized; a missing `name` is derived from it.
    pub fn file_object(&self, mut raw: Properties, storage: Arc<dyn Storage>) -> ResourceResult<FileRecord> {
        let identifier = raw.get("identifier").and_then(Value::as_str).unwrap_or_default().to_string();
        if let Err(e) = validate_identifier(&identifier) {
            return Err(ResourceError::InvalidIdentifier { identifier, reason: e.to_string() });
        }
        let identifier = normalize_nfc(&identifier);
        if !raw.contains_key("name") {
            raw.insert("name".into(), json!(name_from_identifier(&identifier)));
        }
        raw.insert("identifier".into(), json!(identifier));
        raw.entry("storage").or_insert_with(|| json!(storage.uid()));
        FileRecord::new(raw, storage, self.services.clone())
    }

    /// Record for raw file data on the storage with the given uid.
    pub fn file_object_on_storage(&self, storage_uid: u64, raw: Properties) -> ResourceResult<FileRecord> {
        let storage = self.services.storage_factory.storage_object(storage_uid)?;
        self.file_object(raw, storage)
    }

    /// Record for `"<storageUid>:<identifier>"`. Rehydrated from the index when a
    /// record exists there, otherwise left for lazy indexing.
    pub fn file_object_by_combined_identifier(&self, combined: &str) -> ResourceResult<FileRecord> {
        let invalid = |reason: &str| ResourceError::InvalidIdentifier { identifier: combined.to_string(), reason: reason.to_string() };
        let (uid_part, identifier) = combined.split_once(':').ok_or_else(|| invalid("missing storage uid"))?;
        let storage_uid: u64 = uid_part.parse().map_err(|_| invalid("storage uid is not a number"))?;
        let storage = self.services.storage_factory.storage_object(storage_uid)?;

        let key = combined_identifier(storage_uid, &normalize_nfc(identifier));
        let raw = match self.services.index_repository.find_one_by_combined_identifier(&key)? {
            Some(record) => {
                debug!(target: "fal::factory", "rehydrating '{}' from index", key);
                record
            }
            None => {
                let mut raw = Properties::new();
                raw.insert("identifier".into(), json!(identifier));
                raw
            }
        };
        self.file_object(raw, storage)
    }
}
