//! In-memory collaborators: index and metadata repositories, an indexer, storages
//! and a storage registry. Maps are guarded by `parking_lot` locks so one set of
//! collaborators can serve records on several threads.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use chrono::Utc;
use parking_lot::RwLock;
use serde_json::{json, Value};
use tracing::debug;

use super::collaborators::{IndexRepository, Indexer, MetaDataRepository, Storage, StorageFactory};
use super::file::FileRecord;
use super::kv::{checksum_for, combined_identifier, Keys};
use super::paths::extension_of;
use super::types::{int_of, FileAction, ProcessedFile, Properties};

/// Index records keyed by `Keys::index(combined identifier)`.
pub struct MemoryIndexRepository {
    records: RwLock<HashMap<String, Properties>>,
    next_uid: AtomicI64,
    lookups: RwLock<Vec<String>>,
}

impl Default for MemoryIndexRepository {
    fn default() -> Self {
        Self { records: RwLock::new(HashMap::new()), next_uid: AtomicI64::new(1), lookups: RwLock::new(Vec::new()) }
    }
}

impl MemoryIndexRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Persist a record, assigning the next uid. The record must carry `storage` and `identifier`.
    pub fn insert(&self, mut record: Properties) -> Result<i64> {
        let storage_uid = int_of(record.get("storage")).max(0) as u64;
        let identifier = record
            .get("identifier")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow!("index record without identifier"))?
            .to_string();
        let uid = self.next_uid.fetch_add(1, Ordering::SeqCst);
        record.insert("uid".into(), json!(uid));
        let key = Keys::index(&combined_identifier(storage_uid, &identifier));
        self.records.write().insert(key, record);
        Ok(uid)
    }

    pub fn remove(&self, combined_identifier: &str) -> bool {
        self.records.write().remove(&Keys::index(combined_identifier)).is_some()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Combined identifiers looked up so far, in order.
    pub fn lookups(&self) -> Vec<String> {
        self.lookups.read().clone()
    }

    pub fn lookup_count(&self) -> usize {
        self.lookups.read().len()
    }
}

impl IndexRepository for MemoryIndexRepository {
    fn find_one_by_combined_identifier(&self, combined_identifier: &str) -> Result<Option<Properties>> {
        self.lookups.write().push(combined_identifier.to_string());
        Ok(self.records.read().get(&Keys::index(combined_identifier)).cloned())
    }
}

/// Metadata rows keyed by `Keys::metadata(file uid)`.
#[derive(Default)]
pub struct MemoryMetaDataRepository {
    rows: RwLock<HashMap<String, Properties>>,
    loads: AtomicUsize,
}

impl MemoryMetaDataRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, file_uid: i64, row: Properties) {
        self.rows.write().insert(Keys::metadata(file_uid), row);
    }

    pub fn get(&self, file_uid: i64) -> Option<Properties> {
        self.rows.read().get(&Keys::metadata(file_uid)).cloned()
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl MetaDataRepository for MemoryMetaDataRepository {
    fn find_by_file(&self, file: &FileRecord) -> Result<Properties> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        let uid = int_of(file.property_raw("uid").as_ref());
        if uid <= 0 {
            return Ok(Properties::new());
        }
        Ok(self.get(uid).unwrap_or_default())
    }
}

/// Creates index records from what the file's storage reports about it.
pub struct MemoryIndexer {
    index: Arc<MemoryIndexRepository>,
    metadata: Arc<MemoryMetaDataRepository>,
    calls: AtomicUsize,
}

impl MemoryIndexer {
    pub fn new(index: Arc<MemoryIndexRepository>, metadata: Arc<MemoryMetaDataRepository>) -> Self {
        Self { index, metadata, calls: AtomicUsize::new(0) }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Indexer for MemoryIndexer {
    fn index_file(&self, file: &FileRecord, extract_metadata_now: bool) -> Result<Properties> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let storage = file.storage();
        let info = storage.file_info(file)?;
        let now = Utc::now().timestamp();

        let mut record = Properties::new();
        record.insert("storage".into(), json!(storage.uid()));
        record.insert("identifier".into(), json!(file.identifier()));
        record.insert("name".into(), json!(file.name()));
        record.insert("extension".into(), json!(extension_of(&file.name())));
        record.insert("size".into(), info.get("size").cloned().unwrap_or(json!(0)));
        record.insert("mime_type".into(), info.get("mime_type").cloned().unwrap_or(json!("application/octet-stream")));
        record.insert("missing".into(), json!(0));
        record.insert("creation_date".into(), json!(now));
        record.insert("modification_date".into(), info.get("mtime").cloned().unwrap_or(json!(now)));

        let uid = self.index.insert(record.clone())?;
        record.insert("uid".into(), json!(uid));

        if extract_metadata_now {
            let mut row = Properties::new();
            row.insert("file".into(), json!(uid));
            row.insert("extracted_at".into(), json!(now));
            self.metadata.set(uid, row);
        }
        debug!(target: "fal::memory", "indexed '{}' as uid {}", file.combined_identifier(), uid);
        Ok(record)
    }
}

struct Blob {
    bytes: Vec<u8>,
    mime_type: String,
    mtime: i64,
}

/// A storage holding file contents in memory.
pub struct MemoryStorage {
    uid: u64,
    name: String,
    public_base_url: Option<String>,
    blobs: RwLock<HashMap<String, Blob>>,
    denied: RwLock<HashSet<FileAction>>,
}

impl MemoryStorage {
    pub fn new(uid: u64, name: impl Into<String>) -> Self {
        Self { uid, name: name.into(), public_base_url: None, blobs: RwLock::new(HashMap::new()), denied: RwLock::new(HashSet::new()) }
    }

    pub fn with_public_base_url(mut self, base: impl Into<String>) -> Self {
        self.public_base_url = Some(base.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn put(&self, identifier: &str, bytes: impl Into<Vec<u8>>, mime_type: &str) {
        let blob = Blob { bytes: bytes.into(), mime_type: mime_type.to_string(), mtime: Utc::now().timestamp() };
        self.blobs.write().insert(Keys::blob(identifier), blob);
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.blobs.read().contains_key(&Keys::blob(identifier))
    }

    pub fn deny(&self, action: FileAction) {
        self.denied.write().insert(action);
    }

    fn missing(&self, file: &FileRecord) -> anyhow::Error {
        anyhow!("file '{}' does not exist in storage '{}'", file.identifier(), self.name)
    }
}

impl Storage for MemoryStorage {
    fn uid(&self) -> u64 {
        self.uid
    }

    fn file_contents(&self, file: &FileRecord) -> Result<Vec<u8>> {
        self.blobs
            .read()
            .get(&Keys::blob(&file.identifier()))
            .map(|b| b.bytes.clone())
            .ok_or_else(|| self.missing(file))
    }

    fn set_file_contents(&self, file: &FileRecord, contents: &[u8]) -> Result<()> {
        let key = Keys::blob(&file.identifier());
        let mut blobs = self.blobs.write();
        let blob = blobs.get_mut(&key).ok_or_else(|| self.missing(file))?;
        blob.bytes = contents.to_vec();
        blob.mtime = Utc::now().timestamp();
        Ok(())
    }

    /// Absolute URL below the public base with each identifier segment percent-encoded;
    /// with `relative_to_current_script` only the path part of the base is kept.
    fn public_url(&self, file: &FileRecord, relative_to_current_script: bool) -> Result<Option<String>> {
        let Some(base) = self.public_base_url.as_deref() else {
            return Ok(None);
        };
        let base = if relative_to_current_script {
            match base.split_once("://") {
                Some((_, rest)) => rest.find('/').map(|i| &rest[i..]).unwrap_or(""),
                None => base,
            }
        } else {
            base
        };
        let path: Vec<String> = file
            .identifier()
            .split('/')
            .map(|seg| urlencoding::encode(seg).into_owned())
            .collect();
        Ok(Some(format!("{}{}", base.trim_end_matches('/'), path.join("/"))))
    }

    fn check_file_action_permission(&self, action: FileAction, _file: &FileRecord) -> Result<bool> {
        Ok(!self.denied.read().contains(&action))
    }

    fn file_info(&self, file: &FileRecord) -> Result<Properties> {
        let blobs = self.blobs.read();
        let blob = blobs.get(&Keys::blob(&file.identifier())).ok_or_else(|| self.missing(file))?;
        let mut info = Properties::new();
        info.insert("size".into(), json!(blob.bytes.len()));
        info.insert("mime_type".into(), json!(blob.mime_type));
        info.insert("mtime".into(), json!(blob.mtime));
        Ok(info)
    }

    fn process_file(&self, file: &FileRecord, task_type: &str, configuration: &Properties) -> Result<ProcessedFile> {
        if !self.contains(&file.identifier()) {
            return Err(self.missing(file));
        }
        let original = file.combined_identifier();
        let config_json = serde_json::to_string(configuration)?;
        let digest = checksum_for(&original, task_type, &config_json);
        let slug: String = task_type.chars().map(|c| if c.is_ascii_alphanumeric() { c } else { '_' }).collect();
        let ext = file.extension();
        let identifier = if ext.is_empty() {
            format!("/_processed_/{}_{}", slug, &digest[..10])
        } else {
            format!("/_processed_/{}_{}.{}", slug, &digest[..10], ext)
        };
        Ok(ProcessedFile { original, task_type: task_type.to_string(), identifier, configuration: configuration.clone() })
    }
}

/// Resolves registered storages by uid.
#[derive(Default)]
pub struct MemoryStorageRegistry {
    storages: RwLock<HashMap<u64, Arc<dyn Storage>>>,
}

impl MemoryStorageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, storage: Arc<dyn Storage>) {
        self.storages.write().insert(storage.uid(), storage);
    }
}

impl StorageFactory for MemoryStorageRegistry {
    fn storage_object(&self, storage_uid: u64) -> Result<Arc<dyn Storage>> {
        self.storages
            .read()
            .get(&storage_uid)
            .cloned()
            .ok_or_else(|| anyhow!("storage {} is not registered", storage_uid))
    }
}

#[cfg(test)]
mod memory_tests;
