//! File representation in the file abstraction layer.
//!
//! A `FileRecord` starts from whatever the storage or a caller knows about a file
//! and fills itself in from the persisted index record (and the metadata attached
//! to it) the first time a property is needed. Collaborators receive `&FileRecord`
//! and may read from it while it is being indexed, so all state sits behind
//! `Cell`/`RefCell` and no borrow is held across a collaborator call.

use std::cell::{Cell, RefCell};
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, info};

use crate::error::{ResourceError, ResourceResult};

use super::collaborators::Storage;
use super::config::EffectiveConfig;
use super::factory::ResourceServices;
use super::kv::{checksum_for, combined_identifier};
use super::paths::{extension_of, name_from_identifier};
use super::types::{int_of, truthy, FileAction, FileType, IndexState, ProcessedFile, Properties};

/// Holds the reentrancy flag for the duration of one indexing pass and clears it on drop.
struct IndexingGuard<'a> {
    flag: &'a Cell<bool>,
}

impl<'a> IndexingGuard<'a> {
    fn acquire(flag: &'a Cell<bool>) -> Option<Self> {
        if flag.get() {
            return None;
        }
        flag.set(true);
        Some(Self { flag })
    }
}

impl Drop for IndexingGuard<'_> {
    fn drop(&mut self) {
        self.flag.set(false);
    }
}

/// `isset` semantics: present and not null.
fn is_set(value: Option<&Value>) -> bool {
    !matches!(value, None | Some(Value::Null))
}

pub struct FileRecord {
    identifier: RefCell<String>,
    name: RefCell<String>,
    properties: RefCell<Properties>,
    metadata: RefCell<Properties>,
    indexed: Cell<IndexState>,
    indexable: Cell<bool>,
    indexing_in_progress: Cell<bool>,
    deleted: Cell<bool>,
    updated_properties: RefCell<Vec<String>>,
    storage: RefCell<Arc<dyn Storage>>,
    services: Arc<ResourceServices>,
}

impl std::fmt::Debug for FileRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileRecord")
            .field("identifier", &*self.identifier.borrow())
            .field("storage", &self.storage.borrow().uid())
            .field("indexed", &self.indexed.get())
            .field("properties", &*self.properties.borrow())
            .finish()
    }
}

impl FileRecord {
    /// Build a record from raw file data. Data carrying a positive `uid` comes from
    /// the index already, so the record starts out indexed and loads its metadata.
    pub fn new(raw: Properties, storage: Arc<dyn Storage>, services: Arc<ResourceServices>) -> ResourceResult<Self> {
        let identifier = raw
            .get("identifier")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let name = raw
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| name_from_identifier(&identifier));
        let indexable = services.config_for(storage.uid()).indexable;
        let rehydrated = int_of(raw.get("uid")) > 0;

        let file = Self {
            identifier: RefCell::new(identifier),
            name: RefCell::new(name),
            properties: RefCell::new(raw),
            metadata: RefCell::new(Properties::new()),
            indexed: Cell::new(IndexState::Unknown),
            indexable: Cell::new(indexable),
            indexing_in_progress: Cell::new(false),
            deleted: Cell::new(false),
            updated_properties: RefCell::new(Vec::new()),
            storage: RefCell::new(storage),
            services,
        };
        if rehydrated {
            file.indexed.set(IndexState::Indexed);
            file.load_metadata()?;
        }
        Ok(file)
    }

    pub fn identifier(&self) -> String {
        self.identifier.borrow().clone()
    }

    pub fn name(&self) -> String {
        self.name.borrow().clone()
    }

    pub fn storage(&self) -> Arc<dyn Storage> {
        self.storage.borrow().clone()
    }

    pub fn combined_identifier(&self) -> String {
        combined_identifier(self.storage().uid(), &self.identifier.borrow())
    }

    fn config(&self) -> EffectiveConfig {
        self.services.config_for(self.storage().uid())
    }

    // Property access ---------------------------------------------

    /// Property value, falling back to metadata. Loads the index record on first use.
    pub fn property(&self, key: &str) -> ResourceResult<Option<Value>> {
        self.lazy_index()?;
        if let Some(v) = self.properties.borrow().get(key) {
            return Ok(Some(v.clone()));
        }
        Ok(self.metadata.borrow().get(key).cloned())
    }

    /// All properties with metadata filling keys the record itself lacks.
    pub fn properties(&self) -> ResourceResult<Properties> {
        self.lazy_index()?;
        let mut out = self.metadata.borrow().clone();
        for (k, v) in self.properties.borrow().iter() {
            out.insert(k.clone(), v.clone());
        }
        Ok(out)
    }

    /// Record property without triggering indexing; for repositories and indexers.
    pub fn property_raw(&self, key: &str) -> Option<Value> {
        self.properties.borrow().get(key).cloned()
    }

    pub fn metadata(&self) -> Properties {
        self.metadata.borrow().clone()
    }

    pub fn uid(&self) -> ResourceResult<i64> {
        Ok(int_of(self.property("uid")?.as_ref()))
    }

    pub fn size(&self) -> ResourceResult<u64> {
        Ok(int_of(self.property("size")?.as_ref()).max(0) as u64)
    }

    pub fn mime_type(&self) -> ResourceResult<String> {
        Ok(self
            .property("mime_type")?
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default())
    }

    pub fn extension(&self) -> String {
        extension_of(&self.name.borrow())
    }

    pub fn file_type(&self) -> ResourceResult<FileType> {
        Ok(FileType::from_mime(&self.mime_type()?))
    }

    // Contents ----------------------------------------------------

    pub fn contents(&self) -> ResourceResult<Vec<u8>> {
        Ok(self.storage().file_contents(self)?)
    }

    pub fn set_contents(&self, contents: &[u8]) -> ResourceResult<&Self> {
        self.storage().set_file_contents(self, contents)?;
        Ok(self)
    }

    // Indexing ----------------------------------------------------

    /// Current index state, without triggering indexing.
    pub fn index_state(&self) -> IndexState {
        self.indexed.get()
    }

    /// Whether the file is indexed, loading the index record first if that is still unknown.
    pub fn is_indexed(&self) -> ResourceResult<bool> {
        if self.indexed.get() == IndexState::Unknown && !self.indexing_in_progress.get() {
            self.lazy_index()?;
        }
        Ok(self.indexed.get() == IndexState::Indexed)
    }

    pub fn is_indexable(&self) -> bool {
        self.indexable.get()
    }

    pub fn set_indexable(&self, indexable: bool) {
        self.indexable.set(indexable);
    }

    pub fn is_indexing_in_progress(&self) -> bool {
        self.indexing_in_progress.get()
    }

    /// For indexers that drive a record through indexing themselves.
    pub fn set_indexing_in_progress(&self, in_progress: bool) {
        self.indexing_in_progress.set(in_progress);
    }

    fn lazy_index(&self) -> ResourceResult<()> {
        if self.indexed.get() == IndexState::Unknown {
            self.ensure_indexed(self.config().create_index_if_missing)?;
        }
        Ok(())
    }

    /// Load the index record, creating it through the indexer when missing and
    /// `create_if_missing` is set. No-op when already indexed, not indexable or
    /// when an indexing pass is running further up the stack.
    pub fn ensure_indexed(&self, create_if_missing: bool) -> ResourceResult<()> {
        if self.indexed.get() == IndexState::Indexed || !self.indexable.get() {
            return Ok(());
        }
        let Some(_guard) = IndexingGuard::acquire(&self.indexing_in_progress) else {
            return Ok(());
        };

        let combined = self.combined_identifier();
        let record = match self.services.index_repository.find_one_by_combined_identifier(&combined)? {
            Some(record) => {
                debug!(target: "fal::file", "index record found for '{}'", combined);
                record
            }
            None if create_if_missing => {
                info!(target: "fal::file", "no index record for '{}', indexing", combined);
                let extract = self.config().extract_metadata_on_index;
                self.services.indexer.index_file(self, extract)?
            }
            None => {
                return Err(ResourceError::IndexRecordNotFound { combined_identifier: combined });
            }
        };
        self.merge_index_record(record)?;
        self.indexed.set(IndexState::Indexed);
        self.load_metadata()
    }

    fn load_metadata(&self) -> ResourceResult<()> {
        let metadata = self.services.metadata_repository.find_by_file(self)?;
        *self.metadata.borrow_mut() = metadata;
        Ok(())
    }

    /// Merge a freshly loaded index record. Values already on the record win, except
    /// the placeholder zero `uid`, which the record's identity replaces.
    pub fn merge_index_record(&self, record: Properties) -> ResourceResult<()> {
        let uid = int_of(self.properties.borrow().get("uid"));
        if uid != 0 {
            return Err(ResourceError::UidAlreadySet { uid });
        }
        let mut props = self.properties.borrow_mut();
        let mut merged = record;
        for (k, v) in std::mem::take(&mut *props) {
            if k == "uid" && merged.contains_key("uid") {
                continue;
            }
            merged.insert(k, v);
        }
        *props = merged;
        Ok(())
    }

    /// Apply a partial update, e.g. after re-indexing, moving or renaming the file.
    ///
    /// `identifier` and `name` are taken over before the lazy index lookup runs, so a
    /// record that was never indexed is looked up under its new identifier. A persisted
    /// `uid` is never replaced. Only values that actually change are recorded in
    /// `updated_properties`.
    pub fn update_properties(&self, mut update: Properties) -> ResourceResult<()> {
        if let Some(identifier) = update.get("identifier").and_then(Value::as_str) {
            *self.identifier.borrow_mut() = identifier.to_string();
        }
        if let Some(name) = update.get("name").and_then(Value::as_str) {
            *self.name.borrow_mut() = name.to_string();
        }
        if self.indexed.get() == IndexState::Unknown && !is_set(update.get("uid")) {
            self.lazy_index()?;
        }
        // An explicit null uid is not "set", so it passes through and clears the stored uid.
        if int_of(self.properties.borrow().get("uid")) != 0 && is_set(update.get("uid")) {
            update.remove("uid");
        }

        {
            let mut props = self.properties.borrow_mut();
            let mut updated = self.updated_properties.borrow_mut();
            for (key, value) in &update {
                if props.get(key).unwrap_or(&Value::Null) == value {
                    continue;
                }
                if !updated.iter().any(|k| k == key) {
                    updated.push(key.clone());
                }
                props.insert(key.clone(), value.clone());
            }
        }

        if int_of(update.get("uid")) > 0 {
            self.indexed.set(IndexState::Indexed);
            self.load_metadata()?;
        }
        if update.contains_key("storage") && self.updated_properties.borrow().iter().any(|k| k == "storage") {
            let storage_uid = int_of(update.get("storage")).max(0) as u64;
            let storage = self.services.storage_factory.storage_object(storage_uid)?;
            debug!(target: "fal::file", "file '{}' now on storage {}", self.identifier.borrow(), storage_uid);
            *self.storage.borrow_mut() = storage;
        }
        Ok(())
    }

    /// Names of all properties changed since construction, in order of first change.
    pub fn updated_properties(&self) -> Vec<String> {
        self.updated_properties.borrow().clone()
    }

    // Storage and management --------------------------------------

    pub fn check_action_permission(&self, action: FileAction) -> ResourceResult<bool> {
        Ok(self.storage().check_file_action_permission(action, self)?)
    }

    /// Fingerprint over combined identifier, MIME type and the installation secret;
    /// used to verify derived-asset requests such as thumbnails.
    pub fn calculate_checksum(&self) -> ResourceResult<String> {
        let mime = self.mime_type()?;
        Ok(checksum_for(&self.combined_identifier(), &mime, &self.config().encryption_key))
    }

    pub fn process(&self, task_type: &str, configuration: &Properties) -> ResourceResult<ProcessedFile> {
        Ok(self.storage().process_file(self, task_type, configuration)?)
    }

    pub fn is_missing(&self) -> ResourceResult<bool> {
        Ok(truthy(self.property("missing")?.as_ref()))
    }

    pub fn set_missing(&self, missing: bool) -> ResourceResult<()> {
        let mut update = Properties::new();
        update.insert("missing".to_string(), json!(if missing { 1 } else { 0 }));
        self.update_properties(update)
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted.get()
    }

    /// Flag the file as deleted from its storage.
    pub fn mark_deleted(&self) {
        self.deleted.set(true);
    }

    /// Public URL of the file; `None` when the file is missing or deleted.
    pub fn public_url(&self, relative_to_current_script: bool) -> ResourceResult<Option<String>> {
        if self.is_missing()? || self.deleted.get() {
            return Ok(None);
        }
        Ok(self.storage().public_url(self, relative_to_current_script)?)
    }

    /// Listing/display snapshot: identity, derived attributes, permissions, checksum,
    /// then the raw properties and finally the storage's stat fields.
    pub fn to_array(&self) -> ResourceResult<Properties> {
        let mut out = Properties::new();
        out.insert("id".into(), json!(self.combined_identifier()));
        out.insert("name".into(), json!(self.name()));
        out.insert("extension".into(), json!(self.extension()));
        out.insert("type".into(), json!(self.file_type()?.code()));
        out.insert("mimetype".into(), json!(self.mime_type()?));
        out.insert("size".into(), json!(self.size()?));
        out.insert("url".into(), self.public_url(false)?.map(Value::String).unwrap_or(Value::Null));
        out.insert(
            "indexed".into(),
            match self.indexed.get() {
                IndexState::Indexed => Value::Bool(true),
                IndexState::Unknown => Value::Null,
            },
        );
        out.insert("uid".into(), json!(self.uid()?));

        let mut permissions = Properties::new();
        for action in FileAction::ALL {
            permissions.insert(action.as_str().into(), json!(self.check_action_permission(action)?));
        }
        out.insert("permissions".into(), Value::Object(permissions));
        out.insert("checksum".into(), json!(self.calculate_checksum()?));

        let props = self.properties.borrow().clone();
        out.extend(props);
        let stat = self.storage().file_info(self)?;
        out.extend(stat);
        Ok(out)
    }
}
