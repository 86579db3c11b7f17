//! Contracts of the services a file record delegates to.
//! Implementations must be shareable; records themselves stay on one thread.

use std::sync::Arc;

use anyhow::Result;

use super::file::FileRecord;
use super::types::{FileAction, ProcessedFile, Properties};

/// Content I/O, URLs and permissions for the files of one storage.
pub trait Storage: Send + Sync {
    fn uid(&self) -> u64;
    fn file_contents(&self, file: &FileRecord) -> Result<Vec<u8>>;
    fn set_file_contents(&self, file: &FileRecord, contents: &[u8]) -> Result<()>;
    fn public_url(&self, file: &FileRecord, relative_to_current_script: bool) -> Result<Option<String>>;
    fn check_file_action_permission(&self, action: FileAction, file: &FileRecord) -> Result<bool>;
    /// File-system stat fields (size, mtime, ...) as reported by the backend.
    fn file_info(&self, file: &FileRecord) -> Result<Properties>;
    fn process_file(&self, file: &FileRecord, task_type: &str, configuration: &Properties) -> Result<ProcessedFile>;
}

/// Persisted index records, keyed by combined identifier.
pub trait IndexRepository: Send + Sync {
    fn find_one_by_combined_identifier(&self, combined_identifier: &str) -> Result<Option<Properties>>;
}

/// Extracted metadata rows, keyed by the file's uid.
pub trait MetaDataRepository: Send + Sync {
    fn find_by_file(&self, file: &FileRecord) -> Result<Properties>;
}

/// Creates index records for files that have none yet.
pub trait Indexer: Send + Sync {
    fn index_file(&self, file: &FileRecord, extract_metadata_now: bool) -> Result<Properties>;
}

/// Resolves storages by uid, e.g. after a file moved between storages.
pub trait StorageFactory: Send + Sync {
    fn storage_object(&self, storage_uid: u64) -> Result<Arc<dyn Storage>>;
}
