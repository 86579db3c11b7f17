use super::*;
use crate::resource::config::GlobalResourceConfig;
use crate::resource::factory::{ResourceFactory, ResourceServices};

fn factory_over(storage: Arc<MemoryStorage>) -> (ResourceFactory, Arc<MemoryIndexRepository>, Arc<MemoryIndexer>) {
    let index = Arc::new(MemoryIndexRepository::new());
    let metadata = Arc::new(MemoryMetaDataRepository::new());
    let indexer = Arc::new(MemoryIndexer::new(index.clone(), metadata.clone()));
    let registry = Arc::new(MemoryStorageRegistry::new());
    registry.register(storage);
    let services = ResourceServices::new(index.clone(), metadata, indexer.clone(), registry, GlobalResourceConfig::default());
    (ResourceFactory::new(Arc::new(services)), index, indexer)
}

#[test]
fn index_repository_assigns_sequential_uids() {
    let repo = MemoryIndexRepository::new();
    let a = repo.insert(json!({ "storage": 1, "identifier": "/a.txt" }).as_object().cloned().unwrap()).unwrap();
    let b = repo.insert(json!({ "storage": 1, "identifier": "/b.txt" }).as_object().cloned().unwrap()).unwrap();
    assert_eq!((a, b), (1, 2));
    assert_eq!(repo.len(), 2);

    let found = repo.find_one_by_combined_identifier("1:/b.txt").unwrap().unwrap();
    assert_eq!(found.get("uid"), Some(&json!(2)));
    assert!(repo.find_one_by_combined_identifier("2:/b.txt").unwrap().is_none());
    assert_eq!(repo.lookups(), vec!["1:/b.txt".to_string(), "2:/b.txt".to_string()]);

    assert!(repo.remove("1:/a.txt"));
    assert!(!repo.remove("1:/a.txt"));
}

#[test]
fn index_repository_rejects_records_without_identifier() {
    let repo = MemoryIndexRepository::new();
    assert!(repo.insert(json!({ "storage": 1 }).as_object().cloned().unwrap()).is_err());
    assert!(repo.is_empty());
}

#[test]
fn storage_registry_resolves_registered_storages() {
    let registry = MemoryStorageRegistry::new();
    registry.register(Arc::new(MemoryStorage::new(3, "uploads")));
    assert_eq!(registry.storage_object(3).unwrap().uid(), 3);
    let err = registry.storage_object(4).err().unwrap();
    assert!(err.to_string().contains("storage 4"));
}

#[test]
fn storage_without_public_base_has_no_url() {
    let storage = Arc::new(MemoryStorage::new(1, "private"));
    storage.put("/secret.pdf", vec![1u8, 2, 3], "application/pdf");
    let (factory, _, _) = factory_over(storage);
    let file = factory.file_object_on_storage(1, json!({ "identifier": "/secret.pdf" }).as_object().cloned().unwrap()).unwrap();
    assert_eq!(file.public_url(false).unwrap(), None);
    assert_eq!(file.file_type().unwrap(), crate::resource::types::FileType::Application);
}

#[test]
fn factory_validates_and_normalizes_identifiers() {
    let storage = Arc::new(MemoryStorage::new(1, "fileadmin"));
    let (factory, _, _) = factory_over(storage.clone());

    let bad = factory.file_object(json!({ "identifier": "no-slash.txt" }).as_object().cloned().unwrap(), storage.clone());
    assert!(matches!(bad, Err(crate::error::ResourceError::InvalidIdentifier { .. })));

    let file = factory
        .file_object(json!({ "identifier": "/Cafe\u{0301}.txt" }).as_object().cloned().unwrap(), storage)
        .unwrap();
    assert_eq!(file.identifier(), "/Caf\u{00e9}.txt");
    assert_eq!(file.name(), "Caf\u{00e9}.txt");
    assert_eq!(file.property_raw("storage"), Some(json!(1)));
}

#[test]
fn factory_rehydrates_from_combined_identifier() {
    let storage = Arc::new(MemoryStorage::new(1, "fileadmin"));
    storage.put("/a.txt", "hello", "text/plain");
    storage.put("/b.txt", "world!", "text/plain");
    let (factory, index, indexer) = factory_over(storage);
    index.insert(json!({ "storage": 1, "identifier": "/a.txt", "size": 5 }).as_object().cloned().unwrap()).unwrap();

    let a = factory.file_object_by_combined_identifier("1:/a.txt").unwrap();
    assert!(a.is_indexed().unwrap());
    assert_eq!(a.uid().unwrap(), 1);

    let b = factory.file_object_by_combined_identifier("1:/b.txt").unwrap();
    assert_eq!(b.index_state(), crate::resource::types::IndexState::Unknown);
    assert_eq!(b.size().unwrap(), 6);
    assert_eq!(indexer.call_count(), 1);

    assert!(factory.file_object_by_combined_identifier("nope").is_err());
    assert!(factory.file_object_by_combined_identifier("x:/a.txt").is_err());
    assert!(factory.file_object_by_combined_identifier("9:/a.txt").is_err());
}

#[test]
fn public_urls_encode_identifier_segments() {
    let storage = Arc::new(MemoryStorage::new(1, "fileadmin").with_public_base_url("https://example.org/fileadmin/"));
    storage.put("/user upload/Gr\u{00fc}\u{00df}e & more.txt", "x", "text/plain");
    let (factory, _, _) = factory_over(storage);
    let file = factory
        .file_object_on_storage(1, json!({ "identifier": "/user upload/Gr\u{00fc}\u{00df}e & more.txt", "uid": 8 }).as_object().cloned().unwrap())
        .unwrap();
    assert_eq!(
        file.public_url(false).unwrap().as_deref(),
        Some("https://example.org/fileadmin/user%20upload/Gr%C3%BC%C3%9Fe%20%26%20more.txt")
    );
}
