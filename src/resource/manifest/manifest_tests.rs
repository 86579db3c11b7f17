use super::*;
use std::io::Write;

const SAMPLE: &str = r#"{
  "storages": [
    { "uid": 1, "name": "fileadmin", "public_base_url": "https://example.org/fileadmin" },
    { "uid": 2, "name": "archive", "config": { "indexable": false } }
  ],
  "files": [
    { "storage": 1, "identifier": "/images/logo.png", "contents": "PNG", "mime_type": "image/png",
      "indexed": true, "metadata": { "alternative": "Company logo" } },
    { "storage": 1, "identifier": "/docs/readme.txt", "contents": "read me", "mime_type": "text/plain" },
    { "storage": 1, "identifier": "/docs/gone.txt", "contents": "", "missing": true },
    { "storage": 2, "identifier": "/old.bin", "contents": "xx" }
  ]
}"#;

#[test]
fn manifest_file_round_trip_through_disk() {
    let mut tmp = tempfile::NamedTempFile::new().unwrap();
    tmp.write_all(SAMPLE.as_bytes()).unwrap();
    let manifest = Manifest::from_path(tmp.path()).unwrap();
    assert_eq!(manifest.storages.len(), 2);
    assert_eq!(manifest.files.len(), 4);
    assert_eq!(manifest.storages[1].config.indexable, Some(false));
}

#[test]
fn unreadable_manifest_reports_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.json");
    let err = Manifest::from_path(&path).unwrap_err();
    assert!(format!("{err:#}").contains("absent.json"));
}

#[test]
fn load_builds_records_per_file() {
    let manifest: Manifest = serde_json::from_str(SAMPLE).unwrap();
    let loaded = load_manifest(&manifest, GlobalResourceConfig::default()).unwrap();
    assert_eq!(loaded.files.len(), 4);

    let logo = &loaded.files[0];
    assert!(logo.is_indexed().unwrap());
    assert_eq!(logo.property("alternative").unwrap(), Some(json!("Company logo")));
    assert_eq!(logo.public_url(false).unwrap().as_deref(), Some("https://example.org/fileadmin/images/logo.png"));

    let readme = &loaded.files[1];
    assert_eq!(readme.index_state(), crate::resource::types::IndexState::Unknown);
    assert_eq!(readme.size().unwrap(), 7);
    assert!(readme.is_indexed().unwrap());

    let gone = &loaded.files[2];
    assert!(gone.is_missing().unwrap());
    assert_eq!(gone.public_url(false).unwrap(), None);

    let archived = &loaded.files[3];
    assert!(!archived.is_indexable());
    assert!(!archived.is_indexed().unwrap());
}

#[test]
fn unknown_storage_is_rejected() {
    let manifest: Manifest = serde_json::from_value(json!({
        "storages": [],
        "files": [{ "storage": 5, "identifier": "/a.txt" }]
    }))
    .unwrap();
    let err = load_manifest(&manifest, GlobalResourceConfig::default()).err().unwrap();
    assert!(err.to_string().contains("unknown storage 5"));
}

#[test]
fn decomposed_identifiers_are_loaded_in_nfc() {
    let manifest: Manifest = serde_json::from_value(json!({
        "storages": [{ "uid": 1, "name": "fileadmin" }],
        "files": [{ "storage": 1, "identifier": "/Cafe\u{0301}.txt", "contents": "menu", "indexed": true }]
    }))
    .unwrap();
    let loaded = load_manifest(&manifest, GlobalResourceConfig::default()).unwrap();
    let cafe = &loaded.files[0];
    assert_eq!(cafe.index_state(), crate::resource::types::IndexState::Indexed);
    assert_eq!(cafe.identifier(), "/Caf\u{00e9}.txt");
    assert_eq!(cafe.size().unwrap(), 4);
    assert_eq!(cafe.to_array().unwrap().get("name"), Some(&json!("Caf\u{00e9}.txt")));
}
