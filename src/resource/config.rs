use serde::{Deserialize, Serialize};

/// Global settings applied to all storages unless overridden.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GlobalResourceConfig {
    /// Installation secret mixed into file checksums
    pub encryption_key: String,
    /// Ask the indexer to extract metadata while creating a missing index record
    pub extract_metadata_on_index: bool,
    /// Create index records on first access when none exist
    pub create_index_if_missing: bool,
}

impl Default for GlobalResourceConfig {
    fn default() -> Self {
        Self {
            encryption_key: String::new(),
            extract_metadata_on_index: false,
            create_index_if_missing: true,
        }
    }
}

impl GlobalResourceConfig {
    /// Defaults overlaid with `FAL_ENCRYPTION_KEY`, `FAL_EXTRACT_METADATA_ON_INDEX`
    /// and `FAL_CREATE_INDEX_IF_MISSING` when set.
    pub fn from_env() -> Self {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();
        if let Some(k) = lookup("FAL_ENCRYPTION_KEY") {
            cfg.encryption_key = k;
        }
        if let Some(v) = lookup("FAL_EXTRACT_METADATA_ON_INDEX").and_then(|v| parse_flag(&v)) {
            cfg.extract_metadata_on_index = v;
        }
        if let Some(v) = lookup("FAL_CREATE_INDEX_IF_MISSING").and_then(|v| parse_flag(&v)) {
            cfg.create_index_if_missing = v;
        }
        cfg
    }
}

fn parse_flag(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Per-storage configuration. Unspecified values inherit from Global.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct StorageConfig {
    /// Files of a non-indexable storage never get index records
    #[serde(default)]
    pub indexable: Option<bool>,
    #[serde(default)]
    pub extract_metadata_on_index: Option<bool>,
    #[serde(default)]
    pub create_index_if_missing: Option<bool>,
}

/// Fully resolved effective config used by file records.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EffectiveConfig {
    pub encryption_key: String,
    pub indexable: bool,
    pub extract_metadata_on_index: bool,
    pub create_index_if_missing: bool,
}

impl Default for EffectiveConfig {
    fn default() -> Self {
        Self::from_layers(&GlobalResourceConfig::default(), &StorageConfig::default())
    }
}

impl EffectiveConfig {
    /// Build an effective config from Global + Storage layers.
    pub fn from_layers(global: &GlobalResourceConfig, storage: &StorageConfig) -> Self {
        Self {
            encryption_key: global.encryption_key.clone(),
            indexable: storage.indexable.unwrap_or(true),
            extract_metadata_on_index: storage
                .extract_metadata_on_index
                .unwrap_or(global.extract_metadata_on_index),
            create_index_if_missing: storage
                .create_index_if_missing
                .unwrap_or(global.create_index_if_missing),
        }
    }
}
