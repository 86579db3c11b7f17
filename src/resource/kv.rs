//! Namespaced KV key builders, combined identifiers and checksum helpers.
//! Keep this module focused and small; record logic belongs in `file`.

use xxhash_rust::xxh3::xxh3_128;

#[inline]
fn ns(prefix: &str) -> String {
    format!("fal.{}::", prefix)
}

/// Key combining a storage's uid with a file identifier inside that storage.
pub fn combined_identifier(storage_uid: u64, identifier: &str) -> String {
    format!("{}:{}", storage_uid, identifier)
}

/// Build keys for the in-memory collaborator namespaces.
pub struct Keys;

impl Keys {
    pub fn index(combined_identifier: &str) -> String {
        format!("{}{}", ns("index"), combined_identifier)
    }
    pub fn metadata(file_uid: i64) -> String {
        format!("{}{}", ns("metadata"), file_uid)
    }
    pub fn blob(identifier: &str) -> String {
        format!("{}{}", ns("blob"), identifier)
    }
}

/// Fingerprint of a file used to sign derived-asset URLs (thumbnails etc.).
/// xxh3_128 over `combined|mime|secret`, as fixed-width lowercase hex.
pub fn checksum_for(combined_identifier: &str, mime_type: &str, secret: &str) -> String {
    let input = format!("{}|{}|{}", combined_identifier, mime_type, secret);
    let h = xxh3_128(input.as_bytes());
    format!("{h:032x}")
}

#[cfg(test)]
mod kv_tests;
