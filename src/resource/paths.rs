use anyhow::{bail, Result};
use unicode_normalization::UnicodeNormalization;

/// Normalize a UTF-8 string to NFC.
pub fn normalize_nfc(input: &str) -> String {
    input.nfc().collect::<String>()
}

/// Validate a storage-relative file identifier:
/// - must start with '/' and must not end with '/' (that would be a folder)
/// - NUL ("\u{0000}") not allowed
/// - no empty segments ('//') and no '.' or '..' segments
pub fn validate_identifier(identifier: &str) -> Result<()> {
    if identifier.is_empty() {
        bail!("identifier cannot be empty");
    }
    if identifier.chars().any(|c| c == '\u{0000}') {
        bail!("identifier cannot contain NUL characters");
    }
    if !identifier.starts_with('/') {
        bail!("identifier must start with '/'");
    }
    if identifier.len() == 1 || identifier.ends_with('/') {
        bail!("identifier must name a file, not a folder");
    }
    for seg in identifier[1..].split('/') {
        if seg.is_empty() {
            bail!("empty segment in identifier");
        }
        if seg == "." || seg == ".." {
            bail!("segments '.' and '..' are not allowed");
        }
    }
    Ok(())
}

/// Last segment of an identifier, used as the display name when none is given.
pub fn name_from_identifier(identifier: &str) -> String {
    identifier
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Lowercased extension of a file name; empty when there is none.
/// A leading dot alone (".htaccess") does not start an extension.
pub fn extension_of(name: &str) -> String {
    match name.rfind('.') {
        Some(0) | None => String::new(),
        Some(i) => name[i + 1..].to_lowercase(),
    }
}
