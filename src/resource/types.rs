//! Core data contracts shared by file records and their collaborators.
//! Keep this module purely about types/serde and light helpers.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Property bag of a file, index record or metadata row.
pub type Properties = serde_json::Map<String, Value>;

/// Whether the persisted index record has been loaded or created yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexState {
    Unknown,
    Indexed,
}

/// Actions a storage may grant or deny on a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileAction {
    Read,
    Write,
    Delete,
}

impl FileAction {
    pub const ALL: [FileAction; 3] = [FileAction::Read, FileAction::Write, FileAction::Delete];

    pub fn as_str(&self) -> &'static str {
        match self {
            FileAction::Read => "read",
            FileAction::Write => "write",
            FileAction::Delete => "delete",
        }
    }
}

/// Coarse file type derived from the MIME type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Unknown = 0,
    Text = 1,
    Image = 2,
    Audio = 3,
    Video = 4,
    Application = 5,
}

impl FileType {
    pub fn from_mime(mime: &str) -> Self {
        match mime.split('/').next().unwrap_or_default() {
            "text" => FileType::Text,
            "image" => FileType::Image,
            "audio" => FileType::Audio,
            "video" => FileType::Video,
            "application" | "software" => FileType::Application,
            _ => FileType::Unknown,
        }
    }

    pub fn code(&self) -> i64 {
        *self as i64
    }
}

/// Result of a storage-side processing task (thumbnail, crop, ...).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProcessedFile {
    pub original: String,
    pub task_type: String,
    pub identifier: String,
    #[serde(default)]
    pub configuration: Properties,
}

/// Integer view of a property value: numbers truncate, numeric strings parse,
/// booleans map to 0/1, anything else is 0.
pub fn int_of(value: Option<&Value>) -> i64 {
    match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Some(Value::String(s)) => {
            let t = s.trim();
            t.parse::<i64>()
                .ok()
                .or_else(|| t.parse::<f64>().ok().map(|f| f as i64))
                .unwrap_or(0)
        }
        Some(Value::Bool(b)) => i64::from(*b),
        _ => 0,
    }
}

/// Truthiness of a property value in the loose sense used by flags like `missing`.
pub fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => !s.is_empty() && s != "0",
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
        Some(v @ Value::Number(_)) => {
            int_of(Some(v)) != 0 || v.as_f64().map(|f| f != 0.0).unwrap_or(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn int_coercion() {
        assert_eq!(int_of(None), 0);
        assert_eq!(int_of(Some(&json!(7))), 7);
        assert_eq!(int_of(Some(&json!("12"))), 12);
        assert_eq!(int_of(Some(&json!("abc"))), 0);
        assert_eq!(int_of(Some(&json!(3.9))), 3);
        assert_eq!(int_of(Some(&json!(true))), 1);
        assert_eq!(int_of(Some(&json!(null))), 0);
    }

    #[test]
    fn truthiness() {
        assert!(!truthy(None));
        assert!(!truthy(Some(&json!(0))));
        assert!(!truthy(Some(&json!("0"))));
        assert!(!truthy(Some(&json!(""))));
        assert!(truthy(Some(&json!(1))));
        assert!(truthy(Some(&json!(0.5))));
        assert!(truthy(Some(&json!(true))));
    }

    #[test]
    fn file_type_from_mime() {
        assert_eq!(FileType::from_mime("image/png"), FileType::Image);
        assert_eq!(FileType::from_mime("text/plain").code(), 1);
        assert_eq!(FileType::from_mime("application/pdf").code(), 5);
        assert_eq!(FileType::from_mime(""), FileType::Unknown);
    }
}
