//! Error model for file records.
//! Two failures originate in the record itself (missing index record, double merge);
//! everything a collaborator raises passes through untouched as `Collaborator`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResourceError {
    /// Indexing was required, no record exists and creation was disabled.
    #[error("could not load index record for \"{combined_identifier}\"")]
    IndexRecordNotFound { combined_identifier: String },

    /// An index record was merged onto a file that already has a persisted identity.
    #[error("uid property is already set ({uid}); cannot merge index record")]
    UidAlreadySet { uid: i64 },

    /// Identifier rejected before a record was built for it.
    #[error("invalid identifier \"{identifier}\": {reason}")]
    InvalidIdentifier { identifier: String, reason: String },

    #[error(transparent)]
    Collaborator(#[from] anyhow::Error),
}

impl ResourceError {
    pub fn code_str(&self) -> &'static str {
        match self {
            ResourceError::IndexRecordNotFound { .. } => "index_record_not_found",
            ResourceError::UidAlreadySet { .. } => "uid_already_set",
            ResourceError::InvalidIdentifier { .. } => "invalid_identifier",
            ResourceError::Collaborator(_) => "collaborator_error",
        }
    }

    /// Map to HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            ResourceError::IndexRecordNotFound { .. } => 404,
            ResourceError::UidAlreadySet { .. } => 409,
            ResourceError::InvalidIdentifier { .. } => 400,
            ResourceError::Collaborator(_) => 500,
        }
    }
}

pub type ResourceResult<T> = Result<T, ResourceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_and_status_mapping() {
        let nf = ResourceError::IndexRecordNotFound { combined_identifier: "1:/a.txt".into() };
        assert_eq!(nf.code_str(), "index_record_not_found");
        assert_eq!(nf.http_status(), 404);
        assert!(nf.to_string().contains("1:/a.txt"));

        let dup = ResourceError::UidAlreadySet { uid: 3 };
        assert_eq!(dup.code_str(), "uid_already_set");
        assert_eq!(dup.http_status(), 409);

        let bad = ResourceError::InvalidIdentifier { identifier: "a".into(), reason: "no leading '/'".into() };
        assert_eq!(bad.http_status(), 400);

        let io = ResourceError::from(anyhow::anyhow!("disk gone"));
        assert_eq!(io.code_str(), "collaborator_error");
        assert_eq!(io.to_string(), "disk gone");
    }
}
