// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Error types for the catalog client

use thiserror::Error;

use crate::transport::{FailureClass, HttpError};

/// Catalog client error
#[derive(Debug, Error)]
pub enum Error {
    /// The remote store has no entry at this URL
    #[error("not found: {url}")]
    NotFound {
        /// URL that returned 404
        url: String,
    },

    /// 401 from the remote store or IAM
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// 403 from the remote store
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// A page reported a resource count that disagrees with its array
    #[error("protocol violation at {url} (offset {offset}): resource_count={reported} but {actual} resources returned")]
    ProtocolViolation {
        /// Page URL
        url: String,
        /// Offset requested
        offset: usize,
        /// Count reported by the server
        reported: usize,
        /// Length of the returned array
        actual: usize,
    },

    /// A resource failed the sidecar, name/id or status checks
    #[error("inconsistent entry {id}: {reason}")]
    InconsistentEntry {
        /// Remote entry id
        id: String,
        /// What did not match
        reason: String,
    },

    /// Declared schema version differs from the one this client writes
    #[error("schema mismatch for {id}: found {found:?}, expected {expected:?}")]
    SchemaMismatch {
        /// Remote entry id
        id: String,
        /// Declared version
        found: String,
        /// Current version
        expected: String,
    },

    /// Write attempted without the right context, or a required sidecar was nil
    #[error("policy violation: {0}")]
    PolicyViolation(String),

    /// Include-options bits are inconsistent or unknown
    #[error("invalid include options: {0}")]
    InvalidOptions(String),

    /// A domain variant was requested that has no override on the record
    #[error("domain {domain} unavailable for {id}")]
    DomainUnavailable {
        /// Remote entry id
        id: String,
        /// Requested domain
        domain: String,
    },

    /// Unparseable domain name
    #[error("invalid domain: {0:?}")]
    InvalidDomain(String),

    /// Update attempted on an id the Parent-Map has never seen
    #[error("entry {0} was not loaded before update")]
    NotLoaded(String),

    /// The token provider could not produce a bearer
    #[error("token unavailable for key {key}: {reason}")]
    TokenUnavailable {
        /// Key-file credential name
        key: String,
        /// Underlying failure
        reason: String,
    },

    /// A retryable failure that persisted after the retry
    #[error("transient failure: {0}")]
    Transient(String),

    /// Any other HTTP status
    #[error(transparent)]
    Http(HttpError),

    /// Malformed canonical resource name
    #[error("invalid CRN {crn:?}: {reason}")]
    InvalidCrn {
        /// Input string
        crn: String,
        /// What was wrong
        reason: String,
    },

    /// The caller cancelled the operation
    #[error("operation cancelled")]
    Cancelled,

    /// JSON encode/decode failure outside of transport
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Key file could not be read
    #[error("key file {path}: {reason}")]
    KeyFile {
        /// Key file path
        path: String,
        /// Underlying failure
        reason: String,
    },

    /// Settings could not be loaded
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Bad name pattern
    #[error("invalid name pattern: {0}")]
    Pattern(#[from] globset::Error),
}

impl Error {
    /// True for the 404 sentinel
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Errors that lenient mode may downgrade to a warning
    #[must_use]
    pub fn is_inconsistency(&self) -> bool {
        matches!(self, Self::InconsistentEntry { .. } | Self::SchemaMismatch { .. })
    }

    /// Errors that abort a traversal instead of being counted and skipped
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Unauthorized(_)
                | Self::Forbidden(_)
                | Self::ProtocolViolation { .. }
                | Self::PolicyViolation(_)
                | Self::InvalidOptions(_)
                | Self::TokenUnavailable { .. }
                | Self::Transient(_)
                | Self::Http(_)
                | Self::Cancelled
        )
    }

    pub(crate) fn inconsistent(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InconsistentEntry { id: id.into(), reason: reason.into() }
    }
}

impl From<HttpError> for Error {
    fn from(e: HttpError) -> Self {
        match (e.status, e.class) {
            (Some(404), _) => Self::NotFound { url: e.url },
            (Some(401), _) => Self::Unauthorized(e.to_string()),
            (Some(403), _) => Self::Forbidden(e.to_string()),
            (_, FailureClass::Transient) => Self::Transient(e.to_string()),
            _ => Self::Http(e),
        }
    }
}

/// Result type for catalog operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    fn http(status: Option<u16>, class: FailureClass) -> HttpError {
        HttpError {
            status,
            url: "https://catalog.test/api/v1/oss.x".into(),
            attribution: "test".into(),
            message: "boom".into(),
            class,
        }
    }

    #[test]
    fn test_http_status_mapping() {
        assert!(Error::from(http(Some(404), FailureClass::Fatal)).is_not_found());
        assert!(matches!(Error::from(http(Some(401), FailureClass::Fatal)), Error::Unauthorized(_)));
        assert!(matches!(Error::from(http(Some(403), FailureClass::Fatal)), Error::Forbidden(_)));
        assert!(matches!(Error::from(http(Some(503), FailureClass::Transient)), Error::Transient(_)));
        assert!(matches!(Error::from(http(Some(400), FailureClass::Fatal)), Error::Http(_)));
    }

    #[test]
    fn test_classification() {
        assert!(Error::inconsistent("oss.x", "bad").is_inconsistency());
        assert!(!Error::inconsistent("oss.x", "bad").is_fatal());
        assert!(Error::Cancelled.is_fatal());
        assert!(!Error::NotFound { url: String::new() }.is_fatal());
    }
}
