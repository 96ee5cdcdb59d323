use thiserror::Error;
use trellis_core_types::ValueError;

/// Result type alias using TrellisError
pub type Result<T> = std::result::Result<T, TrellisError>;

/// Canonical error kind taxonomy
///
/// Every error the engine produces classifies into one of these kinds,
/// and each kind maps to a stable HTTP status for the transport layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    BadRequest,
    Conflict,
    Forbidden,
    TooLarge,
    Internal,
}

impl ErrorKind {
    /// HTTP status carried to the transport layer
    pub fn status(&self) -> u16 {
        match self {
            ErrorKind::NotFound => 404,
            ErrorKind::BadRequest => 400,
            ErrorKind::Conflict => 409,
            ErrorKind::Forbidden => 403,
            ErrorKind::TooLarge => 413,
            ErrorKind::Internal => 500,
        }
    }
}

/// Error taxonomy for schema, traversal, and edit operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrellisError {
    // ===== Schema / path lookup =====
    /// Identifier does not exist in the containing definition
    #[error("{ident} not found in {container}")]
    DefNotFound { ident: String, container: String },

    /// List item with the given key is absent
    #[error("list item not found: {path}")]
    ItemNotFound { path: String },

    /// Navigation above the root of the selection chain
    #[error("no parent path to resolve {path}")]
    NoParent { path: String },

    /// Malformed URL path or query expression
    #[error("malformed path expression: {reason}")]
    PathSyntax { reason: String },

    /// Key value count disagrees with the list's key definitions
    #[error("list {list} expects {expected} key(s), got {got}")]
    KeyCountMismatch {
        list: String,
        expected: usize,
        got: usize,
    },

    // ===== Value domain =====
    /// Raw input failed coercion into the declared type
    #[error("{0}")]
    Value(#[from] ValueError),

    /// Target of a leaf operation is not a leaf
    #[error("property is not a leaf: {ident}")]
    NotLeaf { ident: String },

    // ===== Edit =====
    /// Insert target already exists
    #[error("insert conflict, {path} already exists")]
    InsertExists { path: String },

    /// Update target does not exist
    #[error("update target not found: {path}")]
    UpdateMissing { path: String },

    /// List item created without its key leaves
    #[error("no key for list item in {list}")]
    MissingKey { list: String },

    /// Key leaf written after creation disagrees with the creation key
    #[error("key conflict writing {path}")]
    KeyConflict { path: String },

    /// Switching a choice's active case requires delete then insert
    #[error("cannot change active case of {choice} in update, delete it first")]
    CaseChange { choice: String },

    // ===== Constraints =====
    /// Write denied to a non-config definition
    #[error("{path} is not configurable")]
    NotConfig { path: String },

    /// Node budget for the walk was exceeded
    #[error("response exceeds {max} nodes")]
    MaxNodesExceeded { max: usize },

    /// Explicit refusal from a provider or pre-constraint
    #[error("forbidden: {reason}")]
    Forbidden { reason: String },

    // ===== Provider / engine =====
    /// Error surfaced by a provider node, path appended
    #[error("{msg}, at {path}")]
    Provider { msg: String, path: String },

    /// The request context was cancelled
    #[error("request cancelled")]
    Cancelled,

    /// Serialization failure in a codec node
    #[error("serialization error: {message}")]
    Serialization { message: String },

    /// Generic internal error
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl TrellisError {
    /// Classify into the stable kind taxonomy
    pub fn kind(&self) -> ErrorKind {
        match self {
            TrellisError::DefNotFound { .. }
            | TrellisError::ItemNotFound { .. }
            | TrellisError::NoParent { .. }
            | TrellisError::UpdateMissing { .. } => ErrorKind::NotFound,

            TrellisError::PathSyntax { .. }
            | TrellisError::KeyCountMismatch { .. }
            | TrellisError::Value(_)
            | TrellisError::NotLeaf { .. }
            | TrellisError::MissingKey { .. } => ErrorKind::BadRequest,

            TrellisError::InsertExists { .. }
            | TrellisError::KeyConflict { .. }
            | TrellisError::CaseChange { .. } => ErrorKind::Conflict,

            TrellisError::NotConfig { .. } | TrellisError::Forbidden { .. } => ErrorKind::Forbidden,

            TrellisError::MaxNodesExceeded { .. } => ErrorKind::TooLarge,

            TrellisError::Provider { .. }
            | TrellisError::Cancelled
            | TrellisError::Serialization { .. }
            | TrellisError::Internal { .. } => ErrorKind::Internal,
        }
    }

    /// HTTP status for the transport layer
    pub fn status(&self) -> u16 {
        self.kind().status()
    }

    /// Wrap an unclassified provider error, appending the current path
    pub fn provider(msg: impl Into<String>, path: impl Into<String>) -> Self {
        TrellisError::Provider {
            msg: msg.into(),
            path: path.into(),
        }
    }
}

impl From<serde_json::Error> for TrellisError {
    fn from(err: serde_json::Error) -> Self {
        TrellisError::Serialization {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases: [(TrellisError, u16); 6] = [
            (
                TrellisError::DefNotFound {
                    ident: "x".into(),
                    container: "m".into(),
                },
                404,
            ),
            (
                TrellisError::PathSyntax {
                    reason: "bad".into(),
                },
                400,
            ),
            (TrellisError::InsertExists { path: "a".into() }, 409),
            (TrellisError::NotConfig { path: "a".into() }, 403),
            (TrellisError::MaxNodesExceeded { max: 10 }, 413),
            (
                TrellisError::Internal {
                    message: "boom".into(),
                },
                500,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(err.status(), status, "wrong status for {:?}", err);
        }
    }

    #[test]
    fn test_missing_key_message_prefix() {
        let err = TrellisError::MissingKey { list: "p".into() };
        assert!(err.to_string().starts_with("no key"));
    }
}
