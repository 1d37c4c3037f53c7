//! Error types and result types for store and verb operations.
//!
//! Two layers of errors exist:
//!
//! - [`DocumentStoreError`] is raised by storage backends and by the record/query helpers.
//! - [`ActionError`] is what every verb (`post`, `get`, `put`, `patch`, `del`, ...) returns.
//!   It wraps the failing [`ActionErrorKind`] together with a numeric `status` that is
//!   always set by the time the error leaves a verb.

use bson::error::Error as BsonError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// Status assigned to every verb error that does not carry one of its own.
pub const DEFAULT_ERROR_STATUS: u16 = 400;

/// Represents all possible errors that can occur when interacting with a document store.
///
/// This enum covers serialization errors, document lifecycle issues, query shape problems
/// and backend-specific errors.
#[derive(Error, Debug)]
pub enum DocumentStoreError {
    /// Serialization/deserialization error when converting between document formats (BSON, JSON).
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// A document with the given ID already exists in the collection.
    /// The first argument is the document ID, the second is the collection name.
    #[error("Document {0} already exists in collection {1}")]
    DocumentAlreadyExists(String, String),
    /// The requested document was not found in the collection.
    /// The first argument is the document ID, the second is the collection name.
    #[error("Document not found {0} in collection {1}")]
    DocumentNotFound(String, String),
    /// The requested collection does not exist in the store.
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),
    /// A unique index rejected the write.
    /// The first argument is the indexed field, the second is the collection name.
    #[error("Duplicate value for unique field {0} in collection {1}")]
    DuplicateKey(String, String),
    /// The document violates schema constraints or has invalid structure.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
    /// The filter, projection or sort specification cannot be understood.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
    /// The backend refused the operation and chose the status to report for it.
    #[error("{message}")]
    Rejected {
        /// Status the backend wants surfaced to callers.
        status: u16,
        /// Human readable reason.
        message: String,
    },
    /// An error occurred in the underlying storage backend.
    #[error("Backend error: {0}")]
    Backend(String),
    /// An unknown error occurred.
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl DocumentStoreError {
    /// Returns the status the backend attached to this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            DocumentStoreError::Rejected { status, .. } if *status != 0 => Some(*status),
            _ => None,
        }
    }
}

/// A specialized `Result` type for document store operations.
///
/// This type alias is used throughout the crate to indicate operations that may fail
/// with a [`DocumentStoreError`].
pub type DocumentStoreResult<T> = Result<T, DocumentStoreError>;

impl From<BsonError> for DocumentStoreError {
    fn from(err: BsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}

impl From<SerdeJsonError> for DocumentStoreError {
    fn from(err: SerdeJsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}

/// The reason a verb failed.
#[derive(Error, Debug)]
pub enum ActionErrorKind {
    /// No identifier could be resolved from the call arguments.
    #[error("Missing Instance Id")]
    MissingInstanceId,
    /// The positional arguments do not match any accepted call shape.
    #[error("Illegal Arguments")]
    IllegalArguments,
    /// A call argument is present but malformed (e.g. an id that is not a UUID).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    /// A before/after hook aborted the pipeline.
    #[error("{0}")]
    Hook(String),
    /// The storage backend (or a record/query helper) failed.
    #[error(transparent)]
    Store(#[from] DocumentStoreError),
}

/// Error returned by every verb.
///
/// `status` is `0` while the error travels through a pipeline without an explicit status;
/// [`ActionError::normalized`] runs at the tail of every verb and replaces it with
/// [`DEFAULT_ERROR_STATUS`].
#[derive(Error, Debug)]
#[error("{kind}")]
pub struct ActionError {
    status: u16,
    #[source]
    kind: ActionErrorKind,
}

/// A specialized `Result` type for verb operations.
pub type ActionResult<T> = Result<T, ActionError>;

impl ActionError {
    /// Creates an error of the given kind without a status.
    pub fn new(kind: ActionErrorKind) -> Self {
        Self { status: 0, kind }
    }

    /// No identifier could be resolved from the call arguments.
    pub fn missing_instance_id() -> Self {
        Self::new(ActionErrorKind::MissingInstanceId).with_status(DEFAULT_ERROR_STATUS)
    }

    /// The call arguments do not match any accepted shape.
    pub fn illegal_arguments() -> Self {
        Self::new(ActionErrorKind::IllegalArguments).with_status(DEFAULT_ERROR_STATUS)
    }

    /// A call argument is malformed.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ActionErrorKind::InvalidArgument(message.into())).with_status(DEFAULT_ERROR_STATUS)
    }

    /// Error raised from inside a hook. The status is left unset so the normalizer
    /// applies the default; use [`ActionError::with_status`] to pick another one.
    pub fn hook(message: impl Into<String>) -> Self {
        Self::new(ActionErrorKind::Hook(message.into()))
    }

    /// Sets the status of this error.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Fills in [`DEFAULT_ERROR_STATUS`] when no status was set; leaves the error otherwise
    /// untouched.
    pub fn normalized(mut self) -> Self {
        if self.status == 0 {
            self.status = DEFAULT_ERROR_STATUS;
        }
        self
    }

    /// Returns the status of this error, `0` if it was never normalized or assigned.
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Returns the reason of this error.
    pub fn kind(&self) -> &ActionErrorKind {
        &self.kind
    }

    /// Consumes the error, returning its reason.
    pub fn into_kind(self) -> ActionErrorKind {
        self.kind
    }

    /// Returns `true` when the error comes from an id lookup that matched nothing.
    pub fn is_not_found(&self) -> bool {
        matches!(self.kind, ActionErrorKind::Store(DocumentStoreError::DocumentNotFound(..)))
    }
}

impl From<DocumentStoreError> for ActionError {
    fn from(err: DocumentStoreError) -> Self {
        let status = err.status().unwrap_or(0);
        Self::new(ActionErrorKind::Store(err)).with_status(status)
    }
}

impl From<ActionErrorKind> for ActionError {
    fn from(kind: ActionErrorKind) -> Self {
        match kind {
            ActionErrorKind::Store(err) => err.into(),
            kind => Self::new(kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizer_defaults_missing_status() {
        let error = ActionError::hook("nope").normalized();
        assert_eq!(error.status(), 400);
        assert_eq!(error.to_string(), "nope");
    }

    #[test]
    fn normalizer_keeps_explicit_status() {
        let error = ActionError::hook("forbidden").with_status(403).normalized();
        assert_eq!(error.status(), 403);
    }

    #[test]
    fn store_errors_carry_backend_status() {
        let rejected: ActionError = DocumentStoreError::Rejected {
            status: 409,
            message: "conflict".to_string(),
        }
        .into();
        assert_eq!(rejected.status(), 409);

        let unknown: ActionError = DocumentStoreError::Backend("down".to_string()).into();
        assert_eq!(unknown.status(), 0);
        assert_eq!(unknown.normalized().status(), 400);
    }

    #[test]
    fn argument_errors_are_bad_requests() {
        assert_eq!(ActionError::missing_instance_id().status(), 400);
        assert_eq!(ActionError::missing_instance_id().to_string(), "Missing Instance Id");
        assert_eq!(ActionError::illegal_arguments().to_string(), "Illegal Arguments");
    }

    #[test]
    fn not_found_is_detected() {
        let error: ActionError =
            DocumentStoreError::DocumentNotFound("abc".to_string(), "users".to_string()).into();
        assert!(error.is_not_found());
        assert!(!ActionError::illegal_arguments().is_not_found());
    }
}
