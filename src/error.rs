//! Error types for pocket-ledger
//!
//! Every failure in the crate is a variant of [`LedgerError`]. Raw signals
//! coming out of the record store are carried as [`EngineFailure`] until
//! [`classify`] folds them into the taxonomy the rest of the application
//! reasons about (connection, transaction, migration, generic database).

use std::fmt;

use thiserror::Error;

use crate::storage::TableName;
use crate::validation::ValidationIssue;

/// The main error type for pocket-ledger operations
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Unclassified storage failure
    #[error("Database error: {0}")]
    Database(String),

    /// One or more records failed validation. Never retried.
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        issues: Vec<ValidationIssue>,
    },

    /// The storage engine is unavailable or broken
    #[error("Connection error: {0}")]
    Connection(String),

    /// A transaction was aborted; safe to retry
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// A migration step failed
    #[error("Migration to version {version} failed: {cause}")]
    Migration { version: u32, cause: String },

    /// A backup payload was rejected before touching the store
    #[error("Import failed: {0}")]
    Import(#[from] ImportFailure),

    /// A backup could not be produced
    #[error("Export error: {0}")]
    Export(String),

    /// Entity not found errors
    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: &'static str,
        identifier: String,
    },

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),

    /// Raw storage engine signal, not yet classified
    #[error("Storage engine error: {0}")]
    Engine(#[from] EngineFailure),
}

/// Low-level failure signals raised by a record store implementation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineFailure {
    /// The persisted schema is newer than this build understands
    #[error("stored schema version {found} is newer than supported version {supported}")]
    VersionMismatch { found: u32, supported: u32 },

    /// The store is closed or its internal state is unusable
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// The enclosing transaction already finished
    #[error("transaction is no longer active")]
    TransactionInactive,

    /// A write was attempted inside a read-only transaction
    #[error("{0} is read-only in this transaction")]
    ReadOnly(String),

    /// A table outside the transaction's declared scope was touched
    #[error("table {0} is not part of this transaction")]
    OutOfScope(TableName),

    /// A key constraint was violated (duplicate id, missing row)
    #[error("constraint violated: {0}")]
    Constraint(String),
}

/// Why a backup payload was refused
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ImportFailure {
    /// The payload could not be decoded or parsed
    #[error("malformed backup: {0}")]
    Malformed(String),

    #[error("backup metadata is missing")]
    MissingMetadata,

    #[error("backup metadata has no checksum")]
    MissingChecksum,

    /// The payload was altered after export
    #[error("checksum mismatch: expected {expected}, computed {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    /// One or more collections failed batch validation
    #[error("backup data failed validation ({} issue(s))", issues.len())]
    Invalid { issues: Vec<ValidationIssue> },

    /// The backup was written by a newer schema than this build supports
    #[error("backup schema version {found} is newer than supported version {supported}")]
    UnsupportedSchema { found: u32, supported: u32 },
}

/// Coarse classification of a [`LedgerError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Database,
    Validation,
    Connection,
    Transaction,
    Migration,
    Import,
    Export,
    NotFound,
    Config,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Database => "DatabaseError",
            Self::Validation => "ValidationError",
            Self::Connection => "ConnectionError",
            Self::Transaction => "TransactionError",
            Self::Migration => "MigrationError",
            Self::Import => "ImportError",
            Self::Export => "ExportError",
            Self::NotFound => "NotFoundError",
            Self::Config => "ConfigError",
        };
        write!(f, "{}", name)
    }
}

impl LedgerError {
    /// Create a "not found" error for accounts
    pub fn account_not_found(identifier: impl fmt::Display) -> Self {
        Self::NotFound {
            entity_type: "Account",
            identifier: identifier.to_string(),
        }
    }

    /// Create a "not found" error for categories
    pub fn category_not_found(identifier: impl fmt::Display) -> Self {
        Self::NotFound {
            entity_type: "Category",
            identifier: identifier.to_string(),
        }
    }

    /// Create a "not found" error for budgets
    pub fn budget_not_found(identifier: impl fmt::Display) -> Self {
        Self::NotFound {
            entity_type: "Budget",
            identifier: identifier.to_string(),
        }
    }

    /// The taxonomy bucket this error falls into after classification
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Connection(_) => ErrorKind::Connection,
            Self::Transaction(_) => ErrorKind::Transaction,
            Self::Migration { .. } => ErrorKind::Migration,
            Self::Import(_) => ErrorKind::Import,
            Self::Export(_) => ErrorKind::Export,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Config(_) => ErrorKind::Config,
            Self::Engine(EngineFailure::VersionMismatch { .. }) => ErrorKind::Migration,
            Self::Engine(EngineFailure::InvalidState(_)) => ErrorKind::Connection,
            Self::Engine(EngineFailure::TransactionInactive) => ErrorKind::Transaction,
            Self::Database(_) | Self::Io(_) | Self::Json(_) | Self::Engine(_) => {
                ErrorKind::Database
            }
        }
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is an aborted transaction, classified or raw
    pub fn is_transaction_failure(&self) -> bool {
        matches!(
            self,
            Self::Transaction(_) | Self::Engine(EngineFailure::TransactionInactive)
        )
    }

    /// Validation issues attached to this error, if any
    pub fn issues(&self) -> &[ValidationIssue] {
        match self {
            Self::Validation { issues, .. } => issues,
            Self::Import(ImportFailure::Invalid { issues }) => issues,
            _ => &[],
        }
    }
}

/// Normalise an error into the taxonomy.
///
/// Errors that already belong to a taxonomy bucket are returned unchanged;
/// raw engine signals and I/O or JSON failures are mapped onto
/// connection, transaction, migration or generic database errors.
pub fn classify(err: LedgerError) -> LedgerError {
    match err {
        LedgerError::Engine(EngineFailure::VersionMismatch { found, supported }) => {
            LedgerError::Migration {
                version: found,
                cause: format!(
                    "Database version mismatch: stored {}, supported {}",
                    found, supported
                ),
            }
        }
        LedgerError::Engine(EngineFailure::InvalidState(msg)) => {
            LedgerError::Connection(format!("Database connection error: {}", msg))
        }
        LedgerError::Engine(EngineFailure::TransactionInactive) => {
            LedgerError::Transaction("Transaction is no longer active".into())
        }
        LedgerError::Engine(other) => {
            LedgerError::Database(format!("Unexpected database error: {}", other))
        }
        LedgerError::Io(msg) | LedgerError::Json(msg) => {
            LedgerError::Database(format!("Unexpected database error: {}", msg))
        }
        classified => classified,
    }
}

// Implement From traits for common error types

impl From<std::io::Error> for LedgerError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

/// Result type alias for pocket-ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LedgerError::Config("test error".into());
        assert_eq!(err.to_string(), "Configuration error: test error");
    }

    #[test]
    fn test_not_found_error() {
        let err = LedgerError::category_not_found(7);
        assert_eq!(err.to_string(), "Category not found: 7");
        assert!(err.is_not_found());
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_migration_error_display() {
        let err = LedgerError::Migration {
            version: 3,
            cause: "boom".into(),
        };
        assert_eq!(err.to_string(), "Migration to version 3 failed: boom");
    }

    #[test]
    fn test_classify_version_mismatch() {
        let err = classify(EngineFailure::VersionMismatch {
            found: 9,
            supported: 3,
        }
        .into());
        assert!(matches!(err, LedgerError::Migration { version: 9, .. }));
    }

    #[test]
    fn test_classify_invalid_state() {
        let err = classify(EngineFailure::InvalidState("closed".into()).into());
        assert!(matches!(err, LedgerError::Connection(_)));
        assert!(err.to_string().contains("closed"));
    }

    #[test]
    fn test_classify_transaction_inactive() {
        let raw: LedgerError = EngineFailure::TransactionInactive.into();
        assert!(raw.is_transaction_failure());
        let err = classify(raw);
        assert!(matches!(err, LedgerError::Transaction(_)));
    }

    #[test]
    fn test_classify_unknown_becomes_database() {
        let err = classify(EngineFailure::Constraint("duplicate key 4".into()).into());
        assert!(matches!(err, LedgerError::Database(_)));

        let io_err = std::io::Error::new(std::io::ErrorKind::Other, "disk gone");
        let err = classify(io_err.into());
        assert!(matches!(err, LedgerError::Database(_)));
    }

    #[test]
    fn test_classify_keeps_taxonomy_errors() {
        let err = classify(LedgerError::Validation {
            message: "bad".into(),
            issues: Vec::new(),
        });
        assert!(err.is_validation());

        let err = classify(LedgerError::Transaction("aborted".into()));
        assert_eq!(err.kind(), ErrorKind::Transaction);
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let ledger_err: LedgerError = io_err.into();
        assert!(matches!(ledger_err, LedgerError::Io(_)));
    }

    #[test]
    fn test_import_failure_display() {
        let err: LedgerError = ImportFailure::ChecksumMismatch {
            expected: "deadbeef".into(),
            actual: "0000abcd".into(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "Import failed: checksum mismatch: expected deadbeef, computed 0000abcd"
        );
        assert_eq!(err.kind(), ErrorKind::Import);
    }
}
