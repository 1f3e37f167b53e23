//! # Sync Errors
//!
//! ```text
//!  config ───── InvalidConfig, InvalidUrl, ConfigLoadFailed, ConfigSaveFailed
//!  source ───── HttpClient, SourceUnavailable
//!  record ───── Validation, Database (constraint kinds)
//!  run ──────── StoreUnavailable (fatal), Interrupted, Internal
//! ```
//!
//! Only [`SyncError::StoreUnavailable`] ends a run. Everything else is
//! counted against a record or a phase and the run continues.

use thiserror::Error;

use vetsync_core::ValidationError;
use vetsync_db::DbError;

pub type SyncResult<T> = Result<T, SyncError>;

/// Everything that can go wrong during a run.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid source URL: {0}")]
    InvalidUrl(String),

    #[error("cannot read config file: {0}")]
    ConfigLoadFailed(String),

    #[error("cannot write config file: {0}")]
    ConfigSaveFailed(String),

    /// The HTTP client could not be built.
    #[error("cannot build HTTP client: {0}")]
    HttpClient(String),

    /// An endpoint returned no data (transport failure or non-2xx).
    #[error("no data from {endpoint}")]
    SourceUnavailable { endpoint: String },

    /// The payload could not be mapped to a record.
    #[error("invalid payload: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Database(#[from] DbError),

    /// The local store cannot be opened.
    #[error("local store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("internal error: {0}")]
    Internal(String),

    /// The run was interrupted.
    #[error("run interrupted")]
    Interrupted,
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Internal(err.to_string())
    }
}

impl From<url::ParseError> for SyncError {
    fn from(err: url::ParseError) -> Self {
        SyncError::InvalidUrl(err.to_string())
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for SyncError {
    fn from(err: toml::de::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for SyncError {
    fn from(err: toml::ser::Error) -> Self {
        SyncError::ConfigSaveFailed(err.to_string())
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        SyncError::HttpClient(err.to_string())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl SyncError {
    /// True when the whole run must stop.
    ///
    /// Only a store that cannot be opened qualifies: there is nothing to
    /// write partial progress into.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SyncError::StoreUnavailable(_))
    }

    /// Errors the operator fixes in `vetsync.toml` or the environment.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            SyncError::InvalidConfig(_)
                | SyncError::InvalidUrl(_)
                | SyncError::ConfigLoadFailed(_)
                | SyncError::ConfigSaveFailed(_)
        )
    }

    /// True when the error belongs to a single record.
    pub fn is_record_error(&self) -> bool {
        match self {
            SyncError::Validation(_) => true,
            SyncError::Database(db) => db.is_constraint_violation(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_store_unavailable_is_fatal() {
        assert!(SyncError::StoreUnavailable("locked".into()).is_fatal());
        assert!(!SyncError::SourceUnavailable {
            endpoint: "/clientes".into()
        }
        .is_fatal());
        assert!(!SyncError::Database(DbError::PoolExhausted).is_fatal());
        assert!(!SyncError::Interrupted.is_fatal());
    }

    #[test]
    fn test_record_errors() {
        let err: SyncError = ValidationError::required("pet", "name").into();
        assert!(err.is_record_error());

        let err: SyncError = DbError::ForeignKeyViolation {
            message: "FOREIGN KEY constraint failed".into(),
        }
        .into();
        assert!(err.is_record_error());

        assert!(!SyncError::Internal("x".into()).is_record_error());
    }

    #[test]
    fn test_config_errors() {
        let err: SyncError = url::Url::parse("not a url").unwrap_err().into();
        assert!(err.is_config_error());
        assert!(!SyncError::Interrupted.is_config_error());
    }
}
