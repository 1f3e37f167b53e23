//! # Error Types
//!
//! Domain-specific error types for vetsync-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  vetsync-core errors (this file)                                       │
//! │  └── ValidationError  - Malformed / incomplete source payloads         │
//! │                                                                         │
//! │  vetsync-db errors (separate crate)                                    │
//! │  └── DbError          - Store constraint / connection failures         │
//! │                                                                         │
//! │  vetsync-sync errors (separate crate)                                  │
//! │  └── SyncError        - Everything the orchestrator can observe        │
//! │                                                                         │
//! │  Flow: ValidationError → SyncError → PhaseReport (counted, never lost) │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Validation Error
// =============================================================================

/// Payload validation errors.
///
/// Raised while mapping a loosely-typed source payload into one of the
/// explicit entity records. A record that fails here is skipped and counted
/// as an error by the phase that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{entity}: {field} is required")]
    Required {
        entity: &'static str,
        field: &'static str,
    },

    /// Field is present but cannot be interpreted.
    #[error("{entity}: {field} has invalid format: {reason}")]
    InvalidFormat {
        entity: &'static str,
        field: &'static str,
        reason: String,
    },

    /// A parent reference (flat `*_id` or nested `{id}`) is absent.
    #[error("{entity}: no {parent} reference")]
    MissingReference {
        entity: &'static str,
        parent: &'static str,
    },

    /// The payload is not a JSON object.
    #[error("{entity}: payload is not an object")]
    NotAnObject { entity: &'static str },
}

impl ValidationError {
    /// Creates a `Required` error.
    pub fn required(entity: &'static str, field: &'static str) -> Self {
        ValidationError::Required { entity, field }
    }

    /// Creates an `InvalidFormat` error.
    pub fn invalid(entity: &'static str, field: &'static str, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            entity,
            field,
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for payload mapping.
pub type ValidationResult<T> = Result<T, ValidationError>;
