//! # vetsync-core: Pure Domain Logic for VetSync
//!
//! Entity records, payload mapping, field normalization and free-text
//! classification for the clinic mirror. Nothing in this crate performs I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        VetSync Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    vetsync-sync (engine)                        │   │
//! │  │   Source Client ──► Pagination Walker ──► Orchestrator          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ serde_json::Value                      │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              ★ vetsync-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │ normalize │  │ classify  │  │  payload  │  │   │
//! │  │   │ Customer  │  │  phones   │  │ type      │  │ Value ──► │  │   │
//! │  │   │ Pet ...   │  │  dates    │  │ status    │  │ records   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ typed records                          │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    vetsync-db (Entity Store)                    │   │
//! │  │              SQLite upserts, migrations, repositories           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Entity records and closed enumerations
//! - [`normalize`] - Phone and date canonicalization
//! - [`classify`] - Free text → enumeration mapping
//! - [`payload`] - Source JSON → entity records
//! - [`error`] - Validation errors
//!
//! ## Example Usage
//!
//! ```rust
//! use serde_json::json;
//! use vetsync_core::normalize::PhoneRules;
//! use vetsync_core::payload::customer_from_payload;
//!
//! let payload = json!({"id": 42, "nome": "Maria", "telefone": "(19) 99991-4201"});
//! let customer = customer_from_payload(&payload, &PhoneRules::default()).unwrap();
//!
//! assert_eq!(customer.phone.as_deref(), Some("5519999914201"));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod classify;
pub mod error;
pub mod normalize;
pub mod payload;
pub mod types;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{ValidationError, ValidationResult};
pub use normalize::{normalize_date, normalize_datetime, normalize_phone, PhoneRules};
pub use types::*;
