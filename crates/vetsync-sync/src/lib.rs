//! # vetsync-sync: Sync Engine for VetSync
//!
//! Mirrors the clinic API into the local store, one phase per entity type.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Sync Run Architecture                           │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                  SyncOrchestrator (Main Loop)                    │  │
//! │  │                                                                  │  │
//! │  │  customers → pets → vaccines / grooming → appointments          │  │
//! │  │  Per-record savepoints, batch commits, RunReport                 │  │
//! │  └────────────────────────────┬─────────────────────────────────────┘  │
//! │                               │                                         │
//! │         ┌─────────────────────┼─────────────────────┐                  │
//! │         ▼                     ▼                     ▼                   │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────┐    │
//! │  │ PaginationWalk │  │  SourceClient  │  │  DependencyResolver    │    │
//! │  │                │  │                │  │                        │    │
//! │  │ ?page=N, dedup │  │ Paced GET,     │  │ Placeholder customers  │    │
//! │  │ repeat / cap   │  │ None on error  │  │ and pets on demand     │    │
//! │  └────────────────┘  └────────────────┘  └────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`orchestrator`] - Phase sequencing and the run state machine
//! - [`pagination`] - Page walking with duplicate and cap detection
//! - [`resolver`] - Placeholder creation for missing parents
//! - [`source`] - Clinic API client
//! - [`report`] - Phase and run reports
//! - [`config`] - TOML + environment configuration
//! - [`error`] - Sync error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use vetsync_sync::{HttpSourceClient, SyncConfig, SyncOrchestrator};
//!
//! let config = SyncConfig::load(None)?;
//! let source = HttpSourceClient::new(&config.source)?;
//!
//! let report = SyncOrchestrator::new(config, source).run().await?;
//! println!("{}", report);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod orchestrator;
pub mod pagination;
pub mod report;
pub mod resolver;
pub mod source;

#[cfg(test)]
pub(crate) mod test_support;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{DatabaseSettings, SourceSettings, SyncConfig, SyncSettings};
pub use error::{SyncError, SyncResult};
pub use orchestrator::{RunState, SyncOrchestrator};
pub use pagination::{PageStep, PaginationWalker, WalkConfig, WalkEnd};
pub use report::{Phase, PhaseReport, RecordOutcome, RunReport, RunTotals};
pub use resolver::{AutoCreated, DependencyResolver, Resolution};
pub use source::{HttpSourceClient, SourceClient};
