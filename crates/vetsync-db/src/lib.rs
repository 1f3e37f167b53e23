//! # vetsync-db: Entity Store for VetSync
//!
//! Local SQLite mirror of the clinic API: pool, embedded migrations, one
//! repository per entity type and a batched write session.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        VetSync Data Flow                                │
//! │                                                                         │
//! │  SyncOrchestrator (vetsync-sync)                                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     vetsync-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ CustomerRepo  │    │ 001_initial  │  │   │
//! │  │   │ SqlitePool    │    │ PetRepo       │    │ _schema.sql  │  │   │
//! │  │   │ StoreSession ─┼───►│ VaccineRepo   │    │              │  │   │
//! │  │   │ (session.rs)  │    │ GroomingRepo  │    │              │  │   │
//! │  │   │               │    │ AppointmentRepo    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (vetsync.db)                │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`session`] - Batched transaction with per-record savepoints
//! - [`error`] - Database error types
//! - [`repository`] - Upserts and lookups per entity
//!
//! ## Usage
//!
//! ```rust,ignore
//! use vetsync_db::{Database, DbConfig, CustomerRepository};
//!
//! let db = Database::new(DbConfig::new("vetsync.db")).await?;
//! let mut session = db.session();
//!
//! let mut sp = session.savepoint().await?;
//! CustomerRepository::upsert(&mut *sp, &customer).await?;
//! sp.commit().await?;
//! session.record_applied();
//!
//! session.finish().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod session;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use session::{Savepoint, StoreSession};

pub use repository::{
    AppointmentRepository, CustomerRepository, GroomingRepository, PetRepository, TableCounts,
    VaccineRepository,
};
