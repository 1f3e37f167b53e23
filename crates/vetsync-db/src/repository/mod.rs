//! # Repository Module
//!
//! One repository per mirrored entity type.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  Orchestrator                                                          │
//! │       │                                                                 │
//! │       │  PetRepository::upsert(&mut *savepoint, &pet)                  │
//! │       ▼                                                                 │
//! │  PetRepository                                                         │
//! │  ├── upsert(conn, pet)                ← INSERT .. ON CONFLICT UPDATE   │
//! │  ├── insert_placeholder(conn, pet)    ← INSERT .. ON CONFLICT NOTHING  │
//! │  ├── exists(conn, id)                                                  │
//! │  ├── get_by_id(conn, id)                                               │
//! │  └── count(conn)                                                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite (inside the caller's transaction / savepoint)                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Repositories are stateless and take the connection explicitly, so the
//! same call works on a pooled connection, a batch transaction or a
//! per-record savepoint.
//!
//! ## Available Repositories
//!
//! - [`CustomerRepository`]
//! - [`PetRepository`]
//! - [`VaccineRepository`]
//! - [`GroomingRepository`]
//! - [`AppointmentRepository`]

pub mod appointment;
pub mod customer;
pub mod grooming;
pub mod pet;
pub mod vaccine;

pub use appointment::AppointmentRepository;
pub use customer::CustomerRepository;
pub use grooming::GroomingRepository;
pub use pet::PetRepository;
pub use vaccine::VaccineRepository;

use serde::Serialize;
use sqlx::SqliteConnection;

use crate::error::DbResult;

/// Row counts of every mirrored table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TableCounts {
    pub customers: i64,
    pub pets: i64,
    pub vaccines: i64,
    pub grooming_services: i64,
    pub appointments: i64,
}

impl TableCounts {
    /// Reads the current counts.
    pub async fn load(conn: &mut SqliteConnection) -> DbResult<Self> {
        Ok(TableCounts {
            customers: CustomerRepository::count(&mut *conn).await?,
            pets: PetRepository::count(&mut *conn).await?,
            vaccines: VaccineRepository::count(&mut *conn).await?,
            grooming_services: GroomingRepository::count(&mut *conn).await?,
            appointments: AppointmentRepository::count(&mut *conn).await?,
        })
    }
}
