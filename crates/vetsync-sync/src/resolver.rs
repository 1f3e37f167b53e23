//! # Dependency Resolver
//!
//! Makes sure the parent of a record is stored before the record itself.
//!
//! ## Resolution Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  appointment payload                                                    │
//! │       │                                                                 │
//! │       ├── customer ref ──► ensure_exists(Customer)                      │
//! │       │                                                                 │
//! │       └── pet ref ─┬─ stored? ──► done                                  │
//! │                    │                                                    │
//! │                    ├── owner ref ──► ensure_exists(Customer)            │
//! │                    └──────────────► ensure_exists(Pet)                  │
//! │                                                                         │
//! │  ensure_exists: stored? → AlreadyPresent                                │
//! │                 else    → placeholder from the partial payload,         │
//! │                           INSERT .. ON CONFLICT DO NOTHING → Created    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything runs on the caller's connection, normally the savepoint of the
//! dependent record, so a placeholder disappears again if that record fails.

use serde::Serialize;
use serde_json::Value;
use sqlx::SqliteConnection;
use tracing::{debug, warn};

use crate::error::SyncResult;
use vetsync_core::payload::{
    appointment_customer_ref, appointment_pet_ref, customer_placeholder, parse_source_id,
    pet_owner_ref, pet_placeholder,
};
use vetsync_core::{EntityKind, PhoneRules, SourceId, ValidationError};
use vetsync_db::{CustomerRepository, PetRepository};

/// Outcome of one [`DependencyResolver::ensure_exists`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    AlreadyPresent,
    Created,
}

/// Placeholders created while resolving one record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AutoCreated {
    pub customers: usize,
    pub pets: usize,
}

impl AutoCreated {
    fn count(&mut self, kind: EntityKind, resolution: Resolution) {
        if resolution == Resolution::Created {
            match kind {
                EntityKind::Customer => self.customers += 1,
                EntityKind::Pet => self.pets += 1,
            }
        }
    }
}

/// Creates placeholder parents on demand.
#[derive(Debug, Clone, Default)]
pub struct DependencyResolver {
    phones: PhoneRules,
}

impl DependencyResolver {
    pub fn new(phones: PhoneRules) -> Self {
        DependencyResolver { phones }
    }

    /// Ensures the entity described by `candidate` is stored.
    ///
    /// A missing entity is created as a placeholder from whatever fields the
    /// candidate carries. Existing rows are never touched.
    pub async fn ensure_exists(
        &self,
        conn: &mut SqliteConnection,
        kind: EntityKind,
        candidate: &Value,
    ) -> SyncResult<Resolution> {
        let id = candidate_id(kind, candidate)?;

        if self.is_stored(&mut *conn, kind, id).await? {
            debug!(entity = %kind, entity_id = id, "Reference already stored");
            return Ok(Resolution::AlreadyPresent);
        }

        let created = match kind {
            EntityKind::Customer => {
                let customer = customer_placeholder(candidate, &self.phones)?;
                CustomerRepository::insert_placeholder(conn, &customer).await?
            }
            EntityKind::Pet => {
                let pet = pet_placeholder(candidate)?;
                PetRepository::insert_placeholder(conn, &pet).await?
            }
        };

        if created {
            warn!(entity = %kind, entity_id = id, "Auto-created placeholder");
            Ok(Resolution::Created)
        } else {
            Ok(Resolution::AlreadyPresent)
        }
    }

    /// Resolves the customer and pet an appointment refers to.
    ///
    /// The pet's owner is resolved before the pet, and only when the pet
    /// itself is missing.
    pub async fn ensure_appointment_parents(
        &self,
        conn: &mut SqliteConnection,
        appointment: &Value,
    ) -> SyncResult<AutoCreated> {
        let mut created = AutoCreated::default();

        if let Some(customer) = appointment_customer_ref(appointment) {
            let resolution = self
                .ensure_exists(&mut *conn, EntityKind::Customer, &customer)
                .await?;
            created.count(EntityKind::Customer, resolution);
        }

        if let Some(pet) = appointment_pet_ref(appointment) {
            let pet_id = candidate_id(EntityKind::Pet, &pet)?;
            if !self.is_stored(&mut *conn, EntityKind::Pet, pet_id).await? {
                if let Some(owner) = pet_owner_ref(&pet) {
                    let resolution = self
                        .ensure_exists(&mut *conn, EntityKind::Customer, &owner)
                        .await?;
                    created.count(EntityKind::Customer, resolution);
                }

                let resolution = self.ensure_exists(&mut *conn, EntityKind::Pet, &pet).await?;
                created.count(EntityKind::Pet, resolution);
            }
        }

        Ok(created)
    }

    async fn is_stored(
        &self,
        conn: &mut SqliteConnection,
        kind: EntityKind,
        id: SourceId,
    ) -> SyncResult<bool> {
        let stored = match kind {
            EntityKind::Customer => CustomerRepository::exists(conn, id).await?,
            EntityKind::Pet => PetRepository::exists(conn, id).await?,
        };
        Ok(stored)
    }
}

fn candidate_id(kind: EntityKind, candidate: &Value) -> SyncResult<SourceId> {
    candidate
        .get("id")
        .and_then(parse_source_id)
        .ok_or_else(|| ValidationError::required(kind.as_str(), "id").into())
}
