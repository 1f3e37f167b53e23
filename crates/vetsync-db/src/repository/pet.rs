//! # Pet Repository
//!
//! Upserts keyed by the source pet id. The owning customer must already be
//! stored; SQLite rejects the write otherwise (`ForeignKeyViolation`).

use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::DbResult;
use vetsync_core::{Pet, SourceId};

const COLUMNS: &str = "id, customer_id, name, species, breed, gender, birth_date, weight_kg, \
                       coat, notes, auto_created";

/// Repository for pet operations.
#[derive(Debug, Clone, Copy, Default)]
pub struct PetRepository;

impl PetRepository {
    /// Inserts or updates a pet.
    pub async fn upsert(conn: &mut SqliteConnection, pet: &Pet) -> DbResult<()> {
        let now = Utc::now();

        debug!(pet_id = pet.id, customer_id = pet.customer_id, "Upserting pet");

        sqlx::query(
            r#"
            INSERT INTO pets (
                id, customer_id, name, species, breed, gender, birth_date,
                weight_kg, coat, notes, auto_created, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12)
            ON CONFLICT (id) DO UPDATE SET
                customer_id = excluded.customer_id,
                name = excluded.name,
                species = excluded.species,
                breed = excluded.breed,
                gender = excluded.gender,
                birth_date = excluded.birth_date,
                weight_kg = excluded.weight_kg,
                coat = excluded.coat,
                notes = excluded.notes,
                auto_created = excluded.auto_created,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(pet.id)
        .bind(pet.customer_id)
        .bind(&pet.name)
        .bind(&pet.species)
        .bind(&pet.breed)
        .bind(&pet.gender)
        .bind(&pet.birth_date)
        .bind(pet.weight_kg)
        .bind(&pet.coat)
        .bind(&pet.notes)
        .bind(pet.auto_created)
        .bind(now)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Inserts a placeholder unless the id already exists.
    ///
    /// Returns true when a row was created.
    pub async fn insert_placeholder(conn: &mut SqliteConnection, pet: &Pet) -> DbResult<bool> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO pets (id, customer_id, name, species, breed, gender, auto_created, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1, ?7, ?7)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(pet.id)
        .bind(pet.customer_id)
        .bind(&pet.name)
        .bind(&pet.species)
        .bind(&pet.breed)
        .bind(&pet.gender)
        .bind(now)
        .execute(conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Checks whether a pet id is present.
    pub async fn exists(conn: &mut SqliteConnection, id: SourceId) -> DbResult<bool> {
        let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM pets WHERE id = ?1")
            .bind(id)
            .fetch_optional(conn)
            .await?;
        Ok(found.is_some())
    }

    /// Gets a pet by source id.
    pub async fn get_by_id(conn: &mut SqliteConnection, id: SourceId) -> DbResult<Option<Pet>> {
        let pet = sqlx::query_as::<_, Pet>(&format!("SELECT {COLUMNS} FROM pets WHERE id = ?1"))
            .bind(id)
            .fetch_optional(conn)
            .await?;

        Ok(pet)
    }

    /// Returns all pets ordered by id.
    pub async fn list(conn: &mut SqliteConnection) -> DbResult<Vec<Pet>> {
        let pets = sqlx::query_as::<_, Pet>(&format!("SELECT {COLUMNS} FROM pets ORDER BY id"))
            .fetch_all(conn)
            .await?;

        Ok(pets)
    }

    /// Ids of every stored pet, ascending.
    pub async fn ids(conn: &mut SqliteConnection) -> DbResult<Vec<SourceId>> {
        let ids: Vec<SourceId> = sqlx::query_scalar("SELECT id FROM pets ORDER BY id")
            .fetch_all(conn)
            .await?;
        Ok(ids)
    }

    /// Counts stored pets.
    pub async fn count(conn: &mut SqliteConnection) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM pets")
            .fetch_one(conn)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::repository::customer::CustomerRepository;
    use crate::{Database, DbConfig};
    use vetsync_core::Customer;

    fn owner(id: SourceId) -> Customer {
        Customer {
            id,
            name: "Owner".to_string(),
            phone: None,
            whatsapp: None,
            email: None,
            tax_id: None,
            address: None,
            neighborhood: None,
            city: None,
            state: None,
            postal_code: None,
            auto_created: false,
        }
    }

    fn pet(id: SourceId, customer_id: SourceId) -> Pet {
        Pet {
            id,
            customer_id,
            name: "Rex".to_string(),
            species: "Cão".to_string(),
            breed: Some("SRD".to_string()),
            gender: Some("M".to_string()),
            birth_date: Some("2020-02-01".to_string()),
            weight_kg: Some(12.5),
            coat: None,
            notes: None,
            auto_created: false,
        }
    }

    #[tokio::test]
    async fn test_pet_requires_existing_customer() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();

        let err = PetRepository::upsert(&mut conn, &pet(10, 42))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
        assert_eq!(PetRepository::count(&mut conn).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_pet_upsert_round_trip() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();

        CustomerRepository::upsert(&mut conn, &owner(42)).await.unwrap();
        CustomerRepository::upsert(&mut conn, &owner(43)).await.unwrap();

        let p = pet(10, 42);
        PetRepository::upsert(&mut conn, &p).await.unwrap();
        assert_eq!(PetRepository::get_by_id(&mut conn, 10).await.unwrap(), Some(p));

        // ownership is mutable
        PetRepository::upsert(&mut conn, &pet(10, 43)).await.unwrap();
        let stored = PetRepository::get_by_id(&mut conn, 10).await.unwrap().unwrap();
        assert_eq!(stored.customer_id, 43);
        assert_eq!(PetRepository::ids(&mut conn).await.unwrap(), vec![10]);
    }

    #[tokio::test]
    async fn test_impossible_birth_date_is_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();
        CustomerRepository::upsert(&mut conn, &owner(1)).await.unwrap();

        let mut p = pet(5, 1);
        p.birth_date = Some("2024-13-40".to_string());
        let err = PetRepository::upsert(&mut conn, &p).await.unwrap_err();
        assert!(matches!(err, DbError::CheckViolation { .. }));
    }
}
