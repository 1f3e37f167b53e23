//! # Vaccine Repository
//!
//! Vaccine applications have no stable source id. They are upserted on the
//! composite key `(pet_id, vaccine_name, application_date)`.

use chrono::Utc;
use sqlx::SqliteConnection;

use crate::error::DbResult;
use vetsync_core::{SourceId, VaccineRecord};

const COLUMNS: &str = "pet_id, vaccine_name, application_date, next_dose_date, dose, \
                       batch_number, veterinarian_name, is_annual, notes";

/// Repository for vaccine records.
#[derive(Debug, Clone, Copy, Default)]
pub struct VaccineRepository;

impl VaccineRepository {
    /// Inserts or updates a vaccine application.
    pub async fn upsert(conn: &mut SqliteConnection, record: &VaccineRecord) -> DbResult<()> {
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO vaccines (
                pet_id, vaccine_name, application_date, next_dose_date, dose,
                batch_number, veterinarian_name, is_annual, notes,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)
            ON CONFLICT (pet_id, vaccine_name, application_date) DO UPDATE SET
                next_dose_date = excluded.next_dose_date,
                dose = excluded.dose,
                batch_number = excluded.batch_number,
                veterinarian_name = excluded.veterinarian_name,
                is_annual = excluded.is_annual,
                notes = excluded.notes,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(record.pet_id)
        .bind(&record.vaccine_name)
        .bind(&record.application_date)
        .bind(&record.next_dose_date)
        .bind(&record.dose)
        .bind(&record.batch_number)
        .bind(&record.veterinarian_name)
        .bind(record.is_annual)
        .bind(&record.notes)
        .bind(now)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Finds one application by its composite key.
    pub async fn find(
        conn: &mut SqliteConnection,
        pet_id: SourceId,
        vaccine_name: &str,
        application_date: &str,
    ) -> DbResult<Option<VaccineRecord>> {
        let record = sqlx::query_as::<_, VaccineRecord>(&format!(
            "SELECT {COLUMNS} FROM vaccines \
             WHERE pet_id = ?1 AND vaccine_name = ?2 AND application_date = ?3"
        ))
        .bind(pet_id)
        .bind(vaccine_name)
        .bind(application_date)
        .fetch_optional(conn)
        .await?;

        Ok(record)
    }

    /// All applications for a pet, oldest first.
    pub async fn list_for_pet(
        conn: &mut SqliteConnection,
        pet_id: SourceId,
    ) -> DbResult<Vec<VaccineRecord>> {
        let records = sqlx::query_as::<_, VaccineRecord>(&format!(
            "SELECT {COLUMNS} FROM vaccines WHERE pet_id = ?1 \
             ORDER BY application_date, vaccine_name"
        ))
        .bind(pet_id)
        .fetch_all(conn)
        .await?;

        Ok(records)
    }

    /// Counts stored vaccine applications.
    pub async fn count(conn: &mut SqliteConnection) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM vaccines")
            .fetch_one(conn)
            .await?;
        Ok(count)
    }
}
