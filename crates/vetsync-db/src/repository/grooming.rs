//! # Grooming Repository
//!
//! Bath / grooming sheets keyed by `(pet_id, service_date)`: one sheet per
//! pet per day.

use chrono::Utc;
use sqlx::SqliteConnection;

use crate::error::DbResult;
use vetsync_core::{GroomingService, SourceId};

const COLUMNS: &str = "pet_id, service_date, return_date, service_type, details, total_cents, \
                       staff_name, notes, source_record_id";

/// Repository for grooming services.
#[derive(Debug, Clone, Copy, Default)]
pub struct GroomingRepository;

impl GroomingRepository {
    /// Inserts or updates a grooming sheet.
    pub async fn upsert(conn: &mut SqliteConnection, service: &GroomingService) -> DbResult<()> {
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO grooming_services (
                pet_id, service_date, return_date, service_type, details,
                total_cents, staff_name, notes, source_record_id,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)
            ON CONFLICT (pet_id, service_date) DO UPDATE SET
                return_date = excluded.return_date,
                service_type = excluded.service_type,
                details = excluded.details,
                total_cents = excluded.total_cents,
                staff_name = excluded.staff_name,
                notes = excluded.notes,
                source_record_id = excluded.source_record_id,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(service.pet_id)
        .bind(&service.service_date)
        .bind(&service.return_date)
        .bind(service.service_type.as_str())
        .bind(&service.details)
        .bind(service.total_cents)
        .bind(&service.staff_name)
        .bind(&service.notes)
        .bind(service.source_record_id)
        .bind(now)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Finds the sheet of a pet on a given day.
    pub async fn find(
        conn: &mut SqliteConnection,
        pet_id: SourceId,
        service_date: &str,
    ) -> DbResult<Option<GroomingService>> {
        let service = sqlx::query_as::<_, GroomingService>(&format!(
            "SELECT {COLUMNS} FROM grooming_services WHERE pet_id = ?1 AND service_date = ?2"
        ))
        .bind(pet_id)
        .bind(service_date)
        .fetch_optional(conn)
        .await?;

        Ok(service)
    }

    /// Counts stored grooming sheets.
    pub async fn count(conn: &mut SqliteConnection) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM grooming_services")
            .fetch_one(conn)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use vetsync_core::ServiceType;

    fn sheet(details: &str, total: Option<i64>) -> GroomingService {
        GroomingService {
            pet_id: 10,
            service_date: "2024-03-15".to_string(),
            return_date: None,
            service_type: vetsync_core::classify::classify_service_type(details),
            details: Some(details.to_string()),
            total_cents: total,
            staff_name: Some("Carla".to_string()),
            notes: None,
            source_record_id: Some(77),
        }
    }

    #[tokio::test]
    async fn test_same_day_sheet_is_updated_in_place() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();
        sqlx::query("INSERT INTO customers (id, name) VALUES (1, 'Owner')")
            .execute(&mut *conn)
            .await
            .unwrap();
        sqlx::query("INSERT INTO pets (id, customer_id, name, species) VALUES (10, 1, 'Rex', 'Cão')")
            .execute(&mut *conn)
            .await
            .unwrap();

        GroomingRepository::upsert(&mut conn, &sheet("Banho", Some(5000)))
            .await
            .unwrap();
        GroomingRepository::upsert(&mut conn, &sheet("Banho e Tosa", Some(8550)))
            .await
            .unwrap();

        assert_eq!(GroomingRepository::count(&mut conn).await.unwrap(), 1);

        let stored = GroomingRepository::find(&mut conn, 10, "2024-03-15")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.service_type, ServiceType::BathAndGroom);
        assert_eq!(stored.total_cents, Some(8550));
    }
}
