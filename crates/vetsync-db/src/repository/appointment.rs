//! # Appointment Repository
//!
//! Upserts keyed by the source appointment id. The pet, and the customer
//! when one is named, must be stored first.

use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::DbResult;
use vetsync_core::{Appointment, SourceId};

const COLUMNS: &str = "id, pet_id, customer_id, scheduled_at, appointment_type, status, notes, \
                       amount_cents";

/// Repository for appointments.
#[derive(Debug, Clone, Copy, Default)]
pub struct AppointmentRepository;

impl AppointmentRepository {
    /// Inserts or updates an appointment.
    pub async fn upsert(conn: &mut SqliteConnection, appointment: &Appointment) -> DbResult<()> {
        let now = Utc::now();

        debug!(
            appointment_id = appointment.id,
            pet_id = appointment.pet_id,
            "Upserting appointment"
        );

        sqlx::query(
            r#"
            INSERT INTO appointments (
                id, pet_id, customer_id, scheduled_at, appointment_type,
                status, notes, amount_cents, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
            ON CONFLICT (id) DO UPDATE SET
                pet_id = excluded.pet_id,
                customer_id = excluded.customer_id,
                scheduled_at = excluded.scheduled_at,
                appointment_type = excluded.appointment_type,
                status = excluded.status,
                notes = excluded.notes,
                amount_cents = excluded.amount_cents,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(appointment.id)
        .bind(appointment.pet_id)
        .bind(appointment.customer_id)
        .bind(&appointment.scheduled_at)
        .bind(appointment.appointment_type.as_str())
        .bind(appointment.status.as_str())
        .bind(&appointment.notes)
        .bind(appointment.amount_cents)
        .bind(now)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Gets an appointment by source id.
    pub async fn get_by_id(
        conn: &mut SqliteConnection,
        id: SourceId,
    ) -> DbResult<Option<Appointment>> {
        let appointment = sqlx::query_as::<_, Appointment>(&format!(
            "SELECT {COLUMNS} FROM appointments WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(conn)
        .await?;

        Ok(appointment)
    }

    /// Returns all appointments ordered by id.
    pub async fn list(conn: &mut SqliteConnection) -> DbResult<Vec<Appointment>> {
        let appointments = sqlx::query_as::<_, Appointment>(&format!(
            "SELECT {COLUMNS} FROM appointments ORDER BY id"
        ))
        .fetch_all(conn)
        .await?;

        Ok(appointments)
    }

    /// Counts stored appointments.
    pub async fn count(conn: &mut SqliteConnection) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM appointments")
            .fetch_one(conn)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::{Database, DbConfig};
    use vetsync_core::{AppointmentStatus, AppointmentType};

    fn appointment(id: SourceId, scheduled_at: &str) -> Appointment {
        Appointment {
            id,
            pet_id: 10,
            customer_id: Some(1),
            scheduled_at: scheduled_at.to_string(),
            appointment_type: AppointmentType::FollowUp,
            status: AppointmentStatus::Confirmed,
            notes: None,
            amount_cents: Some(12000),
        }
    }

    async fn seed(conn: &mut SqliteConnection) {
        sqlx::query("INSERT INTO customers (id, name) VALUES (1, 'Owner')")
            .execute(&mut *conn)
            .await
            .unwrap();
        sqlx::query("INSERT INTO pets (id, customer_id, name, species) VALUES (10, 1, 'Rex', 'Cão')")
            .execute(&mut *conn)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_appointment_round_trip_with_enums() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();
        seed(&mut conn).await;

        let appt = appointment(3001, "2024-05-02 09:30:00");
        AppointmentRepository::upsert(&mut conn, &appt).await.unwrap();
        AppointmentRepository::upsert(&mut conn, &appt).await.unwrap();

        assert_eq!(AppointmentRepository::count(&mut conn).await.unwrap(), 1);
        assert_eq!(
            AppointmentRepository::get_by_id(&mut conn, 3001).await.unwrap(),
            Some(appt)
        );
    }

    #[tokio::test]
    async fn test_unparseable_datetime_is_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();
        seed(&mut conn).await;

        let err = AppointmentRepository::upsert(&mut conn, &appointment(1, "2024-13-40 10:00"))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::CheckViolation { .. }));
        assert!(AppointmentRepository::list(&mut conn).await.unwrap().is_empty());
    }
}
