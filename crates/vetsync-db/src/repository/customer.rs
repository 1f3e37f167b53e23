//! # Customer Repository
//!
//! Upserts keyed by the source customer id.
//!
//! ## Mutable Fields
//! Everything except `id` and `created_at`. A full payload clears the
//! `auto_created` flag left by a placeholder.

use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::DbResult;
use vetsync_core::{Customer, SourceId};

const COLUMNS: &str = "id, name, phone, whatsapp, email, tax_id, address, neighborhood, \
                       city, state, postal_code, auto_created";

/// Repository for customer operations.
#[derive(Debug, Clone, Copy, Default)]
pub struct CustomerRepository;

impl CustomerRepository {
    /// Inserts or updates a customer.
    pub async fn upsert(conn: &mut SqliteConnection, customer: &Customer) -> DbResult<()> {
        let now = Utc::now();

        debug!(customer_id = customer.id, "Upserting customer");

        sqlx::query(
            r#"
            INSERT INTO customers (
                id, name, phone, whatsapp, email, tax_id, address,
                neighborhood, city, state, postal_code, auto_created,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?13)
            ON CONFLICT (id) DO UPDATE SET
                name = excluded.name,
                phone = excluded.phone,
                whatsapp = excluded.whatsapp,
                email = excluded.email,
                tax_id = excluded.tax_id,
                address = excluded.address,
                neighborhood = excluded.neighborhood,
                city = excluded.city,
                state = excluded.state,
                postal_code = excluded.postal_code,
                auto_created = excluded.auto_created,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(customer.id)
        .bind(&customer.name)
        .bind(&customer.phone)
        .bind(&customer.whatsapp)
        .bind(&customer.email)
        .bind(&customer.tax_id)
        .bind(&customer.address)
        .bind(&customer.neighborhood)
        .bind(&customer.city)
        .bind(&customer.state)
        .bind(&customer.postal_code)
        .bind(customer.auto_created)
        .bind(now)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Inserts a placeholder unless the id already exists.
    ///
    /// Never overwrites an existing row. Returns true when a row was created.
    pub async fn insert_placeholder(
        conn: &mut SqliteConnection,
        customer: &Customer,
    ) -> DbResult<bool> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO customers (id, name, phone, whatsapp, email, auto_created, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6, ?6)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(customer.id)
        .bind(&customer.name)
        .bind(&customer.phone)
        .bind(&customer.whatsapp)
        .bind(&customer.email)
        .bind(now)
        .execute(conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Checks whether a customer id is present.
    pub async fn exists(conn: &mut SqliteConnection, id: SourceId) -> DbResult<bool> {
        let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM customers WHERE id = ?1")
            .bind(id)
            .fetch_optional(conn)
            .await?;
        Ok(found.is_some())
    }

    /// Gets a customer by source id.
    pub async fn get_by_id(conn: &mut SqliteConnection, id: SourceId) -> DbResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(&format!(
            "SELECT {COLUMNS} FROM customers WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(conn)
        .await?;

        Ok(customer)
    }

    /// Returns all customers ordered by id.
    pub async fn list(conn: &mut SqliteConnection) -> DbResult<Vec<Customer>> {
        let customers = sqlx::query_as::<_, Customer>(&format!(
            "SELECT {COLUMNS} FROM customers ORDER BY id"
        ))
        .fetch_all(conn)
        .await?;

        Ok(customers)
    }

    /// Counts stored customers.
    pub async fn count(conn: &mut SqliteConnection) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customers")
            .fetch_one(conn)
            .await?;
        Ok(count)
    }
}
