//! # Domain Types
//!
//! Canonical records mirrored from the clinic API.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Customer     │◄──│      Pet        │◄──│  VaccineRecord  │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (source)    │   │  id (source)    │   │  pet_id + name  │       │
//! │  │  name           │   │  customer_id    │   │  + applied date │       │
//! │  │  phone          │   │  species        │   └─────────────────┘       │
//! │  └────────▲────────┘   └───▲─────────▲───┘                             │
//! │           │ optional       │         │       ┌─────────────────┐       │
//! │  ┌────────┴────────────────┴──┐      └───────│ GroomingService │       │
//! │  │        Appointment         │              │  ─────────────  │       │
//! │  │  id (source), scheduled_at │              │  pet_id + date  │       │
//! │  │  type, status, amount      │              └─────────────────┘       │
//! │  └────────────────────────────┘                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Source Identity
//! Customers, pets and appointments keep the integer id assigned by the
//! clinic API; it is never regenerated locally. Vaccine and grooming records
//! have no stable source id and are identified by composite keys instead.
//!
//! Dates are canonical strings (`YYYY-MM-DD`, or `YYYY-MM-DD HH:MM[:SS]` for
//! appointments) produced by [`crate::normalize`].

use serde::{Deserialize, Serialize};

/// Identifier assigned by the clinic API.
pub type SourceId = i64;

// =============================================================================
// Entity Kind
// =============================================================================

/// Parent entity kinds the dependency resolver can synthesize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Customer,
    Pet,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Customer => "customer",
            EntityKind::Pet => "pet",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Customer
// =============================================================================

/// A clinic customer (pet owner).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Customer {
    /// Source-assigned identifier.
    pub id: SourceId,

    pub name: String,

    /// Normalized phone (digits only, with country code).
    pub phone: Option<String>,

    /// Normalized WhatsApp number.
    pub whatsapp: Option<String>,

    pub email: Option<String>,

    /// CPF / CNPJ as sent by the source.
    pub tax_id: Option<String>,

    /// Street, number and complement joined with ", ".
    pub address: Option<String>,

    pub neighborhood: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,

    /// True while the row is a placeholder synthesized by the resolver.
    pub auto_created: bool,
}

// =============================================================================
// Pet
// =============================================================================

/// A patient of the clinic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Pet {
    /// Source-assigned identifier.
    pub id: SourceId,

    /// Owner. Must exist in the store before the pet is written.
    pub customer_id: SourceId,

    pub name: String,
    pub species: String,
    pub breed: Option<String>,
    pub gender: Option<String>,

    /// `YYYY-MM-DD`.
    pub birth_date: Option<String>,

    pub weight_kg: Option<f64>,
    pub coat: Option<String>,
    pub notes: Option<String>,

    /// True while the row is a placeholder synthesized by the resolver.
    pub auto_created: bool,
}

// =============================================================================
// Vaccine Record
// =============================================================================

/// A vaccine application.
///
/// Unique by `(pet_id, vaccine_name, application_date)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct VaccineRecord {
    pub pet_id: SourceId,
    pub vaccine_name: String,

    /// `YYYY-MM-DD`.
    pub application_date: String,

    /// `YYYY-MM-DD`.
    pub next_dose_date: Option<String>,

    pub dose: Option<String>,
    pub batch_number: Option<String>,
    pub veterinarian_name: Option<String>,

    /// Derived from the vaccine name.
    pub is_annual: bool,

    pub notes: Option<String>,
}

// =============================================================================
// Grooming Service
// =============================================================================

/// Kind of grooming performed, classified from free text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    Bath,
    Groom,
    BathAndGroom,
}

impl ServiceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::Bath => "bath",
            ServiceType::Groom => "groom",
            ServiceType::BathAndGroom => "bath_and_groom",
        }
    }
}

/// A bath / grooming sheet.
///
/// Unique by `(pet_id, service_date)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct GroomingService {
    pub pet_id: SourceId,

    /// `YYYY-MM-DD`.
    pub service_date: String,

    /// `YYYY-MM-DD`.
    pub return_date: Option<String>,

    pub service_type: ServiceType,

    /// Free-text service list as sent by the source.
    pub details: Option<String>,

    /// Total charged, in cents.
    pub total_cents: Option<i64>,

    pub staff_name: Option<String>,
    pub notes: Option<String>,

    /// Source id of the sheet, informational only.
    pub source_record_id: Option<SourceId>,
}

// =============================================================================
// Appointment
// =============================================================================

/// Appointment type, classified from free text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum AppointmentType {
    Consultation,
    FollowUp,
    Surgery,
    Exam,
    Vaccination,
    Grooming,
}

impl AppointmentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentType::Consultation => "consultation",
            AppointmentType::FollowUp => "follow_up",
            AppointmentType::Surgery => "surgery",
            AppointmentType::Exam => "exam",
            AppointmentType::Vaccination => "vaccination",
            AppointmentType::Grooming => "grooming",
        }
    }
}

/// Appointment status, classified from free text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    Confirmed,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }
}

impl Default for AppointmentStatus {
    fn default() -> Self {
        AppointmentStatus::Scheduled
    }
}

/// A scheduled visit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Appointment {
    /// Source-assigned identifier.
    pub id: SourceId,

    pub pet_id: SourceId,

    /// Not every appointment names its customer.
    pub customer_id: Option<SourceId>,

    /// `YYYY-MM-DD[ HH:MM[:SS]]`.
    pub scheduled_at: String,

    pub appointment_type: AppointmentType,
    pub status: AppointmentStatus,
    pub notes: Option<String>,

    /// Amount in cents.
    pub amount_cents: Option<i64>,
}

// =============================================================================
// Placeholders
// =============================================================================

/// Name given to a customer synthesized from a bare reference.
pub const PLACEHOLDER_CUSTOMER_NAME: &str = "Auto-created customer";

/// Name given to a pet synthesized from a bare reference.
pub const PLACEHOLDER_PET_NAME: &str = "Auto-created pet";

/// Species given to a pet synthesized from a bare reference.
pub const PLACEHOLDER_SPECIES: &str = "Unknown";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_serde_names_match_store_values() {
        let json = serde_json::to_string(&AppointmentType::FollowUp).unwrap();
        assert_eq!(json, format!("\"{}\"", AppointmentType::FollowUp.as_str()));

        let json = serde_json::to_string(&ServiceType::BathAndGroom).unwrap();
        assert_eq!(json, format!("\"{}\"", ServiceType::BathAndGroom.as_str()));

        let json = serde_json::to_string(&AppointmentStatus::Cancelled).unwrap();
        assert_eq!(json, format!("\"{}\"", AppointmentStatus::Cancelled.as_str()));
    }

    #[test]
    fn test_default_status_is_scheduled() {
        assert_eq!(AppointmentStatus::default(), AppointmentStatus::Scheduled);
    }
}
