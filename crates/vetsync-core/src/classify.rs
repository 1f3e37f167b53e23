//! # Free-Text Classification
//!
//! The clinic API reports appointment types, appointment statuses and
//! grooming services as free text typed by reception staff. These functions
//! map that text onto the closed enumerations stored locally.
//!
//! ## Matching Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Appointment type (first match wins, case-insensitive substring)        │
//! │    "retorno"            → FollowUp                                      │
//! │    "cirurgia"           → Surgery                                       │
//! │    "exame"              → Exam                                          │
//! │    "vacina"             → Vaccination                                   │
//! │    "banho" | "tosa"     → Grooming                                      │
//! │    (anything else)      → Consultation                                  │
//! │                                                                         │
//! │  Appointment status                                                     │
//! │    "confirmado"         → Confirmed                                     │
//! │    "cancelado"          → Cancelled                                     │
//! │    "conclu"|"realizado" → Completed                                     │
//! │    (anything else)      → Scheduled                                     │
//! │                                                                         │
//! │  Grooming service                                                       │
//! │    "tosa" and "banho"   → BathAndGroom                                  │
//! │    "tosa"               → Groom                                         │
//! │    (anything else)      → Bath                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::types::{AppointmentStatus, AppointmentType, ServiceType};

/// Vaccine name fragments that mark a yearly booster.
const ANNUAL_VACCINE_MARKERS: &[&str] = &["anual", "raiva", "v8", "v10", "múltipla", "multipla"];

/// Classifies a free-text appointment type.
pub fn classify_appointment_type(raw: &str) -> AppointmentType {
    let text = raw.to_lowercase();

    if text.contains("retorno") {
        AppointmentType::FollowUp
    } else if text.contains("cirurgia") {
        AppointmentType::Surgery
    } else if text.contains("exame") {
        AppointmentType::Exam
    } else if text.contains("vacina") {
        AppointmentType::Vaccination
    } else if text.contains("banho") || text.contains("tosa") {
        AppointmentType::Grooming
    } else {
        AppointmentType::Consultation
    }
}

/// Classifies a free-text appointment status.
pub fn classify_appointment_status(raw: &str) -> AppointmentStatus {
    let text = raw.to_lowercase();

    if text.contains("confirmado") {
        AppointmentStatus::Confirmed
    } else if text.contains("cancelado") {
        AppointmentStatus::Cancelled
    } else if text.contains("conclu") || text.contains("realizado") {
        AppointmentStatus::Completed
    } else {
        AppointmentStatus::Scheduled
    }
}

/// Classifies the free-text service list of a grooming record.
pub fn classify_service_type(raw: &str) -> ServiceType {
    let text = raw.to_lowercase();
    let groom = text.contains("tosa");

    if groom && text.contains("banho") {
        ServiceType::BathAndGroom
    } else if groom {
        ServiceType::Groom
    } else {
        ServiceType::Bath
    }
}

/// Returns true when a vaccine name denotes a yearly booster.
pub fn is_annual_vaccine(name: &str) -> bool {
    let name = name.to_lowercase();
    ANNUAL_VACCINE_MARKERS
        .iter()
        .any(|marker| name.contains(marker))
}
