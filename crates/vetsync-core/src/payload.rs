//! # Payload Mapping
//!
//! Converts the loosely-typed JSON objects returned by the clinic API into
//! the explicit records of [`crate::types`].
//!
//! ## Mapping Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Payload → Record                                 │
//! │                                                                         │
//! │  serde_json::Value                                                      │
//! │       │                                                                 │
//! │       ├── required field missing / empty   → ValidationError::Required  │
//! │       ├── date or amount unparseable       → ValidationError::Invalid.. │
//! │       ├── parent id nowhere to be found    → MissingReference           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Customer / Pet / VaccineRecord / GroomingService / Appointment         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Empty strings and `null` are both treated as absent. Identifiers may
//! arrive as JSON numbers or numeric strings.
//!
//! Parent references may be flat (`cliente_id`) or nested (`cliente: {id}`);
//! both spellings are accepted everywhere a parent is referenced.

use serde_json::{json, Map, Value};

use crate::classify::{
    classify_appointment_status, classify_appointment_type, classify_service_type,
    is_annual_vaccine,
};
use crate::error::{ValidationError, ValidationResult};
use crate::normalize::{normalize_date, normalize_datetime, PhoneRules};
use crate::types::{
    Appointment, Customer, GroomingService, Pet, SourceId, VaccineRecord,
    PLACEHOLDER_CUSTOMER_NAME, PLACEHOLDER_PET_NAME, PLACEHOLDER_SPECIES,
};

// =============================================================================
// Field Helpers
// =============================================================================

/// Reads a source identifier from a number or numeric string.
pub fn parse_source_id(value: &Value) -> Option<SourceId> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Returns the `id` of a payload as a stable deduplication key.
pub fn source_key(payload: &Value) -> Option<String> {
    match payload.get("id")? {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

fn as_object<'a>(payload: &'a Value, entity: &'static str) -> ValidationResult<&'a Map<String, Value>> {
    payload
        .as_object()
        .ok_or(ValidationError::NotAnObject { entity })
}

fn text(obj: &Map<String, Value>, key: &str) -> Option<String> {
    match obj.get(key)? {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn nested_text(obj: &Map<String, Value>, outer: &str, inner: &str) -> Option<String> {
    obj.get(outer)
        .and_then(Value::as_object)
        .and_then(|nested| text(nested, inner))
}

fn id(obj: &Map<String, Value>, key: &str) -> Option<SourceId> {
    obj.get(key).and_then(parse_source_id)
}

fn nested_id(obj: &Map<String, Value>, outer: &str) -> Option<SourceId> {
    obj.get(outer)
        .and_then(Value::as_object)
        .and_then(|nested| id(nested, "id"))
}

fn required_id(obj: &Map<String, Value>, entity: &'static str) -> ValidationResult<SourceId> {
    match obj.get("id") {
        None | Some(Value::Null) => Err(ValidationError::required(entity, "id")),
        Some(value) => parse_source_id(value)
            .ok_or_else(|| ValidationError::invalid(entity, "id", value.to_string())),
    }
}

fn required_text(
    obj: &Map<String, Value>,
    key: &str,
    entity: &'static str,
    field: &'static str,
) -> ValidationResult<String> {
    text(obj, key).ok_or(ValidationError::required(entity, field))
}

/// Parses a decimal that may use a comma as separator ("12,5").
fn decimal(raw: &str) -> Option<f64> {
    raw.trim().replace(',', ".").parse::<f64>().ok()
}

fn number(obj: &Map<String, Value>, key: &str) -> Option<f64> {
    match obj.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => decimal(s),
        _ => None,
    }
}

/// Reads a money amount into integer cents.
fn cents(
    obj: &Map<String, Value>,
    key: &str,
    entity: &'static str,
    field: &'static str,
) -> ValidationResult<Option<i64>> {
    let amount = match obj.get(key) {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) if s.trim().is_empty() => return Ok(None),
        Some(Value::String(s)) => decimal(s),
        Some(_) => None,
    };

    let cents = amount
        .filter(|value| value.is_finite())
        .map(|value| (value * 100.0).round())
        .ok_or_else(|| ValidationError::invalid(entity, field, "not a number"))?;

    // i64::MAX as f64 rounds up to 2^63, which is already out of range
    if cents < i64::MIN as f64 || cents >= i64::MAX as f64 {
        return Err(ValidationError::invalid(entity, field, "amount out of range"));
    }
    Ok(Some(cents as i64))
}

/// Normalizes an optional date field. Unparseable input is an error, not
/// silently dropped.
fn optional_date(
    obj: &Map<String, Value>,
    key: &str,
    entity: &'static str,
    field: &'static str,
) -> ValidationResult<Option<String>> {
    match text(obj, key) {
        None => Ok(None),
        Some(raw) => normalize_date(&raw)
            .map(Some)
            .ok_or_else(|| ValidationError::invalid(entity, field, raw)),
    }
}

fn required_date(
    obj: &Map<String, Value>,
    key: &str,
    entity: &'static str,
    field: &'static str,
) -> ValidationResult<String> {
    optional_date(obj, key, entity, field)?.ok_or(ValidationError::required(entity, field))
}

// =============================================================================
// Customer
// =============================================================================

/// Maps a `/clientes` payload.
pub fn customer_from_payload(payload: &Value, phones: &PhoneRules) -> ValidationResult<Customer> {
    const ENTITY: &str = "customer";
    let obj = as_object(payload, ENTITY)?;

    let id = required_id(obj, ENTITY)?;
    let name = required_text(obj, "nome", ENTITY, "name")?;

    let whatsapp = text(obj, "whatsapp").and_then(|raw| phones.normalize(&raw));
    let phone = text(obj, "telefone")
        .and_then(|raw| phones.normalize(&raw))
        .or_else(|| whatsapp.clone());

    let address_parts: Vec<String> = ["endereco", "numero", "complemento"]
        .iter()
        .filter_map(|key| text(obj, key))
        .collect();
    let address = (!address_parts.is_empty()).then(|| address_parts.join(", "));

    Ok(Customer {
        id,
        name,
        phone,
        whatsapp,
        email: text(obj, "email"),
        tax_id: text(obj, "cpf"),
        address,
        neighborhood: text(obj, "bairro"),
        city: text(obj, "cidade"),
        state: text(obj, "estado"),
        postal_code: text(obj, "cep"),
        auto_created: false,
    })
}

/// Builds a placeholder customer from a partial reference.
///
/// Only `id` is required; a missing name gets [`PLACEHOLDER_CUSTOMER_NAME`].
pub fn customer_placeholder(payload: &Value, phones: &PhoneRules) -> ValidationResult<Customer> {
    const ENTITY: &str = "customer";
    let obj = as_object(payload, ENTITY)?;

    let whatsapp = text(obj, "whatsapp").and_then(|raw| phones.normalize(&raw));
    let phone = text(obj, "telefone")
        .and_then(|raw| phones.normalize(&raw))
        .or_else(|| whatsapp.clone());

    Ok(Customer {
        id: required_id(obj, ENTITY)?,
        name: text(obj, "nome").unwrap_or_else(|| PLACEHOLDER_CUSTOMER_NAME.to_string()),
        phone,
        whatsapp,
        email: text(obj, "email"),
        tax_id: None,
        address: None,
        neighborhood: None,
        city: None,
        state: None,
        postal_code: None,
        auto_created: true,
    })
}

// =============================================================================
// Pet
// =============================================================================

/// Customer a pet or appointment belongs to: the flat `cliente_id`, else
/// the nested `cliente.id`.
fn customer_id(obj: &Map<String, Value>) -> Option<SourceId> {
    id(obj, "cliente_id").or_else(|| nested_id(obj, "cliente"))
}

/// Resolver candidate for the customer of `obj`.
///
/// The id follows [`customer_id`], so the candidate always names the same
/// customer the mapped record points at. Name and phone are copied from the
/// nested `cliente` only when it describes that customer.
fn customer_ref(obj: &Map<String, Value>) -> Option<Value> {
    let customer_id = customer_id(obj)?;

    let mut candidate = obj
        .get("cliente")
        .and_then(Value::as_object)
        .filter(|nested| id(nested, "id").map_or(true, |nested_id| nested_id == customer_id))
        .cloned()
        .unwrap_or_default();
    candidate.insert("id".to_string(), json!(customer_id));

    Some(Value::Object(candidate))
}

/// Maps a `/pets` payload.
pub fn pet_from_payload(payload: &Value) -> ValidationResult<Pet> {
    const ENTITY: &str = "pet";
    let obj = as_object(payload, ENTITY)?;

    let id = required_id(obj, ENTITY)?;
    let customer_id = customer_id(obj).ok_or(ValidationError::MissingReference {
        entity: ENTITY,
        parent: "customer",
    })?;

    Ok(Pet {
        id,
        customer_id,
        name: required_text(obj, "nome", ENTITY, "name")?,
        species: required_text(obj, "especie", ENTITY, "species")?,
        breed: text(obj, "raca"),
        gender: text(obj, "sexo"),
        birth_date: optional_date(obj, "data_nascimento", ENTITY, "birth_date")?,
        weight_kg: number(obj, "peso"),
        coat: text(obj, "pelagem"),
        notes: text(obj, "observacoes"),
        auto_created: false,
    })
}

/// Builds a placeholder pet from a partial reference.
///
/// `id` and an owner are required; name and species fall back to
/// [`PLACEHOLDER_PET_NAME`] and [`PLACEHOLDER_SPECIES`].
pub fn pet_placeholder(payload: &Value) -> ValidationResult<Pet> {
    const ENTITY: &str = "pet";
    let obj = as_object(payload, ENTITY)?;

    let id = required_id(obj, ENTITY)?;
    let customer_id = customer_id(obj).ok_or(ValidationError::MissingReference {
        entity: ENTITY,
        parent: "customer",
    })?;

    Ok(Pet {
        id,
        customer_id,
        name: text(obj, "nome").unwrap_or_else(|| PLACEHOLDER_PET_NAME.to_string()),
        species: text(obj, "especie").unwrap_or_else(|| PLACEHOLDER_SPECIES.to_string()),
        breed: text(obj, "raca"),
        gender: text(obj, "sexo"),
        birth_date: None,
        weight_kg: None,
        coat: None,
        notes: None,
        auto_created: true,
    })
}

// =============================================================================
// Sub-resources
// =============================================================================

/// Maps a `/pets/{id}/vacinacoes` payload.
pub fn vaccine_from_payload(pet_id: SourceId, payload: &Value) -> ValidationResult<VaccineRecord> {
    const ENTITY: &str = "vaccine";
    let obj = as_object(payload, ENTITY)?;

    let vaccine_name = nested_text(obj, "vacina", "nome")
        .or_else(|| text(obj, "vacina_nome"))
        .ok_or(ValidationError::required(ENTITY, "vaccine_name"))?;

    let next_dose_date = match optional_date(obj, "proxima_dose", ENTITY, "next_dose_date")? {
        Some(date) => Some(date),
        None => optional_date(obj, "data_proxima_dose", ENTITY, "next_dose_date")?,
    };

    Ok(VaccineRecord {
        pet_id,
        application_date: required_date(obj, "data_aplicacao", ENTITY, "application_date")?,
        next_dose_date,
        dose: text(obj, "dose"),
        batch_number: text(obj, "lote"),
        veterinarian_name: nested_text(obj, "veterinario", "nome")
            .or_else(|| text(obj, "veterinario_nome")),
        is_annual: is_annual_vaccine(&vaccine_name),
        notes: text(obj, "observacoes"),
        vaccine_name,
    })
}

/// Maps a `/pets/{id}/fichas-banho` payload.
pub fn grooming_from_payload(
    pet_id: SourceId,
    payload: &Value,
) -> ValidationResult<GroomingService> {
    const ENTITY: &str = "grooming";
    let obj = as_object(payload, ENTITY)?;

    let details = text(obj, "servicos");

    Ok(GroomingService {
        pet_id,
        service_date: required_date(obj, "data", ENTITY, "service_date")?,
        return_date: optional_date(obj, "retorno", ENTITY, "return_date")?,
        service_type: classify_service_type(details.as_deref().unwrap_or_default()),
        details,
        total_cents: cents(obj, "valor_total", ENTITY, "total")?,
        staff_name: text(obj, "funcionario_nome"),
        notes: text(obj, "observacoes"),
        source_record_id: id(obj, "id"),
    })
}

// =============================================================================
// Appointment
// =============================================================================

/// Maps an `/agendamentos` payload.
pub fn appointment_from_payload(payload: &Value) -> ValidationResult<Appointment> {
    const ENTITY: &str = "appointment";
    let obj = as_object(payload, ENTITY)?;

    let id = required_id(obj, ENTITY)?;
    let pet_id = id_or_nested(obj, "pet_id", "pet").ok_or(ValidationError::MissingReference {
        entity: ENTITY,
        parent: "pet",
    })?;

    let raw_when = required_text(obj, "data_hora", ENTITY, "scheduled_at")?;
    let scheduled_at = normalize_datetime(&raw_when)
        .ok_or_else(|| ValidationError::invalid(ENTITY, "scheduled_at", raw_when))?;

    Ok(Appointment {
        id,
        pet_id,
        customer_id: customer_id(obj),
        scheduled_at,
        appointment_type: classify_appointment_type(
            text(obj, "tipo").as_deref().unwrap_or_default(),
        ),
        status: classify_appointment_status(text(obj, "status").as_deref().unwrap_or_default()),
        notes: text(obj, "observacoes"),
        amount_cents: cents(obj, "valor", ENTITY, "amount")?,
    })
}

fn id_or_nested(obj: &Map<String, Value>, flat: &str, nested: &str) -> Option<SourceId> {
    id(obj, flat).or_else(|| nested_id(obj, nested))
}

/// Extracts the customer an appointment refers to, as a resolver candidate.
pub fn appointment_customer_ref(payload: &Value) -> Option<Value> {
    customer_ref(payload.as_object()?)
}

/// Extracts the pet an appointment refers to, as a resolver candidate.
///
/// The pet's owner is taken from the nested pet first, then from the
/// appointment's own customer reference.
pub fn appointment_pet_ref(payload: &Value) -> Option<Value> {
    let obj = payload.as_object()?;

    let mut candidate = match obj.get("pet").and_then(Value::as_object) {
        Some(nested) if id(nested, "id").is_some() => nested.clone(),
        _ => {
            let mut stub = Map::new();
            stub.insert("id".to_string(), json!(id(obj, "pet_id")?));
            stub
        }
    };

    if customer_id(&candidate).is_none() {
        if let Some(owner) = customer_id(obj) {
            candidate.insert("cliente_id".to_string(), json!(owner));
        }
    }

    Some(Value::Object(candidate))
}

/// Extracts the owner of a pet candidate, as a resolver candidate.
pub fn pet_owner_ref(pet: &Value) -> Option<Value> {
    customer_ref(pet.as_object()?)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AppointmentStatus, AppointmentType, ServiceType};

    #[test]
    fn test_customer_full_payload() {
        let payload = json!({
            "id": 42,
            "nome": "Maria Souza",
            "telefone": "(19) 99991-4201",
            "whatsapp": "19 99991-0000",
            "email": "maria@example.com",
            "cpf": "123.456.789-00",
            "endereco": "Rua das Flores",
            "numero": "100",
            "complemento": "",
            "bairro": "Centro",
            "cidade": "Campinas",
            "estado": "SP",
            "cep": "13010-000"
        });

        let customer = customer_from_payload(&payload, &PhoneRules::default()).unwrap();
        assert_eq!(customer.id, 42);
        assert_eq!(customer.phone.as_deref(), Some("5519999914201"));
        assert_eq!(customer.whatsapp.as_deref(), Some("5519999910000"));
        assert_eq!(customer.address.as_deref(), Some("Rua das Flores, 100"));
        assert_eq!(customer.neighborhood.as_deref(), Some("Centro"));
        assert!(!customer.auto_created);
    }

    #[test]
    fn test_customer_phone_falls_back_to_whatsapp() {
        let payload = json!({"id": "7", "nome": "João", "telefone": "", "whatsapp": "1933334444"});
        let customer = customer_from_payload(&payload, &PhoneRules::default()).unwrap();
        assert_eq!(customer.id, 7);
        assert_eq!(customer.phone.as_deref(), Some("551933334444"));
        assert_eq!(customer.address, None);
    }

    #[test]
    fn test_customer_requires_name() {
        let payload = json!({"id": 1, "nome": "  "});
        assert_eq!(
            customer_from_payload(&payload, &PhoneRules::default()),
            Err(ValidationError::required("customer", "name"))
        );
    }

    #[test]
    fn test_customer_rejects_non_object() {
        assert_eq!(
            customer_from_payload(&json!([1, 2]), &PhoneRules::default()),
            Err(ValidationError::NotAnObject { entity: "customer" })
        );
    }

    #[test]
    fn test_pet_flat_and_nested_customer() {
        let flat = json!({"id": 10, "nome": "Rex", "especie": "Cão", "cliente_id": 42});
        let nested = json!({"id": 10, "nome": "Rex", "especie": "Cão", "cliente": {"id": "42"}});

        assert_eq!(pet_from_payload(&flat).unwrap().customer_id, 42);
        assert_eq!(pet_from_payload(&nested).unwrap().customer_id, 42);
    }

    #[test]
    fn test_pet_fields() {
        let payload = json!({
            "id": 10,
            "nome": "Rex",
            "especie": "Cão",
            "raca": "SRD",
            "sexo": "M",
            "data_nascimento": "01/02/2020",
            "peso": "12,5",
            "cliente_id": 42
        });
        let pet = pet_from_payload(&payload).unwrap();
        assert_eq!(pet.birth_date.as_deref(), Some("2020-02-01"));
        assert_eq!(pet.weight_kg, Some(12.5));
        assert_eq!(pet.gender.as_deref(), Some("M"));
    }

    #[test]
    fn test_pet_without_customer_is_rejected() {
        let payload = json!({"id": 10, "nome": "Rex", "especie": "Cão"});
        assert_eq!(
            pet_from_payload(&payload),
            Err(ValidationError::MissingReference {
                entity: "pet",
                parent: "customer"
            })
        );
    }

    #[test]
    fn test_pet_bad_birth_date_is_invalid() {
        let payload = json!({
            "id": 10, "nome": "Rex", "especie": "Cão", "cliente_id": 1,
            "data_nascimento": "ontem"
        });
        assert!(matches!(
            pet_from_payload(&payload),
            Err(ValidationError::InvalidFormat { field: "birth_date", .. })
        ));
    }

    #[test]
    fn test_placeholders_fill_sentinels() {
        let customer = customer_placeholder(&json!({"id": 500}), &PhoneRules::default()).unwrap();
        assert_eq!(customer.name, PLACEHOLDER_CUSTOMER_NAME);
        assert!(customer.auto_created);

        let pet = pet_placeholder(&json!({"id": 999, "cliente_id": 500})).unwrap();
        assert_eq!(pet.name, PLACEHOLDER_PET_NAME);
        assert_eq!(pet.species, PLACEHOLDER_SPECIES);
        assert_eq!(pet.customer_id, 500);
        assert!(pet.auto_created);

        let named = pet_placeholder(&json!({"id": 1, "nome": "Mia", "cliente": {"id": 2}})).unwrap();
        assert_eq!(named.name, "Mia");
    }

    #[test]
    fn test_vaccine_nested_and_flat_names() {
        let nested = json!({
            "vacina": {"nome": "V10"},
            "data_aplicacao": "10/01/2024",
            "data_proxima_dose": "2025-01-10",
            "lote": "L123",
            "veterinario": {"nome": "Dra. Ana"}
        });
        let record = vaccine_from_payload(10, &nested).unwrap();
        assert_eq!(record.vaccine_name, "V10");
        assert_eq!(record.application_date, "2024-01-10");
        assert_eq!(record.next_dose_date.as_deref(), Some("2025-01-10"));
        assert_eq!(record.veterinarian_name.as_deref(), Some("Dra. Ana"));
        assert!(record.is_annual);

        let flat = json!({"vacina_nome": "Giárdia", "data_aplicacao": "2024-01-10"});
        let record = vaccine_from_payload(10, &flat).unwrap();
        assert_eq!(record.vaccine_name, "Giárdia");
        assert!(!record.is_annual);
    }

    #[test]
    fn test_vaccine_requires_application_date() {
        let payload = json!({"vacina_nome": "V10"});
        assert_eq!(
            vaccine_from_payload(1, &payload),
            Err(ValidationError::required("vaccine", "application_date"))
        );
    }

    #[test]
    fn test_grooming_payload() {
        let payload = json!({
            "id": 77,
            "data": "15/03/2024",
            "retorno": "2024-04-15",
            "servicos": "Banho e Tosa",
            "valor_total": "85.50",
            "funcionario_nome": "Carla"
        });
        let record = grooming_from_payload(10, &payload).unwrap();
        assert_eq!(record.service_date, "2024-03-15");
        assert_eq!(record.service_type, ServiceType::BathAndGroom);
        assert_eq!(record.total_cents, Some(8550));
        assert_eq!(record.source_record_id, Some(77));
    }

    #[test]
    fn test_grooming_invalid_amount() {
        let payload = json!({"data": "2024-03-15", "valor_total": "abc"});
        assert!(matches!(
            grooming_from_payload(1, &payload),
            Err(ValidationError::InvalidFormat { field: "total", .. })
        ));
    }

    #[test]
    fn test_amount_beyond_cents_range_is_rejected() {
        let base = json!({"id": 1, "pet_id": 2, "data_hora": "2024-05-02 10:00"});
        let with_amount = |amount: Value| {
            let mut payload = base.clone();
            payload["valor"] = amount;
            appointment_from_payload(&payload)
        };

        assert!(matches!(
            with_amount(json!(1e18)),
            Err(ValidationError::InvalidFormat { field: "amount", .. })
        ));
        assert!(matches!(
            with_amount(json!("-9e17")),
            Err(ValidationError::InvalidFormat { field: "amount", .. })
        ));
        assert_eq!(with_amount(json!("1234,56")).unwrap().amount_cents, Some(123456));
    }

    #[test]
    fn test_appointment_payload() {
        let payload = json!({
            "id": 3001,
            "pet": {"id": 999, "nome": "Bidu"},
            "cliente": {"id": 500, "nome": "Carlos"},
            "data_hora": "2024-05-02T09:30:00",
            "tipo": "Retorno",
            "status": "Confirmado",
            "valor": 120
        });
        let appt = appointment_from_payload(&payload).unwrap();
        assert_eq!(appt.pet_id, 999);
        assert_eq!(appt.customer_id, Some(500));
        assert_eq!(appt.scheduled_at, "2024-05-02 09:30:00");
        assert_eq!(appt.appointment_type, AppointmentType::FollowUp);
        assert_eq!(appt.status, AppointmentStatus::Confirmed);
        assert_eq!(appt.amount_cents, Some(12000));
    }

    #[test]
    fn test_appointment_requires_pet() {
        let payload = json!({"id": 1, "data_hora": "2024-05-02 09:30"});
        assert_eq!(
            appointment_from_payload(&payload),
            Err(ValidationError::MissingReference {
                entity: "appointment",
                parent: "pet"
            })
        );
    }

    #[test]
    fn test_appointment_refs_carry_owner() {
        let payload = json!({
            "id": 1,
            "pet": {"id": 999},
            "cliente": {"id": 500, "nome": "Carlos"},
            "data_hora": "2024-05-02"
        });

        let customer = appointment_customer_ref(&payload).unwrap();
        assert_eq!(customer["nome"], "Carlos");

        let pet = appointment_pet_ref(&payload).unwrap();
        assert_eq!(pet["id"], 999);
        assert_eq!(pet["cliente_id"], 500);
    }

    #[test]
    fn test_appointment_refs_from_flat_ids() {
        let payload = json!({"id": 1, "pet_id": "12", "cliente_id": 5});

        assert_eq!(appointment_customer_ref(&payload), Some(json!({"id": 5})));
        assert_eq!(
            appointment_pet_ref(&payload),
            Some(json!({"id": 12, "cliente_id": 5}))
        );
    }

    #[test]
    fn test_nested_pet_owner_wins_over_appointment_customer() {
        let payload = json!({"id": 1, "pet": {"id": 9, "cliente_id": 8}, "cliente_id": 5});
        let pet = appointment_pet_ref(&payload).unwrap();
        assert_eq!(pet["cliente_id"], 8);
    }

    #[test]
    fn test_pet_owner_ref() {
        let nested = json!({"id": 9, "cliente": {"id": 8, "nome": "Ana"}});
        assert_eq!(pet_owner_ref(&nested).unwrap()["nome"], "Ana");

        let flat = json!({"id": 9, "cliente_id": "8"});
        assert_eq!(pet_owner_ref(&flat), Some(json!({"id": 8})));

        assert_eq!(pet_owner_ref(&json!({"id": 9})), None);
    }

    #[test]
    fn test_owner_ref_matches_mapped_customer() {
        // Flat id and nested object disagree: the flat id is the owner
        let pet = json!({"id": 20, "cliente_id": 1, "cliente": {"id": 2, "nome": "Joana"}});
        assert_eq!(pet_placeholder(&pet).unwrap().customer_id, 1);
        assert_eq!(pet_owner_ref(&pet), Some(json!({"id": 1})));

        let same = json!({"id": 20, "cliente_id": "1", "cliente": {"id": 1, "nome": "Joana"}});
        assert_eq!(pet_owner_ref(&same).unwrap()["nome"], "Joana");

        let appointment = json!({"id": 7, "pet_id": 20, "cliente_id": 3, "cliente": {"id": 4}});
        assert_eq!(appointment_customer_ref(&appointment), Some(json!({"id": 3})));
        assert_eq!(
            appointment_from_payload(&json!({
                "id": 7, "pet_id": 20, "cliente_id": 3, "cliente": {"id": 4},
                "data_hora": "2024-05-02 10:00"
            }))
            .unwrap()
            .customer_id,
            Some(3)
        );
    }

    #[test]
    fn test_source_key() {
        assert_eq!(source_key(&json!({"id": 5})).as_deref(), Some("5"));
        assert_eq!(source_key(&json!({"id": " a1 "})).as_deref(), Some("a1"));
        assert_eq!(source_key(&json!({"nome": "x"})), None);
    }
}
