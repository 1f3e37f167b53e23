//! # Field Normalizer
//!
//! Pure functions converting loosely-formatted source fields into the
//! canonical forms stored locally.
//!
//! ## Phone Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Phone Normalization                                  │
//! │                                                                         │
//! │  "(19) 99991-4201"                                                      │
//! │       │  strip non-digits                                               │
//! │       ▼                                                                 │
//! │  "19999914201"  (11 digits = local length)                              │
//! │       │  prepend country code                                           │
//! │       ▼                                                                 │
//! │  "5519999914201"                                                        │
//! │                                                                         │
//! │  10 / 11 digits            → "55" + digits                              │
//! │  12 / 13 digits, no "55"   → "55" + digits                              │
//! │  anything else             → digits unchanged                           │
//! │  no digits at all          → None                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The lengths and the country code are tuned to the Brazilian numbering
//! plan used by the source clinic system. They live in [`PhoneRules`] so a
//! different deployment can change them without touching the algorithm.
//! Area codes are not checked for plausibility.
//!
//! ## Date Rules
//! Dates are rewritten syntactically only. `"2024/13/40"` is not rejected
//! here; the store's `CHECK` constraints are the calendar authority.

use serde::{Deserialize, Serialize};

// =============================================================================
// Phone
// =============================================================================

/// Tunable parameters of the phone normalization heuristic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhoneRules {
    /// Country code prepended to national numbers.
    #[serde(default = "default_country_code")]
    pub country_code: String,

    /// Digit counts treated as a national number without country code.
    #[serde(default = "default_local_lengths")]
    pub local_lengths: Vec<usize>,

    /// Digit counts that may already carry a country code.
    #[serde(default = "default_international_lengths")]
    pub international_lengths: Vec<usize>,
}

fn default_country_code() -> String {
    "55".to_string()
}

fn default_local_lengths() -> Vec<usize> {
    vec![10, 11]
}

fn default_international_lengths() -> Vec<usize> {
    vec![12, 13]
}

impl Default for PhoneRules {
    fn default() -> Self {
        PhoneRules {
            country_code: default_country_code(),
            local_lengths: default_local_lengths(),
            international_lengths: default_international_lengths(),
        }
    }
}

impl PhoneRules {
    /// Normalizes a raw phone string to a digits-only international form.
    ///
    /// ## Example
    /// ```rust
    /// use vetsync_core::normalize::PhoneRules;
    ///
    /// let rules = PhoneRules::default();
    /// assert_eq!(rules.normalize("(19) 99991-4201").as_deref(), Some("5519999914201"));
    /// assert_eq!(rules.normalize("--"), None);
    /// ```
    pub fn normalize(&self, raw: &str) -> Option<String> {
        let mut cleaned: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();

        if cleaned.is_empty() {
            return None;
        }

        if self.local_lengths.contains(&cleaned.len()) {
            cleaned.insert_str(0, &self.country_code);
        }

        // A freshly prefixed national number lands in this range too; it
        // already starts with the country code so it passes through.
        if self.international_lengths.contains(&cleaned.len())
            && !cleaned.starts_with(&self.country_code)
        {
            cleaned.insert_str(0, &self.country_code);
        }

        Some(cleaned)
    }
}

/// Normalizes a phone number with the default (Brazilian) rules.
pub fn normalize_phone(raw: &str) -> Option<String> {
    PhoneRules::default().normalize(raw)
}

// =============================================================================
// Dates
// =============================================================================

/// Normalizes a date string to `YYYY-MM-DD`.
///
/// - Contains `/`: read as `DD/MM/YYYY`, day and month zero-padded.
/// - Contains `-`: already ISO-like, anything after the first space is
///   dropped (time-of-day).
/// - Otherwise: `None`.
///
/// ## Example
/// ```rust
/// use vetsync_core::normalize::normalize_date;
///
/// assert_eq!(normalize_date("5/3/2024").as_deref(), Some("2024-03-05"));
/// assert_eq!(normalize_date("2024-03-05 10:00:00").as_deref(), Some("2024-03-05"));
/// assert_eq!(normalize_date("20240305"), None);
/// ```
pub fn normalize_date(raw: &str) -> Option<String> {
    let raw = raw.trim();

    if raw.contains('/') {
        // "05/03/2024 10:00" carries its time after the year
        let date_part = raw.split_whitespace().next().unwrap_or(raw);
        let parts: Vec<&str> = date_part.split('/').collect();
        if let [day, month, year] = parts.as_slice() {
            return Some(format!("{}-{:0>2}-{:0>2}", year, month, day));
        }
    }

    if raw.contains('-') {
        return raw.split(' ').next().map(str::to_string);
    }

    None
}

/// Normalizes a date-time string to `YYYY-MM-DD[ HH:MM[:SS]]`.
///
/// The date part follows [`normalize_date`]; a time-of-day, if present, is
/// kept as given. An ISO `T` separator is accepted.
pub fn normalize_datetime(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let (date_part, time_part) = match raw.split_once(|c: char| c == ' ' || c == 'T') {
        Some((date, time)) => (date, Some(time.trim())),
        None => (raw, None),
    };

    let date = normalize_date(date_part)?;
    match time_part.filter(|t| !t.is_empty()) {
        Some(time) => Some(format!("{} {}", date, time)),
        None => Some(date),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
