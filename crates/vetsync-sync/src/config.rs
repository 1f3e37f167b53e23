//! # Sync Configuration
//!
//! Configuration for a sync run: where the local store lives, where the
//! clinic API is, how fast to call it and how big each batch is.
//!
//! ## Configuration Sources (Priority Order)
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Loading                                │
//! │                                                                         │
//! │  1. Default Values (hardcoded)                                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  2. Config File (~/.config/vetsync/sync.toml or --config)              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  3. Environment Variables (VETSYNC_*, VETCARE_API_URL)                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  4. validate()                                                         │
//! │                                                                         │
//! │  Later sources override earlier ones.                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Environment Variables
//! | Variable                    | Setting                     |
//! |-----------------------------|-----------------------------|
//! | `VETSYNC_DB_PATH`           | `database.path`             |
//! | `VETCARE_API_URL`           | `source.base_url`           |
//! | `VETSYNC_RATE_LIMIT_MS`     | `source.request_interval_ms`|
//! | `VETSYNC_MAX_PETS`          | `sync.max_pets`             |
//! | `VETSYNC_APPOINTMENTS_FROM` | `sync.appointments_from`    |
//! | `VETSYNC_APPOINTMENTS_UNTIL`| `sync.appointments_until`   |

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{SyncError, SyncResult};
use vetsync_core::PhoneRules;

// =============================================================================
// Database Settings
// =============================================================================

/// Local store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file path.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_db_connect_timeout")]
    pub connect_timeout_secs: u64,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("vetsync.db")
}
fn default_max_connections() -> u32 {
    5
}
fn default_db_connect_timeout() -> u64 {
    30
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_db_path(),
            max_connections: default_max_connections(),
            connect_timeout_secs: default_db_connect_timeout(),
        }
    }
}

// =============================================================================
// Source Settings
// =============================================================================

/// Clinic API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSettings {
    /// Base URL; endpoints such as `/clientes` are appended to it.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Minimum delay between two requests.
    #[serde(default = "default_request_interval")]
    pub request_interval_ms: u64,
}

fn default_base_url() -> String {
    "http://localhost:3000/api".to_string()
}
fn default_timeout() -> u64 {
    30
}
fn default_request_interval() -> u64 {
    150
}

impl Default for SourceSettings {
    fn default() -> Self {
        SourceSettings {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
            request_interval_ms: default_request_interval(),
        }
    }
}

impl SourceSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn request_interval(&self) -> Duration {
        Duration::from_millis(self.request_interval_ms)
    }
}

// =============================================================================
// Sync Settings
// =============================================================================

/// Phase behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Hard cap on pets accepted from `/pets`. 0 disables the cap.
    #[serde(default = "default_max_pets")]
    pub max_pets: usize,

    /// Delay between two pages of a paginated collection.
    #[serde(default = "default_page_delay")]
    pub page_delay_ms: u64,

    /// Fraction of already-seen ids above which a page ends the walk.
    #[serde(default = "default_duplicate_threshold")]
    pub duplicate_threshold: f64,

    #[serde(default = "default_customer_batch")]
    pub customer_batch_size: usize,

    #[serde(default = "default_pet_batch")]
    pub pet_batch_size: usize,

    /// Counted in parent pets, not in child records.
    #[serde(default = "default_sub_resource_batch")]
    pub sub_resource_batch_size: usize,

    #[serde(default = "default_appointment_batch")]
    pub appointment_batch_size: usize,

    /// Consecutive failed per-pet fetches after which the sub-resource
    /// phases are aborted. 0 never aborts.
    #[serde(default = "default_sub_resource_misses")]
    pub sub_resource_max_consecutive_misses: usize,

    /// `data_inicio` of the appointment query.
    #[serde(default = "default_appointments_from")]
    pub appointments_from: String,

    /// `data_fim` of the appointment query.
    #[serde(default = "default_appointments_until")]
    pub appointments_until: String,

    /// Whether to fetch vaccines and grooming sheets per pet.
    #[serde(default = "default_true")]
    pub sync_sub_resources: bool,
}

fn default_max_pets() -> usize {
    6000
}
fn default_page_delay() -> u64 {
    200
}
fn default_duplicate_threshold() -> f64 {
    0.90
}
fn default_customer_batch() -> usize {
    100
}
fn default_pet_batch() -> usize {
    50
}
fn default_sub_resource_batch() -> usize {
    10
}
fn default_appointment_batch() -> usize {
    100
}
fn default_sub_resource_misses() -> usize {
    10
}
fn default_appointments_from() -> String {
    "2022-01-01".to_string()
}
fn default_appointments_until() -> String {
    "2026-12-31".to_string()
}
fn default_true() -> bool {
    true
}

impl Default for SyncSettings {
    fn default() -> Self {
        SyncSettings {
            max_pets: default_max_pets(),
            page_delay_ms: default_page_delay(),
            duplicate_threshold: default_duplicate_threshold(),
            customer_batch_size: default_customer_batch(),
            pet_batch_size: default_pet_batch(),
            sub_resource_batch_size: default_sub_resource_batch(),
            appointment_batch_size: default_appointment_batch(),
            sub_resource_max_consecutive_misses: default_sub_resource_misses(),
            appointments_from: default_appointments_from(),
            appointments_until: default_appointments_until(),
            sync_sub_resources: default_true(),
        }
    }
}

impl SyncSettings {
    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }

    /// The pet cap, or `None` when disabled.
    pub fn pet_cap(&self) -> Option<usize> {
        (self.max_pets > 0).then_some(self.max_pets)
    }

    /// The consecutive-miss cutoff, or `None` when disabled.
    pub fn sub_resource_miss_limit(&self) -> Option<usize> {
        (self.sub_resource_max_consecutive_misses > 0)
            .then_some(self.sub_resource_max_consecutive_misses)
    }
}

// =============================================================================
// Main Sync Configuration
// =============================================================================

/// Complete sync configuration.
///
/// ## Example Config File
/// ```toml
/// [database]
/// path = "/var/lib/vetsync/vetsync.db"
///
/// [source]
/// base_url = "https://clinic.example.com/api"
/// timeout_secs = 30
/// request_interval_ms = 150
///
/// [sync]
/// max_pets = 6000
/// duplicate_threshold = 0.9
/// appointments_from = "2022-01-01"
/// appointments_until = "2026-12-31"
///
/// [phone]
/// country_code = "55"
/// local_lengths = [10, 11]
/// international_lengths = [12, 13]
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub source: SourceSettings,

    #[serde(default)]
    pub sync: SyncSettings,

    /// Phone normalization heuristic.
    #[serde(default)]
    pub phone: PhoneRules,
}

impl SyncConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (sync.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> SyncResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading sync config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> SyncResult<PathBuf> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| SyncError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| SyncError::ConfigSaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| SyncError::ConfigSaveFailed(e.to_string()))?;

        info!(?path, "Sync config saved");
        Ok(path)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> SyncResult<()> {
        let url = Url::parse(&self.source.base_url)?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(SyncError::InvalidUrl(format!(
                "Source URL must start with http:// or https://, got: {}",
                self.source.base_url
            )));
        }

        let batches = [
            ("customer_batch_size", self.sync.customer_batch_size),
            ("pet_batch_size", self.sync.pet_batch_size),
            ("sub_resource_batch_size", self.sync.sub_resource_batch_size),
            ("appointment_batch_size", self.sync.appointment_batch_size),
        ];
        if let Some((name, _)) = batches.iter().find(|(_, size)| *size == 0) {
            return Err(SyncError::InvalidConfig(format!(
                "{} must be greater than 0",
                name
            )));
        }

        let threshold = self.sync.duplicate_threshold;
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(SyncError::InvalidConfig(format!(
                "duplicate_threshold must be in (0, 1], got {}",
                threshold
            )));
        }

        if self.phone.country_code.is_empty()
            || !self.phone.country_code.chars().all(|c| c.is_ascii_digit())
        {
            return Err(SyncError::InvalidConfig(
                "phone.country_code must be digits".into(),
            ));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("VETSYNC_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Ok(url) = std::env::var("VETCARE_API_URL") {
            debug!(url = %url, "Overriding source URL from environment");
            self.source.base_url = url;
        }

        if let Ok(interval) = std::env::var("VETSYNC_RATE_LIMIT_MS") {
            match interval.parse::<u64>() {
                Ok(ms) => self.source.request_interval_ms = ms,
                Err(_) => warn!(value = %interval, "Ignoring invalid VETSYNC_RATE_LIMIT_MS"),
            }
        }

        if let Ok(max) = std::env::var("VETSYNC_MAX_PETS") {
            match max.parse::<usize>() {
                Ok(n) => self.sync.max_pets = n,
                Err(_) => warn!(value = %max, "Ignoring invalid VETSYNC_MAX_PETS"),
            }
        }

        if let Ok(from) = std::env::var("VETSYNC_APPOINTMENTS_FROM") {
            self.sync.appointments_from = from;
        }

        if let Ok(until) = std::env::var("VETSYNC_APPOINTMENTS_UNTIL") {
            self.sync.appointments_until = until;
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "vetsync", "vetsync")
            .map(|dirs| dirs.config_dir().join("sync.toml"))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SyncConfig::default();
        assert_eq!(config.source.request_interval_ms, 150);
        assert_eq!(config.sync.customer_batch_size, 100);
        assert_eq!(config.sync.pet_batch_size, 50);
        assert_eq!(config.sync.sub_resource_batch_size, 10);
        assert_eq!(config.sync.appointment_batch_size, 100);
        assert_eq!(config.sync.duplicate_threshold, 0.90);
        assert_eq!(config.sync.pet_cap(), Some(6000));
        assert_eq!(config.phone, PhoneRules::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = SyncConfig::default();
        config.source.base_url = "ftp://clinic".into();
        assert!(matches!(config.validate(), Err(SyncError::InvalidUrl(_))));

        let mut config = SyncConfig::default();
        config.source.base_url = "not a url".into();
        assert!(matches!(config.validate(), Err(SyncError::InvalidUrl(_))));

        let mut config = SyncConfig::default();
        config.sync.pet_batch_size = 0;
        assert!(matches!(config.validate(), Err(SyncError::InvalidConfig(_))));

        let mut config = SyncConfig::default();
        config.sync.duplicate_threshold = 1.5;
        assert!(config.validate().is_err());

        let mut config = SyncConfig::default();
        config.phone.country_code = "+55".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_max_pets_disables_cap() {
        let mut config = SyncConfig::default();
        config.sync.max_pets = 0;
        assert_eq!(config.sync.pet_cap(), None);
    }

    #[test]
    fn test_sub_resource_miss_limit() {
        let mut config = SyncConfig::default();
        assert_eq!(config.sync.sub_resource_miss_limit(), Some(10));

        config.sync.sub_resource_max_consecutive_misses = 0;
        assert_eq!(config.sync.sub_resource_miss_limit(), None);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: SyncConfig = toml::from_str(
            r#"
            [source]
            base_url = "https://clinic.example.com/api"

            [phone]
            country_code = "1"
            "#,
        )
        .unwrap();

        assert_eq!(config.source.base_url, "https://clinic.example.com/api");
        assert_eq!(config.source.timeout_secs, 30);
        assert_eq!(config.phone.country_code, "1");
        assert_eq!(config.phone.local_lengths, vec![10, 11]);
        assert_eq!(config.database.path, PathBuf::from("vetsync.db"));
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("sync.toml");

        let mut config = SyncConfig::default();
        config.sync.max_pets = 120;
        config.save(Some(path.clone())).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let loaded: SyncConfig = toml::from_str(&contents).unwrap();
        assert_eq!(loaded.sync.max_pets, 120);
    }
}
