// ⚙️ Configuration
// Policy constants (card lengths, bulk cap, session lifetime, dataset columns, store path)

use crate::error::{ForgeError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable that overrides `store.path`
pub const ENV_STORE_PATH: &str = "CARDFORGE_STORE";
/// Environment variable that overrides `dataset.path`
pub const ENV_DATASET_PATH: &str = "CARDFORGE_DATASET";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub card: CardConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub dataset: DatasetConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardConfig {
    /// Length used when a pattern has no wildcard and no explicit length
    #[serde(default = "default_card_length")]
    pub default_length: usize,

    #[serde(default = "default_min_length")]
    pub min_length: usize,

    #[serde(default = "default_max_length")]
    pub max_length: usize,

    /// Upper bound of the expiry horizon, in years
    #[serde(default = "default_years_ahead")]
    pub default_years_ahead: u32,

    /// Largest horizon a request may ask for
    #[serde(default = "default_max_years_ahead")]
    pub max_years_ahead: u32,

    /// Largest count accepted by a single bulk request
    #[serde(default = "default_max_bulk")]
    pub max_bulk: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_expiry_hours")]
    pub expiry_hours: u32,

    /// Random bytes per token before hex encoding
    #[serde(default = "default_token_bytes")]
    pub token_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Address CSV loaded at startup, if any
    #[serde(default)]
    pub path: Option<PathBuf>,

    #[serde(default)]
    pub columns: DatasetColumns,

    /// Used when a row has an empty state column
    #[serde(default = "default_state")]
    pub default_state: String,

    /// Used when the dataset has no country column
    #[serde(default = "default_country")]
    pub default_country: String,

    #[serde(default = "default_load_timeout_secs")]
    pub load_timeout_secs: u64,
}

/// Header names of the address dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetColumns {
    #[serde(default = "default_street_column")]
    pub street: String,
    #[serde(default = "default_city_column")]
    pub city: String,
    #[serde(default = "default_state_column")]
    pub state: String,
    #[serde(default = "default_zip_column")]
    pub zip: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// SQLite file holding BINs, admins, sessions and settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_card_length() -> usize {
    16
}

fn default_min_length() -> usize {
    13
}

fn default_max_length() -> usize {
    19
}

fn default_years_ahead() -> u32 {
    5
}

fn default_max_years_ahead() -> u32 {
    10
}

fn default_max_bulk() -> usize {
    100 // matches the cap the generator form enforces
}

fn default_expiry_hours() -> u32 {
    24
}

fn default_token_bytes() -> usize {
    32
}

fn default_state() -> String {
    "Louisiana".to_string()
}

fn default_country() -> String {
    "US".to_string()
}

fn default_load_timeout_secs() -> u64 {
    30
}

fn default_street_column() -> String {
    "FULL ADDRESS".to_string()
}

fn default_city_column() -> String {
    "CITY".to_string()
}

fn default_state_column() -> String {
    "JURISDICTION".to_string()
}

fn default_zip_column() -> String {
    "ZIP".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

fn default_bind() -> String {
    "127.0.0.1:3000".to_string()
}

impl Default for CardConfig {
    fn default() -> Self {
        CardConfig {
            default_length: default_card_length(),
            min_length: default_min_length(),
            max_length: default_max_length(),
            default_years_ahead: default_years_ahead(),
            max_years_ahead: default_max_years_ahead(),
            max_bulk: default_max_bulk(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            expiry_hours: default_expiry_hours(),
            token_bytes: default_token_bytes(),
        }
    }
}

impl Default for DatasetConfig {
    fn default() -> Self {
        DatasetConfig {
            path: None,
            columns: DatasetColumns::default(),
            default_state: default_state(),
            default_country: default_country(),
            load_timeout_secs: default_load_timeout_secs(),
        }
    }
}

impl Default for DatasetColumns {
    fn default() -> Self {
        DatasetColumns {
            street: default_street_column(),
            city: default_city_column(),
            state: default_state_column(),
            zip: default_zip_column(),
            country: None,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            path: None,
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind: default_bind(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file, then apply environment overrides
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            ForgeError::Config(format!(
                "failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        let mut config: AppConfig = toml::from_str(&content)
            .map_err(|e| ForgeError::Config(format!("failed to parse TOML config: {}", e)))?;

        config.load_from_env();
        config.validate()?;

        Ok(config)
    }

    /// Like `load`, but a missing file yields the defaults
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            return Self::load(path);
        }

        let mut config = AppConfig::default();
        config.load_from_env();
        config.validate()?;
        Ok(config)
    }

    fn load_from_env(&mut self) {
        if let Ok(store) = std::env::var(ENV_STORE_PATH) {
            if !store.is_empty() {
                self.store.path = Some(PathBuf::from(store));
            }
        }

        if let Ok(dataset) = std::env::var(ENV_DATASET_PATH) {
            if !dataset.is_empty() {
                self.dataset.path = Some(PathBuf::from(dataset));
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        let card = &self.card;

        if card.min_length < 13 || card.max_length > 19 {
            return Err(ForgeError::Config(
                "card lengths must stay within 13-19 digits".to_string(),
            ));
        }
        if card.min_length > card.max_length {
            return Err(ForgeError::Config(format!(
                "card.min_length ({}) exceeds card.max_length ({})",
                card.min_length, card.max_length
            )));
        }
        if card.default_length < card.min_length || card.default_length > card.max_length {
            return Err(ForgeError::Config(format!(
                "card.default_length must be between {} and {}",
                card.min_length, card.max_length
            )));
        }
        if card.max_years_ahead > 50 {
            return Err(ForgeError::Config(
                "card.max_years_ahead must be <= 50".to_string(),
            ));
        }
        if card.default_years_ahead > card.max_years_ahead {
            return Err(ForgeError::Config(format!(
                "card.default_years_ahead ({}) exceeds card.max_years_ahead ({})",
                card.default_years_ahead, card.max_years_ahead
            )));
        }
        if card.max_bulk == 0 {
            return Err(ForgeError::Config("card.max_bulk must be >= 1".to_string()));
        }

        if self.session.expiry_hours == 0 {
            return Err(ForgeError::Config(
                "session.expiry_hours must be >= 1".to_string(),
            ));
        }
        if self.session.token_bytes < 16 {
            return Err(ForgeError::Config(
                "session.token_bytes must be >= 16".to_string(),
            ));
        }

        let columns = &self.dataset.columns;
        for (name, value) in [
            ("street", &columns.street),
            ("city", &columns.city),
            ("state", &columns.state),
            ("zip", &columns.zip),
        ] {
            if value.trim().is_empty() {
                return Err(ForgeError::Config(format!(
                    "dataset.columns.{} must not be empty",
                    name
                )));
            }
        }

        Ok(())
    }

    /// Store location: configured path, or `<data dir>/cardforge/cardforge.db`
    pub fn resolve_store_path(&self) -> PathBuf {
        if let Some(path) = &self.store.path {
            return path.clone();
        }

        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("cardforge")
            .join("cardforge.db")
    }

    /// Shipped defaults rendered as TOML
    pub fn default_toml() -> String {
        r#"# cardforge configuration

[card]
default_length = 16
min_length = 13
max_length = 19
default_years_ahead = 5
max_years_ahead = 10
max_bulk = 100

[session]
expiry_hours = 24
token_bytes = 32

[dataset]
# path = "assets/address/us-US.csv"
default_state = "Louisiana"
default_country = "US"
load_timeout_secs = 30

[dataset.columns]
street = "FULL ADDRESS"
city = "CITY"
state = "JURISDICTION"
zip = "ZIP"

[store]
# path = "cardforge.db"
busy_timeout_ms = 5000

[server]
bind = "127.0.0.1:3000"
"#
        .to_string()
    }

    /// Write the shipped defaults to `path`
    pub fn save_default<P: AsRef<Path>>(path: P) -> Result<()> {
        fs::write(path.as_ref(), Self::default_toml())
            .map_err(|e| ForgeError::Config(format!("failed to write default config: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.card.default_length, 16);
        assert_eq!(config.card.max_bulk, 100);
        assert_eq!(config.session.expiry_hours, 24);
    }

    #[test]
    fn test_default_toml_parses_to_defaults() {
        let parsed: AppConfig = toml::from_str(&AppConfig::default_toml()).unwrap();
        assert!(parsed.validate().is_ok());
        assert_eq!(parsed.dataset.columns.street, "FULL ADDRESS");
        assert_eq!(parsed.server.bind, "127.0.0.1:3000");
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let parsed: AppConfig = toml::from_str("").unwrap();
        assert_eq!(parsed.card.max_length, 19);
        assert_eq!(parsed.dataset.default_country, "US");
    }

    #[test]
    fn test_validate_rejects_inverted_lengths() {
        let mut config = AppConfig::default();
        config.card.min_length = 18;
        config.card.max_length = 15;
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("exceeds"), "got err: {}", err);
    }

    #[test]
    fn test_validate_rejects_short_tokens() {
        let mut config = AppConfig::default();
        config.session.token_bytes = 8;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_default_horizon_above_cap() {
        let mut config = AppConfig::default();
        config.card.default_years_ahead = 12;
        config.card.max_years_ahead = 10;
        assert!(matches!(config.validate(), Err(ForgeError::Config(_))));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cardforge.toml");
        fs::write(&path, "[card]\nmax_bulk = 250\n").unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.card.max_bulk, 250);
        assert_eq!(config.card.default_length, 16);
    }

    #[test]
    fn test_explicit_store_path_wins() {
        let mut config = AppConfig::default();
        config.store.path = Some(PathBuf::from("/tmp/forge.db"));
        assert_eq!(config.resolve_store_path(), PathBuf::from("/tmp/forge.db"));
    }
}
