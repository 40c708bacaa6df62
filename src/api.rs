// 📮 Request Façade
// One method per external request, each answering with a result envelope

use crate::address::{
    AddressDataset, AddressQuery, AddressRecord, AddressSampler, ComposeOptions, Gender,
    IdentityComposer, NameGenerator, NameSource, PersonName,
};
use crate::auth::{AdminSession, AuthGate};
use crate::config::AppConfig;
use crate::db::ConfigStore;
use crate::error::{ErrorKind, ForgeError, Result};
use crate::format::OutputFormat;
use crate::generator::{CardGenerator, CardRecord, GenerateOptions};
use crate::registry::{BinPatch, BinPattern, BinRegistry, NewBin};
use crate::settings::SettingsStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

// ============================================================================
// ENVELOPE
// ============================================================================

/// `{ success, data?, message?, error? }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Tag for programmatic branching; set only on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorKind>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            error: None,
        }
    }

    /// Success with nothing to return
    pub fn done(message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: None,
            message: Some(message.into()),
            error: None,
        }
    }

    pub fn fail(err: &ForgeError) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(err.to_string()),
            error: Some(err.kind()),
        }
    }

    pub fn from_result(result: Result<T>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => Self::fail(&e),
        }
    }
}

// ============================================================================
// REQUESTS / RESULTS
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerateCardRequest {
    pub pattern: String,
    #[serde(flatten)]
    pub options: GenerateOptions,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerateCardsRequest {
    pub pattern: String,
    pub count: i64,
    #[serde(default)]
    pub format: Option<OutputFormat>,
    #[serde(flatten)]
    pub options: GenerateOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedCards {
    pub cards: Vec<CardRecord>,
    pub format: OutputFormat,
    /// `cards` rendered in `format`
    pub rendered: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerateAddressRequest {
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub include_name: bool,
    #[serde(default)]
    pub gender: Gender,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerateAddressesRequest {
    pub count: i64,
    #[serde(flatten)]
    pub address: GenerateAddressRequest,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerateNameRequest {
    #[serde(default)]
    pub gender: Gender,
    #[serde(default)]
    pub country: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedName {
    #[serde(flatten)]
    pub person: PersonName,
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateBinRequest {
    pub id: String,
    #[serde(flatten)]
    pub patch: BinPatch,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingRequest {
    pub key: String,
    pub value: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigPath {
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetStatus {
    pub loaded: bool,
    pub count: usize,
}

// ============================================================================
// FORGE
// ============================================================================

/// Owns one instance of every component
pub struct Forge {
    config: AppConfig,
    store: Arc<ConfigStore>,
    generator: CardGenerator,
    dataset: Arc<AddressDataset>,
    composer: IdentityComposer,
    registry: BinRegistry,
    auth: AuthGate,
    settings: SettingsStore,
}

impl Forge {
    pub fn new(config: AppConfig, store: ConfigStore) -> Self {
        let store = Arc::new(store);
        let dataset = Arc::new(AddressDataset::new(&config.dataset));
        let names: Arc<dyn NameSource> = Arc::new(NameGenerator::new());

        Forge {
            generator: CardGenerator::new(config.card.clone()),
            composer: IdentityComposer::new(AddressSampler::new(Arc::clone(&dataset)), names),
            registry: BinRegistry::new(Arc::clone(&store)),
            auth: AuthGate::new(Arc::clone(&store), &config.session),
            settings: SettingsStore::new(Arc::clone(&store)),
            dataset,
            store,
            config,
        }
    }

    /// Open the configured store and, if one is configured, the address dataset
    ///
    /// A dataset that fails to load leaves addresses unavailable; everything
    /// else still works.
    pub fn open(config: AppConfig) -> Result<Self> {
        let store = ConfigStore::open(
            config.resolve_store_path(),
            Duration::from_millis(config.store.busy_timeout_ms),
        )?;
        let forge = Forge::new(config, store);

        if let Some(path) = forge.config.dataset.path.clone() {
            if let Err(e) = forge.dataset.load_file(&path) {
                warn!("address feature unavailable: {}", e);
            }
        }

        Ok(forge)
    }

    pub fn in_memory(config: AppConfig) -> Result<Self> {
        Ok(Forge::new(config, ConfigStore::open_in_memory()?))
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<ConfigStore> {
        &self.store
    }

    pub fn generator(&self) -> &CardGenerator {
        &self.generator
    }

    pub fn dataset(&self) -> &Arc<AddressDataset> {
        &self.dataset
    }

    pub fn composer(&self) -> &IdentityComposer {
        &self.composer
    }

    pub fn registry(&self) -> &BinRegistry {
        &self.registry
    }

    pub fn auth(&self) -> &AuthGate {
        &self.auth
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    fn respond<T>(&self, request: &str, result: Result<T>) -> ApiResponse<T> {
        if let Err(e) = &result {
            match e.kind() {
                ErrorKind::Persistence | ErrorKind::Config => {
                    warn!(request, "request failed: {}", e)
                }
                _ => debug!(request, "request refused: {}", e),
            }
        }
        ApiResponse::from_result(result)
    }

    /// Gate for admin-only requests
    fn admin(&self, token: &str) -> Result<AdminSession> {
        self.auth.require(token)
    }

    // ------------------------------------------------------------------------
    // Generation
    // ------------------------------------------------------------------------

    pub fn generate_card(&self, req: &GenerateCardRequest) -> ApiResponse<CardRecord> {
        let result = self
            .generator
            .generate(&mut rand::thread_rng(), &req.pattern, &req.options);
        self.respond("generate-card", result)
    }

    pub fn generate_cards(&self, req: &GenerateCardsRequest) -> ApiResponse<GeneratedCards> {
        let format = req.format.unwrap_or_default();
        let result = self
            .generator
            .generate_bulk(&mut rand::thread_rng(), &req.pattern, req.count, &req.options)
            .and_then(|cards| {
                let rendered = format.render(&cards)?;
                Ok(GeneratedCards {
                    cards,
                    format,
                    rendered,
                })
            });
        self.respond("generate-cards", result)
    }

    pub fn generate_address(&self, req: &GenerateAddressRequest) -> ApiResponse<AddressRecord> {
        let result = self
            .composer
            .compose(&mut rand::thread_rng(), &compose_options(req));
        self.respond("generate-address", result)
    }

    /// Bounded by the same cap as bulk card generation
    pub fn generate_addresses(
        &self,
        req: &GenerateAddressesRequest,
    ) -> ApiResponse<Vec<AddressRecord>> {
        let max = self.config.card.max_bulk;
        let result = if req.count <= 0 || req.count as u64 > max as u64 {
            Err(ForgeError::InvalidCount {
                got: req.count,
                max,
            })
        } else {
            self.composer.compose_many(
                &mut rand::thread_rng(),
                &compose_options(&req.address),
                req.count as usize,
            )
        };
        self.respond("generate-addresses", result)
    }

    pub fn generate_name(&self, req: &GenerateNameRequest) -> ApiResponse<GeneratedName> {
        if let Some(country) = req.country.as_deref() {
            if !NameGenerator::supports_country(country) {
                debug!(country, "no name set for country, using US names");
            }
        }

        let mut rng = rand::thread_rng();
        let names = self.composer.names();
        let person = names.person(&mut rng, req.gender);
        let email = names.email(&mut rng, &person);
        let phone = names.phone(&mut rng);

        ApiResponse::ok(GeneratedName {
            person,
            email,
            phone,
        })
    }

    // ------------------------------------------------------------------------
    // Dataset
    // ------------------------------------------------------------------------

    pub fn load_dataset(&self, path: &Path) -> ApiResponse<DatasetStatus> {
        let result = self.dataset.load_file(path).map(|records| DatasetStatus {
            loaded: true,
            count: records.len(),
        });
        self.respond("load-dataset", result)
    }

    /// Timeout-bounded variant for remote callers; admin only
    #[cfg(feature = "server")]
    pub async fn load_dataset_bounded(
        &self,
        token: &str,
        path: std::path::PathBuf,
    ) -> ApiResponse<DatasetStatus> {
        if let Err(e) = self.admin(token) {
            return self.respond("load-dataset", Err(e));
        }

        let result = self
            .dataset
            .load_file_bounded(path)
            .await
            .map(|records| DatasetStatus {
                loaded: true,
                count: records.len(),
            });
        self.respond("load-dataset", result)
    }

    pub fn dataset_status(&self) -> ApiResponse<DatasetStatus> {
        ApiResponse::ok(DatasetStatus {
            loaded: self.dataset.is_loaded(),
            count: self.dataset.count(),
        })
    }

    // ------------------------------------------------------------------------
    // Admin
    // ------------------------------------------------------------------------

    pub fn admin_login(&self, req: &LoginRequest) -> ApiResponse<AdminSession> {
        let result = self.auth.login(&req.username, &req.password);
        self.respond("admin-login", result)
    }

    /// Not being logged in is an answer, not a failure
    pub fn admin_verify_session(&self, token: &str) -> ApiResponse<SessionStatus> {
        let status = match self.auth.verify(token) {
            Some(session) => SessionStatus {
                valid: true,
                username: Some(session.username),
                expires_at: Some(session.expires_at),
            },
            None => SessionStatus {
                valid: false,
                username: None,
                expires_at: None,
            },
        };
        ApiResponse::ok(status)
    }

    pub fn admin_logout(&self, token: &str) -> ApiResponse<()> {
        match self.auth.logout(token) {
            Ok(()) => ApiResponse::done("logged out"),
            Err(e) => self.respond("admin-logout", Err(e)),
        }
    }

    pub fn get_all_bins(&self, token: &str) -> ApiResponse<Vec<BinPattern>> {
        let result = self.admin(token).and_then(|_| self.registry.list());
        self.respond("get-all-bins", result)
    }

    pub fn get_active_bins(&self) -> ApiResponse<Vec<BinPattern>> {
        self.respond("get-active-bins", self.registry.list_active())
    }

    pub fn add_bin(&self, token: &str, record: NewBin) -> ApiResponse<BinPattern> {
        let result = self
            .admin(token)
            .and_then(|session| self.registry.add(record, &session.username));
        self.respond("add-bin", result)
    }

    pub fn update_bin(&self, token: &str, req: UpdateBinRequest) -> ApiResponse<BinPattern> {
        let result = self
            .admin(token)
            .and_then(|_| self.registry.update(&req.id, req.patch));
        self.respond("update-bin", result)
    }

    pub fn delete_bin(&self, token: &str, id: &str) -> ApiResponse<bool> {
        let result = self.admin(token).and_then(|_| self.registry.delete(id));
        self.respond("delete-bin", result)
    }

    /// Missing keys answer with success and no data
    pub fn get_setting(&self, key: &str) -> ApiResponse<Value> {
        match self.settings.get(key) {
            Ok(Some(value)) => ApiResponse::ok(value),
            Ok(None) => ApiResponse::done(format!("no setting '{}'", key)),
            Err(e) => self.respond("get-setting", Err(e)),
        }
    }

    pub fn set_setting(&self, token: &str, req: &SettingRequest) -> ApiResponse<()> {
        let result = self
            .admin(token)
            .and_then(|_| self.settings.set(&req.key, &req.value));
        match result {
            Ok(()) => ApiResponse::done(format!("setting '{}' saved", req.key.trim())),
            Err(e) => self.respond("set-setting", Err(e)),
        }
    }

    pub fn get_config_path(&self) -> ApiResponse<ConfigPath> {
        ApiResponse::ok(ConfigPath {
            path: self.settings.config_path(),
        })
    }

    /// Also revokes the caller's own session
    pub fn reset_config(&self, token: &str) -> ApiResponse<()> {
        let result = self
            .admin(token)
            .and_then(|_| self.settings.reset_to_defaults());
        match result {
            Ok(()) => ApiResponse::done("configuration restored to defaults"),
            Err(e) => self.respond("reset-config", Err(e)),
        }
    }
}

fn compose_options(req: &GenerateAddressRequest) -> ComposeOptions {
    ComposeOptions {
        include_name: req.include_name,
        gender: req.gender,
        query: AddressQuery {
            state: req.state.clone(),
            country: req.country.clone(),
        },
    }
}
