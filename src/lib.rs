// CardForge - Core Library
// Exposes all modules for use in CLI, API server, and tests

pub mod error;
pub mod config;
pub mod luhn;
pub mod pattern;   // BIN templates + card type detection
pub mod generator; // Card synthesis
pub mod format;    // Bulk output renderers
pub mod address;   // Dataset, sampler, names, identity
pub mod db;        // SQLite config store
pub mod registry;  // BIN registry
pub mod auth;      // Admin sessions
pub mod settings;
pub mod api;       // Request façade
#[cfg(feature = "server")]
pub mod server;

// Re-export commonly used types
pub use error::{ErrorKind, ForgeError, Result};
pub use config::AppConfig;
pub use pattern::{validate_template, CardType, Pattern};
pub use generator::{CardGenerator, CardRecord, Expiry, GenerateOptions};
pub use format::OutputFormat;
pub use address::{
    AddressDataset, AddressQuery, AddressRecord, AddressSampler, ComposeOptions, Gender,
    Identity, IdentityComposer, NameGenerator, NameSource, PersonName,
};
pub use db::ConfigStore;
pub use registry::{BinPatch, BinPattern, BinRegistry, NewBin};
pub use auth::{AdminSession, AuthGate};
pub use settings::SettingsStore;
pub use api::{ApiResponse, Forge};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
