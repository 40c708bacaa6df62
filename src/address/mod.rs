// 🏠 Address & Identity Synthesis
// Dataset index → uniform sampling → optional name/contact merge

pub mod dataset;
pub mod identity;
pub mod names;
pub mod sampler;

use serde::{Deserialize, Serialize};

pub use dataset::AddressDataset;
pub use identity::{ComposeOptions, IdentityComposer};
pub use names::{Gender, NameGenerator, NameSource, PersonName};
pub use sampler::{AddressQuery, AddressSampler};

/// One address drawn from the dataset
///
/// `street`, `city` and `zip` are copied verbatim from a dataset row. The
/// optional identity is synthesized separately and never read from the data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressRecord {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub country: String,

    #[serde(flatten)]
    pub identity: Option<Identity>,
}

/// Synthesized contact data merged into a sampled address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub name: String,
    pub email: String,
    pub phone: String,
}

impl AddressRecord {
    /// Same address with contact data attached; dataset fields are untouched
    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Dataset-sourced fields only (identity stripped)
    pub fn address_only(&self) -> AddressRecord {
        AddressRecord {
            identity: None,
            ..self.clone()
        }
    }
}
