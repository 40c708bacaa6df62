// 🪪 Identity Composer
// Sampled address + synthesized name/email/phone

use super::{AddressQuery, AddressRecord, AddressSampler, Gender, Identity, NameSource};
use crate::error::Result;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComposeOptions {
    #[serde(default)]
    pub include_name: bool,
    #[serde(default)]
    pub gender: Gender,
    #[serde(default)]
    pub query: AddressQuery,
}

#[derive(Clone)]
pub struct IdentityComposer {
    sampler: AddressSampler,
    names: Arc<dyn NameSource>,
}

impl IdentityComposer {
    pub fn new(sampler: AddressSampler, names: Arc<dyn NameSource>) -> Self {
        IdentityComposer { sampler, names }
    }

    pub fn sampler(&self) -> &AddressSampler {
        &self.sampler
    }

    pub fn names(&self) -> &Arc<dyn NameSource> {
        &self.names
    }

    /// Sample an address and, when asked, attach a synthesized identity
    pub fn compose<R: Rng>(&self, rng: &mut R, options: &ComposeOptions) -> Result<AddressRecord> {
        let address = self.sampler.sample_matching(rng, &options.query)?;

        if !options.include_name {
            return Ok(address);
        }

        let person = self.names.person(rng, options.gender);
        let email = self.names.email(rng, &person);
        let phone = self.names.phone(rng);

        Ok(address.with_identity(Identity {
            name: person.full_name,
            email,
            phone,
        }))
    }

    /// `count` independent compositions; repeats of the same address are possible
    pub fn compose_many<R: Rng>(
        &self,
        rng: &mut R,
        options: &ComposeOptions,
        count: usize,
    ) -> Result<Vec<AddressRecord>> {
        (0..count).map(|_| self.compose(rng, options)).collect()
    }
}
