// 🎲 Address Sampler
// Uniform draws over the installed dataset index

use super::{AddressDataset, AddressRecord};
use crate::error::{ForgeError, Result};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Optional filters for a draw; empty fields match everything
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressQuery {
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

impl AddressQuery {
    pub fn is_empty(&self) -> bool {
        non_blank(&self.state).is_none() && non_blank(&self.country).is_none()
    }

    pub fn matches(&self, record: &AddressRecord) -> bool {
        let state_ok = non_blank(&self.state)
            .map(|s| record.state.eq_ignore_ascii_case(s))
            .unwrap_or(true);
        let country_ok = non_blank(&self.country)
            .map(|c| record.country.eq_ignore_ascii_case(c))
            .unwrap_or(true);
        state_ok && country_ok
    }

    fn describe(&self) -> String {
        let mut parts = Vec::new();
        if let Some(state) = non_blank(&self.state) {
            parts.push(format!("state '{}'", state));
        }
        if let Some(country) = non_blank(&self.country) {
            parts.push(format!("country '{}'", country));
        }
        parts.join(" and ")
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[derive(Debug, Clone)]
pub struct AddressSampler {
    dataset: Arc<AddressDataset>,
}

impl AddressSampler {
    pub fn new(dataset: Arc<AddressDataset>) -> Self {
        AddressSampler { dataset }
    }

    pub fn dataset(&self) -> &Arc<AddressDataset> {
        &self.dataset
    }

    /// One record, uniform over the whole index
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<AddressRecord> {
        let records = self.dataset.snapshot()?;
        records
            .choose(rng)
            .cloned()
            .ok_or(ForgeError::DatasetNotLoaded)
    }

    /// Uniform among the records matching `query`
    pub fn sample_matching<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        query: &AddressQuery,
    ) -> Result<AddressRecord> {
        if query.is_empty() {
            return self.sample(rng);
        }

        let records = self.dataset.snapshot()?;
        let matching: Vec<&AddressRecord> = records.iter().filter(|r| query.matches(r)).collect();

        matching
            .choose(rng)
            .map(|r| (*r).clone())
            .ok_or_else(|| ForgeError::NoMatchingAddress(query.describe()))
    }
}
