//! Policy file loading.
//!
//! The policy catalogue is immutable configuration, versioned by deploy.
//! Operators ship a YAML file mapping features to credit prices and
//! per-tier quotas; this module parses it into a
//! [`PolicyCatalogue`](crate::domain::entitlement::PolicyCatalogue).
//!
//! # File format
//!
//! ```yaml
//! features:
//!   ai_recommendations:
//!     credits_per_unit: 1
//!     quotas:
//!       free: 5
//!       educator: 50
//!   storage_uploads:
//!     # no credits_per_unit: quota is a hard limit
//!     quotas:
//!       free: 1
//! ```

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use super::error::ConfigError;
use crate::domain::entitlement::{CreditCost, FeatureKey, PolicyCatalogue, SubscriptionTier};

/// On-disk shape of the policy catalogue.
#[derive(Debug, Clone, Deserialize)]
pub struct PolicyFile {
    pub features: HashMap<String, PolicyFileFeature>,
}

/// One feature's policy as declared in the file.
#[derive(Debug, Clone, Deserialize)]
pub struct PolicyFileFeature {
    /// Credits per unit beyond quota; absent means not creditable.
    #[serde(default)]
    pub credits_per_unit: Option<u64>,
    /// Per-tier quotas; tiers left out get zero.
    #[serde(default)]
    pub quotas: HashMap<SubscriptionTier, u64>,
}

impl PolicyFile {
    /// Parses the YAML policy format.
    pub fn from_yaml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(s)?)
    }

    /// Builds the immutable catalogue the engine consumes.
    pub fn into_catalogue(self) -> Result<PolicyCatalogue, ConfigError> {
        let mut builder = PolicyCatalogue::builder();
        for (key, feature) in self.features {
            let key = FeatureKey::new(&key)
                .map_err(|_| ConfigError::PolicyFeatureInvalid(key.clone()))?;
            let credit_cost = match feature.credits_per_unit {
                Some(per_unit) => CreditCost::PerUnit(per_unit),
                None => CreditCost::NotCreditable,
            };
            builder = builder.with_feature(key, credit_cost, feature.quotas);
        }
        Ok(builder.build())
    }
}

/// Loads a catalogue from a YAML file on disk.
pub fn load_policy_catalogue(path: impl AsRef<Path>) -> Result<PolicyCatalogue, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    PolicyFile::from_yaml_str(&contents)?.into_catalogue()
}
