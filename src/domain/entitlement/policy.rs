//! Policy catalogue - per-tier quotas and per-feature credit costs.
//!
//! Immutable configuration, versioned by deploy. A feature that is not
//! registered at all is an error (`UnknownFeature`); a registered feature
//! whose quota is zero for a tier is a valid policy state meaning "not
//! available under quota".

use once_cell::sync::Lazy;
use std::collections::HashMap;

use super::{EntitlementError, FeatureKey, SubscriptionTier};

/// How a feature charges against the credit balance once quota is spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreditCost {
    /// Each admitted unit costs this many credits beyond quota.
    PerUnit(u64),
    /// Feature cannot be paid for with credits; quota is a hard limit.
    NotCreditable,
}

impl CreditCost {
    /// Returns true if the feature can be paid for with credits.
    pub fn is_creditable(&self) -> bool {
        matches!(self, CreditCost::PerUnit(_))
    }

    /// Credits required for `quantity` units, or None if not creditable.
    pub fn cost_of(&self, quantity: u64) -> Option<u64> {
        match self {
            CreditCost::PerUnit(per_unit) => Some(per_unit * quantity),
            CreditCost::NotCreditable => None,
        }
    }
}

/// Resolved policy for one (tier, feature) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeaturePolicy {
    /// Units admitted per billing period before credits are required.
    pub quota: u64,
    /// Credit pricing beyond quota.
    pub credit_cost: CreditCost,
}

#[derive(Debug, Clone)]
struct FeatureEntry {
    credit_cost: CreditCost,
    quotas: HashMap<SubscriptionTier, u64>,
}

/// Catalogue of registered features and their per-tier quotas.
#[derive(Debug, Clone, Default)]
pub struct PolicyCatalogue {
    features: HashMap<FeatureKey, FeatureEntry>,
}

impl PolicyCatalogue {
    pub fn builder() -> PolicyCatalogueBuilder {
        PolicyCatalogueBuilder::default()
    }

    /// The shipped default catalogue.
    ///
    /// # Quotas per billing period
    ///
    /// | Feature | Credits/unit | Free | Educator | Professional | Institution | Enterprise |
    /// |---------|--------------|------|----------|--------------|-------------|------------|
    /// | ai_recommendations | 1 | 5 | 50 | 200 | 1000 | 5000 |
    /// | generated_reports | 5 | 2 | 20 | 100 | 500 | 2500 |
    /// | storage_uploads | not creditable | 1 | 5 | 20 | 100 | 500 |
    pub fn standard() -> &'static PolicyCatalogue {
        static STANDARD: Lazy<PolicyCatalogue> = Lazy::new(|| {
            use SubscriptionTier::*;

            PolicyCatalogue::builder()
                .with_feature(
                    FeatureKey::new("ai_recommendations").unwrap(),
                    CreditCost::PerUnit(1),
                    [
                        (Free, 5),
                        (Educator, 50),
                        (Professional, 200),
                        (Institution, 1000),
                        (Enterprise, 5000),
                    ],
                )
                .with_feature(
                    FeatureKey::new("generated_reports").unwrap(),
                    CreditCost::PerUnit(5),
                    [
                        (Free, 2),
                        (Educator, 20),
                        (Professional, 100),
                        (Institution, 500),
                        (Enterprise, 2500),
                    ],
                )
                .with_feature(
                    FeatureKey::new("storage_uploads").unwrap(),
                    CreditCost::NotCreditable,
                    [
                        (Free, 1),
                        (Educator, 5),
                        (Professional, 20),
                        (Institution, 100),
                        (Enterprise, 500),
                    ],
                )
                .build()
        });
        &STANDARD
    }

    /// Returns true if the feature is registered in this catalogue.
    pub fn is_registered(&self, feature: &FeatureKey) -> bool {
        self.features.contains_key(feature)
    }

    /// Quota for a (tier, feature) pair.
    ///
    /// Zero means the feature exists but this tier gets no quota-funded
    /// use; an unregistered feature is an `UnknownFeature` error.
    pub fn quota_for(
        &self,
        tier: SubscriptionTier,
        feature: &FeatureKey,
    ) -> Result<u64, EntitlementError> {
        let entry = self.entry(feature)?;
        Ok(entry.quotas.get(&tier).copied().unwrap_or(0))
    }

    /// Credit pricing for a feature, independent of tier.
    pub fn credit_cost_for(&self, feature: &FeatureKey) -> Result<CreditCost, EntitlementError> {
        Ok(self.entry(feature)?.credit_cost)
    }

    /// Resolved policy for a (tier, feature) pair.
    pub fn policy_for(
        &self,
        tier: SubscriptionTier,
        feature: &FeatureKey,
    ) -> Result<FeaturePolicy, EntitlementError> {
        let entry = self.entry(feature)?;
        Ok(FeaturePolicy {
            quota: entry.quotas.get(&tier).copied().unwrap_or(0),
            credit_cost: entry.credit_cost,
        })
    }

    /// Registered feature keys, in no particular order.
    pub fn features(&self) -> impl Iterator<Item = &FeatureKey> {
        self.features.keys()
    }

    fn entry(&self, feature: &FeatureKey) -> Result<&FeatureEntry, EntitlementError> {
        self.features
            .get(feature)
            .ok_or_else(|| EntitlementError::UnknownFeature(feature.clone()))
    }
}

/// Builder for assembling a catalogue from configuration.
#[derive(Debug, Clone, Default)]
pub struct PolicyCatalogueBuilder {
    features: HashMap<FeatureKey, FeatureEntry>,
}

impl PolicyCatalogueBuilder {
    /// Registers a feature with its credit pricing and per-tier quotas.
    ///
    /// Tiers absent from `quotas` default to zero. Registering the same
    /// key twice replaces the earlier entry.
    pub fn with_feature(
        mut self,
        key: FeatureKey,
        credit_cost: CreditCost,
        quotas: impl IntoIterator<Item = (SubscriptionTier, u64)>,
    ) -> Self {
        self.features.insert(
            key,
            FeatureEntry {
                credit_cost,
                quotas: quotas.into_iter().collect(),
            },
        );
        self
    }

    pub fn build(self) -> PolicyCatalogue {
        PolicyCatalogue {
            features: self.features,
        }
    }
}
