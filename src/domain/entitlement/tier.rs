//! Subscription tier definitions.
//!
//! Represents the subscription levels offered by the platform. Each tier
//! grants a fixed monthly allotment of metered actions per feature; the
//! amounts themselves live in the policy catalogue, not here.

use serde::{Deserialize, Serialize};

/// Subscription tier.
///
/// Determines which per-feature quotas apply. Tier changes are delivered
/// by the billing collaborator as settled facts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionTier {
    /// Free tier - evaluation quotas only.
    Free,

    /// Individual educator plan.
    Educator,

    /// Professional plan for individual power users.
    Professional,

    /// Institution plan for schools and districts.
    Institution,

    /// Enterprise plan with negotiated quotas.
    Enterprise,
}

impl SubscriptionTier {
    /// Returns true if this tier is a paid tier.
    pub fn is_paid(&self) -> bool {
        !matches!(self, SubscriptionTier::Free)
    }

    /// Returns the display name for this tier.
    pub fn display_name(&self) -> &'static str {
        match self {
            SubscriptionTier::Free => "Free",
            SubscriptionTier::Educator => "Educator",
            SubscriptionTier::Professional => "Professional",
            SubscriptionTier::Institution => "Institution",
            SubscriptionTier::Enterprise => "Enterprise",
        }
    }

    /// Returns the numeric rank of this tier for comparison.
    ///
    /// Higher rank = larger quotas. Used for upgrade validation by callers.
    pub fn rank(&self) -> u8 {
        match self {
            SubscriptionTier::Free => 0,
            SubscriptionTier::Educator => 1,
            SubscriptionTier::Professional => 2,
            SubscriptionTier::Institution => 3,
            SubscriptionTier::Enterprise => 4,
        }
    }

    /// All tiers, in ascending rank order.
    pub fn all() -> [SubscriptionTier; 5] {
        [
            SubscriptionTier::Free,
            SubscriptionTier::Educator,
            SubscriptionTier::Professional,
            SubscriptionTier::Institution,
            SubscriptionTier::Enterprise,
        ]
    }
}

impl std::fmt::Display for SubscriptionTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_tier_is_not_paid() {
        assert!(!SubscriptionTier::Free.is_paid());
    }

    #[test]
    fn educator_tier_is_paid() {
        assert!(SubscriptionTier::Educator.is_paid());
    }

    #[test]
    fn ranks_ascend_with_tier() {
        let ranks: Vec<u8> = SubscriptionTier::all().iter().map(|t| t.rank()).collect();
        let mut sorted = ranks.clone();
        sorted.sort_unstable();
        assert_eq!(ranks, sorted);
    }

    #[test]
    fn tier_serializes_lowercase() {
        let json = serde_json::to_string(&SubscriptionTier::Educator).unwrap();
        assert_eq!(json, "\"educator\"");
    }

    #[test]
    fn tier_deserializes_from_lowercase() {
        let tier: SubscriptionTier = serde_json::from_str("\"enterprise\"").unwrap();
        assert_eq!(tier, SubscriptionTier::Enterprise);
    }
}
