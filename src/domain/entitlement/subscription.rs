//! Subscription read model.
//!
//! Owned by the billing/checkout collaborator; the engine treats it as
//! read-only input. Tier changes and renewals arrive as settled facts.

use serde::{Deserialize, Serialize};

use super::SubscriptionTier;
use crate::domain::foundation::{Timestamp, UserId};

/// How often the subscription bills, and therefore how usage periods roll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingInterval {
    Monthly,
    Annual,
}

/// Lifecycle state of a subscription.
///
/// Carried for callers and reporting. Admission does not branch on it:
/// blocking past-due or cancelled users is the billing collaborator's
/// policy, the engine only meters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    PastDue,
    Cancelled,
}

/// A user's subscription as delivered by the billing collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub user_id: UserId,
    pub tier: SubscriptionTier,
    pub billing_interval: BillingInterval,
    pub status: SubscriptionStatus,
    /// Anchor for billing periods. Usage counters partition on whole
    /// intervals elapsed since this instant.
    pub period_start: Timestamp,
}

impl Subscription {
    pub fn new(
        user_id: UserId,
        tier: SubscriptionTier,
        billing_interval: BillingInterval,
        status: SubscriptionStatus,
        period_start: Timestamp,
    ) -> Self {
        Self {
            user_id,
            tier,
            billing_interval,
            status,
            period_start,
        }
    }

    /// True while the subscription is in good standing or grace.
    pub fn is_current(&self) -> bool {
        matches!(
            self.status,
            SubscriptionStatus::Active | SubscriptionStatus::PastDue
        )
    }
}
