//! In-memory subscription reader.
//!
//! Holds subscriptions pushed in by tests or a bootstrap step. The
//! production reader is backed by the billing database.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::domain::entitlement::Subscription;
use crate::domain::foundation::UserId;
use crate::ports::{StoreError, SubscriptionReader};

/// In-memory implementation of the SubscriptionReader port.
#[derive(Default)]
pub struct InMemorySubscriptionReader {
    subscriptions: Mutex<HashMap<UserId, Subscription>>,
}

impl InMemorySubscriptionReader {
    /// Creates a new empty reader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a user's subscription.
    pub fn upsert(&self, subscription: Subscription) {
        self.subscriptions
            .lock()
            .unwrap()
            .insert(subscription.user_id.clone(), subscription);
    }

    /// Removes a user's subscription, if present.
    pub fn remove(&self, user_id: &UserId) {
        self.subscriptions.lock().unwrap().remove(user_id);
    }
}

#[async_trait]
impl SubscriptionReader for InMemorySubscriptionReader {
    async fn subscription_for(
        &self,
        user_id: &UserId,
    ) -> Result<Option<Subscription>, StoreError> {
        Ok(self.subscriptions.lock().unwrap().get(user_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entitlement::{BillingInterval, SubscriptionStatus, SubscriptionTier};
    use crate::domain::foundation::Timestamp;

    fn subscription(user: &str) -> Subscription {
        Subscription::new(
            UserId::new(user).unwrap(),
            SubscriptionTier::Professional,
            BillingInterval::Monthly,
            SubscriptionStatus::Active,
            Timestamp::from_unix_secs(0),
        )
    }

    #[tokio::test]
    async fn unknown_user_has_no_subscription() {
        let reader = InMemorySubscriptionReader::new();
        let result = reader
            .subscription_for(&UserId::new("ghost").unwrap())
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn upsert_then_read_round_trips() {
        let reader = InMemorySubscriptionReader::new();
        reader.upsert(subscription("user-1"));

        let found = reader
            .subscription_for(&UserId::new("user-1").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.tier, SubscriptionTier::Professional);
    }

    #[tokio::test]
    async fn upsert_replaces_existing() {
        let reader = InMemorySubscriptionReader::new();
        reader.upsert(subscription("user-1"));

        let mut changed = subscription("user-1");
        changed.tier = SubscriptionTier::Enterprise;
        reader.upsert(changed);

        let found = reader
            .subscription_for(&UserId::new("user-1").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.tier, SubscriptionTier::Enterprise);
    }

    #[tokio::test]
    async fn remove_drops_the_subscription() {
        let reader = InMemorySubscriptionReader::new();
        reader.upsert(subscription("user-1"));
        reader.remove(&UserId::new("user-1").unwrap());

        let result = reader
            .subscription_for(&UserId::new("user-1").unwrap())
            .await
            .unwrap();
        assert!(result.is_none());
    }
}
