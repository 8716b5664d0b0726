//! SubscriptionReader port - subscriptions as delivered by billing.

use async_trait::async_trait;

use super::StoreError;
use crate::domain::entitlement::Subscription;
use crate::domain::foundation::UserId;

/// Port for reading a user's current subscription.
///
/// The subscription is owned by the billing collaborator; the engine
/// only reads it to resolve the tier and the active billing period.
/// `None` means the user is unknown to billing, which the handlers
/// surface as `UnknownUser`.
#[async_trait]
pub trait SubscriptionReader: Send + Sync {
    async fn subscription_for(&self, user_id: &UserId)
        -> Result<Option<Subscription>, StoreError>;
}
