//! AuthorizeHandler - the entitlement evaluator.
//!
//! Decides whether a metered action proceeds under quota, proceeds by
//! spending credits, or is denied, and records the resulting ledger
//! mutations. The quota check is the guarded increment itself and the
//! credit fallback is the store's combined debit-and-record, so no
//! decision ever rests on a separately-read snapshot of either ledger.

use std::sync::Arc;

use tracing::debug;

use crate::domain::entitlement::{
    Decision, DenialReason, EntitlementError, FeatureKey, PeriodKey, PolicyCatalogue,
};
use crate::domain::foundation::{Timestamp, UserId};
use crate::ports::{CreditCharge, MeteringStore, QuotaCharge, SubscriptionReader};

/// Command to authorize a metered action.
#[derive(Debug, Clone)]
pub struct AuthorizeCommand {
    pub user_id: UserId,
    pub feature: FeatureKey,
    /// Units requested; must be greater than zero.
    pub quantity: u64,
}

/// Handler deciding admission for metered actions.
///
/// Concurrency-safe by construction: many request tasks may call
/// `handle` for the same user and feature simultaneously, and the sum of
/// quota admissions in a period never exceeds the quota.
pub struct AuthorizeHandler {
    store: Arc<dyn MeteringStore>,
    subscriptions: Arc<dyn SubscriptionReader>,
    policies: Arc<PolicyCatalogue>,
}

impl AuthorizeHandler {
    pub fn new(
        store: Arc<dyn MeteringStore>,
        subscriptions: Arc<dyn SubscriptionReader>,
        policies: Arc<PolicyCatalogue>,
    ) -> Self {
        Self {
            store,
            subscriptions,
            policies,
        }
    }

    /// Authorizes against the current clock.
    pub async fn handle(&self, command: AuthorizeCommand) -> Result<Decision, EntitlementError> {
        self.handle_at(command, Timestamp::now()).await
    }

    /// Authorizes against an explicit clock reading.
    ///
    /// The explicit variant keeps period boundaries deterministic for
    /// tests and replay tooling; `handle` is the production entry point.
    pub async fn handle_at(
        &self,
        command: AuthorizeCommand,
        now: Timestamp,
    ) -> Result<Decision, EntitlementError> {
        if command.quantity == 0 {
            return Err(EntitlementError::InvalidQuantity);
        }

        let subscription = self
            .subscriptions
            .subscription_for(&command.user_id)
            .await?
            .ok_or_else(|| EntitlementError::UnknownUser(command.user_id.clone()))?;

        let policy = self.policies.policy_for(subscription.tier, &command.feature)?;
        let period = PeriodKey::current(&subscription, now);

        // Quota path. The guarded increment is the admission decision:
        // it either records the usage or leaves the counter untouched.
        let charge = self
            .store
            .increment_usage_within(
                &command.user_id,
                &command.feature,
                period,
                command.quantity,
                policy.quota,
            )
            .await?;

        if let QuotaCharge::Charged { new_count } = charge {
            debug!(
                user_id = %command.user_id,
                feature = %command.feature,
                %period,
                new_count,
                "admitted under quota"
            );
            return Ok(Decision::admitted_via_quota(new_count));
        }

        // Credit fallback.
        let Some(cost) = policy.credit_cost.cost_of(command.quantity) else {
            debug!(
                user_id = %command.user_id,
                feature = %command.feature,
                %period,
                "denied: quota exhausted, feature not creditable"
            );
            return Ok(Decision::denied(DenialReason::QuotaExhaustedNotCreditable));
        };

        if cost == 0 {
            // Zero-priced overage: usage is still tracked, but there is
            // nothing to debit.
            let new_count = self
                .store
                .increment_usage(&command.user_id, &command.feature, period, command.quantity)
                .await?;
            return Ok(Decision::admitted_via_credits(0, new_count));
        }

        match self
            .store
            .debit_and_record(&command.user_id, &command.feature, period, command.quantity, cost)
            .await?
        {
            CreditCharge::Charged {
                spent,
                new_balance,
                new_count,
            } => {
                debug!(
                    user_id = %command.user_id,
                    feature = %command.feature,
                    %period,
                    spent,
                    new_balance,
                    new_count,
                    "admitted via credits"
                );
                Ok(Decision::admitted_via_credits(spent, new_count))
            }
            CreditCharge::Insufficient { shortfall } => {
                debug!(
                    user_id = %command.user_id,
                    feature = %command.feature,
                    %period,
                    shortfall,
                    "denied: insufficient credits"
                );
                Ok(Decision::denied(DenialReason::InsufficientCredits {
                    shortfall,
                }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryMeteringStore, InMemorySubscriptionReader};
    use crate::domain::entitlement::{
        AdmissionSource, BillingInterval, CreditCost, Subscription, SubscriptionStatus,
        SubscriptionTier,
    };
    use crate::ports::{CreditLedger, CreditReason, UsageLedger};

    // ════════════════════════════════════════════════════════════════════════════
    // Test Helpers
    // ════════════════════════════════════════════════════════════════════════════

    fn user() -> UserId {
        UserId::new("educator-1").unwrap()
    }

    fn ai_recommendations() -> FeatureKey {
        FeatureKey::new("ai_recommendations").unwrap()
    }

    fn storage_uploads() -> FeatureKey {
        FeatureKey::new("storage_uploads").unwrap()
    }

    fn educator_subscription() -> Subscription {
        Subscription::new(
            user(),
            SubscriptionTier::Educator,
            BillingInterval::Monthly,
            SubscriptionStatus::Active,
            Timestamp::from_unix_secs(0),
        )
    }

    struct Fixture {
        store: Arc<InMemoryMeteringStore>,
        subscriptions: Arc<InMemorySubscriptionReader>,
        handler: AuthorizeHandler,
    }

    fn fixture() -> Fixture {
        fixture_with_policies(PolicyCatalogue::standard().clone())
    }

    fn fixture_with_policies(policies: PolicyCatalogue) -> Fixture {
        let store = Arc::new(InMemoryMeteringStore::new());
        let subscriptions = Arc::new(InMemorySubscriptionReader::new());
        subscriptions.upsert(educator_subscription());
        let handler = AuthorizeHandler::new(
            store.clone(),
            subscriptions.clone(),
            Arc::new(policies),
        );
        Fixture {
            store,
            subscriptions,
            handler,
        }
    }

    fn command(feature: FeatureKey, quantity: u64) -> AuthorizeCommand {
        AuthorizeCommand {
            user_id: user(),
            feature,
            quantity,
        }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Validation and configuration errors
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn zero_quantity_is_rejected() {
        let f = fixture();
        let result = f.handler.handle(command(ai_recommendations(), 0)).await;
        assert_eq!(result, Err(EntitlementError::InvalidQuantity));
    }

    #[tokio::test]
    async fn unknown_user_is_an_error() {
        let f = fixture();
        f.subscriptions.remove(&user());

        let result = f.handler.handle(command(ai_recommendations(), 1)).await;
        assert!(matches!(result, Err(EntitlementError::UnknownUser(_))));
    }

    #[tokio::test]
    async fn unknown_feature_is_an_error_and_records_nothing() {
        let f = fixture();
        let result = f
            .handler
            .handle(command(FeatureKey::new("telepathy").unwrap(), 1))
            .await;
        assert!(matches!(result, Err(EntitlementError::UnknownFeature(_))));
        assert!(f.store.entries().is_empty());
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Quota path
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn admits_under_quota_without_credit_movement() {
        let f = fixture();
        let decision = f
            .handler
            .handle(command(ai_recommendations(), 1))
            .await
            .unwrap();

        assert_eq!(
            decision,
            Decision::Admitted {
                via: AdmissionSource::Quota,
                spent: 0,
                new_count: 1
            }
        );
        assert!(f.store.entries().is_empty());
    }

    #[tokio::test]
    async fn admits_exactly_up_to_the_quota() {
        let f = fixture();
        let now = Timestamp::from_unix_secs(0);
        // Educator quota for ai_recommendations is 50.
        for _ in 0..50 {
            let decision = f
                .handler
                .handle_at(command(ai_recommendations(), 1), now)
                .await
                .unwrap();
            assert!(decision.is_admitted());
        }

        // The 51st request must not be a quota admission.
        let decision = f
            .handler
            .handle_at(command(ai_recommendations(), 1), now)
            .await
            .unwrap();
        assert_eq!(
            decision,
            Decision::denied(DenialReason::InsufficientCredits { shortfall: 1 })
        );
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Credit fallback
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn falls_back_to_credits_when_quota_is_spent() {
        let f = fixture();
        f.store.credit(&user(), 5, CreditReason::Purchase).await.unwrap();
        let period = PeriodKey::new(0);
        f.store
            .increment_usage(&user(), &ai_recommendations(), period, 50)
            .await
            .unwrap();

        let decision = f
            .handler
            .handle_at(command(ai_recommendations(), 1), Timestamp::from_unix_secs(0))
            .await
            .unwrap();

        assert_eq!(
            decision,
            Decision::Admitted {
                via: AdmissionSource::Credits,
                spent: 1,
                new_count: 51
            }
        );
        assert_eq!(f.store.get_balance(&user()).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn denies_non_creditable_feature_once_quota_is_spent() {
        let f = fixture();
        f.store.credit(&user(), 100, CreditReason::Purchase).await.unwrap();
        let period = PeriodKey::new(0);
        // Educator quota for storage_uploads is 5, and it is not creditable.
        f.store
            .increment_usage(&user(), &storage_uploads(), period, 5)
            .await
            .unwrap();

        let decision = f
            .handler
            .handle_at(command(storage_uploads(), 1), Timestamp::from_unix_secs(0))
            .await
            .unwrap();

        assert_eq!(
            decision,
            Decision::denied(DenialReason::QuotaExhaustedNotCreditable)
        );
        // A full balance and an untouched counter: nothing was charged.
        assert_eq!(f.store.get_balance(&user()).await.unwrap(), 100);
        assert_eq!(
            f.store
                .get_usage(&user(), &storage_uploads(), period)
                .await
                .unwrap(),
            5
        );
    }

    #[tokio::test]
    async fn denial_for_insufficient_credits_leaves_usage_untouched() {
        let f = fixture();
        let period = PeriodKey::new(0);
        f.store
            .increment_usage(&user(), &ai_recommendations(), period, 50)
            .await
            .unwrap();

        let decision = f
            .handler
            .handle_at(command(ai_recommendations(), 1), Timestamp::from_unix_secs(0))
            .await
            .unwrap();

        assert_eq!(
            decision,
            Decision::denied(DenialReason::InsufficientCredits { shortfall: 1 })
        );
        assert_eq!(
            f.store
                .get_usage(&user(), &ai_recommendations(), period)
                .await
                .unwrap(),
            50
        );
    }

    #[tokio::test]
    async fn zero_priced_overage_admits_without_debiting() {
        let policies = PolicyCatalogue::builder()
            .with_feature(
                FeatureKey::new("drafts").unwrap(),
                CreditCost::PerUnit(0),
                [(SubscriptionTier::Educator, 1)],
            )
            .build();
        let f = fixture_with_policies(policies);
        let drafts = FeatureKey::new("drafts").unwrap();
        let period = PeriodKey::new(0);
        f.store
            .increment_usage(&user(), &drafts, period, 1)
            .await
            .unwrap();

        let decision = f
            .handler
            .handle_at(command(drafts, 1), Timestamp::from_unix_secs(0))
            .await
            .unwrap();

        assert_eq!(
            decision,
            Decision::Admitted {
                via: AdmissionSource::Credits,
                spent: 0,
                new_count: 2
            }
        );
        assert!(f.store.entries().is_empty());
    }

    // ════════════════════════════════════════════════════════════════════════════
    // The educator walkthrough
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn educator_walkthrough_at_the_quota_boundary() {
        let f = fixture();
        let now = Timestamp::from_unix_secs(0);
        let period = PeriodKey::new(0);
        f.store
            .increment_usage(&user(), &ai_recommendations(), period, 49)
            .await
            .unwrap();
        f.store.credit(&user(), 5, CreditReason::Purchase).await.unwrap();

        // 49 of 50 used: the 50th admission comes from quota.
        let decision = f
            .handler
            .handle_at(command(ai_recommendations(), 1), now)
            .await
            .unwrap();
        assert_eq!(decision, Decision::admitted_via_quota(50));

        // Quota spent: the next admission costs one credit.
        let decision = f
            .handler
            .handle_at(command(ai_recommendations(), 1), now)
            .await
            .unwrap();
        assert_eq!(decision, Decision::admitted_via_credits(1, 51));
        assert_eq!(f.store.get_balance(&user()).await.unwrap(), 4);

        // Drain the balance: the next request is denied and usage stays.
        f.store
            .try_debit(&user(), 4, CreditReason::ManualAdjustment, None)
            .await
            .unwrap();
        let decision = f
            .handler
            .handle_at(command(ai_recommendations(), 1), now)
            .await
            .unwrap();
        assert_eq!(
            decision,
            Decision::denied(DenialReason::InsufficientCredits { shortfall: 1 })
        );
        assert_eq!(
            f.store
                .get_usage(&user(), &ai_recommendations(), period)
                .await
                .unwrap(),
            51
        );
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Periods and status
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn new_period_starts_with_a_fresh_quota() {
        let f = fixture();
        let in_period_zero = Timestamp::from_unix_secs(0);
        f.store
            .increment_usage(&user(), &ai_recommendations(), PeriodKey::new(0), 50)
            .await
            .unwrap();

        // Same instant, same period: quota is spent.
        let decision = f
            .handler
            .handle_at(command(ai_recommendations(), 1), in_period_zero)
            .await
            .unwrap();
        assert!(!decision.is_admitted());

        // Forty days on, a new period: counters read zero by definition.
        let in_period_one = in_period_zero.add_days(40);
        let decision = f
            .handler
            .handle_at(command(ai_recommendations(), 1), in_period_one)
            .await
            .unwrap();
        assert_eq!(decision, Decision::admitted_via_quota(1));

        // The old period's counter is untouched.
        assert_eq!(
            f.store
                .get_usage(&user(), &ai_recommendations(), PeriodKey::new(0))
                .await
                .unwrap(),
            50
        );
    }

    #[tokio::test]
    async fn past_due_subscription_is_still_metered() {
        let f = fixture();
        let mut subscription = educator_subscription();
        subscription.status = SubscriptionStatus::PastDue;
        f.subscriptions.upsert(subscription);

        let decision = f
            .handler
            .handle(command(ai_recommendations(), 1))
            .await
            .unwrap();
        assert!(decision.is_admitted());
    }
}
