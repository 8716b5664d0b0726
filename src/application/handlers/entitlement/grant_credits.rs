//! GrantCreditsHandler - credit top-ups from the billing collaborator.
//!
//! Purchases arrive here as already-settled facts; this handler never
//! talks to a payment provider. Accounts are created implicitly on
//! first grant, so no subscription lookup is needed.

use std::sync::Arc;

use tracing::info;

use crate::domain::entitlement::EntitlementError;
use crate::domain::foundation::UserId;
use crate::ports::{CreditReason, MeteringStore};

/// Command to grant credits to a user.
#[derive(Debug, Clone)]
pub struct GrantCreditsCommand {
    pub user_id: UserId,
    /// Credits to add; must be greater than zero.
    pub amount: u64,
    /// Why the grant exists. Must be a grantable reason: a
    /// `subtraction_for_feature` entry can only be written by a debit.
    pub reason: CreditReason,
}

/// Result of a credit grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantCreditsResult {
    pub new_balance: u64,
}

/// Handler for credit grants.
pub struct GrantCreditsHandler {
    store: Arc<dyn MeteringStore>,
}

impl GrantCreditsHandler {
    pub fn new(store: Arc<dyn MeteringStore>) -> Self {
        Self { store }
    }

    pub async fn handle(
        &self,
        command: GrantCreditsCommand,
    ) -> Result<GrantCreditsResult, EntitlementError> {
        if command.amount == 0 {
            return Err(EntitlementError::InvalidAmount);
        }
        if !command.reason.is_grantable() {
            return Err(EntitlementError::InvalidGrantReason(
                command.reason.to_string(),
            ));
        }

        let new_balance = self
            .store
            .credit(&command.user_id, command.amount, command.reason)
            .await?;

        info!(
            user_id = %command.user_id,
            amount = command.amount,
            reason = %command.reason,
            new_balance,
            "credits granted"
        );

        Ok(GrantCreditsResult { new_balance })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryMeteringStore;
    use crate::ports::{replayed_balance, CreditLedger};

    fn user() -> UserId {
        UserId::new("user-1").unwrap()
    }

    fn handler() -> (Arc<InMemoryMeteringStore>, GrantCreditsHandler) {
        let store = Arc::new(InMemoryMeteringStore::new());
        (store.clone(), GrantCreditsHandler::new(store))
    }

    #[tokio::test]
    async fn grant_creates_the_account_and_raises_the_balance() {
        let (store, handler) = handler();

        let result = handler
            .handle(GrantCreditsCommand {
                user_id: user(),
                amount: 25,
                reason: CreditReason::Purchase,
            })
            .await
            .unwrap();

        assert_eq!(result.new_balance, 25);
        assert_eq!(store.get_balance(&user()).await.unwrap(), 25);
    }

    #[tokio::test]
    async fn grants_accumulate() {
        let (_store, handler) = handler();
        for _ in 0..3 {
            handler
                .handle(GrantCreditsCommand {
                    user_id: user(),
                    amount: 10,
                    reason: CreditReason::Purchase,
                })
                .await
                .unwrap();
        }

        let result = handler
            .handle(GrantCreditsCommand {
                user_id: user(),
                amount: 5,
                reason: CreditReason::Refund,
            })
            .await
            .unwrap();
        assert_eq!(result.new_balance, 35);
    }

    #[tokio::test]
    async fn grant_appends_a_replayable_entry() {
        let (store, handler) = handler();
        handler
            .handle(GrantCreditsCommand {
                user_id: user(),
                amount: 12,
                reason: CreditReason::ManualAdjustment,
            })
            .await
            .unwrap();

        let entries = store.entries_for(&user()).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].reason, CreditReason::ManualAdjustment);
        assert_eq!(replayed_balance(&entries), 12);
    }

    #[tokio::test]
    async fn zero_amount_is_rejected() {
        let (_store, handler) = handler();
        let result = handler
            .handle(GrantCreditsCommand {
                user_id: user(),
                amount: 0,
                reason: CreditReason::Purchase,
            })
            .await;
        assert_eq!(result, Err(EntitlementError::InvalidAmount));
    }

    #[tokio::test]
    async fn debit_reason_is_rejected() {
        let (store, handler) = handler();
        let result = handler
            .handle(GrantCreditsCommand {
                user_id: user(),
                amount: 5,
                reason: CreditReason::SubtractionForFeature,
            })
            .await;
        assert!(matches!(
            result,
            Err(EntitlementError::InvalidGrantReason(_))
        ));
        assert_eq!(store.get_balance(&user()).await.unwrap(), 0);
    }
}
