//! GetCreditBalanceHandler - read-only balance query.

use std::sync::Arc;

use crate::domain::entitlement::EntitlementError;
use crate::domain::foundation::UserId;
use crate::ports::MeteringStore;

/// Query for a user's credit balance.
#[derive(Debug, Clone)]
pub struct GetCreditBalanceQuery {
    pub user_id: UserId,
}

/// Handler for balance queries.
///
/// A user who has never been granted credits reads as zero; no account
/// row is created by asking.
pub struct GetCreditBalanceHandler {
    store: Arc<dyn MeteringStore>,
}

impl GetCreditBalanceHandler {
    pub fn new(store: Arc<dyn MeteringStore>) -> Self {
        Self { store }
    }

    pub async fn handle(&self, query: GetCreditBalanceQuery) -> Result<u64, EntitlementError> {
        Ok(self.store.get_balance(&query.user_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryMeteringStore;
    use crate::ports::{CreditLedger, CreditReason};

    fn user() -> UserId {
        UserId::new("user-1").unwrap()
    }

    #[tokio::test]
    async fn unknown_account_reads_zero() {
        let store = Arc::new(InMemoryMeteringStore::new());
        let handler = GetCreditBalanceHandler::new(store);

        let balance = handler
            .handle(GetCreditBalanceQuery { user_id: user() })
            .await
            .unwrap();
        assert_eq!(balance, 0);
    }

    #[tokio::test]
    async fn balance_reflects_grants_and_debits() {
        let store = Arc::new(InMemoryMeteringStore::new());
        store.credit(&user(), 20, CreditReason::Purchase).await.unwrap();
        store
            .try_debit(&user(), 6, CreditReason::SubtractionForFeature, None)
            .await
            .unwrap();

        let handler = GetCreditBalanceHandler::new(store);
        let balance = handler
            .handle(GetCreditBalanceQuery { user_id: user() })
            .await
            .unwrap();
        assert_eq!(balance, 14);
    }
}
