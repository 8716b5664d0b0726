//! PostgreSQL implementation of the SubscriptionReader port.
//!
//! Reads the subscription read model maintained by the billing
//! collaborator. This adapter never writes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::entitlement::{
    BillingInterval, Subscription, SubscriptionStatus, SubscriptionTier,
};
use crate::domain::foundation::{Timestamp, UserId};
use crate::ports::{StoreError, SubscriptionReader};

/// PostgreSQL implementation of the SubscriptionReader port.
pub struct PostgresSubscriptionReader {
    pool: PgPool,
}

impl PostgresSubscriptionReader {
    /// Creates a new reader with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a subscription.
#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    user_id: String,
    tier: String,
    billing_interval: String,
    status: String,
    period_start: DateTime<Utc>,
}

impl TryFrom<SubscriptionRow> for Subscription {
    type Error = StoreError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        Ok(Subscription {
            user_id: UserId::new(row.user_id)
                .map_err(|e| StoreError::corrupt(format!("invalid user_id: {}", e)))?,
            tier: parse_tier(&row.tier)?,
            billing_interval: parse_interval(&row.billing_interval)?,
            status: parse_status(&row.status)?,
            period_start: Timestamp::from_datetime(row.period_start),
        })
    }
}

fn parse_tier(s: &str) -> Result<SubscriptionTier, StoreError> {
    match s {
        "free" => Ok(SubscriptionTier::Free),
        "educator" => Ok(SubscriptionTier::Educator),
        "professional" => Ok(SubscriptionTier::Professional),
        "institution" => Ok(SubscriptionTier::Institution),
        "enterprise" => Ok(SubscriptionTier::Enterprise),
        _ => Err(StoreError::corrupt(format!("invalid tier value: {}", s))),
    }
}

fn parse_interval(s: &str) -> Result<BillingInterval, StoreError> {
    match s {
        "monthly" => Ok(BillingInterval::Monthly),
        "annual" => Ok(BillingInterval::Annual),
        _ => Err(StoreError::corrupt(format!(
            "invalid billing_interval value: {}",
            s
        ))),
    }
}

fn parse_status(s: &str) -> Result<SubscriptionStatus, StoreError> {
    match s {
        "active" => Ok(SubscriptionStatus::Active),
        "past_due" => Ok(SubscriptionStatus::PastDue),
        "cancelled" => Ok(SubscriptionStatus::Cancelled),
        _ => Err(StoreError::corrupt(format!("invalid status value: {}", s))),
    }
}

#[async_trait]
impl SubscriptionReader for PostgresSubscriptionReader {
    async fn subscription_for(
        &self,
        user_id: &UserId,
    ) -> Result<Option<Subscription>, StoreError> {
        let row: Option<SubscriptionRow> = sqlx::query_as(
            r#"
            SELECT user_id, tier, billing_interval, status, period_start
            FROM subscriptions
            WHERE user_id = $1
            "#,
        )
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::unavailable(e.to_string()))?;

        row.map(Subscription::try_from).transpose()
    }
}
