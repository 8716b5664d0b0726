//! PostgreSQL implementation of the MeteringStore port.
//!
//! Atomicity comes from the statements themselves, never from
//! read-then-write pairs:
//! - usage increments are `INSERT .. ON CONFLICT .. DO UPDATE ..
//!   RETURNING`, with the quota ceiling enforced in the conflict
//!   clause's `WHERE`;
//! - debits are `UPDATE .. SET balance = balance - $n WHERE balance >=
//!   $n RETURNING`, so two concurrent debits can never both drain the
//!   same credits;
//! - `debit_and_record` wraps the debit, the ledger entry, and the usage
//!   increment in one transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::entitlement::{FeatureKey, PeriodKey};
use crate::domain::foundation::{LedgerEntryId, Timestamp, UserId};
use crate::ports::{
    CreditCharge, CreditLedger, CreditLedgerEntry, CreditReason, DebitOutcome, MeteringStore,
    QuotaCharge, StoreError, UsageLedger,
};

/// PostgreSQL implementation of the MeteringStore port.
///
/// Uses sqlx with connection pooling. Schema lives in `migrations/`.
pub struct PostgresMeteringStore {
    pool: PgPool,
}

impl PostgresMeteringStore {
    /// Creates a new store with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn current_balance<'e, E>(executor: E, user_id: &UserId) -> Result<u64, StoreError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT balance FROM credit_accounts WHERE user_id = $1")
                .bind(user_id.as_str())
                .fetch_optional(executor)
                .await
                .map_err(db_error)?;
        match row {
            Some((balance,)) => to_unsigned(balance, "balance"),
            None => Ok(0),
        }
    }
}

/// Database row representation of a credit ledger entry.
#[derive(Debug, sqlx::FromRow)]
struct LedgerEntryRow {
    id: Uuid,
    user_id: String,
    delta: i64,
    reason: String,
    related_feature: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<LedgerEntryRow> for CreditLedgerEntry {
    type Error = StoreError;

    fn try_from(row: LedgerEntryRow) -> Result<Self, Self::Error> {
        let related_feature = row
            .related_feature
            .map(FeatureKey::new)
            .transpose()
            .map_err(|e| StoreError::corrupt(format!("invalid related_feature: {}", e)))?;

        Ok(CreditLedgerEntry {
            id: LedgerEntryId::from_uuid(row.id),
            user_id: UserId::new(row.user_id)
                .map_err(|e| StoreError::corrupt(format!("invalid user_id: {}", e)))?,
            delta: row.delta,
            reason: parse_reason(&row.reason)?,
            related_feature,
            created_at: Timestamp::from_datetime(row.created_at),
        })
    }
}

fn parse_reason(s: &str) -> Result<CreditReason, StoreError> {
    match s {
        "purchase" => Ok(CreditReason::Purchase),
        "subtraction_for_feature" => Ok(CreditReason::SubtractionForFeature),
        "refund" => Ok(CreditReason::Refund),
        "manual_adjustment" => Ok(CreditReason::ManualAdjustment),
        _ => Err(StoreError::corrupt(format!("invalid reason value: {}", s))),
    }
}

fn reason_to_string(reason: CreditReason) -> &'static str {
    match reason {
        CreditReason::Purchase => "purchase",
        CreditReason::SubtractionForFeature => "subtraction_for_feature",
        CreditReason::Refund => "refund",
        CreditReason::ManualAdjustment => "manual_adjustment",
    }
}

fn db_error(e: sqlx::Error) -> StoreError {
    StoreError::unavailable(e.to_string())
}

fn to_unsigned(value: i64, column: &str) -> Result<u64, StoreError> {
    u64::try_from(value)
        .map_err(|_| StoreError::corrupt(format!("negative {}: {}", column, value)))
}

async fn append_entry<'e, E>(
    executor: E,
    user_id: &UserId,
    delta: i64,
    reason: CreditReason,
    related_feature: Option<&FeatureKey>,
) -> Result<(), StoreError>
where
    E: sqlx::Executor<'e, Database = sqlx::Postgres>,
{
    sqlx::query(
        r#"
        INSERT INTO credit_ledger_entries (id, user_id, delta, reason, related_feature, created_at)
        VALUES ($1, $2, $3, $4, $5, now())
        "#,
    )
    .bind(LedgerEntryId::new().as_uuid())
    .bind(user_id.as_str())
    .bind(delta)
    .bind(reason_to_string(reason))
    .bind(related_feature.map(|f| f.as_str()))
    .execute(executor)
    .await
    .map_err(db_error)?;
    Ok(())
}

#[async_trait]
impl UsageLedger for PostgresMeteringStore {
    async fn get_usage(
        &self,
        user_id: &UserId,
        feature: &FeatureKey,
        period: PeriodKey,
    ) -> Result<u64, StoreError> {
        let row: Option<(i64,)> = sqlx::query_as(
            r#"
            SELECT count FROM usage_records
            WHERE user_id = $1 AND feature = $2 AND period_key = $3
            "#,
        )
        .bind(user_id.as_str())
        .bind(feature.as_str())
        .bind(period.index() as i32)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        match row {
            Some((count,)) => to_unsigned(count, "count"),
            None => Ok(0),
        }
    }

    async fn increment_usage(
        &self,
        user_id: &UserId,
        feature: &FeatureKey,
        period: PeriodKey,
        delta: u64,
    ) -> Result<u64, StoreError> {
        let (count,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO usage_records (user_id, feature, period_key, count)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, feature, period_key)
            DO UPDATE SET count = usage_records.count + EXCLUDED.count
            RETURNING count
            "#,
        )
        .bind(user_id.as_str())
        .bind(feature.as_str())
        .bind(period.index() as i32)
        .bind(delta as i64)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)?;

        to_unsigned(count, "count")
    }

    async fn increment_usage_within(
        &self,
        user_id: &UserId,
        feature: &FeatureKey,
        period: PeriodKey,
        delta: u64,
        ceiling: u64,
    ) -> Result<QuotaCharge, StoreError> {
        if delta > ceiling {
            // The insert arm below cannot guard a fresh row, so settle
            // the impossible case up front.
            let current = self.get_usage(user_id, feature, period).await?;
            return Ok(QuotaCharge::Exceeded { current });
        }

        let row: Option<(i64,)> = sqlx::query_as(
            r#"
            INSERT INTO usage_records (user_id, feature, period_key, count)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, feature, period_key)
            DO UPDATE SET count = usage_records.count + EXCLUDED.count
            WHERE usage_records.count + EXCLUDED.count <= $5
            RETURNING count
            "#,
        )
        .bind(user_id.as_str())
        .bind(feature.as_str())
        .bind(period.index() as i32)
        .bind(delta as i64)
        .bind(ceiling as i64)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        match row {
            Some((count,)) => Ok(QuotaCharge::Charged {
                new_count: to_unsigned(count, "count")?,
            }),
            None => {
                let current = self.get_usage(user_id, feature, period).await?;
                Ok(QuotaCharge::Exceeded { current })
            }
        }
    }
}

#[async_trait]
impl CreditLedger for PostgresMeteringStore {
    async fn get_balance(&self, user_id: &UserId) -> Result<u64, StoreError> {
        Self::current_balance(&self.pool, user_id).await
    }

    async fn try_debit(
        &self,
        user_id: &UserId,
        amount: u64,
        reason: CreditReason,
        related_feature: Option<&FeatureKey>,
    ) -> Result<DebitOutcome, StoreError> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let row: Option<(i64,)> = sqlx::query_as(
            r#"
            UPDATE credit_accounts
            SET balance = balance - $2
            WHERE user_id = $1 AND balance >= $2
            RETURNING balance
            "#,
        )
        .bind(user_id.as_str())
        .bind(amount as i64)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error)?;

        match row {
            Some((balance,)) => {
                append_entry(&mut *tx, user_id, -(amount as i64), reason, related_feature)
                    .await?;
                tx.commit().await.map_err(db_error)?;
                Ok(DebitOutcome::Debited {
                    new_balance: to_unsigned(balance, "balance")?,
                })
            }
            None => {
                let balance = Self::current_balance(&mut *tx, user_id).await?;
                // Nothing was written; dropping the transaction is a no-op.
                Ok(DebitOutcome::Insufficient {
                    shortfall: amount - balance,
                })
            }
        }
    }

    async fn credit(
        &self,
        user_id: &UserId,
        amount: u64,
        reason: CreditReason,
    ) -> Result<u64, StoreError> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let (balance,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO credit_accounts (user_id, balance)
            VALUES ($1, $2)
            ON CONFLICT (user_id)
            DO UPDATE SET balance = credit_accounts.balance + EXCLUDED.balance
            RETURNING balance
            "#,
        )
        .bind(user_id.as_str())
        .bind(amount as i64)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error)?;

        append_entry(&mut *tx, user_id, amount as i64, reason, None).await?;
        tx.commit().await.map_err(db_error)?;

        to_unsigned(balance, "balance")
    }

    async fn entries_for(&self, user_id: &UserId) -> Result<Vec<CreditLedgerEntry>, StoreError> {
        let rows: Vec<LedgerEntryRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, delta, reason, related_feature, created_at
            FROM credit_ledger_entries
            WHERE user_id = $1
            ORDER BY seq
            "#,
        )
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.into_iter().map(CreditLedgerEntry::try_from).collect()
    }
}

#[async_trait]
impl MeteringStore for PostgresMeteringStore {
    async fn debit_and_record(
        &self,
        user_id: &UserId,
        feature: &FeatureKey,
        period: PeriodKey,
        quantity: u64,
        cost: u64,
    ) -> Result<CreditCharge, StoreError> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let debited: Option<(i64,)> = sqlx::query_as(
            r#"
            UPDATE credit_accounts
            SET balance = balance - $2
            WHERE user_id = $1 AND balance >= $2
            RETURNING balance
            "#,
        )
        .bind(user_id.as_str())
        .bind(cost as i64)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error)?;

        let Some((balance,)) = debited else {
            let balance = Self::current_balance(&mut *tx, user_id).await?;
            return Ok(CreditCharge::Insufficient {
                shortfall: cost - balance,
            });
        };

        append_entry(
            &mut *tx,
            user_id,
            -(cost as i64),
            CreditReason::SubtractionForFeature,
            Some(feature),
        )
        .await?;

        let (count,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO usage_records (user_id, feature, period_key, count)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, feature, period_key)
            DO UPDATE SET count = usage_records.count + EXCLUDED.count
            RETURNING count
            "#,
        )
        .bind(user_id.as_str())
        .bind(feature.as_str())
        .bind(period.index() as i32)
        .bind(quantity as i64)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error)?;

        tx.commit().await.map_err(db_error)?;

        Ok(CreditCharge::Charged {
            spent: cost,
            new_balance: to_unsigned(balance, "balance")?,
            new_count: to_unsigned(count, "count")?,
        })
    }
}
