//! Entitlement handlers - the engine's caller-facing operations.
//!
//! - `AuthorizeHandler` - admit, deny, or charge credits for an action
//! - `GetUsageSnapshotHandler` - read-only usage vs. quota for UI display
//! - `GrantCreditsHandler` - credit top-ups from the billing collaborator
//! - `GetCreditBalanceHandler` - read-only balance
//! - `AuditCreditLedgerHandler` - replay-vs-balance reconciliation

mod audit_credit_ledger;
mod authorize;
mod get_credit_balance;
mod get_usage_snapshot;
mod grant_credits;

pub use audit_credit_ledger::{AuditCreditLedgerHandler, AuditCreditLedgerQuery, CreditLedgerAudit};
pub use authorize::{AuthorizeCommand, AuthorizeHandler};
pub use get_credit_balance::{GetCreditBalanceHandler, GetCreditBalanceQuery};
pub use get_usage_snapshot::{GetUsageSnapshotHandler, GetUsageSnapshotQuery, UsageSnapshot};
pub use grant_credits::{GrantCreditsCommand, GrantCreditsHandler, GrantCreditsResult};
