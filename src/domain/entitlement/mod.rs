//! Entitlement domain - tiers, policies, periods, and admission decisions.
//!
//! Everything here is pure: no I/O, no clocks read implicitly. The ports
//! layer supplies storage; handlers supply the current time.

mod decision;
mod errors;
mod feature;
mod period;
mod policy;
mod subscription;
mod tier;

pub use decision::{AdmissionSource, Decision, DenialReason, QuotaStanding};
pub use errors::EntitlementError;
pub use feature::FeatureKey;
pub use period::PeriodKey;
pub use policy::{CreditCost, FeaturePolicy, PolicyCatalogue, PolicyCatalogueBuilder};
pub use subscription::{BillingInterval, Subscription, SubscriptionStatus};
pub use tier::SubscriptionTier;
