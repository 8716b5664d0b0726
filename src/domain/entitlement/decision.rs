//! Admission decisions and quota standing.
//!
//! Business denials are values, not errors: the caller turns them into
//! structured UI messaging ("upgrade or buy credits"), so every variant
//! carries the numbers that messaging needs.

use serde::{Deserialize, Serialize};

/// What paid for an admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdmissionSource {
    /// Covered by the subscription quota.
    Quota,
    /// Covered by debiting pre-purchased credits.
    Credits,
}

/// Why an authorization was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum DenialReason {
    /// Quota is spent and the feature cannot be paid for with credits.
    QuotaExhaustedNotCreditable,
    /// Credits would cover it, but the balance is short by `shortfall`.
    InsufficientCredits { shortfall: u64 },
}

/// Outcome of an authorization request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Decision {
    /// The action may proceed; usage has been recorded.
    Admitted {
        via: AdmissionSource,
        /// Credits debited (zero for quota admissions).
        spent: u64,
        /// Usage count for this feature and period after the admission.
        new_count: u64,
    },
    /// The action may not proceed; no ledger was touched.
    Denied { reason: DenialReason },
}

impl Decision {
    pub fn admitted_via_quota(new_count: u64) -> Self {
        Decision::Admitted {
            via: AdmissionSource::Quota,
            spent: 0,
            new_count,
        }
    }

    pub fn admitted_via_credits(spent: u64, new_count: u64) -> Self {
        Decision::Admitted {
            via: AdmissionSource::Credits,
            spent,
            new_count,
        }
    }

    pub fn denied(reason: DenialReason) -> Self {
        Decision::Denied { reason }
    }

    /// Returns true if the action was admitted.
    pub fn is_admitted(&self) -> bool {
        matches!(self, Decision::Admitted { .. })
    }
}

/// Position of current usage relative to the quota, for UI display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "standing", rename_all = "snake_case")]
pub enum QuotaStanding {
    /// Comfortably under quota.
    Under { remaining: u64 },
    /// At or past 80% of quota.
    Warning { remaining: u64, percent_used: u8 },
    /// Quota fully spent (or the tier grants none).
    Exhausted,
}

impl QuotaStanding {
    /// Classifies usage against a quota.
    ///
    /// - under 80% used: `Under`
    /// - 80-99% used: `Warning`
    /// - 100%+ used, or a zero quota: `Exhausted`
    pub fn from_usage(used: u64, quota: u64) -> Self {
        if quota == 0 || used >= quota {
            return Self::Exhausted;
        }

        let remaining = quota - used;
        let percent_used = (used.saturating_mul(100) / quota) as u8;
        if percent_used >= 80 {
            Self::Warning {
                remaining,
                percent_used,
            }
        } else {
            Self::Under { remaining }
        }
    }

    /// Returns true if no quota-funded use remains.
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted)
    }

    /// Returns true if the user should see a near-limit warning.
    pub fn should_warn(&self) -> bool {
        matches!(self, Self::Warning { .. })
    }
}
