//! Billing period derivation.
//!
//! A `PeriodKey` partitions usage counters. There is no reset job: the
//! absence of a usage record under the current key is the reset, so a
//! counter "starts at zero" by definition when a new period begins.

use chrono::{Datelike, Months};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{BillingInterval, Subscription};
use crate::domain::foundation::Timestamp;

/// Index of a billing period since the subscription's `period_start`.
///
/// Period 0 is the interval beginning at `period_start` itself. Keys are
/// deterministic: the same subscription and wall-clock reading always map
/// to the same key.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PeriodKey(u32);

impl PeriodKey {
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    pub fn index(&self) -> u32 {
        self.0
    }

    /// The key of the following period.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Derives the active period for a subscription at `now`.
    ///
    /// Monthly subscriptions roll on the calendar-month anniversary of
    /// `period_start`, with end-of-month clamping (a Jan 31 anchor rolls
    /// over on the last day of February). Annual subscriptions roll on
    /// the yearly anniversary. A clock reading before `period_start`
    /// maps to period 0.
    pub fn current(subscription: &Subscription, now: Timestamp) -> Self {
        let start = *subscription.period_start.as_datetime();
        let now = *now.as_datetime();
        if now <= start {
            return Self(0);
        }

        let months = whole_months_between(&start, &now);
        match subscription.billing_interval {
            BillingInterval::Monthly => Self(months),
            BillingInterval::Annual => Self(months / 12),
        }
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whole calendar months elapsed from `start` to `now` (`now >= start`).
///
/// Counts anniversaries actually reached: the month-difference estimate is
/// walked down while the clamped anniversary instant lies after `now`.
fn whole_months_between(
    start: &chrono::DateTime<chrono::Utc>,
    now: &chrono::DateTime<chrono::Utc>,
) -> u32 {
    let estimate = (now.year() - start.year()) * 12 + now.month() as i32 - start.month() as i32;
    let mut months = estimate.max(0) as u32;
    while months > 0 {
        let anniversary = start.checked_add_months(Months::new(months));
        match anniversary {
            Some(instant) if instant > *now => months -= 1,
            _ => break,
        }
    }
    months
}
