use serde::{Deserialize, Serialize};
use tsify_next::Tsify;

use crate::types::Timestamp;

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

/// How occupancy time turns into money.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BillingPolicy {
    pub rate_per_hour: f64,
    /// Floor on billed time. Zero bills the exact elapsed time.
    pub minimum_billed_hours: f64,
}

impl BillingPolicy {
    pub fn charge(&self, since: Timestamp, now: Timestamp) -> Fee {
        let elapsed_ms = now.elapsed_since(since);
        let elapsed_hours = elapsed_ms as f64 / MILLIS_PER_HOUR;
        let billed_hours = elapsed_hours.max(self.minimum_billed_hours);
        Fee {
            amount: self.rate_per_hour * billed_hours,
            elapsed_ms,
            billed_hours,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct Fee {
    pub amount: f64,
    pub elapsed_ms: u64,
    pub billed_hours: f64,
}
