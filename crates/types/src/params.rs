//! Protocol caps and reserves

use chrono::Duration;
use rust_decimal::Decimal;

/// Default maximum number of simultaneous delegations
pub const MAX_DELEGATIONS: usize = 5;
/// Default maximum number of pending unbondings
pub const MAX_UNBONDINGS: usize = 7;
/// Default maximum number of in-flight redelegations
pub const MAX_REDELEGATIONS: usize = 7;
/// Default flat safety margin kept spendable, in base units
pub const MIN_SAFE: u64 = 100_000;
/// Default per-delegation fee floor, in base units
pub const MIN_FEES: u64 = 6_000;
/// Default unbonding and redelegation maturity, in days
pub const UNBONDING_PERIOD_DAYS: i64 = 21;

/// Protocol parameters consulted by the eligibility and simulation logic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolParams {
    pub max_delegations: usize,
    pub max_unbondings: usize,
    pub max_redelegations: usize,
    pub min_safe: Decimal,
    pub min_fees: Decimal,
    pub unbonding_period: Duration,
}

impl Default for ProtocolParams {
    fn default() -> Self {
        Self {
            max_delegations: MAX_DELEGATIONS,
            max_unbondings: MAX_UNBONDINGS,
            max_redelegations: MAX_REDELEGATIONS,
            min_safe: Decimal::from(MIN_SAFE),
            min_fees: Decimal::from(MIN_FEES),
            unbonding_period: Duration::days(UNBONDING_PERIOD_DAYS),
        }
    }
}

impl ProtocolParams {
    /// Reserve kept aside when delegating to `validator_count` validators.
    ///
    /// A count of zero is priced as a single delegation.
    pub fn delegation_reserve(&self, validator_count: usize) -> Decimal {
        let n = validator_count.max(1).min(self.max_delegations);
        self.min_fees * Decimal::from(n) + self.min_safe
    }
}
