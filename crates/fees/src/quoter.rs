//! Fee quoting collaborators

use async_trait::async_trait;
use config::GasScheduleConfig;
use rust_decimal::Decimal;
use types::{Account, FeeError, FeeEstimate, OperationMode, TransactionDraft};

/// External service pricing a draft.
///
/// Implementations are expected to be slow; callers go through
/// [`crate::FeeEstimationCache`].
#[async_trait]
pub trait FeeQuoter: Send + Sync {
    /// Name used in logs and errors
    fn name(&self) -> &str;

    /// Price `draft` on behalf of `account`
    async fn quote(
        &self,
        account: &Account,
        draft: &TransactionDraft,
    ) -> std::result::Result<FeeEstimate, FeeError>;
}

/// Gas charged per message of each kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GasSchedule {
    pub base_gas: u64,
    pub send_gas: u64,
    pub delegate_gas: u64,
    pub undelegate_gas: u64,
    pub redelegate_gas: u64,
    pub withdraw_gas: u64,
    pub gas_amplifier: Decimal,
    pub gas_price: Decimal,
    pub min_fee: Decimal,
}

impl GasSchedule {
    /// Build the schedule from configuration
    pub fn from_config(config: &GasScheduleConfig) -> std::result::Result<Self, String> {
        let prices = config.parse_prices()?;
        Ok(Self {
            base_gas: config.base_gas,
            send_gas: config.send_gas,
            delegate_gas: config.delegate_gas,
            undelegate_gas: config.undelegate_gas,
            redelegate_gas: config.redelegate_gas,
            withdraw_gas: config.withdraw_gas,
            gas_amplifier: prices.gas_amplifier,
            gas_price: prices.gas_price,
            min_fee: prices.min_fee,
        })
    }

    /// Unamplified gas of every message `draft` produces
    pub fn message_gas(&self, draft: &TransactionDraft) -> u64 {
        let per_validator = match draft.mode {
            OperationMode::Send => return self.send_gas,
            OperationMode::Delegate => self.delegate_gas,
            OperationMode::Undelegate => self.undelegate_gas,
            OperationMode::Redelegate => self.redelegate_gas,
            OperationMode::ClaimReward => self.withdraw_gas,
            OperationMode::ClaimRewardCompound => self.withdraw_gas + self.delegate_gas,
        };
        per_validator * draft.validators.len() as u64
    }

    /// `(base + messages) * amplifier`, rounded up
    pub fn estimate_gas(&self, draft: &TransactionDraft) -> Decimal {
        let raw = Decimal::from(self.base_gas + self.message_gas(draft));
        (raw * self.gas_amplifier).ceil()
    }

    /// `max(min_fee, ceil(gas * price))`
    pub fn fees_for_gas(&self, gas: Decimal) -> Decimal {
        (gas * self.gas_price).ceil().max(self.min_fee)
    }
}

/// Offline quoter pricing drafts from a static gas schedule
#[derive(Debug, Clone)]
pub struct GasScheduleQuoter {
    schedule: GasSchedule,
}

impl GasScheduleQuoter {
    pub fn new(schedule: GasSchedule) -> Self {
        Self { schedule }
    }

    pub fn schedule(&self) -> &GasSchedule {
        &self.schedule
    }
}

#[async_trait]
impl FeeQuoter for GasScheduleQuoter {
    fn name(&self) -> &str {
        "gas-schedule"
    }

    async fn quote(
        &self,
        _account: &Account,
        draft: &TransactionDraft,
    ) -> std::result::Result<FeeEstimate, FeeError> {
        let gas = self.schedule.estimate_gas(draft);
        let fees = self.schedule.fees_for_gas(gas);

        tracing::debug!(
            mode = %draft.mode,
            messages = draft.message_count(),
            gas = %gas,
            fees = %fees,
            "Quoted fees from gas schedule"
        );

        Ok(FeeEstimate {
            estimated_fees: fees,
            estimated_gas: Some(gas),
        })
    }
}
