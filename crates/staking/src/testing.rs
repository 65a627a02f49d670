//! Test doubles for the collaborator traits

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use fees::FeeQuoter;
use rust_decimal::Decimal;
use types::{
    Account, DelegationRecord, DelegationStatus, FeeError, FeeEstimate, RedelegationRecord,
    Result, RewardRecord, StakingError, TransactionDraft, UnbondingRecord, ValidatorItem,
};

/// Resource source replaying fixed records
#[derive(Debug, Default)]
pub struct ScriptedSource {
    pub delegations: Vec<DelegationRecord>,
    pub rewards: Vec<RewardRecord>,
    pub unbondings: Vec<UnbondingRecord>,
    pub redelegations: Vec<RedelegationRecord>,
    pub statuses: Vec<(String, DelegationStatus)>,
    pub fail_status: bool,
}

#[async_trait]
impl crate::traits::ResourceSource for ScriptedSource {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn delegations(&self, _address: &str) -> Result<Vec<DelegationRecord>> {
        Ok(self.delegations.clone())
    }

    async fn rewards(&self, _address: &str) -> Result<Vec<RewardRecord>> {
        Ok(self.rewards.clone())
    }

    async fn unbondings(&self, _address: &str) -> Result<Vec<UnbondingRecord>> {
        Ok(self.unbondings.clone())
    }

    async fn redelegations(&self, _address: &str) -> Result<Vec<RedelegationRecord>> {
        Ok(self.redelegations.clone())
    }

    async fn validator_status(&self, validator_address: &str) -> Result<DelegationStatus> {
        if self.fail_status {
            return Err(StakingError::data_unavailable("scripted", "validator lookup failed"));
        }
        Ok(self
            .statuses
            .iter()
            .find(|(address, _)| address == validator_address)
            .map(|(_, status)| *status)
            .unwrap_or_default())
    }
}

/// Roster source returning a fixed list, or failing
#[derive(Debug, Default)]
pub struct ScriptedRoster {
    pub validators: Vec<ValidatorItem>,
    pub fail: bool,
}

#[async_trait]
impl crate::traits::RosterSource for ScriptedRoster {
    fn name(&self) -> &str {
        "scripted-roster"
    }

    async fn fetch_validators(&self) -> Result<Vec<ValidatorItem>> {
        if self.fail {
            return Err(StakingError::data_unavailable("scripted-roster", "offline"));
        }
        Ok(self.validators.clone())
    }
}

/// Quoter charging a fixed fee and gas, counting its calls
#[derive(Debug)]
pub struct FixedQuoter {
    pub fees: Decimal,
    pub gas: Decimal,
    calls: AtomicUsize,
}

impl FixedQuoter {
    pub fn new(fees: Decimal, gas: Decimal) -> Self {
        Self {
            fees,
            gas,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeeQuoter for FixedQuoter {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn quote(
        &self,
        _account: &Account,
        _draft: &TransactionDraft,
    ) -> std::result::Result<FeeEstimate, FeeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(FeeEstimate {
            estimated_fees: self.fees,
            estimated_gas: Some(self.gas),
        })
    }
}

pub fn validator(address: &str, name: &str) -> ValidatorItem {
    ValidatorItem {
        validator_address: address.to_string(),
        name: name.to_string(),
        voting_power: 0.05,
        commission: 0.1,
        estimated_yearly_rewards_rate: 0.08,
    }
}
