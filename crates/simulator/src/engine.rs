//! Seeded generator of staking resource transitions
//!
//! Every transition rebuilds the account's [`Resources`] from its lists, so
//! the balance invariants hold after each step.

use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;
use types::utils::BECH32_CHARSET;
use types::{
    Account, Delegation, DelegationInfo, DelegationStatus, ProtocolParams, Redelegation,
    Resources, Unbonding, ValidatorItem,
};

use crate::operation::{Operation, OperationExtra, OperationType};

/// Average block time used to date synthetic operations
const BLOCK_TIME_SECONDS: i64 = 900;

/// Share of the moved amount charged as fee
const FEE_RATE: Decimal = Decimal::from_parts(1, 0, 0, false, 3);

/// Share of the delegated amount accrued as pending rewards
const REWARD_RATE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// A synthetic account and its operation history
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MockAccount {
    pub account: Account,
    pub operations: Vec<Operation>,
    pub block_height: u64,
}

/// Deterministic simulator of delegate, redelegate, claim and undelegate.
///
/// The same seed, roster, parameters and clock always produce the same
/// sequence of transitions.
pub struct ResourceTransitionSimulator {
    rng: StdRng,
    validators: Vec<ValidatorItem>,
    params: ProtocolParams,
    now: DateTime<Utc>,
}

impl ResourceTransitionSimulator {
    pub fn new(
        seed: u64,
        validators: Vec<ValidatorItem>,
        params: ProtocolParams,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            validators,
            params,
            now,
        }
    }

    /// Build a synthetic account and run the standard transition sequence.
    ///
    /// A random balance is drawn when `balance` is `None`.
    pub fn generate_account(
        &mut self,
        id: &str,
        currency_id: &str,
        address_prefix: &str,
        balance: Option<Decimal>,
    ) -> MockAccount {
        let address = self.gen_address(address_prefix);
        let balance =
            balance.unwrap_or_else(|| Decimal::from(self.rng.gen_range(1_000_000u64..100_000_000_000)));

        let mut mock = MockAccount {
            account: Account::new(id, currency_id, address, balance).with_resources(Resources::empty()),
            operations: Vec::new(),
            block_height: self.rng.gen_range(1_000_000..10_000_000),
        };

        self.enhance_account(&mut mock);
        mock
    }

    /// Delegate, redelegate, claim, undelegate, then delegate again
    pub fn enhance_account(&mut self, mock: &mut MockAccount) {
        self.add_delegation(mock);
        self.add_redelegation(mock);
        self.add_claim_rewards(mock);
        self.add_undelegation(mock);
        self.add_delegation(mock);
    }

    /// Rebalance the whole bondable value over 3 to 5 distinct validators.
    ///
    /// Returns `false` when nothing is spendable or no validator is known.
    pub fn add_delegation(&mut self, mock: &mut MockAccount) -> bool {
        let account = &mock.account;
        if account.spendable_balance.is_zero() || self.validators.is_empty() {
            return false;
        }

        let value = account.spendable_balance + account.delegated_balance();
        let count = self
            .rng
            .gen_range(3..=5)
            .min(self.params.max_delegations)
            .min(self.validators.len());
        if count == 0 {
            return false;
        }

        let chosen: Vec<String> = self
            .validators
            .choose_multiple(&mut self.rng, count)
            .map(|v| v.validator_address.clone())
            .collect();
        let upper = 1.0 / chosen.len() as f64;

        let mut targets = Vec::with_capacity(chosen.len());
        let mut delegations = Vec::with_capacity(chosen.len());
        for address in chosen {
            let amount = scale(value, self.rng.gen_range(0.1..upper));
            if amount.is_zero() {
                continue;
            }
            targets.push(DelegationInfo::new(address.clone(), amount));
            delegations.push(self.new_delegation(address, amount));
        }

        let (unbondings, redelegations) = current_entries(account);
        let resources = Resources::from_parts(delegations, unbondings, redelegations, account.id.clone());
        let delegated = resources.delegated_balance;
        mock.account = mock.account.clone().with_resources(resources);

        let fee = (delegated * FEE_RATE).round();
        let mut delegation_op = self.base_operation(mock, OperationType::Delegate);
        delegation_op.extra.validators = targets;
        delegation_op.fee = fee;
        delegation_op.value = fee;
        let mut fee_op = self.base_operation(mock, OperationType::Fees);
        fee_op.fee = fee;
        fee_op.value = fee;

        debug!(account = %mock.account.id, delegated = %delegated, "Simulated delegation");
        self.insert_operations(mock, vec![delegation_op, fee_op]);
        true
    }

    /// Move part of one delegation to another validator
    pub fn add_redelegation(&mut self, mock: &mut MockAccount) -> bool {
        let Some(resources) = mock.account.resources.as_ref() else {
            return false;
        };
        if resources.delegations.is_empty()
            || resources.redelegations.len() >= self.params.max_redelegations
        {
            return false;
        }

        let from = resources.delegations[self.rng.gen_range(0..resources.delegations.len())].clone();
        let amount = scale(from.amount, self.rng.gen_range(0.1..1.0)).min(from.amount);
        if amount.is_zero() {
            return false;
        }

        // once at the cap, only existing delegations can receive funds
        let at_cap = resources.delegations.len() >= self.params.max_delegations;
        let candidates: Vec<String> = if at_cap {
            resources
                .delegations
                .iter()
                .map(|d| d.validator_address.clone())
                .filter(|a| *a != from.validator_address)
                .collect()
        } else {
            self.validators
                .iter()
                .map(|v| v.validator_address.clone())
                .filter(|a| *a != from.validator_address)
                .collect()
        };
        let Some(to) = candidates.choose(&mut self.rng).cloned() else {
            return false;
        };

        let mut delegations = resources.delegations.clone();
        shift_delegation(&mut delegations, &from.validator_address, amount);
        match delegations.iter().position(|d| d.validator_address == to) {
            Some(i) => delegations[i].amount += amount,
            None => {
                let fresh = self.new_delegation(to.clone(), amount);
                delegations.push(fresh);
            }
        }

        let mut redelegations = resources.redelegations.clone();
        redelegations.push(Redelegation {
            validator_src_address: from.validator_address.clone(),
            validator_dst_address: to.clone(),
            amount,
            completion_date: self.now + self.params.unbonding_period,
        });

        let resources = Resources::from_parts(
            delegations,
            resources.unbondings.clone(),
            redelegations,
            resources.withdraw_address.clone(),
        );
        mock.account = mock.account.clone().with_resources(resources);

        let mut op = self.base_operation(mock, OperationType::Redelegate);
        op.extra.validator = Some(DelegationInfo::new(to, amount));
        op.extra.source_validator = Some(from.validator_address);
        op.fee = (amount * FEE_RATE).round();
        op.value = op.fee;

        debug!(account = %mock.account.id, amount = %amount, "Simulated redelegation");
        self.insert_operations(mock, vec![op]);
        true
    }

    /// Withdraw the pending rewards of one delegation
    pub fn add_claim_rewards(&mut self, mock: &mut MockAccount) -> bool {
        let Some(resources) = mock.account.resources.as_ref() else {
            return false;
        };
        if resources.delegations.is_empty() {
            return false;
        }

        let from = resources.delegations[self.rng.gen_range(0..resources.delegations.len())].clone();
        let amount = if from.pending_rewards > Decimal::ZERO {
            from.pending_rewards
        } else {
            (from.amount * REWARD_RATE).round()
        };

        let delegations = resources
            .delegations
            .iter()
            .cloned()
            .map(|mut d| {
                if d.validator_address == from.validator_address {
                    d.pending_rewards = Decimal::ZERO;
                }
                d
            })
            .collect();

        let resources = Resources::from_parts(
            delegations,
            resources.unbondings.clone(),
            resources.redelegations.clone(),
            resources.withdraw_address.clone(),
        );
        mock.account = mock.account.clone().with_resources(resources);

        let mut op = self.base_operation(mock, OperationType::Reward);
        op.extra.validator = Some(DelegationInfo::new(from.validator_address, amount));
        op.fee = (amount * FEE_RATE).round();
        op.value = amount;

        debug!(account = %mock.account.id, amount = %amount, "Simulated reward claim");
        self.insert_operations(mock, vec![op]);
        true
    }

    /// Start unbonding part or all of one delegation
    pub fn add_undelegation(&mut self, mock: &mut MockAccount) -> bool {
        let Some(resources) = mock.account.resources.as_ref() else {
            return false;
        };
        if resources.delegations.is_empty()
            || resources.unbondings.len() >= self.params.max_unbondings
        {
            return false;
        }

        let from = resources.delegations[self.rng.gen_range(0..resources.delegations.len())].clone();
        let fraction = if self.rng.gen_bool(0.5) {
            self.rng.gen_range(0.1..1.0)
        } else {
            1.0
        };
        let amount = scale(from.amount, fraction).min(from.amount);
        if amount.is_zero() {
            return false;
        }
        let claimed_reward = from.pending_rewards;

        let mut delegations = resources.delegations.clone();
        shift_delegation(&mut delegations, &from.validator_address, amount);
        for d in delegations
            .iter_mut()
            .filter(|d| d.validator_address == from.validator_address)
        {
            d.pending_rewards = Decimal::ZERO;
        }

        let mut unbondings = resources.unbondings.clone();
        unbondings.push(Unbonding {
            validator_address: from.validator_address.clone(),
            amount,
            completion_date: self.now + self.params.unbonding_period,
        });
        unbondings.sort_by_key(|u| u.completion_date);

        let resources = Resources::from_parts(
            delegations,
            unbondings,
            resources.redelegations.clone(),
            resources.withdraw_address.clone(),
        );
        mock.account = mock.account.clone().with_resources(resources);

        let mut op = self.base_operation(mock, OperationType::Undelegate);
        op.extra.validator = Some(DelegationInfo::new(from.validator_address, amount));
        op.fee = (amount * FEE_RATE).round();
        op.value = op.fee - claimed_reward;

        debug!(account = %mock.account.id, amount = %amount, "Simulated undelegation");
        self.insert_operations(mock, vec![op]);
        true
    }

    fn new_delegation(&mut self, validator_address: String, amount: Decimal) -> Delegation {
        let pending_rewards = if self.rng.gen_bool(0.5) {
            (amount * REWARD_RATE).round()
        } else {
            Decimal::ZERO
        };
        let status = if self.rng.gen::<f64>() > 0.33 {
            DelegationStatus::Bonded
        } else {
            DelegationStatus::Unbonded
        };

        Delegation {
            validator_address,
            amount,
            pending_rewards,
            status,
        }
    }

    fn base_operation(&mut self, mock: &MockAccount, op_type: OperationType) -> Operation {
        let address = mock.account.fresh_address.clone();
        let age = Duration::seconds(self.rng.gen_range(0..100_000));
        let date = self.now - age;
        let blocks_ago = (age.num_seconds() / BLOCK_TIME_SECONDS) as u64;

        Operation {
            id: format!(
                "mock_op_{}_{}_{}",
                mock.operations.len(),
                op_type,
                mock.account.id
            ),
            hash: self.gen_hex(32),
            op_type,
            value: Decimal::ZERO,
            fee: Decimal::ZERO,
            senders: vec![address.clone()],
            recipients: vec![address],
            block_height: mock.block_height.saturating_sub(blocks_ago),
            date,
            extra: OperationExtra::default(),
        }
    }

    /// Insert at a random position near the head of the history
    fn insert_operations(&mut self, mock: &mut MockAccount, ops: Vec<Operation>) {
        let index = self.rng.gen_range(0..10).min(mock.operations.len());
        for (offset, op) in ops.into_iter().enumerate() {
            mock.operations.insert(index + offset, op);
        }
    }

    fn gen_hex(&mut self, bytes: usize) -> String {
        let buf: Vec<u8> = (0..bytes).map(|_| self.rng.gen()).collect();
        hex::encode(buf)
    }

    fn gen_address(&mut self, prefix: &str) -> String {
        random_address(&mut self.rng, prefix)
    }
}

impl std::fmt::Debug for ResourceTransitionSimulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceTransitionSimulator")
            .field("validators", &self.validators.len())
            .field("params", &self.params)
            .field("now", &self.now)
            .finish_non_exhaustive()
    }
}

/// A seeded roster of `count` validators whose ratios all lie in `[0, 1]`
pub fn synthetic_validators(seed: u64, count: usize, validator_prefix: &str) -> Vec<ValidatorItem> {
    let mut rng = StdRng::seed_from_u64(seed);
    let weights: Vec<f64> = (0..count).map(|_| rng.gen_range(1.0..100.0)).collect();
    let total: f64 = weights.iter().sum();

    weights
        .into_iter()
        .enumerate()
        .map(|(i, weight)| ValidatorItem {
            validator_address: random_address(&mut rng, validator_prefix),
            name: format!("Validator {}", i + 1),
            voting_power: weight / total,
            commission: rng.gen_range(0.0..0.2),
            estimated_yearly_rewards_rate: rng.gen_range(0.05..0.2),
        })
        .collect()
}

fn random_address(rng: &mut StdRng, prefix: &str) -> String {
    let charset = BECH32_CHARSET.as_bytes();
    let data: String = (0..38)
        .map(|_| charset[rng.gen_range(0..charset.len())] as char)
        .collect();
    format!("{prefix}1{data}")
}

/// Recompute the spendable balance from the current resources
pub fn post_sync_account(account: &mut Account) {
    if let Some(resources) = account.resources.take() {
        account.resources = Some(resources.recompute_balances());
    }
    account.recompute_spendable();
}

/// Reset the resources and history of an account found empty on scan
pub fn post_scan_account(mock: &mut MockAccount, is_empty: bool) {
    if !is_empty {
        return;
    }
    let resources = Resources {
        withdraw_address: mock.account.id.clone(),
        ..Resources::empty()
    };
    mock.account = mock.account.clone().with_resources(resources);
    mock.operations.clear();
}

fn current_entries(account: &Account) -> (Vec<Unbonding>, Vec<Redelegation>) {
    account
        .resources
        .as_ref()
        .map(|r| (r.unbondings.clone(), r.redelegations.clone()))
        .unwrap_or_default()
}

/// Take `amount` off the delegation to `validator_address`, dropping it when drained
fn shift_delegation(delegations: &mut Vec<Delegation>, validator_address: &str, amount: Decimal) {
    for d in delegations
        .iter_mut()
        .filter(|d| d.validator_address == validator_address)
    {
        d.amount -= amount;
    }
    delegations.retain(|d| d.amount > Decimal::ZERO);
}

/// `amount × factor`, rounded down to whole base units
fn scale(amount: Decimal, factor: f64) -> Decimal {
    Decimal::from_f64(factor)
        .and_then(|f| amount.checked_mul(f))
        .map(|v| v.floor())
        .unwrap_or(Decimal::ZERO)
}
