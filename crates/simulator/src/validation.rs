//! Invariant checks over simulated accounts

use rust_decimal::Decimal;
use types::{Account, ProtocolParams, Resources};

/// Outcome of an invariant check
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    /// Whether every invariant holds
    pub is_valid: bool,
    /// Violated invariants
    pub errors: Vec<String>,
    /// Suspicious but legal states
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// Create a valid result
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Add an error to the result
    pub fn add_error(&mut self, error: String) {
        self.errors.push(error);
        self.is_valid = false;
    }

    /// Add a warning to the result
    pub fn add_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Check the balance, ordering and cap invariants of `account`
pub fn check_resources_invariants(account: &Account, params: &ProtocolParams) -> ValidationResult {
    let mut result = ValidationResult::valid();

    let expected_spendable =
        (account.balance - account.delegated_balance() - account.unbonding_balance()).max(Decimal::ZERO);
    if account.spendable_balance != expected_spendable {
        result.add_error(format!(
            "spendable balance {} does not match expected {}",
            account.spendable_balance, expected_spendable
        ));
    }

    let Some(resources) = account.resources.as_ref() else {
        result.add_warning("account has no staking resources".to_string());
        return result;
    };

    check_balances(resources, &mut result);
    check_entries(resources, &mut result);

    if resources.delegations.len() > params.max_delegations {
        result.add_error(format!(
            "{} delegations exceed the cap of {}",
            resources.delegations.len(),
            params.max_delegations
        ));
    }
    if resources.unbondings.len() > params.max_unbondings {
        result.add_error(format!(
            "{} unbondings exceed the cap of {}",
            resources.unbondings.len(),
            params.max_unbondings
        ));
    }
    if resources.redelegations.len() > params.max_redelegations {
        result.add_error(format!(
            "{} redelegations exceed the cap of {}",
            resources.redelegations.len(),
            params.max_redelegations
        ));
    }

    if account.delegated_balance() + account.unbonding_balance() > account.balance {
        result.add_warning("locked funds exceed the account balance".to_string());
    }

    result
}

fn check_balances(resources: &Resources, result: &mut ValidationResult) {
    let delegated: Decimal = resources.delegations.iter().map(|d| d.amount).sum();
    let rewards: Decimal = resources.delegations.iter().map(|d| d.pending_rewards).sum();
    let unbonding: Decimal = resources.unbondings.iter().map(|u| u.amount).sum();

    if delegated != resources.delegated_balance {
        result.add_error(format!(
            "delegated balance {} does not match delegations sum {}",
            resources.delegated_balance, delegated
        ));
    }
    if rewards != resources.pending_rewards_balance {
        result.add_error(format!(
            "pending rewards balance {} does not match rewards sum {}",
            resources.pending_rewards_balance, rewards
        ));
    }
    if unbonding != resources.unbonding_balance {
        result.add_error(format!(
            "unbonding balance {} does not match unbondings sum {}",
            resources.unbonding_balance, unbonding
        ));
    }
}

fn check_entries(resources: &Resources, result: &mut ValidationResult) {
    for d in &resources.delegations {
        if d.amount <= Decimal::ZERO {
            result.add_error(format!("delegation to {} is empty", d.validator_address));
        }
        if d.pending_rewards < Decimal::ZERO {
            result.add_error(format!("delegation to {} has negative rewards", d.validator_address));
        }
    }

    if resources
        .unbondings
        .windows(2)
        .any(|w| w[0].completion_date > w[1].completion_date)
    {
        result.add_error("unbondings are not ordered by completion date".to_string());
    }

    for r in &resources.redelegations {
        if r.validator_src_address == r.validator_dst_address {
            result.add_error(format!(
                "redelegation from {} lands on its own source",
                r.validator_src_address
            ));
        }
    }
}
