//! Capacity and eligibility predicates gating each transaction mode

use chrono::{DateTime, Utc};
use fees::FeeEstimationCache;
use rust_decimal::Decimal;
use types::{
    Account, Delegation, DelegationInfo, OperationMode, ProtocolParams, Redelegation, Resources,
    Result, StakingError, TransactionDraft,
};

fn resources(account: &Account) -> Result<&Resources> {
    account
        .resources
        .as_ref()
        .ok_or_else(|| StakingError::MissingResources {
            account: account.id.clone(),
        })
}

/// Spendable balance left after reserving fees for `validator_count`
/// delegations and the safety margin. May be negative.
pub fn max_delegation_available(
    account: &Account,
    validator_count: usize,
    params: &ProtocolParams,
) -> Decimal {
    account.spendable_balance - params.delegation_reserve(validator_count)
}

/// `balance - fees - delegated - unbonding`, floored at zero
pub fn max_estimated_balance(account: &Account, estimated_fees: Decimal) -> Decimal {
    let locked = account.delegated_balance() + account.unbonding_balance();
    (account.balance - estimated_fees - locked).max(Decimal::ZERO)
}

pub fn can_delegate(account: &Account, params: &ProtocolParams) -> bool {
    max_delegation_available(account, 1, params) > Decimal::ZERO
}

pub fn can_undelegate(account: &Account, params: &ProtocolParams) -> Result<bool> {
    Ok(resources(account)?.unbondings.len() < params.max_unbondings)
}

/// Whether funds bonded to `delegation` may be redelegated.
///
/// Refused while a pending redelegation already lands on that validator.
pub fn can_redelegate(
    account: &Account,
    delegation: &Delegation,
    params: &ProtocolParams,
) -> Result<bool> {
    let resources = resources(account)?;
    Ok(resources.redelegations.len() < params.max_redelegations
        && !resources
            .redelegations
            .iter()
            .any(|r| r.validator_dst_address == delegation.validator_address))
}

/// Whether claiming the rewards of `delegation` is affordable and not a net loss
pub async fn can_claim_rewards(
    account: &Account,
    delegation: &Delegation,
    fee_cache: &FeeEstimationCache,
) -> Result<bool> {
    resources(account)?;

    let draft = TransactionDraft {
        mode: OperationMode::ClaimReward,
        validators: vec![DelegationInfo::new(
            delegation.validator_address.clone(),
            Decimal::ZERO,
        )],
        ..Default::default()
    };

    let estimate = fee_cache.estimate_fees(account, &draft).await?;
    let fees = estimate.estimated_fees;

    tracing::debug!(
        account = %account.id,
        validator = %delegation.validator_address,
        fees = %fees,
        pending_rewards = %delegation.pending_rewards,
        "Checked claim eligibility"
    );

    Ok(fees < account.spendable_balance && fees < delegation.pending_rewards)
}

/// Pending redelegation landing on `validator_address`
pub fn find_redelegation<'a>(account: &'a Account, validator_address: &str) -> Option<&'a Redelegation> {
    account
        .resources
        .as_ref()?
        .redelegations
        .iter()
        .find(|r| r.validator_dst_address == validator_address)
}

pub fn redelegation_completion_date(
    account: &Account,
    validator_address: &str,
) -> Option<DateTime<Utc>> {
    find_redelegation(account, validator_address).map(|r| r.completion_date)
}
