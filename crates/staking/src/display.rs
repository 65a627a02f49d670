//! Mapping staking resources to display rows and text renderings

use std::fmt::Write as _;

use rust_decimal::Decimal;
use serde::Serialize;
use types::{
    Account, Delegation, DelegationInfo, OperationMode, Redelegation, Result, StakingError,
    TransactionDraft, Unbonding, ValidatorItem,
};

use crate::traits::AmountFormatter;

/// A delegation joined with its roster entry
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MappedDelegation {
    #[serde(flatten)]
    pub delegation: Delegation,
    pub formatted_amount: String,
    pub formatted_pending_rewards: String,
    /// Position in the roster, `None` when the validator is not listed
    pub rank: Option<usize>,
    pub validator: Option<ValidatorItem>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MappedUnbonding {
    #[serde(flatten)]
    pub unbonding: Unbonding,
    pub formatted_amount: String,
    pub validator: Option<ValidatorItem>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MappedRedelegation {
    #[serde(flatten)]
    pub redelegation: Redelegation,
    pub formatted_amount: String,
    pub validator_src: Option<ValidatorItem>,
    pub validator_dst: Option<ValidatorItem>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MappedDelegationInfo {
    #[serde(flatten)]
    pub info: DelegationInfo,
    pub formatted_amount: String,
    pub validator: Option<ValidatorItem>,
}

/// A roster entry with its 1-based rank
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MappedValidator {
    pub rank: usize,
    pub validator: ValidatorItem,
}

fn lookup<'a>(validators: &'a [ValidatorItem], address: &str) -> Option<&'a ValidatorItem> {
    validators.iter().find(|v| v.validator_address == address)
}

pub fn map_delegations(
    delegations: &[Delegation],
    validators: &[ValidatorItem],
    formatter: &dyn AmountFormatter,
) -> Vec<MappedDelegation> {
    delegations
        .iter()
        .map(|d| {
            let rank = validators
                .iter()
                .position(|v| v.validator_address == d.validator_address);
            MappedDelegation {
                delegation: d.clone(),
                formatted_amount: formatter.format(&d.amount),
                formatted_pending_rewards: formatter.format(&d.pending_rewards),
                rank,
                validator: rank.map(|i| validators[i].clone()),
            }
        })
        .collect()
}

/// Unbondings joined with the roster, earliest completion first
pub fn map_unbondings(
    unbondings: &[Unbonding],
    validators: &[ValidatorItem],
    formatter: &dyn AmountFormatter,
) -> Vec<MappedUnbonding> {
    let mut sorted = unbondings.to_vec();
    sorted.sort_by_key(|u| u.completion_date);

    sorted
        .into_iter()
        .map(|u| MappedUnbonding {
            formatted_amount: formatter.format(&u.amount),
            validator: lookup(validators, &u.validator_address).cloned(),
            unbonding: u,
        })
        .collect()
}

pub fn map_redelegations(
    redelegations: &[Redelegation],
    validators: &[ValidatorItem],
    formatter: &dyn AmountFormatter,
) -> Vec<MappedRedelegation> {
    redelegations
        .iter()
        .map(|r| MappedRedelegation {
            redelegation: r.clone(),
            formatted_amount: formatter.format(&r.amount),
            validator_src: lookup(validators, &r.validator_src_address).cloned(),
            validator_dst: lookup(validators, &r.validator_dst_address).cloned(),
        })
        .collect()
}

pub fn map_delegation_info(
    infos: &[DelegationInfo],
    validators: &[ValidatorItem],
    formatter: &dyn AmountFormatter,
) -> Vec<MappedDelegationInfo> {
    infos
        .iter()
        .map(|info| MappedDelegationInfo {
            info: info.clone(),
            formatted_amount: formatter.format(&info.amount),
            validator: lookup(validators, &info.address).cloned(),
        })
        .collect()
}

/// Case-insensitive match of `query` against a validator's name and address
pub fn search_filter(query: &str) -> impl Fn(&ValidatorItem) -> bool {
    let query = query.trim().to_lowercase();
    move |validator| {
        format!("{} {}", validator.name, validator.validator_address)
            .to_lowercase()
            .contains(&query)
    }
}

/// Rank the roster for selection.
///
/// With a search string, the matching validators in roster order. Without
/// one, validators already voted for come first.
pub fn sorted_validators(
    search: &str,
    validators: &[ValidatorItem],
    voted: &[DelegationInfo],
) -> Vec<MappedValidator> {
    let mapped = validators.iter().enumerate().map(|(i, v)| MappedValidator {
        rank: i + 1,
        validator: v.clone(),
    });

    if !search.is_empty() {
        let matches = search_filter(search);
        return mapped.filter(|m| matches(&m.validator)).collect();
    }

    let (mut first, rest): (Vec<_>, Vec<_>) = mapped.partition(|m| {
        voted
            .iter()
            .any(|d| d.address == m.validator.validator_address)
    });
    first.extend(rest);
    first
}

/// Delegations with rewards worth claiming
pub fn claimable_delegations(delegations: &[MappedDelegation]) -> Vec<MappedDelegation> {
    delegations
        .iter()
        .filter(|d| d.delegation.pending_rewards > Decimal::ZERO)
        .cloned()
        .collect()
}

/// Delegations offered for `mode`; claims only list those with rewards
pub fn delegations_for_mode(
    delegations: Vec<MappedDelegation>,
    mode: OperationMode,
) -> Vec<MappedDelegation> {
    match mode {
        OperationMode::ClaimReward => claimable_delegations(&delegations),
        _ => delegations,
    }
}

/// One-paragraph summary of the account's balances and staking positions
pub fn format_account_specifics(
    account: &Account,
    validators: &[ValidatorItem],
    formatter: &dyn AmountFormatter,
) -> Result<String> {
    let resources = account
        .resources
        .as_ref()
        .ok_or_else(|| StakingError::MissingResources {
            account: account.id.clone(),
        })?;

    let mut out = format!(" {} spendable. ", formatter.format(&account.spendable_balance));
    if resources.delegated_balance > Decimal::ZERO {
        let _ = write!(out, "{} delegated. ", formatter.format(&resources.delegated_balance));
    }
    if resources.unbonding_balance > Decimal::ZERO {
        let _ = write!(out, "{} unbonding. ", formatter.format(&resources.unbonding_balance));
    }

    let delegations = map_delegations(&resources.delegations, validators, formatter);
    if !delegations.is_empty() {
        out.push_str("\nDELEGATIONS\n");
        let lines: Vec<String> = delegations
            .iter()
            .map(|d| {
                let claimable = if d.delegation.pending_rewards > Decimal::ZERO {
                    format!(" (claimable {})", formatter.format_plain(&d.delegation.pending_rewards))
                } else {
                    String::new()
                };
                format!(
                    "  to {} {}{}",
                    d.delegation.validator_address, d.formatted_amount, claimable
                )
            })
            .collect();
        out.push_str(&lines.join("\n"));
    }

    let unbondings = map_unbondings(&resources.unbondings, validators, formatter);
    if !unbondings.is_empty() {
        out.push_str("\nUNDELEGATIONS\n");
        let lines: Vec<String> = unbondings
            .iter()
            .map(|u| format!("  from {} {}", u.unbonding.validator_address, u.formatted_amount))
            .collect();
        out.push_str(&lines.join("\n"));
    }

    let redelegations = map_redelegations(&resources.redelegations, validators, formatter);
    if !redelegations.is_empty() {
        out.push_str("\nREDELEGATIONS\n");
        let lines: Vec<String> = redelegations
            .iter()
            .map(|r| {
                format!(
                    "  from {} to {} {}",
                    r.redelegation.validator_src_address,
                    r.redelegation.validator_dst_address,
                    r.formatted_amount
                )
            })
            .collect();
        out.push_str(&lines.join("\n"));
    }

    Ok(out)
}

/// Multi-line rendering of a draft
pub fn format_transaction(draft: &TransactionDraft, formatter: &dyn AmountFormatter) -> String {
    let amount = if draft.use_all_amount {
        "MAX".to_string()
    } else if draft.amount.is_zero() {
        String::new()
    } else {
        formatter.format(&draft.amount)
    };

    let mut out = format!(
        "\n{} {}\nTO {}\n",
        draft.mode.as_str().to_uppercase(),
        amount,
        draft.recipient
    );

    let validators: Vec<String> = draft
        .validators
        .iter()
        .map(|v| format!("  {} -> {}", formatter.format_plain(&v.amount), v.address))
        .collect();
    out.push_str(&validators.join("\n"));

    if let Some(source) = draft.source_validator.as_deref().filter(|s| !s.is_empty()) {
        let _ = write!(out, "\n  source validator={source}");
    }

    let fees = draft
        .fees
        .map(|f| formatter.format(&f))
        .unwrap_or_else(|| "?".to_string());
    let _ = write!(out, "\nwith fees={fees}");

    if let Some(memo) = draft.memo.as_deref().filter(|m| !m.is_empty()) {
        let _ = write!(out, "\n  memo={memo}");
    }

    out
}
