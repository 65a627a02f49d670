//! Draft construction from command-line style options

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use types::{DelegationInfo, OperationMode, Result, StakingError, TransactionDraft};

/// Staking options recognised on top of the common transaction options
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DraftOptions {
    pub mode: Option<String>,
    pub fees: Option<String>,
    pub gas_limit: Option<String>,
    pub memo: Option<String>,
    pub source_validator: Option<String>,
    #[serde(default)]
    pub validator_addresses: Vec<String>,
    #[serde(default)]
    pub validator_amounts: Vec<String>,
}

/// Apply `options` to `draft`.
///
/// `infer_amount` parses a user-entered amount into base units. Validator
/// addresses are paired with amounts by position; an address without an
/// amount gets zero and surplus amounts are ignored.
pub fn infer_transaction<F>(
    draft: TransactionDraft,
    options: &DraftOptions,
    infer_amount: F,
) -> Result<TransactionDraft>
where
    F: Fn(&str) -> Result<Decimal>,
{
    let mode = match options.mode.as_deref() {
        None | Some("") => OperationMode::Send,
        Some(name) => OperationMode::from_str(name).ok_or_else(|| {
            StakingError::Config(format!("unknown transaction mode: {name}"))
        })?,
    };

    let mut validators = Vec::with_capacity(options.validator_addresses.len());
    for (i, address) in options.validator_addresses.iter().enumerate() {
        let amount = match options.validator_amounts.get(i) {
            Some(raw) => infer_amount(raw.as_str())?,
            None => Decimal::ZERO,
        };
        validators.push(DelegationInfo::new(address.clone(), amount));
    }

    let fees = options.fees.as_deref().map(&infer_amount).transpose()?;
    let gas = options
        .gas_limit
        .as_deref()
        .map(|raw| {
            raw.trim()
                .parse::<Decimal>()
                .map_err(|e| StakingError::Config(format!("invalid gas limit {raw}: {e}")))
        })
        .transpose()?;

    Ok(TransactionDraft {
        mode,
        memo: options.memo.clone(),
        fees,
        gas,
        validators,
        source_validator: options.source_validator.clone(),
        ..draft
    })
}
