//! Protocol messages built from a draft

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use types::{ConstructionError, DelegationInfo, OperationMode, TransactionDraft};

/// An amount in one denomination
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Coin {
    pub denom: String,
    pub amount: Decimal,
}

impl Coin {
    pub fn new(denom: &str, amount: Decimal) -> Self {
        Self {
            denom: denom.to_string(),
            amount,
        }
    }
}

/// A single protocol message of a staking transaction
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Message {
    Send {
        from_address: String,
        to_address: String,
        amount: Vec<Coin>,
    },
    Delegate {
        delegator_address: String,
        validator_address: String,
        amount: Coin,
    },
    Undelegate {
        delegator_address: String,
        validator_address: String,
        amount: Coin,
    },
    BeginRedelegate {
        delegator_address: String,
        validator_src_address: String,
        validator_dst_address: String,
        amount: Coin,
    },
    WithdrawDelegationReward {
        delegator_address: String,
        validator_address: String,
    },
}

/// Build the messages `draft` stands for, signed by `from_address`.
///
/// Fails when a validator-targeting draft has no validator, or a redelegation
/// has no source validator.
pub fn create_messages(
    from_address: &str,
    draft: &TransactionDraft,
    denom: &str,
) -> Result<Vec<Message>, ConstructionError> {
    let messages = match draft.mode {
        OperationMode::Send => vec![Message::Send {
            from_address: from_address.to_string(),
            to_address: draft.recipient.clone(),
            amount: vec![Coin::new(denom, draft.amount)],
        }],
        OperationMode::Delegate => targets(draft)?
            .iter()
            .map(|v| delegate(from_address, v, denom))
            .collect(),
        OperationMode::Undelegate => targets(draft)?
            .iter()
            .map(|v| Message::Undelegate {
                delegator_address: from_address.to_string(),
                validator_address: v.address.clone(),
                amount: Coin::new(denom, v.amount),
            })
            .collect(),
        OperationMode::Redelegate => {
            let source = draft
                .source_validator
                .as_deref()
                .filter(|s| !s.is_empty())
                .ok_or(ConstructionError::MissingSourceValidator)?;
            targets(draft)?
                .iter()
                .map(|v| Message::BeginRedelegate {
                    delegator_address: from_address.to_string(),
                    validator_src_address: source.to_string(),
                    validator_dst_address: v.address.clone(),
                    amount: Coin::new(denom, v.amount),
                })
                .collect()
        }
        OperationMode::ClaimReward => targets(draft)?
            .iter()
            .map(|v| withdraw(from_address, v))
            .collect(),
        OperationMode::ClaimRewardCompound => {
            let validators = targets(draft)?;
            validators
                .iter()
                .map(|v| withdraw(from_address, v))
                .chain(validators.iter().map(|v| delegate(from_address, v, denom)))
                .collect()
        }
    };

    Ok(messages)
}

fn targets(draft: &TransactionDraft) -> Result<&[DelegationInfo], ConstructionError> {
    if draft.validators.is_empty() {
        return Err(ConstructionError::NoValidators);
    }
    Ok(&draft.validators)
}

fn delegate(from_address: &str, validator: &DelegationInfo, denom: &str) -> Message {
    Message::Delegate {
        delegator_address: from_address.to_string(),
        validator_address: validator.address.clone(),
        amount: Coin::new(denom, validator.amount),
    }
}

fn withdraw(from_address: &str, validator: &DelegationInfo) -> Message {
    Message::WithdrawDelegationReward {
        delegator_address: from_address.to_string(),
        validator_address: validator.address.clone(),
    }
}
