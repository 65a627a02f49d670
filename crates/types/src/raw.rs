//! Persisted (raw) forms.
//!
//! Every quantity is a base-10 decimal string and every date an RFC 3339
//! string, so `from_raw(to_raw(x)) == x` holds exactly.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::resources::{Account, Delegation, DelegationStatus, Redelegation, Resources, Unbonding};
use crate::transaction::{DelegationInfo, NetworkInfo, OperationMode, TransactionDraft};
use crate::utils::{date_to_string, decimal_to_string, parse_date, parse_decimal};
use crate::StakingError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DelegationRaw {
    pub validator_address: String,
    pub amount: String,
    pub pending_rewards: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UnbondingRaw {
    pub validator_address: String,
    pub amount: String,
    pub completion_date: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RedelegationRaw {
    pub validator_src_address: String,
    pub validator_dst_address: String,
    pub amount: String,
    pub completion_date: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResourcesRaw {
    pub delegations: Vec<DelegationRaw>,
    pub redelegations: Vec<RedelegationRaw>,
    pub unbondings: Vec<UnbondingRaw>,
    pub delegated_balance: String,
    pub pending_rewards_balance: String,
    pub unbonding_balance: String,
    pub withdraw_address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AccountRaw {
    pub id: String,
    pub currency_id: String,
    pub fresh_address: String,
    pub balance: String,
    pub spendable_balance: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourcesRaw>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DelegationInfoRaw {
    pub address: String,
    pub amount: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NetworkInfoRaw {
    pub fees: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDraftRaw {
    pub mode: String,
    pub amount: String,
    pub recipient: String,
    pub fees: Option<String>,
    pub gas: Option<String>,
    pub memo: Option<String>,
    pub validators: Vec<DelegationInfoRaw>,
    pub source_validator: Option<String>,
    #[serde(default)]
    pub use_all_amount: bool,
    pub network_info: Option<NetworkInfoRaw>,
}

impl Delegation {
    pub fn to_raw(&self) -> DelegationRaw {
        DelegationRaw {
            validator_address: self.validator_address.clone(),
            amount: decimal_to_string(&self.amount),
            pending_rewards: decimal_to_string(&self.pending_rewards),
            status: self.status.as_str().to_string(),
        }
    }

    pub fn from_raw(raw: &DelegationRaw) -> Result<Self> {
        let status = DelegationStatus::from_str(&raw.status).ok_or_else(|| {
            StakingError::Serialization(format!("Unknown delegation status '{}'", raw.status))
        })?;

        Ok(Self {
            validator_address: raw.validator_address.clone(),
            amount: parse_decimal("amount", &raw.amount)?,
            pending_rewards: parse_decimal("pendingRewards", &raw.pending_rewards)?,
            status,
        })
    }
}

impl Unbonding {
    pub fn to_raw(&self) -> UnbondingRaw {
        UnbondingRaw {
            validator_address: self.validator_address.clone(),
            amount: decimal_to_string(&self.amount),
            completion_date: date_to_string(&self.completion_date),
        }
    }

    pub fn from_raw(raw: &UnbondingRaw) -> Result<Self> {
        Ok(Self {
            validator_address: raw.validator_address.clone(),
            amount: parse_decimal("amount", &raw.amount)?,
            completion_date: parse_date("completionDate", &raw.completion_date)?,
        })
    }
}

impl Redelegation {
    pub fn to_raw(&self) -> RedelegationRaw {
        RedelegationRaw {
            validator_src_address: self.validator_src_address.clone(),
            validator_dst_address: self.validator_dst_address.clone(),
            amount: decimal_to_string(&self.amount),
            completion_date: date_to_string(&self.completion_date),
        }
    }

    pub fn from_raw(raw: &RedelegationRaw) -> Result<Self> {
        Ok(Self {
            validator_src_address: raw.validator_src_address.clone(),
            validator_dst_address: raw.validator_dst_address.clone(),
            amount: parse_decimal("amount", &raw.amount)?,
            completion_date: parse_date("completionDate", &raw.completion_date)?,
        })
    }
}

impl Resources {
    pub fn to_raw(&self) -> ResourcesRaw {
        ResourcesRaw {
            delegations: self.delegations.iter().map(Delegation::to_raw).collect(),
            redelegations: self.redelegations.iter().map(Redelegation::to_raw).collect(),
            unbondings: self.unbondings.iter().map(Unbonding::to_raw).collect(),
            delegated_balance: decimal_to_string(&self.delegated_balance),
            pending_rewards_balance: decimal_to_string(&self.pending_rewards_balance),
            unbonding_balance: decimal_to_string(&self.unbonding_balance),
            withdraw_address: self.withdraw_address.clone(),
        }
    }

    /// Decode persisted resources, keeping the stored balances as they are
    pub fn from_raw(raw: &ResourcesRaw) -> Result<Self> {
        Ok(Self {
            delegations: raw
                .delegations
                .iter()
                .map(Delegation::from_raw)
                .collect::<Result<_>>()?,
            redelegations: raw
                .redelegations
                .iter()
                .map(Redelegation::from_raw)
                .collect::<Result<_>>()?,
            unbondings: raw
                .unbondings
                .iter()
                .map(Unbonding::from_raw)
                .collect::<Result<_>>()?,
            delegated_balance: parse_decimal("delegatedBalance", &raw.delegated_balance)?,
            pending_rewards_balance: parse_decimal(
                "pendingRewardsBalance",
                &raw.pending_rewards_balance,
            )?,
            unbonding_balance: parse_decimal("unbondingBalance", &raw.unbonding_balance)?,
            withdraw_address: raw.withdraw_address.clone(),
        })
    }
}

impl Account {
    pub fn to_raw(&self) -> AccountRaw {
        AccountRaw {
            id: self.id.clone(),
            currency_id: self.currency_id.clone(),
            fresh_address: self.fresh_address.clone(),
            balance: decimal_to_string(&self.balance),
            spendable_balance: decimal_to_string(&self.spendable_balance),
            resources: self.resources.as_ref().map(Resources::to_raw),
        }
    }

    pub fn from_raw(raw: &AccountRaw) -> Result<Self> {
        Ok(Self {
            id: raw.id.clone(),
            currency_id: raw.currency_id.clone(),
            fresh_address: raw.fresh_address.clone(),
            balance: parse_decimal("balance", &raw.balance)?,
            spendable_balance: parse_decimal("spendableBalance", &raw.spendable_balance)?,
            resources: raw.resources.as_ref().map(Resources::from_raw).transpose()?,
        })
    }
}

impl TransactionDraft {
    pub fn to_raw(&self) -> TransactionDraftRaw {
        TransactionDraftRaw {
            mode: self.mode.as_str().to_string(),
            amount: decimal_to_string(&self.amount),
            recipient: self.recipient.clone(),
            fees: self.fees.as_ref().map(decimal_to_string),
            gas: self.gas.as_ref().map(decimal_to_string),
            memo: self.memo.clone(),
            validators: self
                .validators
                .iter()
                .map(|v| DelegationInfoRaw {
                    address: v.address.clone(),
                    amount: decimal_to_string(&v.amount),
                })
                .collect(),
            source_validator: self.source_validator.clone(),
            use_all_amount: self.use_all_amount,
            network_info: self.network_info.as_ref().map(|n| NetworkInfoRaw {
                fees: decimal_to_string(&n.fees),
            }),
        }
    }

    pub fn from_raw(raw: &TransactionDraftRaw) -> Result<Self> {
        let mode = OperationMode::from_str(&raw.mode).ok_or_else(|| {
            StakingError::Serialization(format!("Unknown transaction mode '{}'", raw.mode))
        })?;

        let validators = raw
            .validators
            .iter()
            .map(|v| {
                Ok(DelegationInfo {
                    address: v.address.clone(),
                    amount: parse_decimal("validators.amount", &v.amount)?,
                })
            })
            .collect::<Result<_>>()?;

        Ok(Self {
            mode,
            amount: parse_decimal("amount", &raw.amount)?,
            recipient: raw.recipient.clone(),
            fees: raw.fees.as_deref().map(|f| parse_decimal("fees", f)).transpose()?,
            gas: raw.gas.as_deref().map(|g| parse_decimal("gas", g)).transpose()?,
            memo: raw.memo.clone(),
            validators,
            source_validator: raw.source_validator.clone(),
            use_all_amount: raw.use_all_amount,
            network_info: raw
                .network_info
                .as_ref()
                .map(|n| -> Result<NetworkInfo> {
                    Ok(NetworkInfo {
                        fees: parse_decimal("networkInfo.fees", &n.fees)?,
                    })
                })
                .transpose()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn sample_resources() -> Resources {
        Resources::from_parts(
            vec![
                Delegation {
                    validator_address: "cosmosvaloper1grgelyng2v6v3t8z87wu3sxgt9m5s03xfytvz7"
                        .to_string(),
                    amount: dec!(1234567.000001),
                    pending_rewards: dec!(0.120),
                    status: DelegationStatus::Bonded,
                },
                Delegation {
                    validator_address: "cosmosvaloper1sd4tl9aljmmezzudugs7zlaya7pg2895ws8tfs"
                        .to_string(),
                    amount: dec!(5),
                    pending_rewards: dec!(0),
                    status: DelegationStatus::Unbonding,
                },
            ],
            vec![Unbonding {
                validator_address: "cosmosvaloper1sd4tl9aljmmezzudugs7zlaya7pg2895ws8tfs".to_string(),
                amount: dec!(300),
                completion_date: Utc.timestamp_opt(1_700_000_000, 987_000_000).unwrap(),
            }],
            vec![Redelegation {
                validator_src_address: "cosmosvaloper1grgelyng2v6v3t8z87wu3sxgt9m5s03xfytvz7"
                    .to_string(),
                validator_dst_address: "cosmosvaloper1sd4tl9aljmmezzudugs7zlaya7pg2895ws8tfs"
                    .to_string(),
                amount: dec!(42),
                completion_date: Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap(),
            }],
            "cosmos108uy5q9jt59gwugq5yrdhkzcd9jryslmpcstk5",
        )
    }

    #[test]
    fn test_resources_round_trip() {
        let resources = sample_resources();
        let raw = resources.to_raw();
        assert_eq!(raw.delegations[0].amount, "1234567.000001");
        assert_eq!(raw.delegations[0].status, "bonded");
        assert_eq!(raw.unbondings[0].completion_date, "2023-11-14T22:13:20.987Z");

        let decoded = Resources::from_raw(&raw).unwrap();
        assert_eq!(decoded, resources);
        assert_eq!(decoded.to_raw(), raw);
    }

    #[test]
    fn test_raw_json_uses_camel_case() {
        let json = serde_json::to_value(sample_resources().to_raw()).unwrap();
        assert!(json.get("pendingRewardsBalance").is_some());
        assert!(json["redelegations"][0].get("validatorSrcAddress").is_some());
        assert!(json["unbondings"][0].get("completionDate").is_some());
    }

    #[test]
    fn test_bad_raw_values_are_rejected() {
        let mut raw = sample_resources().to_raw();
        raw.delegations[0].amount = "12,5".to_string();
        assert!(Resources::from_raw(&raw).is_err());

        let mut raw = sample_resources().to_raw();
        raw.unbondings[0].completion_date = "yesterday".to_string();
        assert!(Resources::from_raw(&raw).is_err());

        let mut raw = sample_resources().to_raw();
        raw.delegations[1].status = "jailed".to_string();
        assert!(Resources::from_raw(&raw).is_err());
    }

    #[test]
    fn test_account_round_trip() {
        let account = Account::new(
            "cosmos-acc-0",
            "cosmos",
            "cosmos108uy5q9jt59gwugq5yrdhkzcd9jryslmpcstk5",
            dec!(2180673),
        )
        .with_resources(sample_resources());

        let raw = account.to_raw();
        let decoded = Account::from_raw(&raw).unwrap();
        assert_eq!(decoded, account);

        let empty = Account::new("acc", "cosmos", "addr", dec!(1));
        let json = serde_json::to_value(empty.to_raw()).unwrap();
        assert!(json.get("resources").is_none());
    }

    #[test]
    fn test_draft_round_trip() {
        let draft = TransactionDraft {
            mode: OperationMode::Redelegate,
            amount: dec!(0),
            recipient: String::new(),
            fees: Some(dec!(7500)),
            gas: Some(dec!(250000)),
            memo: Some("rebalance".to_string()),
            validators: vec![DelegationInfo::new(
                "cosmosvaloper1sd4tl9aljmmezzudugs7zlaya7pg2895ws8tfs",
                dec!(100.25),
            )],
            source_validator: Some(
                "cosmosvaloper1grgelyng2v6v3t8z87wu3sxgt9m5s03xfytvz7".to_string(),
            ),
            use_all_amount: false,
            network_info: Some(NetworkInfo { fees: dec!(7500) }),
        };

        let raw = draft.to_raw();
        assert_eq!(raw.mode, "redelegate");
        assert_eq!(TransactionDraft::from_raw(&raw).unwrap(), draft);
    }
}
