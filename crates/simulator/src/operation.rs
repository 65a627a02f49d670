//! Synthetic operations emitted by the simulator

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use types::DelegationInfo;

/// Kind of a synthetic operation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationType {
    Delegate,
    Redelegate,
    Undelegate,
    Reward,
    Fees,
}

impl OperationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::Delegate => "DELEGATE",
            OperationType::Redelegate => "REDELEGATE",
            OperationType::Undelegate => "UNDELEGATE",
            OperationType::Reward => "REWARD",
            OperationType::Fees => "FEES",
        }
    }
}

impl std::fmt::Display for OperationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Staking details attached to an operation
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OperationExtra {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validators: Vec<DelegationInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validator: Option<DelegationInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_validator: Option<String>,
}

/// A synthetic account operation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub id: String,
    pub hash: String,
    pub op_type: OperationType,
    /// Net effect on the balance; negative when rewards exceed the fee
    pub value: Decimal,
    pub fee: Decimal,
    pub senders: Vec<String>,
    pub recipients: Vec<String>,
    pub block_height: u64,
    pub date: DateTime<Utc>,
    pub extra: OperationExtra,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    #[test]
    fn test_operation_serializes_type_and_extra() {
        let op = Operation {
            id: "mock_op_0_REWARD_acc".to_string(),
            hash: "ab".repeat(32),
            op_type: OperationType::Reward,
            value: dec!(120),
            fee: dec!(0),
            senders: vec!["cosmos1a".to_string()],
            recipients: vec!["cosmos1a".to_string()],
            block_height: 10,
            date: Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
            extra: OperationExtra {
                validator: Some(DelegationInfo::new("cosmosvaloper1v", dec!(120))),
                ..Default::default()
            },
        };

        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(json["opType"], "REWARD");
        assert!(json["extra"].get("validators").is_none());
        assert_eq!(json["extra"]["validator"]["address"], "cosmosvaloper1v");
    }
}
