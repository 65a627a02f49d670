//! Raw per-validator records as reported by a node

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An active delegation before rewards are attached
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DelegationRecord {
    pub validator_address: String,
    pub amount: Decimal,
}

/// Rewards accrued on a delegation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RewardRecord {
    pub validator_address: String,
    pub amount: Decimal,
}

/// One maturity tranche of an unbonding or redelegation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecordEntry {
    pub initial_balance: Decimal,
    pub completion_time: DateTime<Utc>,
}

/// All unbonding tranches leaving one validator
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UnbondingRecord {
    pub validator_address: String,
    pub entries: Vec<RecordEntry>,
}

/// All redelegation tranches between two validators
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RedelegationRecord {
    pub validator_src_address: String,
    pub validator_dst_address: String,
    pub entries: Vec<RecordEntry>,
}
