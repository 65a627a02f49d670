//! JSON shapes served by the node REST API

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Every node response wraps its payload in `result`
#[derive(Debug, Clone, Deserialize)]
pub struct NodeResponse<T> {
    #[serde(default)]
    pub height: Option<String>,
    pub result: T,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CoinWire {
    pub denom: String,
    pub amount: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DelegationWire {
    pub validator_address: String,
    pub balance: CoinWire,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RewardWire {
    pub validator_address: String,
    #[serde(default)]
    pub reward: Vec<CoinWire>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RewardsWire {
    #[serde(default)]
    pub rewards: Vec<RewardWire>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EntryWire {
    pub initial_balance: String,
    pub completion_time: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UnbondingWire {
    pub validator_address: String,
    #[serde(default)]
    pub entries: Vec<EntryWire>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedelegationWire {
    pub validator_src_address: String,
    pub validator_dst_address: String,
    #[serde(default)]
    pub entries: Vec<EntryWire>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DescriptionWire {
    #[serde(default)]
    pub moniker: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommissionRatesWire {
    pub rate: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommissionWire {
    pub commission_rates: CommissionRatesWire,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ValidatorWire {
    pub operator_address: String,
    /// Numeric (`2`, `"2"`) or `BOND_STATUS_*`
    pub status: Value,
    #[serde(default)]
    pub tokens: String,
    #[serde(default)]
    pub description: DescriptionWire,
    pub commission: Option<CommissionWire>,
    #[serde(default)]
    pub estimated_yearly_rewards_rate: Option<String>,
}

impl ValidatorWire {
    /// Status in its textual chain encoding
    pub fn status_str(&self) -> String {
        match &self.status {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// Body of `POST /txs/estimate_fees`
#[derive(Debug, Clone, Serialize)]
pub struct EstimateFeesRequest<M: Serialize> {
    pub from: String,
    pub messages: Vec<M>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EstimateFeesWire {
    pub estimated_fees: String,
    #[serde(default)]
    pub estimated_gas: Option<String>,
}
