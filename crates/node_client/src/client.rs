//! REST client for a staking node

use async_trait::async_trait;
use config::NetworkConfig;
use fees::FeeQuoter;
use reqwest::{Client, RequestBuilder};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use staking::{create_messages, ResourceSource, RosterSource};
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use types::utils::{checked_sum, parse_date, parse_decimal, short_address};
use types::{
    Account, ConfigError, DelegationRecord, DelegationStatus, FeeError, FeeEstimate, RecordEntry,
    RedelegationRecord, Result, RewardRecord, StakingError, TransactionDraft, UnbondingRecord,
    ValidatorItem,
};
use uuid::Uuid;

use crate::wire::{
    CoinWire, DelegationWire, EntryWire, EstimateFeesRequest, EstimateFeesWire, NodeResponse,
    RedelegationWire, RewardsWire, UnbondingWire, ValidatorWire,
};

const USER_AGENT: &str = "stake-drafter/0.1.0";
const ESTIMATE_FEES_PATH: &str = "/txs/estimate_fees";

/// Failure of a single node request
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NodeError {
    #[error("request to {path} timed out")]
    Timeout { path: String },

    #[error("request to {path} failed: {message}")]
    Transport { path: String, message: String },

    #[error("{path} answered with HTTP {status}")]
    Status { path: String, status: u16 },

    #[error("invalid response from {path}: {message}")]
    InvalidResponse { path: String, message: String },
}

impl NodeError {
    /// The node could not be reached at all
    pub fn is_unreachable(&self) -> bool {
        matches!(self, NodeError::Timeout { .. } | NodeError::Transport { .. })
    }
}

/// HTTP client for a node's REST API.
///
/// Serves as the resource source, the roster source and the fee quoter.
#[derive(Debug, Clone)]
pub struct NodeClient {
    name: String,
    base_url: String,
    denom: String,
    request_timeout: Duration,
    http_client: Client,
}

impl NodeClient {
    /// Create a client for the node at `base_url`
    pub fn new(
        base_url: impl Into<String>,
        denom: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(request_timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| StakingError::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            name: "node".to_string(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            denom: denom.into(),
            request_timeout,
            http_client,
        })
    }

    /// Create a client from the network section; fails without a node URL
    pub fn from_config(network: &NetworkConfig) -> Result<Self> {
        let url = network
            .node_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingField {
                field: "network.node_url".to_string(),
            })?;

        Self::new(
            url,
            network.denom.clone(),
            Duration::from_secs(network.request_timeout_seconds),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn denom(&self) -> &str {
        &self.denom
    }

    /// Bank balance of `address` in the client's denom
    pub async fn balance(&self, address: &str) -> Result<Decimal> {
        info!(address = %short_address(address), "Fetching balance");
        let coins: Vec<CoinWire> = self.get(&format!("/bank/balances/{address}")).await?;
        self.sum_denom("balances", &coins)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let request = self.http_client.get(self.url(path));
        self.send::<NodeResponse<T>>(path, request)
            .await
            .map(|response| response.result)
            .map_err(|e| StakingError::data_unavailable(&self.name, e))
    }

    async fn send<T: DeserializeOwned>(
        &self,
        path: &str,
        request: RequestBuilder,
    ) -> std::result::Result<T, NodeError> {
        let request_id = Uuid::new_v4();
        debug!(node = %self.base_url, path = %path, request_id = %request_id, "Sending node request");

        let response = timeout(
            self.request_timeout,
            request.header("x-request-id", request_id.to_string()).send(),
        )
        .await
        .map_err(|_| NodeError::Timeout {
            path: path.to_string(),
        })?
        .map_err(|e| {
            if e.is_timeout() {
                NodeError::Timeout {
                    path: path.to_string(),
                }
            } else {
                NodeError::Transport {
                    path: path.to_string(),
                    message: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!(path = %path, status = status.as_u16(), request_id = %request_id, "Node request failed");
            return Err(NodeError::Status {
                path: path.to_string(),
                status: status.as_u16(),
            });
        }

        let raw_text = response.text().await.map_err(|e| NodeError::InvalidResponse {
            path: path.to_string(),
            message: format!("error reading response body: {e}"),
        })?;

        serde_json::from_str(&raw_text).map_err(|e| NodeError::InvalidResponse {
            path: path.to_string(),
            message: e.to_string(),
        })
    }

    fn decimal(&self, field: &str, raw: &str) -> Result<Decimal> {
        parse_decimal(field, raw).map_err(|e| StakingError::data_unavailable(&self.name, e))
    }

    fn sum_denom(&self, field: &str, coins: &[CoinWire]) -> Result<Decimal> {
        coins
            .iter()
            .filter(|coin| coin.denom == self.denom)
            .try_fold(Decimal::ZERO, |total, coin| -> Result<Decimal> {
                total
                    .checked_add(self.decimal(field, &coin.amount)?)
                    .ok_or_else(|| StakingError::data_unavailable(&self.name, format!("{field} overflows")))
            })
    }

    fn entries(&self, entries: Vec<EntryWire>) -> Result<Vec<RecordEntry>> {
        entries
            .into_iter()
            .map(|entry| {
                Ok(RecordEntry {
                    initial_balance: self.decimal("initial_balance", &entry.initial_balance)?,
                    completion_time: parse_date("completion_time", &entry.completion_time)
                        .map_err(|e| StakingError::data_unavailable(&self.name, e))?,
                })
            })
            .collect()
    }

    fn quote_error(&self, message: impl ToString) -> FeeError {
        FeeError::Quote {
            quoter: self.name.clone(),
            message: message.to_string(),
        }
    }
}

#[async_trait]
impl ResourceSource for NodeClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn delegations(&self, address: &str) -> Result<Vec<DelegationRecord>> {
        let wire: Vec<DelegationWire> = self
            .get(&format!("/staking/delegators/{address}/delegations"))
            .await?;

        wire.into_iter()
            .map(|d| {
                Ok(DelegationRecord {
                    amount: self.decimal("balance.amount", &d.balance.amount)?,
                    validator_address: d.validator_address,
                })
            })
            .collect()
    }

    async fn rewards(&self, address: &str) -> Result<Vec<RewardRecord>> {
        let wire: RewardsWire = self
            .get(&format!("/staking/delegators/{address}/rewards"))
            .await?;

        wire.rewards
            .into_iter()
            .map(|r| {
                Ok(RewardRecord {
                    amount: self.sum_denom("reward", &r.reward)?,
                    validator_address: r.validator_address,
                })
            })
            .collect()
    }

    async fn unbondings(&self, address: &str) -> Result<Vec<UnbondingRecord>> {
        let wire: Vec<UnbondingWire> = self
            .get(&format!("/staking/delegators/{address}/unbonding_delegations"))
            .await?;

        wire.into_iter()
            .map(|u| {
                Ok(UnbondingRecord {
                    entries: self.entries(u.entries)?,
                    validator_address: u.validator_address,
                })
            })
            .collect()
    }

    async fn redelegations(&self, address: &str) -> Result<Vec<RedelegationRecord>> {
        let wire: Vec<RedelegationWire> = self
            .get(&format!("/staking/delegators/{address}/redelegations"))
            .await?;

        wire.into_iter()
            .map(|r| {
                Ok(RedelegationRecord {
                    entries: self.entries(r.entries)?,
                    validator_src_address: r.validator_src_address,
                    validator_dst_address: r.validator_dst_address,
                })
            })
            .collect()
    }

    async fn validator_status(&self, validator_address: &str) -> Result<DelegationStatus> {
        let wire: ValidatorWire = self
            .get(&format!("/staking/validators/{validator_address}"))
            .await?;
        Ok(DelegationStatus::from_chain_status(&wire.status_str()))
    }
}

#[async_trait]
impl RosterSource for NodeClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_validators(&self) -> Result<Vec<ValidatorItem>> {
        let wire: Vec<ValidatorWire> = self.get("/staking/validators").await?;
        info!(count = wire.len(), "Fetched validator roster");
        Ok(roster_from_wire(&wire))
    }
}

#[async_trait]
impl FeeQuoter for NodeClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn quote(
        &self,
        account: &Account,
        draft: &TransactionDraft,
    ) -> std::result::Result<FeeEstimate, FeeError> {
        let messages = create_messages(&account.fresh_address, draft, &self.denom)
            .map_err(|e| self.quote_error(e))?;

        let body = EstimateFeesRequest {
            from: account.fresh_address.clone(),
            messages,
            memo: draft.memo.clone(),
        };
        let request = self.http_client.post(self.url(ESTIMATE_FEES_PATH)).json(&body);

        let response: NodeResponse<EstimateFeesWire> = self
            .send(ESTIMATE_FEES_PATH, request)
            .await
            .map_err(|e| {
                if e.is_unreachable() {
                    FeeError::Unavailable {
                        quoter: self.name.clone(),
                    }
                } else {
                    self.quote_error(e)
                }
            })?;

        let estimated_fees = parse_decimal("estimated_fees", &response.result.estimated_fees)
            .map_err(|e| self.quote_error(e))?;
        let estimated_gas = response
            .result
            .estimated_gas
            .as_deref()
            .map(|gas| parse_decimal("estimated_gas", gas))
            .transpose()
            .map_err(|e| self.quote_error(e))?;

        debug!(mode = %draft.mode, fees = %estimated_fees, "Node fee quote");

        Ok(FeeEstimate {
            estimated_fees,
            estimated_gas,
        })
    }
}

/// Convert the node's validator list into roster items.
///
/// Voting power is the validator's share of all listed tokens. Unparseable
/// ratios become zero, as does every share when the token total overflows.
pub fn roster_from_wire(validators: &[ValidatorWire]) -> Vec<ValidatorItem> {
    let tokens: Vec<Decimal> = validators
        .iter()
        .map(|v| v.tokens.trim().parse::<Decimal>().unwrap_or(Decimal::ZERO))
        .collect();
    let total = checked_sum(tokens.iter().copied()).unwrap_or_else(|| {
        warn!(validators = validators.len(), "Validator token total overflows");
        Decimal::ZERO
    });

    validators
        .iter()
        .zip(tokens)
        .map(|(v, tokens)| {
            let voting_power = if total.is_zero() {
                0.0
            } else {
                (tokens / total).to_f64().unwrap_or(0.0)
            };

            ValidatorItem {
                validator_address: v.operator_address.clone(),
                name: v.description.moniker.clone(),
                voting_power,
                commission: v
                    .commission
                    .as_ref()
                    .and_then(|c| c.commission_rates.rate.trim().parse::<f64>().ok())
                    .unwrap_or(0.0),
                estimated_yearly_rewards_rate: v
                    .estimated_yearly_rewards_rate
                    .as_deref()
                    .and_then(|r| r.trim().parse::<f64>().ok())
                    .unwrap_or(0.0),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use staking::ResourceAggregator;
    use std::sync::Arc;
    use tokio_test::{assert_err, assert_ok};
    use tokio_util::sync::CancellationToken;
    use types::{DelegationInfo, OperationMode};
    use wiremock::{
        matchers::{method, path},
        Mock, MockServer, ResponseTemplate,
    };

    const DELEGATOR: &str = "cosmos108uy5q9jt59gwugq5yrdhkzcd9jryslmpcstk5";
    const VAL_A: &str = "cosmosvaloper1grgelyng2v6v3t8z87wu3sxgt9m5s03xfytvz7";
    const VAL_B: &str = "cosmosvaloper1sd4tl9aljmmezzudugs7zlaya7pg2895ws8tfs";

    fn client(server: &MockServer) -> NodeClient {
        NodeClient::new(server.uri(), "uatom", Duration::from_secs(5)).unwrap()
    }

    async fn mount_get(server: &MockServer, route: &str, result: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "height": "100", "result": result })),
            )
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_delegations_and_rewards() {
        let server = MockServer::start().await;
        mount_get(
            &server,
            &format!("/staking/delegators/{DELEGATOR}/delegations"),
            serde_json::json!([
                { "validator_address": VAL_A, "balance": { "denom": "uatom", "amount": "1500000" } }
            ]),
        )
        .await;
        mount_get(
            &server,
            &format!("/staking/delegators/{DELEGATOR}/rewards"),
            serde_json::json!({ "rewards": [
                { "validator_address": VAL_A, "reward": [
                    { "denom": "uatom", "amount": "12.5" },
                    { "denom": "ibc/27394FB0", "amount": "99" }
                ] }
            ] }),
        )
        .await;

        let node = client(&server);
        let delegations = node.delegations(DELEGATOR).await.unwrap();
        assert_eq!(
            delegations,
            vec![DelegationRecord {
                validator_address: VAL_A.to_string(),
                amount: dec!(1500000),
            }]
        );

        let rewards = node.rewards(DELEGATOR).await.unwrap();
        assert_eq!(rewards[0].amount, dec!(12.5));
    }

    #[tokio::test]
    async fn test_overflowing_reward_total_is_data_unavailable() {
        let server = MockServer::start().await;
        let max = Decimal::MAX.to_string();
        mount_get(
            &server,
            &format!("/staking/delegators/{DELEGATOR}/rewards"),
            serde_json::json!({ "rewards": [
                { "validator_address": VAL_A, "reward": [
                    { "denom": "uatom", "amount": max },
                    { "denom": "uatom", "amount": "1" }
                ] }
            ] }),
        )
        .await;

        let result = client(&server).rewards(DELEGATOR).await;
        assert!(matches!(assert_err!(result), StakingError::DataUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_validator_status_encodings() {
        let server = MockServer::start().await;
        mount_get(
            &server,
            &format!("/staking/validators/{VAL_A}"),
            serde_json::json!({ "operator_address": VAL_A, "status": 2 }),
        )
        .await;
        mount_get(
            &server,
            &format!("/staking/validators/{VAL_B}"),
            serde_json::json!({ "operator_address": VAL_B, "status": "BOND_STATUS_UNBONDING" }),
        )
        .await;

        let node = client(&server);
        assert_eq!(node.validator_status(VAL_A).await.unwrap(), DelegationStatus::Bonded);
        assert_eq!(node.validator_status(VAL_B).await.unwrap(), DelegationStatus::Unbonding);
    }

    #[tokio::test]
    async fn test_aggregates_through_node() {
        let server = MockServer::start().await;
        mount_get(
            &server,
            &format!("/staking/delegators/{DELEGATOR}/delegations"),
            serde_json::json!([
                { "validator_address": VAL_A, "balance": { "denom": "uatom", "amount": "1000" } },
                { "validator_address": VAL_B, "balance": { "denom": "uatom", "amount": "0" } }
            ]),
        )
        .await;
        mount_get(
            &server,
            &format!("/staking/delegators/{DELEGATOR}/rewards"),
            serde_json::json!({ "rewards": [] }),
        )
        .await;
        mount_get(
            &server,
            &format!("/staking/delegators/{DELEGATOR}/unbonding_delegations"),
            serde_json::json!([
                { "validator_address": VAL_B, "entries": [
                    { "initial_balance": "300", "completion_time": "2024-07-01T00:00:00Z" },
                    { "initial_balance": "200", "completion_time": "2024-06-01T00:00:00Z" }
                ] }
            ]),
        )
        .await;
        mount_get(
            &server,
            &format!("/staking/delegators/{DELEGATOR}/redelegations"),
            serde_json::json!([]),
        )
        .await;
        for validator in [VAL_A, VAL_B] {
            mount_get(
                &server,
                &format!("/staking/validators/{validator}"),
                serde_json::json!({ "operator_address": validator, "status": "2" }),
            )
            .await;
        }

        let aggregator = ResourceAggregator::new(Arc::new(client(&server)));
        let resources = aggregator
            .aggregate(DELEGATOR, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(resources.delegations.len(), 1);
        assert_eq!(resources.delegated_balance, dec!(1000));
        assert_eq!(resources.unbonding_balance, dec!(500));
        assert_eq!(resources.unbondings.len(), 2);
    }

    #[tokio::test]
    async fn test_http_error_is_data_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = client(&server).delegations(DELEGATOR).await.unwrap_err();
        assert!(matches!(err, StakingError::DataUnavailable { .. }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_malformed_body_is_data_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
            .mount(&server)
            .await;

        let err = client(&server).balance(DELEGATOR).await.unwrap_err();
        assert!(matches!(err, StakingError::DataUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_balance_filters_denom() {
        let server = MockServer::start().await;
        mount_get(
            &server,
            &format!("/bank/balances/{DELEGATOR}"),
            serde_json::json!([
                { "denom": "uatom", "amount": "2180673" },
                { "denom": "uosmo", "amount": "5" }
            ]),
        )
        .await;

        assert_eq!(client(&server).balance(DELEGATOR).await.unwrap(), dec!(2180673));
    }

    #[tokio::test]
    async fn test_roster_voting_power() {
        let server = MockServer::start().await;
        mount_get(
            &server,
            "/staking/validators",
            serde_json::json!([
                {
                    "operator_address": VAL_A, "status": 3, "tokens": "300",
                    "description": { "moniker": "Alpha" },
                    "commission": { "commission_rates": { "rate": "0.050000000000000000" } },
                    "estimated_yearly_rewards_rate": "0.12"
                },
                { "operator_address": VAL_B, "status": 3, "tokens": "100" }
            ]),
        )
        .await;

        let roster = client(&server).fetch_validators().await.unwrap();
        assert_eq!(roster.len(), 2);
        assert_eq!(roster[0].name, "Alpha");
        assert!((roster[0].voting_power - 0.75).abs() < 1e-9);
        assert!((roster[0].commission - 0.05).abs() < 1e-9);
        assert!((roster[0].estimated_yearly_rewards_rate - 0.12).abs() < 1e-9);
        assert_eq!(roster[1].commission, 0.0);
    }

    fn delegate_draft() -> TransactionDraft {
        TransactionDraft {
            mode: OperationMode::Delegate,
            validators: vec![DelegationInfo::new(VAL_A, dec!(1000))],
            memo: Some("stake-drafter".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_fee_quote() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(ESTIMATE_FEES_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "result": { "estimated_fees": "6250", "estimated_gas": "250000" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let account = Account::new("acc", "cosmos", DELEGATOR, dec!(100000));
        let estimate = client(&server).quote(&account, &delegate_draft()).await.unwrap();
        assert_eq!(estimate.estimated_fees, dec!(6250));
        assert_eq!(estimate.estimated_gas, Some(dec!(250000)));
    }

    #[tokio::test]
    async fn test_fee_quote_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(ESTIMATE_FEES_PATH))
            .respond_with(ResponseTemplate::new(400))
            .mount(&server)
            .await;

        let node = client(&server);
        let account = Account::new("acc", "cosmos", DELEGATOR, dec!(100000));
        let err = node.quote(&account, &delegate_draft()).await.unwrap_err();
        assert!(matches!(err, FeeError::Quote { .. }));

        let no_validators = TransactionDraft {
            mode: OperationMode::Delegate,
            ..Default::default()
        };
        let err = node.quote(&account, &no_validators).await.unwrap_err();
        assert_eq!(
            err,
            FeeError::Quote {
                quoter: "node".to_string(),
                message: "no validators".to_string(),
            }
        );
    }

    #[test]
    fn test_from_config_requires_node_url() {
        let mut network = NetworkConfig::default();
        network.node_url = None;
        assert_err!(NodeClient::from_config(&network));

        network.node_url = Some("http://localhost:1317/".to_string());
        let node = assert_ok!(NodeClient::from_config(&network));
        assert_eq!(node.base_url(), "http://localhost:1317");
        assert_eq!(node.denom(), network.denom);
    }
}
