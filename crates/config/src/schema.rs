//! Configuration schema definitions

use std::str::FromStr;

use chrono::Duration;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use types::ProtocolParams;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Chain and node configuration
    #[serde(default)]
    pub network: NetworkConfig,
    /// Protocol caps and reserves
    #[serde(default)]
    pub protocol: ProtocolConfig,
    /// Fee estimation configuration
    #[serde(default)]
    pub fees: FeesConfig,
    /// Draft preparation configuration
    #[serde(default)]
    pub drafting: DraftingConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Network configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Currency identifier, part of every fee fingerprint
    #[serde(default = "default_currency_id")]
    pub currency_id: String,
    /// Denomination used in protocol messages
    #[serde(default = "default_denom")]
    pub denom: String,
    /// Display unit code
    #[serde(default = "default_unit_code")]
    pub unit_code: String,
    /// Number of decimals between the base unit and the display unit
    #[serde(default = "default_unit_magnitude")]
    pub unit_magnitude: u32,
    /// Human-readable prefix of account addresses
    #[serde(default = "default_account_prefix")]
    pub account_prefix: String,
    /// Human-readable prefix of validator addresses
    #[serde(default = "default_validator_prefix")]
    pub validator_prefix: String,
    /// Node REST endpoint (optional, offline quoting is used without it)
    pub node_url: Option<String>,
    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    /// Recipient used when pricing a max-spendable send without one
    #[serde(default = "default_placeholder_recipient")]
    pub placeholder_recipient: String,
}

/// Protocol caps, decimal values as base-10 strings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolConfig {
    #[serde(default = "default_max_delegations")]
    pub max_delegations: usize,
    #[serde(default = "default_max_unbondings")]
    pub max_unbondings: usize,
    #[serde(default = "default_max_redelegations")]
    pub max_redelegations: usize,
    /// Flat safety margin kept spendable, in base units
    #[serde(default = "default_min_safe")]
    pub min_safe: String,
    /// Per-delegation fee floor, in base units
    #[serde(default = "default_min_fees")]
    pub min_fees: String,
    /// Unbonding and redelegation maturity
    #[serde(default = "default_unbonding_period_days")]
    pub unbonding_period_days: i64,
}

/// Fee estimation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeesConfig {
    /// Maximum number of memoized fee estimates
    #[serde(default = "default_cache_size")]
    pub cache_size: usize,
    /// Offline gas schedule
    #[serde(default)]
    pub schedule: GasScheduleConfig,
}

/// Offline gas schedule used when no node is configured
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GasScheduleConfig {
    /// Gas charged once per transaction
    #[serde(default = "default_base_gas")]
    pub base_gas: u64,
    #[serde(default = "default_send_gas")]
    pub send_gas: u64,
    #[serde(default = "default_delegate_gas")]
    pub delegate_gas: u64,
    #[serde(default = "default_undelegate_gas")]
    pub undelegate_gas: u64,
    #[serde(default = "default_redelegate_gas")]
    pub redelegate_gas: u64,
    #[serde(default = "default_withdraw_gas")]
    pub withdraw_gas: u64,
    /// Safety multiplier applied to the summed gas
    #[serde(default = "default_gas_amplifier")]
    pub gas_amplifier: String,
    /// Price of one gas unit, in base units
    #[serde(default = "default_gas_price")]
    pub gas_price: String,
    /// Lowest fee ever quoted, in base units
    #[serde(default = "default_min_fee")]
    pub min_fee: String,
}

/// Draft preparation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftingConfig {
    /// Memo assigned to non-send drafts that have none
    #[serde(default = "default_memo")]
    pub default_memo: String,
    /// Concurrent per-validator lookups during aggregation
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (json, pretty)
    #[serde(default = "default_log_format")]
    pub format: String,
    /// Log file path (optional)
    pub file_path: Option<String>,
}

// Default value functions
fn default_currency_id() -> String {
    "cosmos".to_string()
}

fn default_denom() -> String {
    "uatom".to_string()
}

fn default_unit_code() -> String {
    "ATOM".to_string()
}

fn default_unit_magnitude() -> u32 {
    6
}

fn default_account_prefix() -> String {
    "cosmos".to_string()
}

fn default_validator_prefix() -> String {
    "cosmosvaloper".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_placeholder_recipient() -> String {
    "cosmos1g84934jpu3v5de5yqukkkhxmcvsw3u2ajxvpdl".to_string()
}

fn default_max_delegations() -> usize {
    types::params::MAX_DELEGATIONS
}

fn default_max_unbondings() -> usize {
    types::params::MAX_UNBONDINGS
}

fn default_max_redelegations() -> usize {
    types::params::MAX_REDELEGATIONS
}

fn default_min_safe() -> String {
    types::params::MIN_SAFE.to_string()
}

fn default_min_fees() -> String {
    types::params::MIN_FEES.to_string()
}

fn default_unbonding_period_days() -> i64 {
    types::params::UNBONDING_PERIOD_DAYS
}

fn default_cache_size() -> usize {
    100
}

fn default_base_gas() -> u64 {
    60_000
}

fn default_send_gas() -> u64 {
    20_000
}

fn default_delegate_gas() -> u64 {
    100_000
}

fn default_undelegate_gas() -> u64 {
    120_000
}

fn default_redelegate_gas() -> u64 {
    160_000
}

fn default_withdraw_gas() -> u64 {
    80_000
}

fn default_gas_amplifier() -> String {
    "1.5".to_string()
}

fn default_gas_price() -> String {
    "0.025".to_string()
}

fn default_min_fee() -> String {
    "2500".to_string()
}

fn default_memo() -> String {
    "stake-drafter".to_string()
}

fn default_batch_size() -> usize {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Config {
    /// Convert the protocol section to decimal parameters
    pub fn protocol_params(&self) -> Result<ProtocolParams, String> {
        let min_safe = Decimal::from_str(&self.protocol.min_safe)
            .map_err(|e| format!("Invalid min_safe: {}", e))?;

        let min_fees = Decimal::from_str(&self.protocol.min_fees)
            .map_err(|e| format!("Invalid min_fees: {}", e))?;

        Ok(ProtocolParams {
            max_delegations: self.protocol.max_delegations,
            max_unbondings: self.protocol.max_unbondings,
            max_redelegations: self.protocol.max_redelegations,
            min_safe,
            min_fees,
            unbonding_period: Duration::days(self.protocol.unbonding_period_days),
        })
    }
}

impl GasScheduleConfig {
    /// Parse the decimal fields of the schedule
    pub fn parse_prices(&self) -> Result<ParsedGasPrices, String> {
        let gas_amplifier = Decimal::from_str(&self.gas_amplifier)
            .map_err(|e| format!("Invalid gas_amplifier: {}", e))?;

        let gas_price = Decimal::from_str(&self.gas_price)
            .map_err(|e| format!("Invalid gas_price: {}", e))?;

        let min_fee = Decimal::from_str(&self.min_fee)
            .map_err(|e| format!("Invalid min_fee: {}", e))?;

        Ok(ParsedGasPrices {
            gas_amplifier,
            gas_price,
            min_fee,
        })
    }
}

/// Parsed decimal fields of the gas schedule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedGasPrices {
    pub gas_amplifier: Decimal,
    pub gas_price: Decimal,
    pub min_fee: Decimal,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            currency_id: default_currency_id(),
            denom: default_denom(),
            unit_code: default_unit_code(),
            unit_magnitude: default_unit_magnitude(),
            account_prefix: default_account_prefix(),
            validator_prefix: default_validator_prefix(),
            node_url: None,
            request_timeout_seconds: default_request_timeout(),
            placeholder_recipient: default_placeholder_recipient(),
        }
    }
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            max_delegations: default_max_delegations(),
            max_unbondings: default_max_unbondings(),
            max_redelegations: default_max_redelegations(),
            min_safe: default_min_safe(),
            min_fees: default_min_fees(),
            unbonding_period_days: default_unbonding_period_days(),
        }
    }
}

impl Default for FeesConfig {
    fn default() -> Self {
        Self {
            cache_size: default_cache_size(),
            schedule: GasScheduleConfig::default(),
        }
    }
}

impl Default for GasScheduleConfig {
    fn default() -> Self {
        Self {
            base_gas: default_base_gas(),
            send_gas: default_send_gas(),
            delegate_gas: default_delegate_gas(),
            undelegate_gas: default_undelegate_gas(),
            redelegate_gas: default_redelegate_gas(),
            withdraw_gas: default_withdraw_gas(),
            gas_amplifier: default_gas_amplifier(),
            gas_price: default_gas_price(),
            min_fee: default_min_fee(),
        }
    }
}

impl Default for DraftingConfig {
    fn default() -> Self {
        Self {
            default_memo: default_memo(),
            batch_size: default_batch_size(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file_path: None,
        }
    }
}
