//! Shared application context built from the configuration

use anyhow::{anyhow, Context, Result};
use config::Config;
use fees::{FeeEstimationCache, FeeQuoter, GasSchedule, GasScheduleQuoter};
use node_client::NodeClient;
use rust_decimal::Decimal;
use staking::{AddressValidator, PrefixAddressValidator, TransactionDrafter, UnitFormatter};
use std::sync::Arc;
use tracing::info;
use types::{ProtocolParams, StakingError};

/// Collaborators every command draws from
#[derive(Debug)]
pub struct AppContext {
    pub config: Config,
    pub params: ProtocolParams,
    pub formatter: UnitFormatter,
    pub address_validator: Arc<PrefixAddressValidator>,
    node: Option<Arc<NodeClient>>,
}

impl AppContext {
    pub fn new(config: Config) -> Result<Self> {
        let params = config
            .protocol_params()
            .map_err(|e| anyhow!(e))
            .context("Invalid protocol parameters")?;

        let node = match config.network.node_url.as_deref() {
            Some(url) if !url.trim().is_empty() => {
                let client = NodeClient::from_config(&config.network)
                    .context("Failed to create node client")?;
                info!(node = %client.base_url(), "Node client configured");
                Some(Arc::new(client))
            }
            _ => None,
        };

        Ok(Self {
            formatter: UnitFormatter::new(
                config.network.unit_code.clone(),
                config.network.unit_magnitude,
            ),
            address_validator: Arc::new(PrefixAddressValidator::new(
                config.network.account_prefix.clone(),
                config.network.validator_prefix.clone(),
            )),
            params,
            node,
            config,
        })
    }

    /// The node client; commands that read chain state require one
    pub fn node(&self) -> Result<Arc<NodeClient>> {
        self.node
            .clone()
            .ok_or_else(|| anyhow!("No node configured; set network.node_url"))
    }

    pub fn has_node(&self) -> bool {
        self.node.is_some()
    }

    /// Fee cache backed by the node when configured, the gas schedule otherwise
    pub fn fee_cache(&self) -> Result<Arc<FeeEstimationCache>> {
        let quoter: Arc<dyn FeeQuoter> = match &self.node {
            Some(node) => node.clone(),
            None => {
                let schedule = GasSchedule::from_config(&self.config.fees.schedule)
                    .map_err(|e| anyhow!(e))
                    .context("Invalid gas schedule")?;
                Arc::new(GasScheduleQuoter::new(schedule))
            }
        };
        info!(quoter = %quoter.name(), "Using fee quoter");

        Ok(Arc::new(FeeEstimationCache::new(
            quoter,
            self.config.fees.cache_size,
        )))
    }

    pub fn drafter(&self) -> Result<TransactionDrafter> {
        let validator: Arc<dyn AddressValidator> = self.address_validator.clone();
        Ok(TransactionDrafter::new(
            self.fee_cache()?,
            validator,
            self.config.network.placeholder_recipient.clone(),
        )
        .with_default_memo(self.config.drafting.default_memo.clone()))
    }

    /// Parse a user-entered amount in display units into base units
    pub fn parse_amount(&self, raw: &str) -> types::Result<Decimal> {
        let display = raw
            .trim()
            .parse::<Decimal>()
            .map_err(|e| StakingError::Config(format!("invalid amount {raw}: {e}")))?;
        if display.is_sign_negative() {
            return Err(StakingError::Config(format!("negative amount {raw}")));
        }
        Ok(self.formatter.from_display(&display))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tokio_test::{assert_err, assert_ok};

    fn context() -> AppContext {
        let mut config = config::ConfigLoader::default();
        config.network.node_url = None;
        AppContext::new(config).unwrap()
    }

    #[test]
    fn test_parse_amount_in_display_units() {
        let ctx = context();
        let magnitude = ctx.config.network.unit_magnitude;
        let expected = dec!(1.5) * Decimal::from(10u64.pow(magnitude));
        assert_eq!(assert_ok!(ctx.parse_amount("1.5")), expected);
        assert_err!(ctx.parse_amount("-1"));
        assert_err!(ctx.parse_amount("many"));
    }

    #[test]
    fn test_offline_without_node() {
        let ctx = context();
        assert!(!ctx.has_node());
        assert_err!(ctx.node());
        assert_eq!(ctx.fee_cache().unwrap().quoter_name(), "gas-schedule");
    }
}
