//! Reconciles raw staking records into typed resources

use std::sync::Arc;

use futures::stream::{self, StreamExt, TryStreamExt};
use rust_decimal::Decimal;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use types::utils::short_address;
use types::{
    Account, Delegation, DelegationRecord, Redelegation, RedelegationRecord, Resources, Result,
    RewardRecord, StakingError, Unbonding, UnbondingRecord,
};

use crate::traits::ResourceSource;

/// Default number of concurrent validator status lookups
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Builds [`Resources`] from a [`ResourceSource`].
///
/// A failure of the source fails the whole aggregation; a partially summed
/// result is never returned.
pub struct ResourceAggregator {
    source: Arc<dyn ResourceSource>,
    batch_size: usize,
}

impl ResourceAggregator {
    pub fn new(source: Arc<dyn ResourceSource>) -> Self {
        Self {
            source,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Fetch and reconcile every staking record of `address`
    pub async fn aggregate(&self, address: &str, cancel: &CancellationToken) -> Result<Resources> {
        info!(
            source = %self.source.name(),
            address = %short_address(address),
            "Aggregating staking resources"
        );

        let delegation_records = self.checked(cancel, self.source.delegations(address)).await?;
        let reward_records = self.checked(cancel, self.source.rewards(address)).await?;
        let delegations = self
            .flatten_delegations(delegation_records, &reward_records, cancel)
            .await?;

        let unbondings = flatten_unbondings(self.checked(cancel, self.source.unbondings(address)).await?);
        let redelegations =
            flatten_redelegations(self.checked(cancel, self.source.redelegations(address)).await?);

        let resources = Resources::try_from_parts(delegations, unbondings, redelegations, "")
            .ok_or_else(|| {
                StakingError::data_unavailable(self.source.name(), "staking balances overflow")
            })?;

        debug!(
            delegations = resources.delegations.len(),
            unbondings = resources.unbondings.len(),
            redelegations = resources.redelegations.len(),
            delegated = %resources.delegated_balance,
            unbonding = %resources.unbonding_balance,
            "Aggregated staking resources"
        );

        Ok(resources)
    }

    /// Aggregate resources for `account` and install them
    pub async fn sync_account(&self, account: Account, cancel: &CancellationToken) -> Result<Account> {
        let resources = self.aggregate(&account.fresh_address, cancel).await?;
        Ok(post_build_account(account, resources))
    }

    async fn flatten_delegations(
        &self,
        records: Vec<DelegationRecord>,
        rewards: &[RewardRecord],
        cancel: &CancellationToken,
    ) -> Result<Vec<Delegation>> {
        let source = &self.source;

        let lookups = stream::iter(records)
            .map(|record| async move {
                let pending_rewards = first_matching_reward(rewards, &record.validator_address);
                let status = source.validator_status(&record.validator_address).await?;
                Ok::<_, StakingError>(Delegation {
                    validator_address: record.validator_address,
                    amount: record.amount,
                    pending_rewards,
                    status,
                })
            })
            .buffered(self.batch_size)
            .try_collect::<Vec<_>>();

        let delegations = self.checked(cancel, lookups).await?;

        Ok(prune_empty_delegations(delegations))
    }

    async fn checked<T>(
        &self,
        cancel: &CancellationToken,
        fut: impl std::future::Future<Output = Result<T>>,
    ) -> Result<T> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(StakingError::Cancelled),
            res = fut => res,
        }
    }
}

/// Rewards of the first record naming `validator_address`, zero when none does.
///
/// Later records for the same validator are ignored.
pub fn first_matching_reward(rewards: &[RewardRecord], validator_address: &str) -> Decimal {
    rewards
        .iter()
        .find(|r| r.validator_address == validator_address)
        .map(|r| r.amount)
        .unwrap_or(Decimal::ZERO)
}

/// Drop delegations with nothing bonded
pub fn prune_empty_delegations(delegations: Vec<Delegation>) -> Vec<Delegation> {
    delegations
        .into_iter()
        .filter(|d| d.amount > Decimal::ZERO)
        .collect()
}

/// One unbonding per tranche, earliest completion first
pub fn flatten_unbondings(records: Vec<UnbondingRecord>) -> Vec<Unbonding> {
    let mut unbondings: Vec<Unbonding> = records
        .into_iter()
        .flat_map(|record| {
            let validator_address = record.validator_address;
            record.entries.into_iter().map(move |entry| Unbonding {
                validator_address: validator_address.clone(),
                amount: entry.initial_balance,
                completion_date: entry.completion_time,
            })
        })
        .collect();

    unbondings.sort_by_key(|u| u.completion_date);
    unbondings
}

/// One redelegation per tranche, in source order
pub fn flatten_redelegations(records: Vec<RedelegationRecord>) -> Vec<Redelegation> {
    records
        .into_iter()
        .flat_map(|record| {
            let src = record.validator_src_address;
            let dst = record.validator_dst_address;
            record.entries.into_iter().map(move |entry| Redelegation {
                validator_src_address: src.clone(),
                validator_dst_address: dst.clone(),
                amount: entry.initial_balance,
                completion_date: entry.completion_time,
            })
        })
        .collect()
}

/// Install freshly aggregated resources and recompute the spendable balance
pub fn post_build_account(account: Account, resources: Resources) -> Account {
    account.with_resources(resources)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedSource;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;
    use types::{DelegationStatus, RecordEntry};

    const OWNER: &str = "cosmos108uy5q9jt59gwugq5yrdhkzcd9jryslmpcstk5";
    const VAL_A: &str = "cosmosvaloper1grgelyng2v6v3t8z87wu3sxgt9m5s03xfytvz7";
    const VAL_B: &str = "cosmosvaloper1sd4tl9aljmmezzudugs7zlaya7pg2895ws8tfs";

    fn source() -> ScriptedSource {
        let later = Utc.with_ymd_and_hms(2024, 6, 2, 0, 0, 0).unwrap();
        let sooner = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();

        ScriptedSource {
            delegations: vec![
                DelegationRecord {
                    validator_address: VAL_A.to_string(),
                    amount: dec!(1000),
                },
                DelegationRecord {
                    validator_address: VAL_B.to_string(),
                    amount: dec!(0),
                },
            ],
            rewards: vec![
                RewardRecord {
                    validator_address: VAL_A.to_string(),
                    amount: dec!(12),
                },
                RewardRecord {
                    validator_address: VAL_A.to_string(),
                    amount: dec!(999),
                },
                RewardRecord {
                    validator_address: VAL_B.to_string(),
                    amount: dec!(3),
                },
            ],
            unbondings: vec![UnbondingRecord {
                validator_address: VAL_B.to_string(),
                entries: vec![
                    RecordEntry {
                        initial_balance: dec!(50),
                        completion_time: later,
                    },
                    RecordEntry {
                        initial_balance: dec!(25),
                        completion_time: sooner,
                    },
                ],
            }],
            redelegations: vec![RedelegationRecord {
                validator_src_address: VAL_B.to_string(),
                validator_dst_address: VAL_A.to_string(),
                entries: vec![
                    RecordEntry {
                        initial_balance: dec!(10),
                        completion_time: later,
                    },
                    RecordEntry {
                        initial_balance: dec!(20),
                        completion_time: sooner,
                    },
                ],
            }],
            statuses: vec![(VAL_A.to_string(), DelegationStatus::Bonded)],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_aggregate_reconciles_records() {
        let aggregator = ResourceAggregator::new(Arc::new(source()));
        let resources = aggregator
            .aggregate(OWNER, &CancellationToken::new())
            .await
            .unwrap();

        // zero-amount delegation pruned, first reward wins
        assert_eq!(resources.delegations.len(), 1);
        assert_eq!(resources.delegations[0].pending_rewards, dec!(12));
        assert_eq!(resources.delegations[0].status, DelegationStatus::Bonded);
        assert_eq!(resources.pending_rewards_balance, dec!(12));

        // unbondings sorted by completion date
        assert_eq!(resources.unbondings.len(), 2);
        assert_eq!(resources.unbondings[0].amount, dec!(25));
        assert_eq!(resources.unbonding_balance, dec!(75));

        // redelegations keep source order
        assert_eq!(resources.redelegations[0].amount, dec!(10));
        assert_eq!(resources.redelegations[1].amount, dec!(20));

        assert_eq!(resources.delegated_balance, dec!(1000));
        assert!(resources.is_consistent());
    }

    #[tokio::test]
    async fn test_sync_account_recomputes_spendable() {
        let aggregator = ResourceAggregator::new(Arc::new(source())).with_batch_size(1);
        let account = Account::new("acc", "cosmos", OWNER, dec!(5000));

        let synced = aggregator
            .sync_account(account, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(synced.spendable_balance, dec!(3925));
        assert!(synced.is_consistent());
    }

    #[tokio::test]
    async fn test_source_failure_fails_aggregation() {
        let mut failing = source();
        failing.fail_status = true;
        let aggregator = ResourceAggregator::new(Arc::new(failing));

        let result = aggregator.aggregate(OWNER, &CancellationToken::new()).await;
        assert!(matches!(result, Err(StakingError::DataUnavailable { .. })));
    }

    #[tokio::test]
    async fn test_overflowing_amounts_fail_aggregation() {
        let mut huge = source();
        huge.delegations[1].amount = Decimal::MAX;
        huge.delegations[0].amount = Decimal::MAX;
        let aggregator = ResourceAggregator::new(Arc::new(huge));

        let result = aggregator.aggregate(OWNER, &CancellationToken::new()).await;
        assert!(matches!(result, Err(StakingError::DataUnavailable { .. })));
    }

    #[tokio::test]
    async fn test_non_ascii_address_is_logged_without_panicking() {
        let aggregator = ResourceAggregator::new(Arc::new(source()));
        let address = "cosmos1ééééééééééééééééqqqqqq";

        let resources = aggregator
            .aggregate(address, &CancellationToken::new())
            .await
            .unwrap();
        assert!(resources.is_consistent());
    }

    #[tokio::test]
    async fn test_cancelled_aggregation() {
        let aggregator = ResourceAggregator::new(Arc::new(source()));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = aggregator.aggregate(OWNER, &cancel).await;
        assert!(matches!(result, Err(StakingError::Cancelled)));
    }

    #[test]
    fn test_unknown_validator_has_no_rewards() {
        assert_eq!(first_matching_reward(&[], VAL_A), Decimal::ZERO);
    }
}
