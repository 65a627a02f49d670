//! Staking resources held by an account

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::utils::checked_sum;

/// Validator-set membership of the validator a delegation is bonded to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum DelegationStatus {
    /// Validator is in the active set, the delegation earns rewards
    Bonded,
    /// Validator is leaving the active set
    Unbonding,
    /// Validator is outside the active set
    #[default]
    Unbonded,
}

impl DelegationStatus {
    /// Map a status as reported by a node.
    ///
    /// Both the numeric encoding (`"0"`, `"1"`, `"2"`) and the
    /// `BOND_STATUS_*` encoding are accepted; anything else is `Unbonded`.
    pub fn from_chain_status(status: &str) -> Self {
        match status {
            "0" | "BOND_STATUS_UNBONDED" => DelegationStatus::Unbonded,
            "1" | "BOND_STATUS_UNBONDING" => DelegationStatus::Unbonding,
            "2" | "BOND_STATUS_BONDED" => DelegationStatus::Bonded,
            _ => DelegationStatus::Unbonded,
        }
    }

    /// Parse from the persisted lowercase form
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "bonded" => Some(DelegationStatus::Bonded),
            "unbonding" => Some(DelegationStatus::Unbonding),
            "unbonded" => Some(DelegationStatus::Unbonded),
            _ => None,
        }
    }

    /// Get the persisted lowercase form
    pub fn as_str(&self) -> &'static str {
        match self {
            DelegationStatus::Bonded => "bonded",
            DelegationStatus::Unbonding => "unbonding",
            DelegationStatus::Unbonded => "unbonded",
        }
    }
}

impl std::fmt::Display for DelegationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Funds bonded to a single validator
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Delegation {
    pub validator_address: String,
    pub amount: Decimal,
    pub pending_rewards: Decimal,
    pub status: DelegationStatus,
}

/// Funds leaving a validator, locked until `completion_date`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Unbonding {
    pub validator_address: String,
    pub amount: Decimal,
    pub completion_date: DateTime<Utc>,
}

/// Funds moving from one validator to another
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Redelegation {
    pub validator_src_address: String,
    pub validator_dst_address: String,
    pub amount: Decimal,
    pub completion_date: DateTime<Utc>,
}

/// The staking view of an account.
///
/// Balances are always derived from the lists: build values through
/// [`Resources::from_parts`] and replace them wholesale rather than editing
/// a balance in place.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Resources {
    pub delegations: Vec<Delegation>,
    pub redelegations: Vec<Redelegation>,
    pub unbondings: Vec<Unbonding>,
    pub delegated_balance: Decimal,
    pub pending_rewards_balance: Decimal,
    pub unbonding_balance: Decimal,
    pub withdraw_address: String,
}

impl Resources {
    /// Build resources and derive every balance from the given lists.
    ///
    /// Balances saturate at `Decimal::MAX`; use [`Resources::try_from_parts`]
    /// for amounts that come from outside the process.
    pub fn from_parts(
        delegations: Vec<Delegation>,
        unbondings: Vec<Unbonding>,
        redelegations: Vec<Redelegation>,
        withdraw_address: impl Into<String>,
    ) -> Self {
        let delegated_balance = saturating_sum(delegations.iter().map(|d| d.amount));
        let pending_rewards_balance = saturating_sum(delegations.iter().map(|d| d.pending_rewards));
        let unbonding_balance = saturating_sum(unbondings.iter().map(|u| u.amount));

        Self {
            delegations,
            redelegations,
            unbondings,
            delegated_balance,
            pending_rewards_balance,
            unbonding_balance,
            withdraw_address: withdraw_address.into(),
        }
    }

    /// Like [`Resources::from_parts`], but `None` when a balance overflows
    pub fn try_from_parts(
        delegations: Vec<Delegation>,
        unbondings: Vec<Unbonding>,
        redelegations: Vec<Redelegation>,
        withdraw_address: impl Into<String>,
    ) -> Option<Self> {
        let delegated_balance = checked_sum(delegations.iter().map(|d| d.amount))?;
        let pending_rewards_balance = checked_sum(delegations.iter().map(|d| d.pending_rewards))?;
        let unbonding_balance = checked_sum(unbondings.iter().map(|u| u.amount))?;

        Some(Self {
            delegations,
            redelegations,
            unbondings,
            delegated_balance,
            pending_rewards_balance,
            unbonding_balance,
            withdraw_address: withdraw_address.into(),
        })
    }

    /// Resources of an account that never staked
    pub fn empty() -> Self {
        Self::default()
    }

    /// Re-derive the balances after the lists were rewritten
    pub fn recompute_balances(self) -> Self {
        Self::from_parts(
            self.delegations,
            self.unbondings,
            self.redelegations,
            self.withdraw_address,
        )
    }

    /// Whether the stored balances match the sums of the lists
    pub fn is_consistent(&self) -> bool {
        let delegated = checked_sum(self.delegations.iter().map(|d| d.amount));
        let rewards = checked_sum(self.delegations.iter().map(|d| d.pending_rewards));
        let unbonding = checked_sum(self.unbondings.iter().map(|u| u.amount));

        delegated == Some(self.delegated_balance)
            && rewards == Some(self.pending_rewards_balance)
            && unbonding == Some(self.unbonding_balance)
    }

    /// Find the delegation bonded to `validator_address`
    pub fn delegation(&self, validator_address: &str) -> Option<&Delegation> {
        self.delegations
            .iter()
            .find(|d| d.validator_address == validator_address)
    }
}

fn saturating_sum(values: impl Iterator<Item = Decimal>) -> Decimal {
    values.fold(Decimal::ZERO, |total, value| total.saturating_add(value))
}

/// An account as seen by the staking components
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// Stable account identifier
    pub id: String,
    /// Identifier of the currency the account holds
    pub currency_id: String,
    /// The account's own address
    pub fresh_address: String,
    pub balance: Decimal,
    pub spendable_balance: Decimal,
    pub resources: Option<Resources>,
}

impl Account {
    /// Create an account without staking resources
    pub fn new(
        id: impl Into<String>,
        currency_id: impl Into<String>,
        fresh_address: impl Into<String>,
        balance: Decimal,
    ) -> Self {
        Self {
            id: id.into(),
            currency_id: currency_id.into(),
            fresh_address: fresh_address.into(),
            balance,
            spendable_balance: balance,
            resources: None,
        }
    }

    /// Install resources and recompute the spendable balance
    pub fn with_resources(mut self, resources: Resources) -> Self {
        self.resources = Some(resources);
        self.recompute_spendable();
        self
    }

    /// `balance - delegated - unbonding`, floored at zero
    pub fn recompute_spendable(&mut self) {
        self.spendable_balance = self.expected_spendable();
    }

    pub fn delegated_balance(&self) -> Decimal {
        self.resources
            .as_ref()
            .map(|r| r.delegated_balance)
            .unwrap_or_default()
    }

    pub fn unbonding_balance(&self) -> Decimal {
        self.resources
            .as_ref()
            .map(|r| r.unbonding_balance)
            .unwrap_or_default()
    }

    pub fn pending_rewards_balance(&self) -> Decimal {
        self.resources
            .as_ref()
            .map(|r| r.pending_rewards_balance)
            .unwrap_or_default()
    }

    /// Whether the spendable balance reconciles with the resources
    pub fn is_consistent(&self) -> bool {
        let resources_ok = self.resources.as_ref().map_or(true, Resources::is_consistent);
        resources_ok && self.expected_spendable() == self.spendable_balance
    }

    fn expected_spendable(&self) -> Decimal {
        let locked = self.delegated_balance().saturating_add(self.unbonding_balance());
        self.balance.saturating_sub(locked).max(Decimal::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn delegation(validator: &str, amount: Decimal, rewards: Decimal) -> Delegation {
        Delegation {
            validator_address: validator.to_string(),
            amount,
            pending_rewards: rewards,
            status: DelegationStatus::Bonded,
        }
    }

    #[test]
    fn test_chain_status_mapping() {
        assert_eq!(DelegationStatus::from_chain_status("0"), DelegationStatus::Unbonded);
        assert_eq!(DelegationStatus::from_chain_status("1"), DelegationStatus::Unbonding);
        assert_eq!(DelegationStatus::from_chain_status("2"), DelegationStatus::Bonded);
        assert_eq!(
            DelegationStatus::from_chain_status("BOND_STATUS_BONDED"),
            DelegationStatus::Bonded
        );
        assert_eq!(
            DelegationStatus::from_chain_status("BOND_STATUS_UNBONDING"),
            DelegationStatus::Unbonding
        );
        assert_eq!(DelegationStatus::from_chain_status("jailed"), DelegationStatus::Unbonded);
    }

    #[test]
    fn test_from_parts_derives_balances() {
        let completion = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let resources = Resources::from_parts(
            vec![
                delegation("val-a", dec!(1000), dec!(12.5)),
                delegation("val-b", dec!(250), dec!(0)),
            ],
            vec![Unbonding {
                validator_address: "val-a".to_string(),
                amount: dec!(40),
                completion_date: completion,
            }],
            vec![],
            "owner",
        );

        assert_eq!(resources.delegated_balance, dec!(1250));
        assert_eq!(resources.pending_rewards_balance, dec!(12.5));
        assert_eq!(resources.unbonding_balance, dec!(40));
        assert!(resources.is_consistent());
        assert!(resources.delegation("val-b").is_some());
    }

    #[test]
    fn test_spendable_balance_is_floored() {
        let resources = Resources::from_parts(
            vec![delegation("val-a", dec!(500), dec!(0))],
            vec![],
            vec![],
            "owner",
        );

        let account = Account::new("acc", "cosmos", "owner", dec!(1200)).with_resources(resources.clone());
        assert_eq!(account.spendable_balance, dec!(700));
        assert!(account.is_consistent());

        let short = Account::new("acc", "cosmos", "owner", dec!(100)).with_resources(resources);
        assert_eq!(short.spendable_balance, Decimal::ZERO);
        assert!(short.is_consistent());
    }

    #[test]
    fn test_overflowing_balances() {
        let huge = vec![
            delegation("val-a", Decimal::MAX, dec!(0)),
            delegation("val-b", dec!(1), dec!(0)),
        ];
        assert!(Resources::try_from_parts(huge.clone(), vec![], vec![], "owner").is_none());

        let saturated = Resources::from_parts(huge, vec![], vec![], "owner");
        assert_eq!(saturated.delegated_balance, Decimal::MAX);
        assert!(!saturated.is_consistent());

        let fits = Resources::try_from_parts(
            vec![delegation("val-a", dec!(10), dec!(2))],
            vec![],
            vec![],
            "owner",
        );
        assert_eq!(fits.map(|r| r.delegated_balance), Some(dec!(10)));
    }

    #[test]
    fn test_edited_balance_is_inconsistent() {
        let mut resources = Resources::from_parts(
            vec![delegation("val-a", dec!(500), dec!(1))],
            vec![],
            vec![],
            "owner",
        );
        resources.delegated_balance = dec!(499);
        assert!(!resources.is_consistent());
        assert!(resources.recompute_balances().is_consistent());
    }
}
