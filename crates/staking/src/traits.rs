//! Collaborator traits consumed by the staking components

use async_trait::async_trait;
use rust_decimal::Decimal;
use types::utils::is_valid_bech32_like;
use types::{
    DelegationRecord, DelegationStatus, RedelegationRecord, Result, RewardRecord,
    UnbondingRecord, ValidatorItem,
};

/// Source of raw, validator-indexed staking records for an address
#[async_trait]
pub trait ResourceSource: Send + Sync {
    /// Name used in logs and errors
    fn name(&self) -> &str;

    /// Active delegations of `address`
    async fn delegations(&self, address: &str) -> Result<Vec<DelegationRecord>>;

    /// Pending rewards of `address`, one record per validator
    async fn rewards(&self, address: &str) -> Result<Vec<RewardRecord>>;

    /// Unbondings of `address`, grouped per validator
    async fn unbondings(&self, address: &str) -> Result<Vec<UnbondingRecord>>;

    /// Redelegations of `address`, grouped per validator pair
    async fn redelegations(&self, address: &str) -> Result<Vec<RedelegationRecord>>;

    /// Status of a validator as reported by the chain
    async fn validator_status(&self, validator_address: &str) -> Result<DelegationStatus>;
}

/// Source of the validator roster
#[async_trait]
pub trait RosterSource: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch_validators(&self) -> Result<Vec<ValidatorItem>>;
}

/// Address-format validation for the chain's address scheme
pub trait AddressValidator: Send + Sync {
    /// Whether `address` is a well-formed account address
    fn is_valid_account(&self, address: &str) -> bool;

    /// Whether `address` is a well-formed validator address
    fn is_valid_validator(&self, address: &str) -> bool;
}

/// Checks bech32-shaped addresses against fixed human-readable prefixes
#[derive(Debug, Clone)]
pub struct PrefixAddressValidator {
    account_prefix: String,
    validator_prefix: String,
}

impl PrefixAddressValidator {
    pub fn new(account_prefix: impl Into<String>, validator_prefix: impl Into<String>) -> Self {
        Self {
            account_prefix: account_prefix.into(),
            validator_prefix: validator_prefix.into(),
        }
    }
}

impl AddressValidator for PrefixAddressValidator {
    fn is_valid_account(&self, address: &str) -> bool {
        is_valid_bech32_like(address, &self.account_prefix)
    }

    fn is_valid_validator(&self, address: &str) -> bool {
        is_valid_bech32_like(address, &self.validator_prefix)
    }
}

/// Renders base-unit amounts for humans
pub trait AmountFormatter: Send + Sync {
    /// Amount with the unit code, e.g. `1.5 ATOM`
    fn format(&self, amount: &Decimal) -> String;

    /// Amount without the unit code
    fn format_plain(&self, amount: &Decimal) -> String;
}

/// Formats amounts by shifting the decimal point `magnitude` places
#[derive(Debug, Clone)]
pub struct UnitFormatter {
    code: String,
    magnitude: u32,
}

impl UnitFormatter {
    pub fn new(code: impl Into<String>, magnitude: u32) -> Self {
        Self {
            code: code.into(),
            magnitude,
        }
    }

    /// Convert base units to display units without rounding
    pub fn to_display(&self, amount: &Decimal) -> Decimal {
        let mut shifted = *amount;
        // set_scale fails past 28 digits, fall back to division
        if shifted.set_scale(amount.scale() + self.magnitude).is_err() {
            shifted = *amount / Decimal::from(10u64.pow(self.magnitude.min(19)));
        }
        shifted.normalize()
    }

    /// Convert display units to base units
    pub fn from_display(&self, amount: &Decimal) -> Decimal {
        (*amount * Decimal::from(10u64.pow(self.magnitude.min(19)))).normalize()
    }
}

impl AmountFormatter for UnitFormatter {
    fn format(&self, amount: &Decimal) -> String {
        format!("{} {}", self.to_display(amount), self.code)
    }

    fn format_plain(&self, amount: &Decimal) -> String {
        self.to_display(amount).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_prefix_validator() {
        let validator = PrefixAddressValidator::new("cosmos", "cosmosvaloper");
        assert!(validator.is_valid_account("cosmos108uy5q9jt59gwugq5yrdhkzcd9jryslmpcstk5"));
        assert!(!validator.is_valid_account("cosmosvaloper1grgelyng2v6v3t8z87wu3sxgt9m5s03xfytvz7"));
        assert!(validator.is_valid_validator("cosmosvaloper1grgelyng2v6v3t8z87wu3sxgt9m5s03xfytvz7"));
        assert!(!validator.is_valid_validator("cosmos108uy5q9jt59gwugq5yrdhkzcd9jryslmpcstk5"));
        assert!(!validator.is_valid_validator(""));
    }

    #[test]
    fn test_unit_formatter() {
        let formatter = UnitFormatter::new("ATOM", 6);
        assert_eq!(formatter.format(&dec!(2180673)), "2.180673 ATOM");
        assert_eq!(formatter.format(&dec!(1000000)), "1 ATOM");
        assert_eq!(formatter.format_plain(&dec!(5)), "0.000005");
        assert_eq!(formatter.format_plain(&dec!(0)), "0");
        assert_eq!(formatter.from_display(&dec!(1.5)), dec!(1500000));
    }
}
