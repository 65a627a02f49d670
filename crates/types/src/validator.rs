//! Validator roster types

use serde::{Deserialize, Serialize};

/// A validator as listed in the roster.
///
/// Ratios are fractions in `[0, 1]`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ValidatorItem {
    pub validator_address: String,
    pub name: String,
    pub voting_power: f64,
    pub commission: f64,
    pub estimated_yearly_rewards_rate: f64,
}

impl ValidatorItem {
    /// Whether every ratio lies within `[0, 1]`
    pub fn has_valid_ratios(&self) -> bool {
        [
            self.voting_power,
            self.commission,
            self.estimated_yearly_rewards_rate,
        ]
        .iter()
        .all(|r| (0.0..=1.0).contains(r))
    }
}

/// Data refreshed once per preload cycle
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PreloadData {
    pub validators: Vec<ValidatorItem>,
}

impl PreloadData {
    pub fn new(validators: Vec<ValidatorItem>) -> Self {
        Self { validators }
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratio_bounds() {
        let mut item = ValidatorItem {
            validator_address: "val".to_string(),
            name: "Validator".to_string(),
            voting_power: 0.02,
            commission: 0.1,
            estimated_yearly_rewards_rate: 0.09,
        };
        assert!(item.has_valid_ratios());

        item.commission = 1.5;
        assert!(!item.has_valid_ratios());

        item.commission = f64::NAN;
        assert!(!item.has_valid_ratios());
    }
}
