//! Transaction status produced by validation

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{TransactionStatusError, TransactionStatusWarning};

/// Field a status error or warning is attached to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "camelCase")]
pub enum StatusField {
    Recipient,
    Amount,
    Redelegation,
    FeeTooHigh,
    ClaimReward,
}

impl StatusField {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusField::Recipient => "recipient",
            StatusField::Amount => "amount",
            StatusField::Redelegation => "redelegation",
            StatusField::FeeTooHigh => "feeTooHigh",
            StatusField::ClaimReward => "claimReward",
        }
    }
}

impl std::fmt::Display for StatusField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors, warnings and computed totals for one draft
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TransactionStatus {
    pub errors: BTreeMap<StatusField, TransactionStatusError>,
    pub warnings: BTreeMap<StatusField, TransactionStatusWarning>,
    pub amount: Decimal,
    pub total_spent: Decimal,
    pub estimated_fees: Decimal,
}

impl TransactionStatus {
    /// Record an error unless the field already has one
    pub fn add_error(&mut self, field: StatusField, error: TransactionStatusError) {
        self.errors.entry(field).or_insert(error);
    }

    /// Record a warning unless the field already has one
    pub fn add_warning(&mut self, field: StatusField, warning: TransactionStatusWarning) {
        self.warnings.entry(field).or_insert(warning);
    }

    pub fn error(&self, field: StatusField) -> Option<TransactionStatusError> {
        self.errors.get(&field).copied()
    }

    pub fn warning(&self, field: StatusField) -> Option<TransactionStatusWarning> {
        self.warnings.get(&field).copied()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}
