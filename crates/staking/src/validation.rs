//! Field-scoped validation of transaction drafts
//!
//! Validation never fails: every problem is reported as data in a
//! [`TransactionStatus`]. Rules run in a fixed order and the first error
//! recorded for a field wins.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::debug;
use types::{
    Account, OperationMode, StatusField, TransactionDraft, TransactionStatus,
    TransactionStatusError, TransactionStatusWarning,
};

use crate::eligibility::max_estimated_balance;
use crate::traits::AddressValidator;

/// Fees above a tenth of the amount trigger a warning
const FEE_WARNING_RATIO: Decimal = Decimal::TEN;

/// Stateless validator of drafts against an account
pub struct ValidationEngine {
    address_validator: Arc<dyn AddressValidator>,
}

impl ValidationEngine {
    pub fn new(address_validator: Arc<dyn AddressValidator>) -> Self {
        Self { address_validator }
    }

    /// Compute errors, warnings and totals for `draft`
    pub fn validate(&self, account: &Account, draft: &TransactionDraft) -> TransactionStatus {
        let mut status = TransactionStatus {
            estimated_fees: draft.fees.unwrap_or(Decimal::ZERO),
            ..Default::default()
        };

        match draft.mode {
            OperationMode::Send => self.check_recipient(account, draft, &mut status),
            OperationMode::Delegate
            | OperationMode::Undelegate
            | OperationMode::ClaimReward
            | OperationMode::ClaimRewardCompound => self.check_validators(draft, &mut status),
            OperationMode::Redelegate => {
                self.check_validators(draft, &mut status);
                self.check_source_validator(draft, &mut status);
            }
        }

        status.amount = status_amount(account, draft, status.estimated_fees);
        status.total_spent = if draft.use_all_amount {
            account.balance
        } else {
            status.amount + status.estimated_fees
        };

        if status.total_spent > account.balance {
            status.add_error(StatusField::Amount, TransactionStatusError::NotEnoughBalance);
        }

        if status.amount > Decimal::ZERO
            && status.estimated_fees * FEE_WARNING_RATIO > status.amount
        {
            status.add_warning(StatusField::FeeTooHigh, TransactionStatusWarning::FeeTooHigh);
        }

        if draft.mode.is_claim() && claim_costs_more_than_rewards(account, draft, status.estimated_fees) {
            status.add_warning(
                StatusField::ClaimReward,
                TransactionStatusWarning::ClaimRewardsFeesWarning,
            );
        }

        debug!(
            account = %account.id,
            mode = %draft.mode,
            errors = status.errors.len(),
            warnings = status.warnings.len(),
            amount = %status.amount,
            total_spent = %status.total_spent,
            "Validated transaction draft"
        );

        status
    }

    fn check_recipient(&self, account: &Account, draft: &TransactionDraft, status: &mut TransactionStatus) {
        let error = if draft.recipient.is_empty() {
            Some(TransactionStatusError::RecipientRequired)
        } else if draft.recipient == account.fresh_address {
            Some(TransactionStatusError::InvalidAddressBecauseDestinationIsAlsoSource)
        } else if !self.address_validator.is_valid_account(&draft.recipient) {
            Some(TransactionStatusError::InvalidAddress)
        } else {
            None
        };

        if let Some(error) = error {
            status.add_error(StatusField::Recipient, error);
        }
    }

    fn check_validators(&self, draft: &TransactionDraft, status: &mut TransactionStatus) {
        // validator format errors land on the recipient field
        if draft
            .validators
            .iter()
            .any(|v| !self.address_validator.is_valid_validator(&v.address))
        {
            status.add_error(StatusField::Recipient, TransactionStatusError::InvalidAddress);
        }

        if !draft.mode.is_claim() && draft.validators_total().is_zero() {
            status.add_error(StatusField::Amount, TransactionStatusError::AmountRequired);
        }
    }

    fn check_source_validator(&self, draft: &TransactionDraft, status: &mut TransactionStatus) {
        let source = draft.source_validator.as_deref().unwrap_or("");

        let error = if source.is_empty() {
            Some(TransactionStatusError::RecipientRequired)
        } else if draft.validators.iter().any(|v| v.address == source) {
            Some(TransactionStatusError::InvalidAddressBecauseDestinationIsAlsoSource)
        } else if !self.address_validator.is_valid_validator(source) {
            Some(TransactionStatusError::InvalidAddress)
        } else {
            None
        };

        if let Some(error) = error {
            status.add_error(StatusField::Redelegation, error);
        }
    }
}

impl std::fmt::Debug for ValidationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationEngine").finish_non_exhaustive()
    }
}

/// Amount the draft moves, as reported in the status
fn status_amount(account: &Account, draft: &TransactionDraft, estimated_fees: Decimal) -> Decimal {
    match draft.mode {
        OperationMode::Send if draft.use_all_amount => max_estimated_balance(account, estimated_fees),
        OperationMode::Send => draft.amount,
        OperationMode::ClaimReward => Decimal::ZERO,
        OperationMode::Delegate
        | OperationMode::Undelegate
        | OperationMode::Redelegate
        | OperationMode::ClaimRewardCompound => draft.validators_total(),
    }
}

/// Whether the fee exceeds the rewards pending on any claimed validator
fn claim_costs_more_than_rewards(
    account: &Account,
    draft: &TransactionDraft,
    estimated_fees: Decimal,
) -> bool {
    draft.validators.iter().any(|v| {
        let pending = account
            .resources
            .as_ref()
            .and_then(|r| r.delegation(&v.address))
            .map(|d| d.pending_rewards)
            .unwrap_or(Decimal::ZERO);
        estimated_fees > pending
    })
}
