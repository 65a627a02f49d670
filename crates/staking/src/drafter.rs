//! Transaction draft lifecycle: create, patch, price and bound

use std::sync::Arc;

use fees::FeeEstimationCache;
use rust_decimal::Decimal;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use types::{Account, OperationMode, Result, TransactionDraft, TransactionPatch, TransactionStatus};

use crate::eligibility::max_estimated_balance;
use crate::traits::AddressValidator;
use crate::validation::ValidationEngine;

/// Memo attached to staking transactions that have none
pub const DEFAULT_MEMO: &str = "stake-drafter";

/// Builds and prices transaction drafts for one chain.
///
/// Every operation takes a draft by reference and returns a new one.
pub struct TransactionDrafter {
    fee_cache: Arc<FeeEstimationCache>,
    address_validator: Arc<dyn AddressValidator>,
    validation: ValidationEngine,
    default_memo: String,
    placeholder_recipient: String,
}

impl TransactionDrafter {
    pub fn new(
        fee_cache: Arc<FeeEstimationCache>,
        address_validator: Arc<dyn AddressValidator>,
        placeholder_recipient: impl Into<String>,
    ) -> Self {
        Self {
            fee_cache,
            validation: ValidationEngine::new(Arc::clone(&address_validator)),
            address_validator,
            default_memo: DEFAULT_MEMO.to_string(),
            placeholder_recipient: placeholder_recipient.into(),
        }
    }

    pub fn with_default_memo(mut self, memo: impl Into<String>) -> Self {
        self.default_memo = memo.into();
        self
    }

    /// A blank send draft
    pub fn create_transaction(&self) -> TransactionDraft {
        TransactionDraft::default()
    }

    /// Apply `patch` to `draft`.
    ///
    /// Fees and gas are cleared when the mode actually changes or when the
    /// number of validators changes, since both are priced per message.
    pub fn update_transaction(&self, draft: &TransactionDraft, patch: TransactionPatch) -> TransactionDraft {
        let mode_changed = patch.mode.is_some_and(|mode| mode != draft.mode);
        let count_changed = patch
            .validators
            .as_ref()
            .is_some_and(|validators| validators.len() != draft.validators.len());

        let mut next = draft.apply(patch);
        if mode_changed || count_changed {
            next.fees = None;
            next.gas = None;
        }
        next
    }

    /// Price `draft` and fill in its default memo.
    ///
    /// Returns an identical draft when neither memo nor fees changed.
    pub async fn prepare_transaction(
        &self,
        account: &Account,
        draft: &TransactionDraft,
        cancel: &CancellationToken,
    ) -> Result<TransactionDraft> {
        let mut fees = draft.fees;
        let mut gas = draft.gas;

        if (!draft.recipient.is_empty() || draft.mode != OperationMode::Send)
            && self.is_valid_for_estimation(draft)
        {
            let max_amount = draft
                .use_all_amount
                .then(|| max_estimated_balance(account, Decimal::ZERO));

            if max_amount.map_or(true, |amount| amount > Decimal::ZERO) {
                let priced = TransactionDraft {
                    amount: max_amount.unwrap_or(draft.amount),
                    ..draft.clone()
                };
                let estimate = self
                    .fee_cache
                    .estimate_fees_with_cancel(account, &priced, cancel)
                    .await?;
                fees = Some(estimate.estimated_fees);
                gas = estimate.estimated_gas;
            }
        } else {
            debug!(account = %account.id, mode = %draft.mode, "Draft not ready for fee estimation");
        }

        let memo = match draft.memo.as_deref() {
            None | Some("") if draft.mode != OperationMode::Send => Some(self.default_memo.clone()),
            _ => draft.memo.clone(),
        };

        if memo == draft.memo && fees == draft.fees {
            return Ok(draft.clone());
        }

        info!(
            account = %account.id,
            mode = %draft.mode,
            fees = ?fees,
            gas = ?gas,
            "Prepared transaction draft"
        );

        Ok(TransactionDraft {
            memo,
            fees,
            gas,
            ..draft.clone()
        })
    }

    /// Validate `draft` against `account`
    pub fn get_transaction_status(&self, account: &Account, draft: &TransactionDraft) -> TransactionStatus {
        self.validation.validate(account, draft)
    }

    /// Largest amount `account` could move once fees are paid.
    ///
    /// Prices a "use all amount" version of `draft` (or of a blank draft),
    /// sending to the placeholder recipient when none is set.
    pub async fn estimate_max_spendable(
        &self,
        account: &Account,
        draft: Option<&TransactionDraft>,
        cancel: &CancellationToken,
    ) -> Result<Decimal> {
        let base = draft.cloned().unwrap_or_else(|| self.create_transaction());
        let recipient = if base.recipient.is_empty() {
            self.placeholder_recipient.clone()
        } else {
            base.recipient.clone()
        };

        let synthetic = TransactionDraft {
            recipient,
            use_all_amount: true,
            ..base
        };

        let prepared = self.prepare_transaction(account, &synthetic, cancel).await?;
        let estimated_fees = prepared.fees.unwrap_or(Decimal::ZERO);

        Ok(max_estimated_balance(account, estimated_fees))
    }

    /// Shape checks a draft must pass before it is worth pricing
    fn is_valid_for_estimation(&self, draft: &TransactionDraft) -> bool {
        if draft.mode == OperationMode::Send
            && (draft.amount > Decimal::ZERO || draft.use_all_amount)
        {
            return !draft.recipient.is_empty()
                && self.address_validator.is_valid_account(&draft.recipient);
        }

        draft
            .validators
            .iter()
            .all(|v| self.address_validator.is_valid_validator(&v.address))
            && (draft.mode.is_claim() || !draft.validators_total().is_zero())
    }
}

impl std::fmt::Debug for TransactionDrafter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionDrafter")
            .field("fee_cache", &self.fee_cache)
            .field("default_memo", &self.default_memo)
            .finish_non_exhaustive()
    }
}
