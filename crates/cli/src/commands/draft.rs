//! Draft Command - prepare and validate a transaction

use anyhow::{bail, Context, Result};
use clap::Args;
use serde_json::{json, Map, Value};
use staking::{
    can_delegate, can_redelegate, can_undelegate, create_messages, format_transaction,
    infer_transaction, max_delegation_available, redelegation_completion_date, AmountFormatter,
    DraftOptions,
};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::info;
use types::utils::decimal_to_string;
use types::{Account, AccountRaw, OperationMode, TransactionPatch, TransactionStatus};

use super::{emit_json, OutputFormat};
use crate::context::AppContext;

/// Prepare, price and validate a transaction draft
#[derive(Args)]
pub struct DraftCommand {
    /// Raw account JSON, as written by `sync` or `simulate`
    #[arg(short, long)]
    account: PathBuf,

    /// send, delegate, undelegate, redelegate, claimReward or claimRewardCompound
    #[arg(short, long)]
    mode: Option<String>,

    /// Amount to send, in display units
    #[arg(long)]
    amount: Option<String>,

    /// Recipient of a send
    #[arg(long)]
    recipient: Option<String>,

    /// Send the whole spendable balance
    #[arg(long)]
    use_all_amount: bool,

    /// Fees in display units; replaced by the estimate when one is available
    #[arg(long)]
    fees: Option<String>,

    #[arg(long)]
    gas_limit: Option<String>,

    #[arg(long)]
    memo: Option<String>,

    /// Validator funds are redelegated from
    #[arg(long)]
    source_validator: Option<String>,

    /// Validator address; repeat for several validators
    #[arg(long = "validator", value_name = "ADDRESS")]
    validators: Vec<String>,

    /// Amount for the validator at the same position, in display units
    #[arg(long = "validator-amount", value_name = "AMOUNT")]
    validator_amounts: Vec<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Default)]
    format: OutputFormat,

    /// Also write the prepared raw draft to this file
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl DraftCommand {
    pub async fn execute(self, ctx: &AppContext, cancel: &CancellationToken) -> Result<()> {
        let account = read_account(&self.account)?;
        let drafter = ctx.drafter()?;

        let amount = self
            .amount
            .as_deref()
            .map(|raw| ctx.parse_amount(raw))
            .transpose()?;
        let draft = drafter.update_transaction(
            &drafter.create_transaction(),
            TransactionPatch {
                amount,
                recipient: self.recipient.clone(),
                use_all_amount: Some(self.use_all_amount),
                ..Default::default()
            },
        );

        let options = DraftOptions {
            mode: self.mode.clone(),
            fees: self.fees.clone(),
            gas_limit: self.gas_limit.clone(),
            memo: self.memo.clone(),
            source_validator: self.source_validator.clone(),
            validator_addresses: self.validators.clone(),
            validator_amounts: self.validator_amounts.clone(),
        };
        let draft = infer_transaction(draft, &options, |raw| ctx.parse_amount(raw))?;

        let prepared = drafter
            .prepare_transaction(&account, &draft, cancel)
            .await
            .context("Failed to prepare the draft")?;
        let status = drafter.get_transaction_status(&account, &prepared);
        let messages = create_messages(&account.fresh_address, &prepared, &ctx.config.network.denom);

        let max_spendable = if prepared.mode == OperationMode::Send {
            Some(
                drafter
                    .estimate_max_spendable(&account, Some(&prepared), cancel)
                    .await
                    .context("Failed to estimate the spendable maximum")?,
            )
        } else {
            None
        };

        info!(
            account = %account.id,
            mode = %prepared.mode,
            errors = status.errors.len(),
            warnings = status.warnings.len(),
            "Draft validated"
        );

        if let Some(path) = &self.output {
            let json = serde_json::to_string_pretty(&prepared.to_raw())?;
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }

        match self.format {
            OutputFormat::Json => {
                let messages = match &messages {
                    Ok(messages) => serde_json::to_value(messages)?,
                    Err(e) => json!({ "error": e.to_string() }),
                };
                emit_json(
                    &json!({
                        "draft": prepared.to_raw(),
                        "status": status_json(&status),
                        "messages": messages,
                        "maxSpendable": max_spendable.as_ref().map(decimal_to_string),
                    }),
                    None,
                )?;
            }
            OutputFormat::Default => {
                println!("{}", format_transaction(&prepared, &ctx.formatter).trim_end());
                match &messages {
                    Ok(messages) => println!("MESSAGES: {}", messages.len()),
                    Err(e) => println!("MESSAGES: cannot be built ({e})"),
                }
                for line in eligibility_lines(ctx, &account, &prepared)? {
                    println!("{line}");
                }
                if let Some(max) = &max_spendable {
                    println!("MAX SPENDABLE: {}", ctx.formatter.format(max));
                }
                for line in render_status(&status, &ctx.formatter) {
                    println!("{line}");
                }
            }
        }

        if status.has_errors() {
            bail!("The draft has {} error(s)", status.errors.len());
        }
        Ok(())
    }
}

fn read_account(path: &Path) -> Result<Account> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let account: AccountRaw = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a raw account", path.display()))?;
    Ok(Account::from_raw(&account)?)
}

/// What the account may still do in the draft's mode
fn eligibility_lines(
    ctx: &AppContext,
    account: &Account,
    draft: &types::TransactionDraft,
) -> Result<Vec<String>> {
    if account.resources.is_none() {
        return Ok(Vec::new());
    }

    let mut lines = Vec::new();
    match draft.mode {
        OperationMode::Delegate => {
            let available =
                max_delegation_available(account, draft.validators.len().max(1), &ctx.params);
            lines.push(format!("CAN DELEGATE: {}", yes_no(can_delegate(account, &ctx.params))));
            lines.push(format!("MAX DELEGATION: {}", ctx.formatter.format(&available)));
        }
        OperationMode::Undelegate => {
            lines.push(format!(
                "CAN UNDELEGATE: {}",
                yes_no(can_undelegate(account, &ctx.params)?)
            ));
        }
        OperationMode::Redelegate => {
            let source = draft
                .source_validator
                .as_deref()
                .and_then(|address| account.resources.as_ref()?.delegation(address));
            if let Some(delegation) = source {
                lines.push(format!(
                    "CAN REDELEGATE: {}",
                    yes_no(can_redelegate(account, delegation, &ctx.params)?)
                ));
            }
            for v in &draft.validators {
                if let Some(date) = redelegation_completion_date(account, &v.address) {
                    lines.push(format!("PENDING REDELEGATION TO {} UNTIL {}", v.address, date.to_rfc3339()));
                }
            }
        }
        _ => {}
    }
    Ok(lines)
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

fn render_status(status: &TransactionStatus, formatter: &dyn AmountFormatter) -> Vec<String> {
    let mut lines = vec![
        format!("TOTAL SPENT: {}", formatter.format(&status.total_spent)),
        format!("ESTIMATED FEES: {}", formatter.format(&status.estimated_fees)),
    ];
    lines.extend(
        status
            .errors
            .iter()
            .map(|(field, error)| format!("ERROR {field}: {error}")),
    );
    lines.extend(
        status
            .warnings
            .iter()
            .map(|(field, warning)| format!("WARNING {field}: {warning}")),
    );
    lines
}

fn status_json(status: &TransactionStatus) -> Value {
    let errors: Map<String, Value> = status
        .errors
        .iter()
        .map(|(field, error)| (field.to_string(), Value::String(format!("{error:?}"))))
        .collect();
    let warnings: Map<String, Value> = status
        .warnings
        .iter()
        .map(|(field, warning)| (field.to_string(), Value::String(format!("{warning:?}"))))
        .collect();

    json!({
        "errors": errors,
        "warnings": warnings,
        "amount": decimal_to_string(&status.amount),
        "totalSpent": decimal_to_string(&status.total_spent),
        "estimatedFees": decimal_to_string(&status.estimated_fees),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use staking::UnitFormatter;
    use types::{StatusField, TransactionStatusError, TransactionStatusWarning};

    fn status() -> TransactionStatus {
        let mut status = TransactionStatus {
            amount: dec!(1000000),
            total_spent: dec!(1005000),
            estimated_fees: dec!(5000),
            ..Default::default()
        };
        status.add_error(StatusField::Amount, TransactionStatusError::NotEnoughBalance);
        status.add_warning(StatusField::FeeTooHigh, TransactionStatusWarning::FeeTooHigh);
        status
    }

    #[test]
    fn test_render_status() {
        let lines = render_status(&status(), &UnitFormatter::new("ATOM", 6));
        assert_eq!(
            lines,
            vec![
                "TOTAL SPENT: 1.005 ATOM",
                "ESTIMATED FEES: 0.005 ATOM",
                "ERROR amount: not enough balance",
                "WARNING feeTooHigh: fees are high compared to the amount",
            ]
        );
    }

    #[test]
    fn test_status_json() {
        let json = status_json(&status());
        assert_eq!(json["errors"]["amount"], "NotEnoughBalance");
        assert_eq!(json["warnings"]["feeTooHigh"], "FeeTooHigh");
        assert_eq!(json["totalSpent"], "1005000");
    }
}
