//! Sync Command - aggregate an address's staking resources

use anyhow::{bail, Context, Result};
use clap::Args;
use staking::{
    format_account_specifics, AddressValidator, PreloadDataStore, ResourceAggregator,
    ResourceSource,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use types::utils::short_address;
use types::Account;

use super::emit_json;
use crate::context::AppContext;

/// Aggregate the staking resources of an address from the node
#[derive(Args)]
pub struct SyncCommand {
    /// Account address to sync
    #[arg(short, long)]
    address: String,

    /// Identifier stored in the account record
    #[arg(long, default_value = "account-0")]
    account_id: String,

    /// Also write the raw account JSON to this file
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl SyncCommand {
    pub async fn execute(self, ctx: &AppContext, cancel: &CancellationToken) -> Result<()> {
        if !ctx.address_validator.is_valid_account(&self.address) {
            bail!("{} is not a valid {} address", self.address, ctx.config.network.account_prefix);
        }

        let node = ctx.node()?;
        let balance = node
            .balance(&self.address)
            .await
            .context("Failed to fetch balance")?;

        let account = Account::new(
            self.account_id.clone(),
            ctx.config.network.currency_id.clone(),
            self.address.clone(),
            balance,
        );

        let source: Arc<dyn ResourceSource> = node.clone();
        let aggregator =
            ResourceAggregator::new(source).with_batch_size(ctx.config.drafting.batch_size);
        let account = aggregator
            .sync_account(account, cancel)
            .await
            .context("Failed to aggregate staking resources")?;

        let roster = PreloadDataStore::new();
        if let Err(e) = roster.refresh(node.as_ref(), cancel).await {
            warn!(error = %e, "Could not load the validator roster; names will be missing");
        }

        info!(
            address = %short_address(&self.address),
            spendable = %account.spendable_balance,
            "Account synced"
        );

        emit_json(&account.to_raw(), self.output.as_deref())?;

        let summary =
            format_account_specifics(&account, &roster.snapshot().validators, &ctx.formatter)?;
        eprintln!("{}", summary.trim_end());

        Ok(())
    }
}
