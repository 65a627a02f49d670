//! Simulate Command - generate a synthetic fixture account

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use simulator::{
    check_resources_invariants, post_scan_account, synthetic_validators,
    ResourceTransitionSimulator,
};
use std::path::PathBuf;
use tracing::{info, warn};
use types::utils::parse_date;

use super::emit_json;
use crate::context::AppContext;

/// Generate a synthetic account with a random staking history
#[derive(Args)]
pub struct SimulateCommand {
    /// Seed of the generator; equal seeds give equal accounts
    #[arg(short, long, default_value_t = 0)]
    seed: u64,

    /// Starting balance in display units; random when omitted
    #[arg(short, long)]
    balance: Option<String>,

    /// Identifier stored in the account record
    #[arg(long, default_value = "mock-account-0")]
    account_id: String,

    /// Size of the synthetic validator roster
    #[arg(long, default_value_t = 20)]
    validators: usize,

    /// Clock of the simulation (RFC 3339); defaults to now
    #[arg(long)]
    now: Option<String>,

    /// Produce an account found empty on scan
    #[arg(long)]
    empty: bool,

    /// Also write the raw account JSON to this file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Write the synthetic operation history to this file
    #[arg(long)]
    operations: Option<PathBuf>,
}

impl SimulateCommand {
    pub fn execute(self, ctx: &AppContext) -> Result<()> {
        if self.validators == 0 {
            bail!("The simulated roster needs at least one validator");
        }

        let network = &ctx.config.network;
        let now: DateTime<Utc> = match self.now.as_deref() {
            Some(raw) => parse_date("now", raw)?,
            None => Utc::now(),
        };
        let balance = self
            .balance
            .as_deref()
            .map(|raw| ctx.parse_amount(raw))
            .transpose()?;

        let roster = synthetic_validators(self.seed, self.validators, &network.validator_prefix);
        let mut sim = ResourceTransitionSimulator::new(self.seed, roster, ctx.params.clone(), now);
        let mut mock = sim.generate_account(
            &self.account_id,
            &network.currency_id,
            &network.account_prefix,
            balance,
        );
        post_scan_account(&mut mock, self.empty);

        let report = check_resources_invariants(&mock.account, &ctx.params);
        for issue in &report.warnings {
            warn!(account = %mock.account.id, "{}", issue);
        }
        if report.has_errors() {
            bail!("Simulated account breaks invariants: {}", report.errors.join("; "));
        }

        info!(
            seed = self.seed,
            account = %mock.account.id,
            operations = mock.operations.len(),
            block_height = mock.block_height,
            "Generated synthetic account"
        );

        if let Some(path) = &self.operations {
            let json = serde_json::to_string_pretty(&mock.operations)?;
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }

        emit_json(&mock.account.to_raw(), self.output.as_deref())
    }
}
