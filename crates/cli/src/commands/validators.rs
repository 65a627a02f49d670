//! Validators Command - print the validator roster

use anyhow::{bail, Context, Result};
use clap::Args;
use staking::{sorted_validators, MappedValidator, PreloadDataStore};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

use super::{emit_json, OutputFormat};
use crate::context::AppContext;

/// Print the validator roster
#[derive(Args)]
pub struct ValidatorsCommand {
    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Default)]
    format: OutputFormat,

    /// Case-insensitive filter on name and address
    #[arg(short, long)]
    search: Option<String>,

    /// Read the roster from a saved preload file instead of the node
    #[arg(long)]
    preload: Option<PathBuf>,

    /// Save the roster as a preload file
    #[arg(long)]
    save: Option<PathBuf>,
}

impl ValidatorsCommand {
    pub async fn execute(self, ctx: &AppContext, cancel: &CancellationToken) -> Result<()> {
        let store = PreloadDataStore::new();

        match &self.preload {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                let blob: serde_json::Value = serde_json::from_str(&raw)
                    .with_context(|| format!("{} is not JSON", path.display()))?;
                store.hydrate(&blob);
            }
            None => {
                let node = ctx.node()?;
                store
                    .refresh(node.as_ref(), cancel)
                    .await
                    .context("Failed to fetch the validator roster")?;
            }
        }

        let snapshot = store.snapshot();
        if snapshot.is_empty() {
            bail!("The validator roster is empty");
        }

        if let Some(path) = &self.save {
            let json = serde_json::to_string_pretty(snapshot.as_ref())?;
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }

        let search = self.search.as_deref().unwrap_or("");
        let ranked = sorted_validators(search, &snapshot.validators, &[]);

        match self.format {
            OutputFormat::Json => emit_json(&ranked, None),
            OutputFormat::Default => {
                for line in ranked.iter().map(render_validator) {
                    println!("{line}");
                }
                Ok(())
            }
        }
    }
}

fn render_validator(item: &MappedValidator) -> String {
    let v = &item.validator;
    format!(
        "{:>4}. {:<24} {}  power {:>6.2}%  commission {:>5.2}%  yearly {:>5.2}%",
        item.rank,
        v.name,
        v.validator_address,
        v.voting_power * 100.0,
        v.commission * 100.0,
        v.estimated_yearly_rewards_rate * 100.0,
    )
}
