//! CLI commands

mod draft;
mod simulate;
mod sync;
mod validators;

pub use draft::DraftCommand;
pub use simulate::SimulateCommand;
pub use sync::SyncCommand;
pub use validators::ValidatorsCommand;

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::Serialize;
use std::path::Path;

/// How command results are printed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Default,
    Json,
}

/// Pretty JSON to stdout, and to `output` when given
pub(crate) fn emit_json<T: Serialize>(value: &T, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    if let Some(path) = output {
        std::fs::write(path, &json)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }
    println!("{json}");
    Ok(())
}
