//! Process-wide validator roster with change notification

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use types::{PreloadData, Result, StakingError, ValidatorItem};

use crate::traits::RosterSource;

/// Holds the current roster snapshot and broadcasts replacements.
///
/// Starts out empty so consumers can render before the first refresh lands.
/// Snapshots are replaced wholesale, never edited in place.
#[derive(Debug)]
pub struct PreloadDataStore {
    sender: watch::Sender<Arc<PreloadData>>,
}

impl PreloadDataStore {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(Arc::new(PreloadData::default()));
        Self { sender }
    }

    /// Current roster
    pub fn snapshot(&self) -> Arc<PreloadData> {
        Arc::clone(&self.sender.borrow())
    }

    /// Receiver notified on every roster replacement
    pub fn subscribe(&self) -> watch::Receiver<Arc<PreloadData>> {
        self.sender.subscribe()
    }

    /// Replace the roster. Returns `false` (and notifies nobody) when the
    /// new roster equals the current one.
    pub fn set(&self, data: PreloadData) -> bool {
        let count = data.validators.len();
        let changed = self.sender.send_if_modified(|current| {
            if **current == data {
                return false;
            }
            *current = Arc::new(data);
            true
        });

        if changed {
            info!(validators = count, "Validator roster updated");
        } else {
            debug!("Validator roster unchanged");
        }
        changed
    }

    /// Pull a fresh roster from `source` and install it.
    ///
    /// On failure the current roster is kept.
    pub async fn refresh(
        &self,
        source: &dyn RosterSource,
        cancel: &CancellationToken,
    ) -> Result<Arc<PreloadData>> {
        let fetched = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(StakingError::Cancelled),
            res = source.fetch_validators() => res,
        };

        let validators = match fetched {
            Ok(validators) => validators,
            Err(e) => {
                warn!(source = %source.name(), error = %e, "Roster refresh failed");
                return Err(e);
            }
        };

        let total = validators.len();
        let validators: Vec<ValidatorItem> = validators
            .into_iter()
            .filter(ValidatorItem::has_valid_ratios)
            .collect();
        if validators.len() < total {
            warn!(
                source = %source.name(),
                dropped = total - validators.len(),
                "Dropped validators with out-of-range ratios"
            );
        }

        self.set(PreloadData::new(validators));
        Ok(self.snapshot())
    }

    /// Restore a persisted roster.
    ///
    /// Blobs without a `validators` array are ignored.
    pub fn hydrate(&self, value: &Value) -> bool {
        if !value.get("validators").is_some_and(Value::is_array) {
            debug!("Ignoring persisted roster without a validators array");
            return false;
        }
        self.set(safe_parse(value))
    }

    pub fn find_validator(&self, validator_address: &str) -> Option<ValidatorItem> {
        self.sender
            .borrow()
            .validators
            .iter()
            .find(|v| v.validator_address == validator_address)
            .cloned()
    }
}

impl Default for PreloadDataStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode an untrusted roster blob. Never fails.
///
/// Anything but an object with a `validators` array yields an empty roster;
/// individual entries that do not decode, or carry ratios outside `[0, 1]`,
/// are dropped.
pub fn safe_parse(value: &Value) -> PreloadData {
    let Some(items) = value.get("validators").and_then(Value::as_array) else {
        return PreloadData::default();
    };

    let validators = items
        .iter()
        .filter_map(|item| serde_json::from_value::<ValidatorItem>(item.clone()).ok())
        .filter(ValidatorItem::has_valid_ratios)
        .collect();

    PreloadData::new(validators)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{validator, ScriptedRoster};
    use serde_json::json;

    const VAL_A: &str = "cosmosvaloper1grgelyng2v6v3t8z87wu3sxgt9m5s03xfytvz7";
    const VAL_B: &str = "cosmosvaloper1sd4tl9aljmmezzudugs7zlaya7pg2895ws8tfs";

    #[test]
    fn test_starts_empty() {
        let store = PreloadDataStore::new();
        assert!(store.snapshot().is_empty());
        assert!(store.find_validator(VAL_A).is_none());
    }

    #[tokio::test]
    async fn test_subscribers_see_replacements_only() {
        let store = PreloadDataStore::new();
        let mut updates = store.subscribe();

        assert!(store.set(PreloadData::new(vec![validator(VAL_A, "Alpha")])));
        updates.changed().await.unwrap();
        assert_eq!(updates.borrow_and_update().validators.len(), 1);

        assert!(!store.set(PreloadData::new(vec![validator(VAL_A, "Alpha")])));
        assert!(!updates.has_changed().unwrap());
    }

    #[tokio::test]
    async fn test_refresh_installs_roster() {
        let store = PreloadDataStore::new();
        let mut wild = validator(VAL_B, "Beta");
        wild.commission = 1.5;
        let roster = ScriptedRoster {
            validators: vec![validator(VAL_A, "Alpha"), wild],
            fail: false,
        };

        let snapshot = store.refresh(&roster, &CancellationToken::new()).await.unwrap();
        assert_eq!(snapshot.validators.len(), 1);
        assert_eq!(store.find_validator(VAL_A).map(|v| v.name), Some("Alpha".to_string()));
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_roster() {
        let store = PreloadDataStore::new();
        store.set(PreloadData::new(vec![validator(VAL_A, "Alpha")]));

        let roster = ScriptedRoster {
            validators: vec![],
            fail: true,
        };
        let result = store.refresh(&roster, &CancellationToken::new()).await;
        assert!(matches!(result, Err(StakingError::DataUnavailable { .. })));
        assert_eq!(store.snapshot().validators.len(), 1);
    }

    #[test]
    fn test_safe_parse_tolerates_garbage() {
        assert!(safe_parse(&json!(null)).is_empty());
        assert!(safe_parse(&json!("validators")).is_empty());
        assert!(safe_parse(&json!({ "validators": { "a": 1 } })).is_empty());

        let parsed = safe_parse(&json!({
            "validators": [
                {
                    "validatorAddress": VAL_A,
                    "name": "Alpha",
                    "votingPower": 0.1,
                    "commission": 0.05,
                    "estimatedYearlyRewardsRate": 0.09
                },
                { "validatorAddress": VAL_B },
                {
                    "validatorAddress": VAL_B,
                    "name": "Beta",
                    "votingPower": 2.0,
                    "commission": 0.05,
                    "estimatedYearlyRewardsRate": 0.09
                },
                42
            ]
        }));
        assert_eq!(parsed.validators.len(), 1);
        assert_eq!(parsed.validators[0].name, "Alpha");
    }

    #[test]
    fn test_hydrate_ignores_malformed_blobs() {
        let store = PreloadDataStore::new();
        store.set(PreloadData::new(vec![validator(VAL_A, "Alpha")]));

        assert!(!store.hydrate(&json!({ "other": [] })));
        assert_eq!(store.snapshot().validators.len(), 1);

        assert!(store.hydrate(&json!({ "validators": [] })));
        assert!(store.snapshot().is_empty());
    }
}
