//! Memoized single-flight fee estimation

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use lru::LruCache;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use types::{Account, FeeError, FeeEstimate, StakingError, TransactionDraft};

use crate::quoter::FeeQuoter;

type QuoteOutcome = std::result::Result<Arc<FeeEstimate>, FeeError>;
type SharedQuote = Shared<BoxFuture<'static, QuoteOutcome>>;

/// A quote still being computed, tagged with the attempt that started it
struct Pending {
    generation: u64,
    quote: SharedQuote,
}

/// Resolved estimates are bounded by the LRU; in-flight quotes are never
/// evicted so late joiners always reach the running computation
struct Entries {
    resolved: LruCache<String, Arc<FeeEstimate>>,
    in_flight: HashMap<String, Pending>,
}

enum Lookup {
    Cached(Arc<FeeEstimate>),
    InFlight(u64, SharedQuote),
}

/// Canonical fingerprint of every fee-affecting field of a draft.
///
/// Fees, gas and network info are deliberately left out. Fields are
/// JSON-encoded so separators inside a memo cannot make two drafts collide.
pub fn fee_cache_key(account: &Account, draft: &TransactionDraft) -> String {
    let validators = draft
        .validators
        .iter()
        .map(|v| v.address.as_str())
        .collect::<Vec<_>>()
        .join("-");
    let amount = draft.amount.normalize().to_string();

    let fields: [&str; 9] = [
        account.id.as_str(),
        account.currency_id.as_str(),
        amount.as_str(),
        draft.recipient.as_str(),
        if draft.use_all_amount { "true" } else { "false" },
        draft.mode.as_str(),
        validators.as_str(),
        draft.memo.as_deref().unwrap_or(""),
        draft.source_validator.as_deref().unwrap_or(""),
    ];

    // an array of strings always serializes
    serde_json::to_string(&fields).unwrap_or_else(|_| fields.join("_"))
}

/// Bounded LRU cache of fee estimates.
///
/// Concurrent requests with the same fingerprint share one underlying
/// quote and receive the same `Arc`. Failed quotes are evicted so the next
/// request retries.
pub struct FeeEstimationCache {
    quoter: Arc<dyn FeeQuoter>,
    entries: Mutex<Entries>,
    next_generation: AtomicU64,
}

impl FeeEstimationCache {
    /// Create a cache holding at most `capacity` estimates
    pub fn new(quoter: Arc<dyn FeeQuoter>, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            quoter,
            entries: Mutex::new(Entries {
                resolved: LruCache::new(capacity),
                in_flight: HashMap::new(),
            }),
            next_generation: AtomicU64::new(0),
        }
    }

    pub fn quoter_name(&self) -> &str {
        self.quoter.name()
    }

    /// Estimate fees for `draft`, joining an identical in-flight request
    pub async fn estimate_fees(
        &self,
        account: &Account,
        draft: &TransactionDraft,
    ) -> QuoteOutcome {
        let key = fee_cache_key(account, draft);
        let (generation, quote) = match self.join_or_start(&key, account, draft) {
            Lookup::Cached(estimate) => return Ok(estimate),
            Lookup::InFlight(generation, quote) => (generation, quote),
        };

        let outcome = quote.await;
        if let Err(ref e) = outcome {
            warn!(key = %key, error = %e, "Fee estimation failed, evicting entry");
        }
        self.settle(&key, generation, &outcome);
        outcome
    }

    /// Like [`estimate_fees`](Self::estimate_fees) but gives up once `cancel`
    /// fires. The shared computation keeps its slot so other waiters are
    /// unaffected.
    pub async fn estimate_fees_with_cancel(
        &self,
        account: &Account,
        draft: &TransactionDraft,
        cancel: &CancellationToken,
    ) -> types::Result<Arc<FeeEstimate>> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(StakingError::Cancelled),
            outcome = self.estimate_fees(account, draft) => outcome.map_err(StakingError::from),
        }
    }

    /// Number of cached or in-flight estimates
    pub fn len(&self) -> usize {
        let entries = self.entries.lock();
        entries.resolved.len() + entries.in_flight.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every cached estimate; running quotes are forgotten, not aborted
    pub fn clear(&self) {
        let mut entries = self.entries.lock();
        entries.resolved.clear();
        entries.in_flight.clear();
    }

    fn join_or_start(&self, key: &str, account: &Account, draft: &TransactionDraft) -> Lookup {
        let mut entries = self.entries.lock();

        if let Some(estimate) = entries.resolved.get(key) {
            debug!(key = %key, "Serving cached fee estimate");
            return Lookup::Cached(Arc::clone(estimate));
        }
        if let Some(pending) = entries.in_flight.get(key) {
            debug!(key = %key, "Joining in-flight fee estimate");
            return Lookup::InFlight(pending.generation, pending.quote.clone());
        }

        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let quoter = Arc::clone(&self.quoter);
        let account = account.clone();
        let draft = draft.clone();

        let quote = async move { quoter.quote(&account, &draft).await.map(Arc::new) }
            .boxed()
            .shared();

        debug!(key = %key, quoter = %self.quoter.name(), "Starting fee estimation");
        entries.in_flight.insert(
            key.to_string(),
            Pending {
                generation,
                quote: quote.clone(),
            },
        );

        Lookup::InFlight(generation, quote)
    }

    /// Retire the attempt `generation` of `key`, caching it on success.
    /// Only the first waiter to settle moves the entry; a newer attempt
    /// under the same key is left alone.
    fn settle(&self, key: &str, generation: u64, outcome: &QuoteOutcome) {
        let mut entries = self.entries.lock();
        if entries.in_flight.get(key).map(|p| p.generation) != Some(generation) {
            return;
        }
        entries.in_flight.remove(key);
        if let Ok(estimate) = outcome {
            entries.resolved.put(key.to_string(), Arc::clone(estimate));
        }
    }
}

impl std::fmt::Debug for FeeEstimationCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeeEstimationCache")
            .field("quoter", &self.quoter.name())
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use tokio_test::{assert_err, assert_ok};
    use types::{DelegationInfo, OperationMode};

    /// Quoter counting its calls, optionally failing the first ones
    struct CountingQuoter {
        calls: AtomicUsize,
        failures: usize,
        delay: Duration,
    }

    impl CountingQuoter {
        fn new(failures: usize, delay: Duration) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                failures,
                delay,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl FeeQuoter for CountingQuoter {
        fn name(&self) -> &str {
            "counting"
        }

        async fn quote(
            &self,
            _account: &Account,
            draft: &TransactionDraft,
        ) -> std::result::Result<FeeEstimate, FeeError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            if call < self.failures {
                return Err(FeeError::Unavailable {
                    quoter: "counting".to_string(),
                });
            }
            // each computation prices differently so duplicated work shows
            Ok(FeeEstimate {
                estimated_fees: dec!(5000) + draft.amount + rust_decimal::Decimal::from(call),
                estimated_gas: Some(dec!(200000)),
            })
        }
    }

    fn account() -> Account {
        Account::new(
            "cosmos-acc-0",
            "cosmos",
            "cosmos108uy5q9jt59gwugq5yrdhkzcd9jryslmpcstk5",
            dec!(2180673),
        )
    }

    fn delegate_draft(amount: rust_decimal::Decimal) -> TransactionDraft {
        TransactionDraft {
            mode: OperationMode::Delegate,
            amount,
            validators: vec![DelegationInfo::new(
                "cosmosvaloper1grgelyng2v6v3t8z87wu3sxgt9m5s03xfytvz7",
                amount,
            )],
            ..Default::default()
        }
    }

    #[test]
    fn test_key_tracks_fee_affecting_fields() {
        let account = account();
        let draft = delegate_draft(dec!(100));
        let key = fee_cache_key(&account, &draft);

        let mut memo = draft.clone();
        memo.memo = Some("note".to_string());
        assert_ne!(fee_cache_key(&account, &memo), key);

        let mut source = draft.clone();
        source.source_validator = Some("cosmosvaloper1sd4tl9aljmmezzudugs7zlaya7pg2895ws8tfs".to_string());
        assert_ne!(fee_cache_key(&account, &source), key);

        let mut all = draft.clone();
        all.use_all_amount = true;
        assert_ne!(fee_cache_key(&account, &all), key);

        // priced fields never reach the key
        let mut priced = draft.clone();
        priced.fees = Some(dec!(1));
        priced.gas = Some(dec!(2));
        assert_eq!(fee_cache_key(&account, &priced), key);

        // same value, different scale
        let scaled = delegate_draft(dec!(100.00));
        assert_eq!(fee_cache_key(&account, &scaled), key);
    }

    #[test]
    fn test_key_separators_do_not_collide() {
        let account = account();
        let mut a = delegate_draft(dec!(1));
        a.memo = Some("a_b".to_string());
        let mut b = delegate_draft(dec!(1));
        b.memo = Some("a".to_string());
        b.source_validator = Some("b".to_string());
        assert_ne!(fee_cache_key(&account, &a), fee_cache_key(&account, &b));
    }

    #[tokio::test]
    async fn test_concurrent_requests_share_one_quote() {
        let quoter = Arc::new(CountingQuoter::new(0, Duration::from_millis(20)));
        let cache = FeeEstimationCache::new(quoter.clone(), 10);
        let account = account();
        let draft = delegate_draft(dec!(100));

        let (first, second) = tokio::join!(
            cache.estimate_fees(&account, &draft),
            cache.estimate_fees(&account, &draft)
        );

        let first = first.unwrap();
        let second = second.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(quoter.calls(), 1);
        assert_eq!(first.estimated_fees, dec!(5100));

        // resolved entries are served from the cache
        let third = cache.estimate_fees(&account, &draft).await.unwrap();
        assert!(Arc::ptr_eq(&first, &third));
        assert_eq!(quoter.calls(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let quoter = Arc::new(CountingQuoter::new(1, Duration::from_millis(1)));
        let cache = FeeEstimationCache::new(quoter.clone(), 10);
        let account = account();
        let draft = delegate_draft(dec!(100));

        assert_err!(cache.estimate_fees(&account, &draft).await);
        assert!(cache.is_empty());

        assert_ok!(cache.estimate_fees(&account, &draft).await);
        assert_eq!(quoter.calls(), 2);
    }

    #[tokio::test]
    async fn test_least_recently_used_entry_is_evicted() {
        let quoter = Arc::new(CountingQuoter::new(0, Duration::from_millis(1)));
        let cache = FeeEstimationCache::new(quoter.clone(), 1);
        let account = account();

        cache.estimate_fees(&account, &delegate_draft(dec!(1))).await.unwrap();
        cache.estimate_fees(&account, &delegate_draft(dec!(2))).await.unwrap();
        cache.estimate_fees(&account, &delegate_draft(dec!(1))).await.unwrap();

        assert_eq!(quoter.calls(), 3);
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_full_cache_keeps_in_flight_quotes_joinable() {
        let quoter = Arc::new(CountingQuoter::new(0, Duration::from_millis(30)));
        let cache = FeeEstimationCache::new(quoter.clone(), 1);
        let account = account();
        let d1 = delegate_draft(dec!(1));
        let d2 = delegate_draft(dec!(2));

        let (x, y, z) = tokio::join!(
            cache.estimate_fees(&account, &d1),
            cache.estimate_fees(&account, &d2),
            cache.estimate_fees(&account, &d1)
        );

        let x = assert_ok!(x);
        let y = assert_ok!(y);
        let z = assert_ok!(z);
        assert_eq!(quoter.calls(), 2);
        assert!(Arc::ptr_eq(&x, &z));
        assert_eq!(x.estimated_fees, dec!(5001));
        assert_eq!(y.estimated_fees, dec!(5003));

        // only one resolved estimate fits once both quotes settle
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_estimate() {
        let quoter = Arc::new(CountingQuoter::new(0, Duration::from_secs(5)));
        let cache = FeeEstimationCache::new(quoter, 10);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = cache
            .estimate_fees_with_cancel(&account(), &delegate_draft(dec!(1)), &cancel)
            .await;
        assert!(matches!(result, Err(StakingError::Cancelled)));
    }
}
