//! End-to-end transfers through the public driver API.

use proptest::prelude::*;
use transfer::source::{permutation, sequential};
use transfer::{
    run_async, run_threaded, CancelToken, RuntimeKind, TransferConfig, TransferError,
    WaitStrategy,
};

fn config(capacity: usize, item_count: usize, wait: WaitStrategy) -> TransferConfig {
    TransferConfig {
        capacity,
        item_count,
        wait,
        ..Default::default()
    }
}

const STRATEGIES: [WaitStrategy; 4] = [
    WaitStrategy::Spin,
    WaitStrategy::Backoff { spin_limit: 16 },
    WaitStrategy::Sleep { micros: 1 },
    WaitStrategy::Park { slice_ms: 5 },
];

#[test]
fn reference_scenario_threaded() {
    let config = TransferConfig::default();
    let source = sequential(10_000);

    let report = run_threaded(&config, &source, &CancelToken::new()).unwrap();

    assert_eq!(report.received, source);
    assert_eq!(report.runtime, RuntimeKind::Threaded);
    assert_eq!(report.stats.capacity, 6);
    assert_eq!(report.stats.total_put, 10_000);
}

#[test]
fn random_permutation_every_strategy() {
    let source = permutation(2_000, Some(0xC0FFEE));
    for wait in STRATEGIES {
        let report = run_threaded(&config(6, source.len(), wait), &source, &CancelToken::new())
            .unwrap_or_else(|e| panic!("{:?} failed: {}", wait, e));
        assert_eq!(report.received, source, "strategy {:?}", wait);
    }
}

#[test]
fn single_slot_and_oversized_buffers() {
    let source = permutation(1_000, Some(9));

    let single =
        run_threaded(&TransferConfig::single_slot(), &source, &CancelToken::new()).unwrap();
    assert_eq!(single.received, source);

    let roomy = TransferConfig::no_backpressure(source.len());
    let report = run_threaded(&roomy, &source, &CancelToken::new()).unwrap();
    assert_eq!(report.received, source);
    assert_eq!(report.stats.rejected_puts, 0);
}

#[test]
fn empty_source_completes() {
    let empty: Vec<u64> = Vec::new();
    let report = run_threaded(&TransferConfig::default(), &empty, &CancelToken::new()).unwrap();
    assert!(report.received.is_empty());
    assert_eq!(report.stats.total_put, 0);
}

#[test]
fn zero_capacity_is_rejected() {
    let zero = config(0, 10, WaitStrategy::Spin);
    let result = run_threaded(&zero, &sequential(10), &CancelToken::new());
    assert!(matches!(result, Err(TransferError::InvalidConfig(_))));
}

#[test]
fn deadline_cancels_slow_run() {
    let mut slow = config(1, 100_000, WaitStrategy::Sleep { micros: 500 });
    slow.timeout_ms = Some(30);
    let cancel = CancelToken::new();

    let result = run_threaded(&slow, &sequential(slow.item_count), &cancel);

    match result {
        Err(TransferError::Cancelled { produced, consumed }) => {
            assert!(produced < slow.item_count);
            assert!(consumed <= produced);
        }
        other => panic!("expected cancellation, got {:?}", other.map(|r| r.received.len())),
    }
    assert!(cancel.is_cancelled());
}

#[test]
fn pre_cancelled_token_stops_both_sides() {
    let cancel = CancelToken::new();
    cancel.cancel();

    let result = run_threaded(&config(2, 50, WaitStrategy::Spin), &sequential(50), &cancel);
    assert!(matches!(
        result,
        Err(TransferError::Cancelled {
            produced: 0,
            consumed: 0
        })
    ));
}

#[test]
fn pre_cancelled_token_moves_nothing_without_backpressure() {
    // The buffer never fills or empties, so only the loop-head check can stop it
    let cancel = CancelToken::new();
    cancel.cancel();
    let roomy = TransferConfig::no_backpressure(1_000);

    let result = run_threaded(&roomy, &sequential(1_000), &cancel);
    assert!(matches!(
        result,
        Err(TransferError::Cancelled {
            produced: 0,
            consumed: 0
        })
    ));
}

#[test]
fn finished_run_leaves_shared_token_untripped() {
    let mut roomy = TransferConfig::no_backpressure(2_000);
    roomy.timeout_ms = Some(60_000);
    let cancel = CancelToken::new();

    let report = run_threaded(&roomy, &sequential(2_000), &cancel).unwrap();
    assert_eq!(report.received.len(), 2_000);
    assert!(!cancel.is_cancelled());
}

#[derive(Debug, PartialEq)]
struct Fragile(u32);

impl Clone for Fragile {
    fn clone(&self) -> Self {
        if self.0 == 13 {
            panic!("refusing to clone 13");
        }
        Fragile(self.0)
    }
}

#[test]
fn producer_panic_releases_consumer() {
    let source: Vec<Fragile> = (0..100).map(Fragile).collect();
    let cancel = CancelToken::new();

    let result = run_threaded(&config(4, source.len(), WaitStrategy::Spin), &source, &cancel);

    assert!(matches!(result, Err(TransferError::TaskFailed(ref who)) if who == "producer"));
    assert!(cancel.is_cancelled());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn reference_scenario_async() {
    let source = sequential(10_000);
    let report = run_async(&TransferConfig::default(), source.clone(), &CancelToken::new())
        .await
        .unwrap();

    assert_eq!(report.received, source);
    assert_eq!(report.runtime, RuntimeKind::Async);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn async_every_strategy() {
    let source = permutation(1_000, Some(77));
    for wait in STRATEGIES {
        let report = run_async(&config(3, source.len(), wait), source.clone(), &CancelToken::new())
            .await
            .unwrap_or_else(|e| panic!("{:?} failed: {}", wait, e));
        assert_eq!(report.received, source, "strategy {:?}", wait);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn async_deadline_cancels() {
    let mut slow = config(1, 100_000, WaitStrategy::Sleep { micros: 500 });
    slow.timeout_ms = Some(30);

    let cancel = CancelToken::new();

    let result = run_async(&slow, sequential(slow.item_count), &cancel).await;
    assert!(matches!(result, Err(TransferError::Cancelled { .. })));
    assert!(cancel.is_cancelled());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn async_pre_cancelled_token_moves_nothing() {
    let cancel = CancelToken::new();
    cancel.cancel();
    let roomy = TransferConfig::no_backpressure(1_000);

    let result = run_async(&roomy, sequential(1_000), &cancel).await;
    assert!(matches!(
        result,
        Err(TransferError::Cancelled {
            produced: 0,
            consumed: 0
        })
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn async_finished_run_leaves_shared_token_untripped() {
    let mut roomy = TransferConfig::no_backpressure(2_000);
    roomy.timeout_ms = Some(60_000);
    let cancel = CancelToken::new();

    let report = run_async(&roomy, sequential(2_000), &cancel).await.unwrap();
    assert_eq!(report.received.len(), 2_000);
    assert!(!cancel.is_cancelled());
}

#[test]
fn summary_serializes_without_payload() {
    let source = sequential(64);
    let small = config(8, 64, WaitStrategy::backoff());
    let report = run_threaded(&small, &source, &CancelToken::new()).unwrap();

    let json = serde_json::to_value(report.summary()).unwrap();
    assert_eq!(json["runtime"], "threaded");
    assert_eq!(json["wait"]["kind"], "backoff");
    assert_eq!(json["items"], 64);
    assert_eq!(json["stats"]["total_get"], 64);
    assert!(json.get("received").is_none());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// No loss, duplication or reordering for any length and capacity.
    #[test]
    fn any_length_any_capacity(capacity in 1usize..=32, len in 0usize..600, seed in any::<u64>()) {
        let source = permutation(len, Some(seed));
        let sized = config(capacity, len, WaitStrategy::backoff());
        let report = run_threaded(&sized, &source, &CancelToken::new()).unwrap();
        prop_assert_eq!(report.received, source);
    }
}
