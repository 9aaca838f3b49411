//! Behavioral tests for the polling refresh controller
//!
//! Run under a paused tokio clock so interval arithmetic is exact:
//! - first cycle fires immediately on start, not after one interval
//! - failed slices keep their previous value while healthy slices advance
//! - the failure streak increments on mixed cycles and resets on clean ones
//! - three consecutive failed cycles pause polling with exactly one notice
//! - stop is idempotent and late-settling fetches never write state

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::error::TryRecvError;
use tokio::sync::Semaphore;

use wellspring_dash::client::FetchError;
use wellspring_dash::notice::NoticeBroadcaster;
use wellspring_dash::poller::{Phase, PollOperation, PollerError, RefreshController, SliceUpdate};

const INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Default)]
struct TestView {
    alpha: u64,
    beta: u64,
}

/// Test helper: controller plus its notice channel
fn setup_controller(threshold: u32) -> (RefreshController<TestView>, NoticeBroadcaster) {
    let notices = NoticeBroadcaster::new(8);
    let controller = RefreshController::new(TestView::default(), notices.clone(), threshold);
    (controller, notices)
}

/// Test helper: operation whose outcome per cycle follows `script`
/// (`Some(v)` writes `alpha = v`, `None` fails). Cycles past the end of the
/// script keep failing. `calls` counts how many times the fetch was issued.
fn scripted_alpha_op(
    script: Vec<Option<u64>>,
    calls: Arc<AtomicUsize>,
) -> PollOperation<TestView> {
    PollOperation::new("alpha", move || {
        let cycle = calls.fetch_add(1, Ordering::SeqCst);
        let step = script.get(cycle).copied().flatten();
        async move {
            match step {
                Some(value) => Ok(SliceUpdate::new(move |view: &mut TestView| {
                    view.alpha = value;
                })),
                None => Err(FetchError::Network("simulated outage".to_string())),
            }
        }
    })
}

/// Test helper: operation that always succeeds, bumping `beta` once per
/// applied cycle
fn steady_beta_op(calls: Arc<AtomicUsize>) -> PollOperation<TestView> {
    PollOperation::new("beta", move || {
        calls.fetch_add(1, Ordering::SeqCst);
        async move {
            Ok(SliceUpdate::new(|view: &mut TestView| {
                view.beta += 1;
            }))
        }
    })
}

/// Let the current cycle settle (everything in these tests is ready
/// without real time passing)
async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

/// Cross one interval boundary and let the next cycle settle
async fn next_cycle() {
    tokio::time::sleep(INTERVAL + Duration::from_millis(10)).await;
}

#[tokio::test(start_paused = true)]
async fn first_cycle_fires_immediately_on_start() {
    let (controller, _notices) = setup_controller(3);
    let calls = Arc::new(AtomicUsize::new(0));

    assert!(controller.is_loading());
    controller
        .start(INTERVAL, vec![scripted_alpha_op(vec![Some(7)], calls.clone())])
        .unwrap();

    // Simulated time barely moves; no 30 s wait for initial population
    settle().await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(controller.snapshot().await.alpha, 7);
    assert_eq!(controller.phase(), Phase::Polling);
    assert_eq!(controller.failure_streak(), 0);
    assert!(!controller.is_loading());

    controller.stop();
}

#[tokio::test(start_paused = true)]
async fn failed_first_cycle_still_clears_loading() {
    let (controller, _notices) = setup_controller(3);
    let calls = Arc::new(AtomicUsize::new(0));

    controller
        .start(INTERVAL, vec![scripted_alpha_op(vec![None], calls)])
        .unwrap();
    settle().await;

    assert!(!controller.is_loading());
    assert_eq!(controller.failure_streak(), 1);
    assert_eq!(controller.snapshot().await.alpha, 0);

    controller.stop();
}

#[tokio::test(start_paused = true)]
async fn failed_slice_retains_value_while_others_advance() {
    let (controller, _notices) = setup_controller(3);
    let alpha_calls = Arc::new(AtomicUsize::new(0));
    let beta_calls = Arc::new(AtomicUsize::new(0));

    controller
        .start(
            INTERVAL,
            vec![
                scripted_alpha_op(vec![Some(5), None, Some(9)], alpha_calls),
                steady_beta_op(beta_calls),
            ],
        )
        .unwrap();

    settle().await;
    let view = controller.snapshot().await;
    assert_eq!((view.alpha, view.beta), (5, 1));
    assert_eq!(controller.failure_streak(), 0);

    // Cycle 2: alpha fails and keeps 5, beta still applies
    next_cycle().await;
    let view = controller.snapshot().await;
    assert_eq!((view.alpha, view.beta), (5, 2));
    assert_eq!(controller.failure_streak(), 1);

    // Cycle 3: alpha recovers
    next_cycle().await;
    let view = controller.snapshot().await;
    assert_eq!((view.alpha, view.beta), (9, 3));
    assert_eq!(controller.failure_streak(), 0);

    controller.stop();
}

#[tokio::test(start_paused = true)]
async fn streak_increments_on_failure_and_resets_on_clean_cycle() {
    let (controller, _notices) = setup_controller(10);
    let calls = Arc::new(AtomicUsize::new(0));

    controller
        .start(
            INTERVAL,
            vec![scripted_alpha_op(vec![None, None, Some(1), None], calls)],
        )
        .unwrap();

    let mut observed = Vec::new();
    settle().await;
    observed.push(controller.failure_streak());
    for _ in 0..3 {
        next_cycle().await;
        observed.push(controller.failure_streak());
    }

    assert_eq!(observed, vec![1, 2, 0, 1]);
    controller.stop();
}

#[tokio::test(start_paused = true)]
async fn threshold_pauses_polling_with_exactly_one_notice() {
    let (controller, notices) = setup_controller(3);
    let mut rx = notices.subscribe();
    let calls = Arc::new(AtomicUsize::new(0));

    // Empty script: every cycle fails
    controller
        .start(INTERVAL, vec![scripted_alpha_op(vec![], calls.clone())])
        .unwrap();

    settle().await;
    assert_eq!(controller.failure_streak(), 1);
    next_cycle().await;
    assert_eq!(controller.failure_streak(), 2);
    next_cycle().await;

    assert_eq!(controller.phase(), Phase::Paused);
    assert_eq!(controller.failure_streak(), 3);
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    // A fourth scheduled tick never fires
    next_cycle().await;
    next_cycle().await;
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(controller.phase(), Phase::Paused);

    // Exactly one notice was produced
    let notice = rx.try_recv().unwrap();
    assert_eq!(notice.event, "refresh_paused");
    assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));

    // Paused is terminal: start on the same controller is rejected
    let more = Arc::new(AtomicUsize::new(0));
    assert!(matches!(
        controller.start(INTERVAL, vec![steady_beta_op(more)]),
        Err(PollerError::NotIdle)
    ));
}

#[tokio::test(start_paused = true)]
async fn recovery_before_threshold_keeps_polling() {
    let (controller, notices) = setup_controller(3);
    let mut rx = notices.subscribe();
    let calls = Arc::new(AtomicUsize::new(0));

    controller
        .start(
            INTERVAL,
            vec![scripted_alpha_op(
                vec![None, None, Some(4), None, None, Some(6)],
                calls,
            )],
        )
        .unwrap();

    settle().await;
    for _ in 0..5 {
        next_cycle().await;
    }

    // Streak hit 2 twice but never 3; polling never paused
    assert_eq!(controller.phase(), Phase::Polling);
    assert_eq!(controller.failure_streak(), 0);
    assert_eq!(controller.snapshot().await.alpha, 6);
    assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));

    controller.stop();
}

#[tokio::test(start_paused = true)]
async fn stop_is_idempotent_and_cancels_the_timer() {
    let (controller, _notices) = setup_controller(3);
    let calls = Arc::new(AtomicUsize::new(0));

    controller
        .start(INTERVAL, vec![steady_beta_op(calls.clone())])
        .unwrap();
    settle().await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    controller.stop();
    controller.stop();
    assert_eq!(controller.phase(), Phase::Idle);

    // No ticks fire after stop
    next_cycle().await;
    next_cycle().await;
    next_cycle().await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn stop_without_start_is_safe() {
    let (controller, _notices) = setup_controller(3);
    controller.stop();
    controller.stop();
    assert_eq!(controller.phase(), Phase::Idle);
}

#[tokio::test(start_paused = true)]
async fn late_settling_fetch_after_stop_writes_nothing() {
    let (controller, _notices) = setup_controller(3);
    let gate = Arc::new(Semaphore::new(0));
    let resolved = Arc::new(AtomicUsize::new(0));

    let op = {
        let gate = Arc::clone(&gate);
        let resolved = Arc::clone(&resolved);
        PollOperation::new("gated", move || {
            let gate = Arc::clone(&gate);
            let resolved = Arc::clone(&resolved);
            async move {
                let _permit = gate.acquire().await;
                resolved.fetch_add(1, Ordering::SeqCst);
                Ok(SliceUpdate::new(|view: &mut TestView| {
                    view.alpha = 99;
                }))
            }
        })
    };

    controller.start(INTERVAL, vec![op]).unwrap();
    settle().await;

    // Fetch is in flight, blocked on the gate; teardown happens first
    controller.stop();
    gate.add_permits(1);
    settle().await;

    // The request ran to completion but its result was discarded
    assert_eq!(resolved.load(Ordering::SeqCst), 1);
    assert_eq!(controller.snapshot().await.alpha, 0);
    assert_eq!(controller.phase(), Phase::Idle);
}

#[tokio::test(start_paused = true)]
async fn start_rejects_invalid_arguments() {
    let (controller, _notices) = setup_controller(3);
    let calls = Arc::new(AtomicUsize::new(0));

    assert!(matches!(
        controller.start(Duration::ZERO, vec![steady_beta_op(calls.clone())]),
        Err(PollerError::ZeroInterval)
    ));
    assert!(matches!(
        controller.start(INTERVAL, Vec::new()),
        Err(PollerError::NoOperations)
    ));

    controller
        .start(INTERVAL, vec![steady_beta_op(calls.clone())])
        .unwrap();
    assert!(matches!(
        controller.start(INTERVAL, vec![steady_beta_op(calls)]),
        Err(PollerError::NotIdle)
    ));

    controller.stop();
}
