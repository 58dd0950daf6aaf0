//! Timing tests for the async clock driver on tokio's paused clock.
//!
//! Store writes happen on a real thread, so virtual time may advance while
//! a command waits for its ack. Assertions compare tick counts against the
//! virtual time that actually elapsed instead of fixed numbers.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Local;
use focusdesk_core::{
    ClockDriver, ClockState, CoreError, Event, FocusTracker, MemoryStore, PersistenceError, Phase, PhaseNotifier,
    SessionStore, Task, TaskStore, TimerSettings, TrackerOptions,
};
use tokio::time::{self, Instant};

fn tracker(settings: TimerSettings) -> FocusTracker {
    let options = TrackerOptions {
        default_settings: settings,
        ..TrackerOptions::default()
    };
    FocusTracker::fresh("u1", Local::now().date_naive(), options)
}

fn driver(store: &Arc<MemoryStore>, settings: TimerSettings) -> ClockDriver {
    ClockDriver::new(tracker(settings), store.clone(), None).unwrap()
}

async fn remaining(driver: &ClockDriver) -> (ClockState, u32) {
    match driver.snapshot().await {
        Event::StateSnapshot {
            state,
            seconds_remaining,
            ..
        } => (state, seconds_remaining),
        other => panic!("unexpected snapshot {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_two_starts_leave_one_ticker() {
    let store = Arc::new(MemoryStore::new());
    let driver = driver(&store, TimerSettings::default());

    let started = Instant::now();
    driver.start().await.unwrap();
    driver.start().await.unwrap();
    assert!(driver.is_ticking().await);

    time::sleep(Duration::from_secs(10)).await;
    driver.pause().await.unwrap();
    let elapsed = started.elapsed().as_secs() as u32;

    let (state, left) = remaining(&driver).await;
    assert_eq!(state, ClockState::IdleFocus);
    let ticks = 1500 - left;
    assert!(ticks >= 9, "only {ticks} ticks in {elapsed}s");
    assert!(ticks <= elapsed + 1, "{ticks} ticks in {elapsed}s means a second ticker");
}

#[tokio::test(start_paused = true)]
async fn test_pause_stops_all_change() {
    let store = Arc::new(MemoryStore::new());
    let driver = driver(&store, TimerSettings::default());

    driver.start().await.unwrap();
    time::sleep(Duration::from_secs(3)).await;
    driver.pause().await.unwrap();
    assert!(!driver.is_ticking().await);

    let (_, paused_at) = remaining(&driver).await;
    assert!(paused_at < 1500);
    time::sleep(Duration::from_secs(30)).await;
    assert_eq!(remaining(&driver).await, (ClockState::IdleFocus, paused_at));

    driver.flush().await.unwrap();
    let stored = store.load_session("u1").unwrap().unwrap();
    assert!(!stored.is_running);
    assert_eq!(stored.seconds_remaining, paused_at);
}

#[tokio::test(start_paused = true)]
async fn test_completion_notifies_and_writes_in_order() {
    let store = Arc::new(MemoryStore::new());
    let task = Task::new("u1", "Refactor parser").unwrap();
    store.insert_task(&task).unwrap();

    let seen: Arc<Mutex<Vec<(Phase, bool)>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let notifier: Arc<dyn PhaseNotifier> = Arc::new(move |phase: Phase, credited: bool| {
        sink.lock().unwrap().push((phase, credited));
    });

    let settings = TimerSettings::new(1, 1).unwrap();
    let driver = ClockDriver::new(tracker(settings), store.clone(), Some(notifier)).unwrap();
    let mut events = driver.subscribe();

    driver.link_task(Some(task.id.clone())).await.unwrap();
    driver.start().await.unwrap();
    time::sleep(Duration::from_secs(75)).await;

    assert_eq!(*seen.lock().unwrap(), vec![(Phase::Focus, true)]);
    assert_eq!(remaining(&driver).await, (ClockState::IdleBreak, 60));
    assert!(!driver.is_ticking().await);
    assert_eq!(driver.goal().await.achieved, 1);
    assert_eq!(driver.stats().await.total_completed_phases, 1);

    assert_eq!(driver.flush().await.unwrap(), 0);
    let log = store.write_log();
    let tail: Vec<&str> = log[log.len() - 4..].iter().map(String::as_str).collect();
    let task_entry = format!("task_pomodoro:{}", task.id);
    assert_eq!(tail, vec![task_entry.as_str(), "daily_goal:u1", "stats:u1", "session:u1"]);
    assert_eq!(store.get_task(&task.id).unwrap().unwrap().pomodoros_completed, 1);

    let mut kinds = Vec::new();
    while let Ok(event) = events.try_recv() {
        kinds.push(event.kind());
    }
    assert!(kinds.contains(&"phase_completed"));
    assert!(kinds.contains(&"daily_goal_changed"));
}

#[tokio::test(start_paused = true)]
async fn test_persistence_failure_keeps_ticking() {
    let store = Arc::new(MemoryStore::new());
    let driver = driver(&store, TimerSettings::default());
    let mut events = driver.subscribe();

    store.set_fail_writes(true);
    let err = driver.start().await.unwrap_err();
    assert!(matches!(err, CoreError::Persistence(PersistenceError::Unavailable(_))));

    time::sleep(Duration::from_secs(5)).await;
    let (state, left) = remaining(&driver).await;
    assert_eq!(state, ClockState::RunningFocus);
    assert!(left < 1500);

    let mut reported = false;
    while let Ok(event) = events.try_recv() {
        if let Event::PersistenceFailed { pending_writes, .. } = event {
            assert!(pending_writes >= 1);
            reported = true;
        }
    }
    assert!(reported);

    store.set_fail_writes(false);
    assert_eq!(driver.flush().await.unwrap(), 0);
    assert!(store.load_session("u1").unwrap().unwrap().is_running);
    driver.pause().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_reset_stops_ticker_and_restores_focus() {
    let store = Arc::new(MemoryStore::new());
    let driver = driver(&store, TimerSettings::default());

    driver.start().await.unwrap();
    time::sleep(Duration::from_secs(4)).await;
    driver.reset().await.unwrap();
    assert!(!driver.is_ticking().await);

    time::sleep(Duration::from_secs(4)).await;
    assert_eq!(remaining(&driver).await, (ClockState::IdleFocus, 1500));
}

#[tokio::test(start_paused = true)]
async fn test_link_rejected_while_running() {
    let store = Arc::new(MemoryStore::new());
    let driver = driver(&store, TimerSettings::default());

    driver.start().await.unwrap();
    let err = driver.link_task(Some("t-1".into())).await.unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));
    driver.pause().await.unwrap();
    driver.link_task(Some("t-1".into())).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_pauses_and_closes_queue() {
    let store = Arc::new(MemoryStore::new());
    let driver = driver(&store, TimerSettings::default());

    driver.start().await.unwrap();
    time::sleep(Duration::from_secs(2)).await;
    driver.shutdown().await.unwrap();

    assert!(!store.load_session("u1").unwrap().unwrap().is_running);
    let err = driver.apply_settings(30, 5).await.unwrap_err();
    assert!(matches!(err, CoreError::Persistence(PersistenceError::QueueClosed)));
}
