//! Async driver for a live session.
//!
//! A [`ClockDriver`] owns one user's [`FocusTracker`], ticks it once per
//! second on a tokio interval while it runs, and hands every resulting
//! unit of work to a single store writer thread. Commands wait for their
//! own writes; ticks do not.

mod writer;

use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDate};
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, info};

use crate::error::{CoreError, PersistenceError};
use crate::events::{Event, PhaseNotifier};
use crate::stats::{DailyGoal, ProductivityStats};
use crate::storage::SessionStore;
use crate::tracker::{FocusTracker, Transition};
use writer::{PendingWrite, StoreWriter};

const EVENT_CAPACITY: usize = 64;

fn today() -> NaiveDate {
    Local::now().date_naive()
}

#[derive(Clone)]
pub struct ClockDriver {
    tracker: Arc<Mutex<FocusTracker>>,
    writer: Arc<StoreWriter>,
    events: broadcast::Sender<Event>,
    notifier: Option<Arc<dyn PhaseNotifier>>,
    ticker: Arc<Mutex<Option<JoinHandle<()>>>>,
    tick_interval: Duration,
}

impl ClockDriver {
    /// Spawn the store writer. The clock is not ticked until [`start`](Self::start).
    pub fn new(
        tracker: FocusTracker,
        store: Arc<dyn SessionStore>,
        notifier: Option<Arc<dyn PhaseNotifier>>,
    ) -> Result<Self, CoreError> {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let writer = StoreWriter::spawn(store, events.clone())?;
        Ok(Self {
            tracker: Arc::new(Mutex::new(tracker)),
            writer: Arc::new(writer),
            events,
            notifier,
            ticker: Arc::new(Mutex::new(None)),
            tick_interval: Duration::from_secs(1),
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> Event {
        self.tracker.lock().await.snapshot()
    }

    pub async fn goal(&self) -> DailyGoal {
        self.tracker.lock().await.goal().clone()
    }

    pub async fn stats(&self) -> ProductivityStats {
        self.tracker.lock().await.stats().clone()
    }

    /// Whether a ticker task is alive.
    pub async fn is_ticking(&self) -> bool {
        self.ticker
            .lock()
            .await
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start (or resume) the countdown. Calling it while running keeps the
    /// existing ticker.
    pub async fn start(&self) -> Result<(), CoreError> {
        let mut slot = self.ticker.lock().await;
        let pending = {
            let mut tracker = self.tracker.lock().await;
            let transition = tracker.start();
            if tracker.is_running() {
                let alive = slot.as_ref().is_some_and(|handle| !handle.is_finished());
                if !alive {
                    *slot = Some(self.spawn_ticker());
                }
            }
            self.dispatch(transition)?
        };
        drop(slot);
        settle(pending).await
    }

    pub async fn pause(&self) -> Result<(), CoreError> {
        let pending = self.stop_ticker_then(|tracker| tracker.pause()).await?;
        settle(pending).await
    }

    pub async fn reset(&self) -> Result<(), CoreError> {
        let pending = self.stop_ticker_then(|tracker| tracker.reset()).await?;
        settle(pending).await
    }

    /// End the current phase now, crediting it as if it had run out.
    pub async fn complete_phase(&self) -> Result<(), CoreError> {
        let pending = self
            .stop_ticker_then(|tracker| tracker.complete_phase(today()))
            .await?;
        settle(pending).await
    }

    pub async fn apply_settings(&self, focus_minutes: u32, break_minutes: u32) -> Result<(), CoreError> {
        let pending = {
            let mut tracker = self.tracker.lock().await;
            let transition = tracker.apply_settings(focus_minutes, break_minutes)?;
            self.dispatch(transition)?
        };
        settle(pending).await
    }

    pub async fn link_task(&self, task_id: Option<String>) -> Result<(), CoreError> {
        let pending = {
            let mut tracker = self.tracker.lock().await;
            let transition = tracker.link_task(task_id)?;
            self.dispatch(transition)?
        };
        settle(pending).await
    }

    pub async fn set_daily_target(&self, target: u32) -> Result<(), CoreError> {
        let pending = {
            let mut tracker = self.tracker.lock().await;
            let transition = tracker.set_daily_target(target, today())?;
            self.dispatch(transition)?
        };
        settle(pending).await
    }

    /// Retry writes left over from earlier failures. Returns how many remain.
    pub async fn flush(&self) -> Result<usize, CoreError> {
        Ok(self.writer.flush().await?)
    }

    /// Pause, persist, and stop the writer.
    pub async fn shutdown(&self) -> Result<(), CoreError> {
        let paused = self.pause().await;
        let writer = Arc::clone(&self.writer);
        tokio::task::spawn_blocking(move || writer.shutdown())
            .await
            .map_err(|err| PersistenceError::Unavailable(err.to_string()))?;
        info!("clock driver stopped");
        paused
    }

    // ── Internal ─────────────────────────────────────────────────────

    async fn stop_ticker_then<F>(&self, command: F) -> Result<Option<PendingWrite>, PersistenceError>
    where
        F: FnOnce(&mut FocusTracker) -> Transition,
    {
        let mut slot = self.ticker.lock().await;
        let mut tracker = self.tracker.lock().await;
        if let Some(handle) = slot.take() {
            handle.abort();
        }
        let transition = command(&mut *tracker);
        self.dispatch(transition)
    }

    /// Publish and queue a transition. Callers hold the tracker lock, so the
    /// writer sees units in the order the tracker produced them.
    fn dispatch(&self, transition: Transition) -> Result<Option<PendingWrite>, PersistenceError> {
        publish(&self.events, self.notifier.as_deref(), &transition);
        if transition.work.is_empty() {
            return Ok(None);
        }
        self.writer.queue(transition.work).map(Some)
    }

    fn spawn_ticker(&self) -> JoinHandle<()> {
        let tracker = Arc::clone(&self.tracker);
        let writer = Arc::clone(&self.writer);
        let events = self.events.clone();
        let notifier = self.notifier.clone();
        let period = self.tick_interval;

        tokio::spawn(async move {
            let start = time::Instant::now() + period;
            let mut interval = time::interval_at(start, period);
            loop {
                interval.tick().await;
                let mut guard = tracker.lock().await;
                if !guard.is_running() {
                    break;
                }
                let transition = guard.tick(today());
                let finished = transition.completion().is_some();
                publish(&events, notifier.as_deref(), &transition);
                writer.submit(transition.work);
                drop(guard);
                if finished {
                    debug!("phase finished; ticker exiting");
                    break;
                }
            }
        })
    }
}

async fn settle(pending: Option<PendingWrite>) -> Result<(), CoreError> {
    if let Some(pending) = pending {
        pending.wait().await?;
    }
    Ok(())
}

fn publish(events: &broadcast::Sender<Event>, notifier: Option<&dyn PhaseNotifier>, transition: &Transition) {
    for event in &transition.events {
        // Nobody listening is fine.
        let _ = events.send(event.clone());
    }
    if let (Some(notifier), Some((previous_phase, task_credited))) = (notifier, transition.completion()) {
        notifier.on_phase_completed(previous_phase, task_credited);
    }
}
