//! Serialized store writer.
//!
//! One dedicated thread owns all writes. Units of work are applied strictly
//! in submission order; a failed unit keeps its unapplied remainder at the
//! head of the queue and is retried before anything submitted later.

use std::collections::VecDeque;
use std::sync::{mpsc, Arc, Mutex};
use std::thread::{self, JoinHandle};

use chrono::Utc;
use tokio::sync::{broadcast, oneshot};
use tracing::{debug, error, info, warn};

use crate::error::PersistenceError;
use crate::events::Event;
use crate::storage::{SessionStore, UnitOfWork, Write};

type Ack = oneshot::Sender<Result<(), PersistenceError>>;

enum WriteCommand {
    Apply { work: UnitOfWork, ack: Option<Ack> },
    Flush(oneshot::Sender<usize>),
    Shutdown,
}

/// Ack for a queued unit; resolves once it and everything before it is applied.
pub(crate) struct PendingWrite(oneshot::Receiver<Result<(), PersistenceError>>);

impl PendingWrite {
    pub(crate) async fn wait(self) -> Result<(), PersistenceError> {
        self.0.await.map_err(|_| PersistenceError::QueueClosed)?
    }
}

pub(crate) struct StoreWriter {
    sender: mpsc::Sender<WriteCommand>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl StoreWriter {
    pub(crate) fn spawn(
        store: Arc<dyn SessionStore>,
        events: broadcast::Sender<Event>,
    ) -> std::io::Result<Self> {
        let (sender, receiver) = mpsc::channel::<WriteCommand>();
        let worker = thread::Builder::new()
            .name("focusdesk-writer".into())
            .spawn(move || run(store.as_ref(), &receiver, &events))?;
        Ok(Self {
            sender,
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Queue without waiting.
    pub(crate) fn submit(&self, work: UnitOfWork) {
        if work.is_empty() {
            return;
        }
        if self.sender.send(WriteCommand::Apply { work, ack: None }).is_err() {
            error!("store writer is gone; dropping write");
        }
    }

    /// Queue with an ack. The send is synchronous, so a caller holding the
    /// tracker lock fixes its place in the queue before releasing it.
    pub(crate) fn queue(&self, work: UnitOfWork) -> Result<PendingWrite, PersistenceError> {
        let (ack, done) = oneshot::channel();
        self.sender
            .send(WriteCommand::Apply { work, ack: Some(ack) })
            .map_err(|_| PersistenceError::QueueClosed)?;
        Ok(PendingWrite(done))
    }

    /// Retry anything still pending. Returns the number of writes left.
    pub(crate) async fn flush(&self) -> Result<usize, PersistenceError> {
        let (ack, done) = oneshot::channel();
        self.sender
            .send(WriteCommand::Flush(ack))
            .map_err(|_| PersistenceError::QueueClosed)?;
        done.await.map_err(|_| PersistenceError::QueueClosed)
    }

    /// Stop the worker after one last drain attempt. Idempotent.
    pub(crate) fn shutdown(&self) {
        let mut guard = match self.worker.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(handle) = guard.take() {
            if let Err(err) = self.sender.send(WriteCommand::Shutdown) {
                error!("failed to send shutdown to store writer: {err}");
            }
            if let Err(err) = handle.join() {
                error!("failed to join store writer: {err:?}");
            }
        }
    }
}

impl Drop for StoreWriter {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run(store: &dyn SessionStore, receiver: &mpsc::Receiver<WriteCommand>, events: &broadcast::Sender<Event>) {
    let mut pending: VecDeque<UnitOfWork> = VecDeque::new();

    while let Ok(command) = receiver.recv() {
        match command {
            WriteCommand::Apply { work, ack } => {
                enqueue(&mut pending, work);
                let result = drain(store, &mut pending, events);
                if let Some(ack) = ack {
                    if ack.send(result).is_err() {
                        debug!("write caller dropped before ack");
                    }
                }
            }
            WriteCommand::Flush(ack) => {
                // The outcome is reported through the returned count.
                let _ = drain(store, &mut pending, events);
                let _ = ack.send(pending_writes(&pending));
            }
            WriteCommand::Shutdown => {
                let _ = drain(store, &mut pending, events);
                if !pending.is_empty() {
                    warn!(pending = pending_writes(&pending), "store writer stopping with unapplied writes");
                }
                break;
            }
        }
    }
    info!("store writer shutting down");
}

/// Append, folding a lone session write into a queued lone session write.
fn enqueue(pending: &mut VecDeque<UnitOfWork>, work: UnitOfWork) {
    if work.is_empty() {
        return;
    }
    if is_session_only(&work) {
        if let Some(last) = pending.back_mut() {
            if last.user_id == work.user_id && is_session_only(last) {
                *last = work;
                return;
            }
        }
    }
    pending.push_back(work);
}

fn is_session_only(work: &UnitOfWork) -> bool {
    matches!(work.writes.as_slice(), [Write::Session(_)])
}

fn drain(
    store: &dyn SessionStore,
    pending: &mut VecDeque<UnitOfWork>,
    events: &broadcast::Sender<Event>,
) -> Result<(), PersistenceError> {
    while let Some(work) = pending.pop_front() {
        if let Err((err, rest)) = work.apply(store) {
            pending.push_front(rest);
            let left = pending_writes(pending);
            warn!(error = %err, pending = left, "keeping unapplied writes for retry");
            // No subscribers is fine.
            let _ = events.send(Event::PersistenceFailed {
                message: err.to_string(),
                pending_writes: left,
                at: Utc::now(),
            });
            return Err(err);
        }
    }
    Ok(())
}

fn pending_writes(pending: &VecDeque<UnitOfWork>) -> usize {
    pending.iter().map(UnitOfWork::len).sum()
}
