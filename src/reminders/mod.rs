//! Reminder chains for projects left in the initial status.
//!
//! One scheduler task owns every pending deadline. It is driven by
//! [`ReminderCommand`]s sent through a cloneable [`ReminderHandle`]:
//! 1. `Arm` sets the task's deadline to now + delay, replacing any previous one
//! 2. `Cancel` drops the deadline, breaking the chain
//! 3. When a deadline passes the task is re-read; if it is still in the
//!    initial status the partners are reminded and the deadline is re-armed,
//!    otherwise the chain ends
//!
//! Deadlines live in memory only and are lost on restart.

mod notify;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, error, info, warn};

use crate::storage::{Database, ProjectStatus, StoreError, Task};

pub use notify::{PartnerReminder, reminder_text};

/// Reads the current state of a task when a reminder comes due.
///
/// Called on the blocking pool.
pub trait TaskLookup: Send + Sync {
    fn task(&self, task_id: i64) -> Result<Option<Task>, StoreError>;
}

impl TaskLookup for Database {
    fn task(&self, task_id: i64) -> Result<Option<Task>, StoreError> {
        self.get_task(task_id)
    }
}

/// Delivers one reminder about a task.
#[async_trait]
pub trait ReminderNotifier: Send + Sync {
    /// Delivery failures are the notifier's to log; the chain goes on.
    async fn remind(&self, task: &Task);
}

/// Messages understood by the scheduler task.
#[derive(Debug)]
pub enum ReminderCommand {
    Arm(i64),
    Cancel(i64),
    /// Asks for the pending deadline of a task.
    Pending {
        task_id: i64,
        reply: oneshot::Sender<Option<Instant>>,
    },
    Shutdown,
}

/// Cloneable sender side of the scheduler.
#[derive(Debug, Clone)]
pub struct ReminderHandle {
    tx: mpsc::Sender<ReminderCommand>,
}

impl ReminderHandle {
    /// Creates a handle and the receiver a [`ReminderScheduler`] runs on.
    #[must_use]
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<ReminderCommand>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    /// Starts (or restarts) the chain for a task.
    pub async fn arm(&self, task_id: i64) {
        self.send(ReminderCommand::Arm(task_id)).await;
    }

    /// Stops the chain for a task, if any.
    pub async fn cancel(&self, task_id: i64) {
        self.send(ReminderCommand::Cancel(task_id)).await;
    }

    /// Deadline of the pending reminder for a task.
    pub async fn pending(&self, task_id: i64) -> Option<Instant> {
        let (reply, rx) = oneshot::channel();
        self.send(ReminderCommand::Pending { task_id, reply }).await;
        rx.await.ok().flatten()
    }

    /// Stops the scheduler task.
    pub async fn shutdown(&self) {
        self.send(ReminderCommand::Shutdown).await;
    }

    async fn send(&self, command: ReminderCommand) {
        if let Err(e) = self.tx.send(command).await {
            warn!("Reminder scheduler is gone, dropped {:?}", e.0);
        }
    }
}

/// Owns the deadline table and fires reminders.
pub struct ReminderScheduler {
    lookup: Arc<dyn TaskLookup>,
    notifier: Arc<dyn ReminderNotifier>,
    delay: Duration,
}

impl ReminderScheduler {
    #[must_use]
    pub fn new(lookup: Arc<dyn TaskLookup>, notifier: Arc<dyn ReminderNotifier>, delay: Duration) -> Self {
        Self {
            lookup,
            notifier,
            delay,
        }
    }

    /// Spawns the scheduler on the runtime and returns its handle.
    #[must_use]
    pub fn spawn(self) -> (ReminderHandle, JoinHandle<()>) {
        let (handle, rx) = ReminderHandle::channel(64);
        let join = tokio::spawn(self.run(rx));
        (handle, join)
    }

    /// Runs until `Shutdown` or until every handle is dropped.
    pub async fn run(self, mut rx: mpsc::Receiver<ReminderCommand>) {
        info!("Reminder scheduler started (delay {}s)", self.delay.as_secs());
        let mut deadlines: HashMap<i64, Instant> = HashMap::new();

        loop {
            let next = deadlines.values().min().copied();

            tokio::select! {
                command = rx.recv() => {
                    match command {
                        Some(ReminderCommand::Arm(task_id)) => {
                            deadlines.insert(task_id, Instant::now() + self.delay);
                            info!("Reminder armed for task {} (+{}s)", task_id, self.delay.as_secs());
                        }
                        Some(ReminderCommand::Cancel(task_id)) => {
                            if deadlines.remove(&task_id).is_some() {
                                info!("Reminder cancelled for task {}", task_id);
                            }
                        }
                        Some(ReminderCommand::Pending { task_id, reply }) => {
                            let _ = reply.send(deadlines.get(&task_id).copied());
                        }
                        Some(ReminderCommand::Shutdown) | None => {
                            info!("Reminder scheduler shutting down ({} pending)", deadlines.len());
                            break;
                        }
                    }
                }
                () = sleep_until(next.unwrap_or_else(Instant::now)), if next.is_some() => {
                    let now = Instant::now();
                    let due: Vec<i64> = deadlines
                        .iter()
                        .filter(|(_, at)| **at <= now)
                        .map(|(id, _)| *id)
                        .collect();

                    for task_id in due {
                        deadlines.remove(&task_id);
                        if self.fire(task_id).await {
                            deadlines.insert(task_id, Instant::now() + self.delay);
                            debug!("Reminder re-armed for task {}", task_id);
                        }
                    }
                }
            }
        }
    }

    /// Re-reads the task and reminds if it is still new.
    ///
    /// Returns whether the chain continues.
    async fn fire(&self, task_id: i64) -> bool {
        let lookup = Arc::clone(&self.lookup);
        let found = tokio::task::spawn_blocking(move || lookup.task(task_id))
            .await
            .unwrap_or_else(|e| Err(e.into()));
        match found {
            Ok(Some(task)) if task.status == ProjectStatus::INITIAL => {
                self.notifier.remind(&task).await;
                true
            }
            Ok(Some(task)) => {
                info!("Reminder: task {} is now '{}', chain stops", task_id, task.status);
                false
            }
            Ok(None) => {
                warn!("Reminder: task {} not found", task_id);
                false
            }
            Err(e) => {
                error!("Reminder lookup failed for task {}: {}", task_id, e);
                false
            }
        }
    }
}
