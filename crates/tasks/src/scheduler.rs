//! Deferred execution of actions.
//!
//! Pending tasks live in one map keyed by `(trigger_at, id)`, guarded by a
//! single mutex. A scan claims every due task by removing it from that map
//! while holding the lock, so no task can be executed twice no matter how
//! scans overlap. Execution itself happens with the lock released.

use crate::trigger_time::parse_trigger_time;
use crate::{ScheduledTask, TaskError, TaskId, TaskStatus};
use chrono::{DateTime, Local};
use kindshell_core::{Action, ExecutionResult, FailureReason};
use kindshell_executor::ActionExecutor;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SchedulerConfig {
    pub scan_interval_ms: u64,
    /// Finished tasks kept for `tasks`; oldest are dropped first.
    pub history_limit: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            scan_interval_ms: 500,
            history_limit: 100,
        }
    }
}

impl SchedulerConfig {
    pub fn scan_interval(&self) -> Duration {
        Duration::from_millis(self.scan_interval_ms.max(1))
    }
}

#[derive(Default)]
struct SchedulerState {
    next_id: TaskId,
    pending: BTreeMap<(DateTime<Local>, TaskId), ScheduledTask>,
    history: VecDeque<ScheduledTask>,
}

impl SchedulerState {
    fn record(&mut self, task: ScheduledTask, limit: usize) {
        self.history.push_back(task);
        self.trim(limit);
    }

    fn trim(&mut self, limit: usize) {
        while self.history.len() > limit {
            // tasks still running stay visible
            match self.history.iter().position(|t| t.status.is_terminal()) {
                Some(index) => {
                    self.history.remove(index);
                }
                None => break,
            }
        }
    }

    fn update(&mut self, task: &ScheduledTask, limit: usize) {
        if let Some(entry) = self.history.iter_mut().find(|t| t.id == task.id) {
            *entry = task.clone();
        }
        self.trim(limit);
    }
}

struct Inner {
    state: Mutex<SchedulerState>,
    executor: Arc<dyn ActionExecutor>,
    config: SchedulerConfig,
    events: broadcast::Sender<ScheduledTask>,
}

impl Inner {
    fn claim_due(&self, now: DateTime<Local>) -> Vec<ScheduledTask> {
        let mut state = self.state.lock();

        let later = state.pending.split_off(&(now, TaskId::MAX));
        let due = std::mem::replace(&mut state.pending, later);

        let mut claimed = Vec::with_capacity(due.len());
        for (_, mut task) in due {
            task.status = TaskStatus::Fired;
            state.record(task.clone(), self.config.history_limit);
            claimed.push(task);
        }
        claimed
    }

    async fn fire(&self, mut task: ScheduledTask) -> ScheduledTask {
        tracing::info!(task_id = task.id, action = %task.action, "Firing scheduled task");

        let executor = Arc::clone(&self.executor);
        let action = task.action.clone();
        // a panicking executor must not take the trigger loop down with it
        let outcome = tokio::spawn(async move { executor.execute(&action).await }).await;

        match outcome {
            Ok(ExecutionResult::Ok(output)) => {
                task.status = TaskStatus::Completed;
                task.summary = Some(output.summary);
                task.entries = output.entries;
            }
            Ok(ExecutionResult::Failed(reason)) => {
                tracing::warn!(task_id = task.id, %reason, "Scheduled task failed");
                task.status = TaskStatus::Failed(reason);
            }
            Err(e) => {
                tracing::error!(task_id = task.id, error = %e, "Scheduled task aborted");
                task.status = TaskStatus::Failed(FailureReason::Io);
                task.summary = Some(format!("executor aborted: {}", e));
            }
        }
        task.finished_at = Some(Local::now());

        self.state.lock().update(&task, self.config.history_limit);
        let _ = self.events.send(task.clone());
        task
    }

    async fn run_due(&self, now: DateTime<Local>) -> Vec<ScheduledTask> {
        let claimed = self.claim_due(now);
        let mut finished = Vec::with_capacity(claimed.len());
        for task in claimed {
            finished.push(self.fire(task).await);
        }
        finished
    }
}

/// Holds scheduled actions and fires each one once its trigger time passes.
///
/// Create one per process, hand it around as `Arc<TaskScheduler>`, call
/// [`start`](Self::start) once and [`shutdown`](Self::shutdown) on exit.
pub struct TaskScheduler {
    inner: Arc<Inner>,
    stop: watch::Sender<bool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl TaskScheduler {
    pub fn new(executor: Arc<dyn ActionExecutor>, config: SchedulerConfig) -> Self {
        let (events, _) = broadcast::channel(64);
        let (stop, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(SchedulerState::default()),
                executor,
                config,
                events,
            }),
            stop,
            handle: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.inner.config
    }

    /// Register `action` to run at `trigger_at`. A time already in the past
    /// makes the task due on the next scan.
    pub fn schedule(&self, action: Action, trigger_at: DateTime<Local>) -> ScheduledTask {
        let mut state = self.inner.state.lock();
        state.next_id += 1;
        let task = ScheduledTask {
            id: state.next_id,
            action,
            trigger_at,
            registered_at: Local::now(),
            status: TaskStatus::Pending,
            finished_at: None,
            summary: None,
            entries: Vec::new(),
        };
        state.pending.insert((trigger_at, task.id), task.clone());
        drop(state);

        tracing::info!(task_id = task.id, action = %task.action, %trigger_at, "Scheduled task");
        task
    }

    /// Parse `time_text` and schedule; an unparseable time creates nothing.
    pub fn schedule_text(&self, action: Action, time_text: &str) -> Result<ScheduledTask, TaskError> {
        let trigger_at = parse_trigger_time(time_text, Local::now())?;
        Ok(self.schedule(action, trigger_at))
    }

    /// Pending → Cancelled. Loses harmlessly against a scan that already
    /// claimed the task.
    pub fn cancel(&self, id: TaskId) -> Result<ScheduledTask, TaskError> {
        let mut state = self.inner.state.lock();

        let key = state.pending.keys().find(|(_, task_id)| *task_id == id).copied();
        if let Some(key) = key {
            if let Some(mut task) = state.pending.remove(&key) {
                task.status = TaskStatus::Cancelled;
                task.finished_at = Some(Local::now());
                state.record(task.clone(), self.inner.config.history_limit);
                drop(state);
                tracing::info!(task_id = id, "Cancelled task");
                return Ok(task);
            }
        }

        match state.history.iter().find(|t| t.id == id) {
            Some(task) => Err(TaskError::NotPending(id, task.status)),
            // ids are handed out in order, so a known id missing from both
            // maps was trimmed out of the history
            None if id >= 1 && id <= state.next_id => Err(TaskError::Finished(id)),
            None => Err(TaskError::NotFound(id)),
        }
    }

    /// One scan: claim everything due at `now`, then execute in trigger-time
    /// order (registration order on ties). Returns the finished tasks.
    pub async fn run_due(&self, now: DateTime<Local>) -> Vec<ScheduledTask> {
        self.inner.run_due(now).await
    }

    /// Spawn the background trigger loop. Calling it again is a no-op.
    pub fn start(&self) {
        let mut handle = self.handle.lock();
        if handle.is_some() {
            return;
        }

        let inner = Arc::clone(&self.inner);
        let mut stop = self.stop.subscribe();
        let period = inner.config.scan_interval();

        *handle = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        inner.run_due(Local::now()).await;
                    }
                    changed = stop.changed() => {
                        if changed.is_err() || *stop.borrow() {
                            break;
                        }
                    }
                }
            }
            tracing::debug!("Scheduler loop stopped");
        }));
        tracing::debug!(?period, "Scheduler loop started");
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .lock()
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// Stop the trigger loop and cancel every task still pending.
    /// Returns how many tasks were cancelled.
    pub async fn shutdown(&self) -> usize {
        let _ = self.stop.send(true);
        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Scheduler loop ended abnormally");
            }
        }

        let mut state = self.inner.state.lock();
        let pending = std::mem::take(&mut state.pending);
        let count = pending.len();
        let now = Local::now();
        for (_, mut task) in pending {
            task.status = TaskStatus::Cancelled;
            task.finished_at = Some(now);
            state.record(task, self.inner.config.history_limit);
        }
        drop(state);

        if count > 0 {
            tracing::info!(count, "Cancelled pending tasks on shutdown");
        }
        count
    }

    /// Pending tasks in firing order.
    pub fn pending(&self) -> Vec<ScheduledTask> {
        self.inner.state.lock().pending.values().cloned().collect()
    }

    /// Tasks that left Pending, oldest first.
    pub fn history(&self) -> Vec<ScheduledTask> {
        self.inner.state.lock().history.iter().cloned().collect()
    }

    pub fn status(&self, id: TaskId) -> Option<TaskStatus> {
        let state = self.inner.state.lock();
        state
            .pending
            .values()
            .chain(state.history.iter())
            .find(|t| t.id == id)
            .map(|t| t.status)
    }

    /// Every task that finishes (completed or failed) is sent here.
    pub fn subscribe(&self) -> broadcast::Receiver<ScheduledTask> {
        self.inner.events.subscribe()
    }
}

impl Drop for TaskScheduler {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.lock().take() {
            handle.abort();
        }
    }
}
