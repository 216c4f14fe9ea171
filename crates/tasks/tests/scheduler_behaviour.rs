use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Local};
use kindshell_core::{Action, ExecutionOutput, ExecutionResult, FailureReason};
use kindshell_executor::{ActionExecutor, FsActionExecutor};
use kindshell_tasks::{SchedulerConfig, TaskScheduler, TaskStatus};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Records every action it is asked to run; fails for targets named "bad".
#[derive(Default)]
struct RecordingExecutor {
    seen: Mutex<Vec<Action>>,
}

impl RecordingExecutor {
    fn seen(&self) -> Vec<String> {
        self.seen
            .lock()
            .iter()
            .map(|a| a.primary().to_string())
            .collect()
    }
}

#[async_trait]
impl ActionExecutor for RecordingExecutor {
    async fn execute(&self, action: &Action) -> ExecutionResult {
        self.seen.lock().push(action.clone());
        if action.primary() == "bad" {
            ExecutionResult::Failed(FailureReason::PermissionDenied)
        } else {
            ExecutionResult::Ok(ExecutionOutput::summary("done"))
        }
    }
}

/// Panics on targets named "boom", succeeds otherwise.
#[derive(Default)]
struct PanickingExecutor {
    completed: Mutex<Vec<String>>,
}

#[async_trait]
impl ActionExecutor for PanickingExecutor {
    async fn execute(&self, action: &Action) -> ExecutionResult {
        if action.primary() == "boom" {
            panic!("executor blew up");
        }
        self.completed.lock().push(action.primary().to_string());
        ExecutionResult::Ok(ExecutionOutput::summary("done"))
    }
}

fn setup(scan_interval_ms: u64) -> (Arc<TaskScheduler>, Arc<RecordingExecutor>) {
    let executor = Arc::new(RecordingExecutor::default());
    let scheduler = Arc::new(TaskScheduler::new(
        executor.clone(),
        SchedulerConfig {
            scan_interval_ms,
            history_limit: 100,
        },
    ));
    (scheduler, executor)
}

#[tokio::test]
async fn test_past_task_fires_exactly_once() {
    let (scheduler, executor) = setup(10);
    let task = scheduler.schedule(
        Action::remove("once").unwrap(),
        Local::now() - ChronoDuration::seconds(5),
    );

    for _ in 0..20 {
        scheduler.run_due(Local::now()).await;
    }

    assert_eq!(executor.seen(), vec!["once"]);
    assert_eq!(scheduler.status(task.id), Some(TaskStatus::Completed));
    assert!(scheduler.pending().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_scans_claim_once() {
    let (scheduler, executor) = setup(10);
    let past = Local::now() - ChronoDuration::seconds(1);
    for i in 0..10 {
        scheduler.schedule(Action::remove(format!("t{i}")).unwrap(), past);
    }

    let mut scans = Vec::new();
    for _ in 0..8 {
        let scheduler = Arc::clone(&scheduler);
        scans.push(tokio::spawn(async move {
            scheduler.run_due(Local::now()).await.len()
        }));
    }

    let mut fired = 0;
    for scan in scans {
        fired += scan.await.unwrap();
    }

    assert_eq!(fired, 10);
    let mut seen = executor.seen();
    seen.sort();
    seen.dedup();
    assert_eq!(seen.len(), 10);
    assert_eq!(executor.seen().len(), 10);
}

#[tokio::test]
async fn test_cancel_before_fire_never_executes() {
    let (scheduler, executor) = setup(10);
    let task = scheduler.schedule(
        Action::remove("keep").unwrap(),
        Local::now() + ChronoDuration::milliseconds(200),
    );

    let cancelled = scheduler.cancel(task.id).unwrap();
    assert_eq!(cancelled.status, TaskStatus::Cancelled);

    scheduler.run_due(Local::now() + ChronoDuration::seconds(1)).await;
    assert!(executor.seen().is_empty());
    assert_eq!(scheduler.status(task.id), Some(TaskStatus::Cancelled));
}

#[tokio::test]
async fn test_cancel_after_fire_fails_harmlessly() {
    let (scheduler, executor) = setup(10);
    let task = scheduler.schedule(Action::remove("gone").unwrap(), Local::now());
    scheduler
        .run_due(Local::now() + ChronoDuration::seconds(1))
        .await;

    assert!(scheduler.cancel(task.id).is_err());
    assert_eq!(executor.seen(), vec!["gone"]);
}

#[tokio::test]
async fn test_fires_in_trigger_order_not_registration_order() {
    let (scheduler, executor) = setup(10);
    let base = Local::now() - ChronoDuration::seconds(10);

    scheduler.schedule(Action::remove("second").unwrap(), base + ChronoDuration::seconds(2));
    scheduler.schedule(Action::remove("first").unwrap(), base + ChronoDuration::seconds(1));
    scheduler.schedule(Action::remove("tie_a").unwrap(), base + ChronoDuration::seconds(3));
    scheduler.schedule(Action::remove("tie_b").unwrap(), base + ChronoDuration::seconds(3));

    let finished = scheduler.run_due(Local::now()).await;
    assert_eq!(finished.len(), 4);
    assert_eq!(executor.seen(), vec!["first", "second", "tie_a", "tie_b"]);
}

#[tokio::test]
async fn test_failure_does_not_block_later_tasks() {
    let (scheduler, executor) = setup(10);
    let past = Local::now() - ChronoDuration::seconds(2);
    let bad = scheduler.schedule(Action::remove("bad").unwrap(), past);
    let good = scheduler.schedule(Action::remove("good").unwrap(), past + ChronoDuration::seconds(1));

    scheduler.run_due(Local::now()).await;

    assert_eq!(executor.seen(), vec!["bad", "good"]);
    assert_eq!(
        scheduler.status(bad.id),
        Some(TaskStatus::Failed(FailureReason::PermissionDenied))
    );
    assert_eq!(scheduler.status(good.id), Some(TaskStatus::Completed));
}

#[tokio::test]
async fn test_panicking_executor_is_isolated() {
    let executor = Arc::new(PanickingExecutor::default());
    let scheduler = TaskScheduler::new(executor.clone(), SchedulerConfig::default());
    let past = Local::now() - ChronoDuration::seconds(2);
    let boom = scheduler.schedule(Action::remove("boom").unwrap(), past);
    let after = scheduler.schedule(Action::remove("after").unwrap(), past + ChronoDuration::seconds(1));

    let finished = scheduler.run_due(Local::now()).await;

    assert_eq!(finished.len(), 2);
    assert_eq!(
        scheduler.status(boom.id),
        Some(TaskStatus::Failed(FailureReason::Io))
    );
    assert!(finished[0]
        .summary
        .as_deref()
        .unwrap_or_default()
        .starts_with("executor aborted"));
    assert_eq!(scheduler.status(after.id), Some(TaskStatus::Completed));
    assert_eq!(*executor.completed.lock(), vec!["after".to_string()]);

    let later = scheduler.schedule(Action::remove("later").unwrap(), Local::now());
    scheduler
        .run_due(Local::now() + ChronoDuration::seconds(1))
        .await;
    assert_eq!(scheduler.status(later.id), Some(TaskStatus::Completed));
}

#[tokio::test]
async fn test_scheduled_listing_keeps_entries() {
    let temp = TempDir::new().unwrap();
    std::fs::create_dir(temp.path().join("docs")).unwrap();
    std::fs::write(temp.path().join("docs/a.txt"), "a").unwrap();
    std::fs::write(temp.path().join("docs/b.txt"), "b").unwrap();

    let scheduler = TaskScheduler::new(
        Arc::new(FsActionExecutor::with_base_dir(temp.path())),
        SchedulerConfig::default(),
    );
    scheduler.schedule(Action::list_files("docs").unwrap(), Local::now());
    let finished = scheduler
        .run_due(Local::now() + ChronoDuration::seconds(1))
        .await;

    let names: Vec<&str> = finished[0].entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["a.txt", "b.txt"]);
    assert_eq!(finished[0].summary.as_deref(), Some("Files in 'docs':"));
}

#[tokio::test]
async fn test_background_loop_fires_due_task() {
    let (scheduler, executor) = setup(10);
    let mut events = scheduler.subscribe();
    scheduler.start();
    scheduler.start();
    assert!(scheduler.is_running());

    let task = scheduler.schedule(Action::create_folder("later").unwrap(), Local::now());

    let finished = tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("task should fire")
        .unwrap();
    assert_eq!(finished.id, task.id);
    assert_eq!(finished.status, TaskStatus::Completed);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(executor.seen(), vec!["later"]);

    assert_eq!(scheduler.shutdown().await, 0);
    assert!(!scheduler.is_running());
}

#[tokio::test]
async fn test_shutdown_cancels_pending() {
    let (scheduler, executor) = setup(10);
    scheduler.start();
    let task = scheduler.schedule(
        Action::remove("tomorrow").unwrap(),
        Local::now() + ChronoDuration::days(1),
    );

    assert_eq!(scheduler.shutdown().await, 1);
    assert_eq!(scheduler.status(task.id), Some(TaskStatus::Cancelled));
    assert!(executor.seen().is_empty());
}

#[tokio::test]
async fn test_scheduled_move_against_real_files() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("file.txt"), "x").unwrap();
    std::fs::create_dir(temp.path().join("documents")).unwrap();

    let scheduler = TaskScheduler::new(
        Arc::new(FsActionExecutor::with_base_dir(temp.path())),
        SchedulerConfig::default(),
    );
    let action = kindshell_core::interpret("move file.txt to documents")
        .into_action()
        .unwrap();
    let task = scheduler.schedule(action, Local::now());
    let missing = scheduler.schedule(Action::remove("nothing-here").unwrap(), Local::now());

    scheduler
        .run_due(Local::now() + ChronoDuration::seconds(1))
        .await;

    assert!(temp.path().join("documents/file.txt").exists());
    assert_eq!(scheduler.status(task.id), Some(TaskStatus::Completed));
    assert_eq!(
        scheduler.status(missing.id),
        Some(TaskStatus::Failed(FailureReason::NotFound))
    );
}
