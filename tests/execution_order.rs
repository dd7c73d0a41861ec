// tests/execution_order.rs

use std::error::Error;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use depsched::exec::{Executor, Job, JobOutcome, TokioExecutor};
use depsched::work::BoxFuture;
use depsched::{
    CancelSignal, RunOutcome, RunPhase, Scheduler, SchedulerOptions, TaskError, TaskState,
    WorkItem,
};
use depsched_test_utils::builders::EventLog;
use depsched_test_utils::fake_executor::RecordingExecutor;
use depsched_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn dependent_starts_after_dependency_finishes() -> TestResult {
    init_tracing();
    let log = EventLog::new();
    let scheduler = Scheduler::new();
    scheduler.register("A", log.task("A", Duration::from_millis(200)), &[])?;
    scheduler.register("C", log.task("C", Duration::from_millis(100)), &["A"])?;

    let started = Instant::now();
    let report = with_timeout(scheduler.run_tasks()?.wait()).await?;

    assert!(started.elapsed() >= Duration::from_millis(300));
    assert!(report.elapsed >= Duration::from_millis(300));
    assert_eq!(report.order, vec!["A".to_string(), "C".to_string()]);
    assert_eq!(log.events(), vec!["A:start", "A:end", "C:start", "C:end"]);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn diamond_joins_after_both_branches() -> TestResult {
    init_tracing();
    let log = EventLog::new();
    let scheduler = Scheduler::new();
    scheduler.register("root", log.task("root", Duration::from_millis(20)), &[])?;
    scheduler.register("left", log.task("left", Duration::from_millis(80)), &["root"])?;
    scheduler.register("right", log.task("right", Duration::from_millis(10)), &["root"])?;
    scheduler.register("join", log.task("join", Duration::ZERO), &["left", "right"])?;

    with_timeout(scheduler.run_tasks()?.wait()).await?;

    let pos = |e: &str| log.position(e).unwrap();
    assert!(pos("root:end") < pos("left:start"));
    assert!(pos("root:end") < pos("right:start"));
    assert!(pos("left:end") < pos("join:start"));
    assert!(pos("right:end") < pos("join:start"));
    // Independent branches overlap.
    assert!(pos("right:end") < pos("left:end"));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn independent_tasks_run_concurrently() -> TestResult {
    init_tracing();
    let log = EventLog::new();
    let scheduler = Scheduler::new();
    for name in ["A", "B", "C", "D"] {
        scheduler.register(name, log.task(name, Duration::from_millis(150)), &[])?;
    }

    let started = Instant::now();
    with_timeout(scheduler.run_tasks()?.wait()).await?;
    assert!(started.elapsed() < Duration::from_millis(550));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn bounded_concurrency_runs_one_at_a_time() -> TestResult {
    init_tracing();
    let active = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let scheduler = Scheduler::with_options(SchedulerOptions::new().max_concurrency(1));

    for name in ["A", "B", "C"] {
        let active = Arc::clone(&active);
        let peak = Arc::clone(&peak);
        scheduler.register(
            name,
            WorkItem::action(move || {
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(40));
                active.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            }),
            &[],
        )?;
    }

    with_timeout(scheduler.run_tasks()?.wait()).await?;
    assert_eq!(peak.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn typed_results_flow_through_handles() -> TestResult {
    init_tracing();
    let scheduler = Scheduler::new();
    let number = scheduler.register("number", WorkItem::action(|| Ok(21_u64)), &[])?;
    let greeting = scheduler.register(
        "greeting",
        WorkItem::from_async(|ctx| async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            Ok::<_, anyhow::Error>(format!("hello from {}", ctx.title()))
        }),
        &["number"],
    )?;

    with_timeout(scheduler.run_tasks()?.wait()).await?;

    assert_eq!(number.wait().await?, 21);
    assert_eq!(greeting.wait().await?, "hello from greeting");

    let looked_up = scheduler
        .try_get_task_handle::<u64>("number")
        .expect("typed handle");
    assert_eq!(looked_up.take(), Some(21));
    // Shared storage: the value is gone for every clone.
    assert!(number.take().is_none());
    assert!(number.wait().await.is_err());
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn failure_propagates_to_dependents_only() -> TestResult {
    init_tracing();
    let log = EventLog::new();
    let scheduler = Scheduler::new();
    scheduler.register("A", log.failing("A"), &[])?;
    let b = scheduler.register("B", log.task("B", Duration::ZERO), &["A"])?;
    let d = scheduler.register("D", log.task("D", Duration::ZERO), &["B"])?;
    let c = scheduler.register("C", log.task("C", Duration::from_millis(20)), &[])?;

    let err = with_timeout(scheduler.run_tasks()?.wait()).await.unwrap_err();
    assert!(!err.is_cancelled());
    assert_eq!(err.failures().len(), 3);

    match err.failure_of("A") {
        Some(TaskError::Failed { error, .. }) => {
            assert!(error.to_string().contains("A exploded"))
        }
        other => panic!("unexpected fault for A: {other:?}"),
    }
    match err.failure_of("B") {
        Some(TaskError::DependencyFailed { dependency, cause, .. }) => {
            assert_eq!(dependency, "A");
            assert!(matches!(**cause, TaskError::Failed { .. }));
        }
        other => panic!("unexpected fault for B: {other:?}"),
    }
    let d_err = err.failure_of("D").expect("D failed");
    assert_eq!(d_err.root_cause().task(), "A");

    assert!(!log.contains("B:start"));
    assert!(!log.contains("D:start"));
    assert!(log.contains("C:end"));
    assert!(c.state().is_success());
    assert!(matches!(b.state(), TaskState::Failed(_)));
    assert!(d.wait_done().await.is_err());
    assert_eq!(scheduler.phase(), RunPhase::Terminal(RunOutcome::Failed));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn panicking_body_is_reported() -> TestResult {
    init_tracing();
    let scheduler = Scheduler::new();
    scheduler.register(
        "boom",
        WorkItem::action(|| -> anyhow::Result<()> { panic!("kaboom") }),
        &[],
    )?;
    let after = scheduler.register("after", WorkItem::action(|| Ok(())), &["boom"])?;

    let err = with_timeout(scheduler.run_tasks()?.wait()).await.unwrap_err();
    match err.failure_of("boom") {
        Some(TaskError::Panicked { message, .. }) => assert!(message.contains("kaboom")),
        other => panic!("expected panic, got {other:?}"),
    }
    assert!(matches!(
        after.wait_done().await,
        Err(TaskError::DependencyFailed { .. })
    ));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn executor_sees_jobs_in_dependency_order() -> TestResult {
    init_tracing();
    let executor = RecordingExecutor::new();
    let scheduler = Scheduler::with_executor(SchedulerOptions::default(), executor.clone());
    scheduler.register("c", WorkItem::action(|| Ok(())), &["b"])?;
    scheduler.register("b", WorkItem::action(|| Ok(())), &["a"])?;
    scheduler.register("a", WorkItem::action(|| Ok(())), &[])?;

    with_timeout(scheduler.run_tasks()?.wait()).await?;
    assert_eq!(executor.submitted(), vec!["a", "b", "c"]);
    Ok(())
}

#[tokio::test]
async fn task_states_progress_to_succeeded() -> TestResult {
    init_tracing();
    let scheduler = Scheduler::new();
    let gate = Arc::new(tokio::sync::Notify::new());
    let opened = Arc::clone(&gate);
    let first = scheduler.register(
        "first",
        WorkItem::from_async(move |_ctx| async move {
            opened.notified().await;
            Ok::<_, anyhow::Error>(())
        }),
        &[],
    )?;
    let second = scheduler.register("second", WorkItem::action(|| Ok(())), &["first"])?;

    let mut first_rx = first.task_ref().subscribe();
    let mut second_rx = second.task_ref().subscribe();
    let run = scheduler.run_tasks()?;

    with_timeout(first_rx.wait_for(|s| matches!(s, TaskState::Running))).await?;
    with_timeout(second_rx.wait_for(|s| matches!(s, TaskState::Waiting))).await?;
    assert_eq!(scheduler.phase(), RunPhase::Running);

    gate.notify_one();
    with_timeout(run.wait()).await?;
    assert!(first.state().is_success());
    assert!(second.state().is_success());
    assert_eq!(scheduler.phase(), RunPhase::Terminal(RunOutcome::Succeeded));
    Ok(())
}

/// Executor whose `submit` panics for one title and delegates otherwise.
struct PanicsOn {
    title: &'static str,
    inner: TokioExecutor,
}

impl Executor for PanicsOn {
    fn submit(&self, job: Job, signal: CancelSignal) -> BoxFuture<JobOutcome> {
        if job.title() == self.title {
            panic!("executor refused {}", self.title);
        }
        self.inner.submit(job, signal)
    }
}

#[tokio::test]
async fn executor_panic_fails_task_and_releases_dependents() -> TestResult {
    init_tracing();
    let scheduler = Scheduler::with_executor(
        SchedulerOptions::default(),
        PanicsOn {
            title: "A",
            inner: TokioExecutor::new(),
        },
    );
    let a = scheduler.register("A", WorkItem::action(|| Ok(())), &[])?;
    let b = scheduler.register("B", WorkItem::action(|| Ok(())), &["A"])?;
    let c = scheduler.register("C", WorkItem::action(|| Ok(())), &[])?;

    let run = scheduler.run_tasks()?;
    let err = tokio::time::timeout(Duration::from_secs(3), run.wait())
        .await
        .expect("run must finish after an executor panic")
        .unwrap_err();

    match err.failure_of("A") {
        Some(TaskError::Panicked { message, .. }) => {
            assert!(message.contains("executor refused A"), "{message}")
        }
        other => panic!("expected panic for A, got {other:?}"),
    }
    assert!(matches!(
        err.failure_of("B"),
        Some(TaskError::DependencyFailed { dependency, .. }) if dependency == "A"
    ));
    assert!(matches!(a.state(), TaskState::Failed(TaskError::Panicked { .. })));
    assert!(matches!(b.state(), TaskState::Failed(_)));
    assert!(c.state().is_success());
    assert_eq!(scheduler.phase(), RunPhase::Terminal(RunOutcome::Failed));
    Ok(())
}
