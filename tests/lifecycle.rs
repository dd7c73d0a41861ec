// tests/lifecycle.rs

use std::error::Error;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use depsched::{
    CancelStage, RunPhase, Scheduler, SchedulerError, TaskError, TaskState, WorkItem,
};
use depsched_test_utils::builders::{looping, EventLog};
use depsched_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn second_run_of_a_generation_is_refused() -> TestResult {
    init_tracing();
    let scheduler = Scheduler::new();
    scheduler.register("A", WorkItem::action(|| Ok(())), &[])?;

    let first = scheduler.run_tasks()?;
    assert_eq!(first.generation(), 1);
    assert_eq!(
        scheduler.run_tasks().unwrap_err(),
        SchedulerError::AlreadyRun { generation: 1 }
    );
    with_timeout(first.wait()).await?;

    assert!(matches!(
        scheduler.run_tasks(),
        Err(SchedulerError::AlreadyRun { .. })
    ));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn reset_allows_rerun_with_fresh_tasks() -> TestResult {
    init_tracing();
    let scheduler = Scheduler::new();

    for generation in 1..=3_u64 {
        assert_eq!(scheduler.generation(), generation);
        assert_eq!(scheduler.phase(), RunPhase::Idle);

        let log = EventLog::new();
        scheduler.register("C", log.task("C", Duration::from_millis(5)), &["A"])?;
        scheduler.register("A", log.task("A", Duration::from_millis(40)), &[])?;

        let report = with_timeout(scheduler.run_tasks()?.wait()).await?;
        assert_eq!(report.generation, generation);
        assert_eq!(log.events(), vec!["A:start", "A:end", "C:start", "C:end"]);
        scheduler.reset();
    }

    assert!(scheduler.task_titles().is_empty());
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn reset_cancels_the_running_generation() -> TestResult {
    init_tracing();
    let iters = Arc::new(AtomicUsize::new(0));
    let scheduler = Scheduler::new();
    let task = scheduler.register(
        "long",
        looping(Arc::clone(&iters), 100, Duration::from_millis(20), true),
        &[],
    )?;
    let run = scheduler.run_tasks()?;
    let mut rx = task.task_ref().subscribe();
    with_timeout(rx.wait_for(|s| matches!(s, TaskState::Running))).await?;

    scheduler.reset();
    assert_eq!(scheduler.phase(), RunPhase::Idle);
    assert_eq!(scheduler.generation(), 2);

    let err = with_timeout(run.wait()).await.unwrap_err();
    assert!(err.is_cancelled());
    assert!(iters.load(Ordering::SeqCst) < 100);

    // The old task title is free again.
    scheduler.register("long", WorkItem::action(|| Ok(())), &[])?;
    Ok(())
}

#[tokio::test]
async fn reset_before_run_cancels_registered_handles() -> TestResult {
    init_tracing();
    let scheduler = Scheduler::new();
    let handle = scheduler.register("A", WorkItem::action(|| Ok(1_i32)), &[])?;

    scheduler.reset();
    match with_timeout(handle.wait()).await {
        Err(TaskError::Cancelled { task, stage }) => {
            assert_eq!(task, "A");
            assert_eq!(stage, CancelStage::BeforeStart);
        }
        other => panic!("expected cancellation, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn dropping_an_unrun_scheduler_releases_handles() -> TestResult {
    init_tracing();
    let scheduler = Scheduler::new();
    let handle = scheduler.register("A", WorkItem::action(|| Ok(())), &[])?;
    let signal = scheduler.signal();

    drop(scheduler);
    assert!(signal.is_cancelled());
    assert!(with_timeout(handle.wait_done()).await.is_err());
    Ok(())
}

#[tokio::test]
async fn dispose_cancels_in_flight_work() -> TestResult {
    init_tracing();
    let scheduler = Scheduler::new();
    scheduler.register(
        "wait",
        WorkItem::from_async(|ctx| async move {
            ctx.cancelled().await;
            ctx.check_cancelled()?;
            Ok::<_, anyhow::Error>(())
        }),
        &[],
    )?;
    let run = scheduler.run_tasks()?;

    scheduler.dispose();
    let err = with_timeout(run.wait()).await.unwrap_err();
    assert!(err.is_cancelled());
    Ok(())
}

#[test]
fn running_requires_a_tokio_runtime() -> TestResult {
    let scheduler = Scheduler::new();
    scheduler.register("A", WorkItem::action(|| Ok(())), &[])?;

    assert!(matches!(
        scheduler.run_tasks(),
        Err(SchedulerError::NoRuntime(_))
    ));
    // Nothing was consumed; the generation can still be run later.
    assert_eq!(scheduler.phase(), RunPhase::Idle);
    Ok(())
}
