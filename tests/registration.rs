// tests/registration.rs

use std::error::Error;

use depsched::{Scheduler, SchedulerError, TaskState, WorkItem};
use depsched_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

#[test]
fn duplicate_title_is_rejected() -> TestResult {
    let scheduler = Scheduler::new();
    scheduler.register("A", WorkItem::action(|| Ok(())), &[])?;

    let err = scheduler
        .register("A", WorkItem::action(|| Ok(())), &[])
        .unwrap_err();
    assert_eq!(err, SchedulerError::DuplicateTitle("A".to_string()));
    assert!(err.to_string().contains("already exists: A"));
    assert_eq!(scheduler.task_titles(), vec!["A".to_string()]);
    Ok(())
}

#[test]
fn blank_titles_are_rejected() {
    let scheduler = Scheduler::new();
    for title in ["", "   ", "\t\n"] {
        let err = scheduler
            .register(title, WorkItem::action(|| Ok(())), &[])
            .unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidTitle(_)), "{title:?}: {err}");
    }
    assert!(scheduler.task_titles().is_empty());
}

#[test]
fn lookup_by_title() -> TestResult {
    let scheduler = Scheduler::new();
    scheduler.register("fetch", WorkItem::action(|| Ok(7_u32)), &[])?;

    let task = scheduler.try_get_task("fetch").expect("registered task");
    assert_eq!(task.title(), "fetch");
    assert!(matches!(task.state(), TaskState::Created));

    assert!(scheduler.try_get_task("missing").is_none());
    Ok(())
}

#[test]
fn typed_lookup_requires_matching_result_type() -> TestResult {
    let scheduler = Scheduler::new();
    scheduler.register("num", WorkItem::action(|| Ok(7_u32)), &[])?;

    assert!(scheduler.try_get_task_handle::<u32>("num").is_some());
    assert!(scheduler.try_get_task_handle::<String>("num").is_none());
    assert!(scheduler.try_get_task_handle::<u32>("other").is_none());
    Ok(())
}

#[test]
fn dependencies_may_be_registered_later() -> TestResult {
    let scheduler = Scheduler::new();
    // "build" names "fetch" before it exists; resolution happens at run time.
    scheduler.register("build", WorkItem::action(|| Ok(())), &["fetch"])?;
    scheduler.register("fetch", WorkItem::action(|| Ok(())), &[])?;

    assert_eq!(scheduler.plan()?, vec!["fetch".to_string(), "build".to_string()]);
    Ok(())
}

#[tokio::test]
async fn register_after_run_fails_until_reset() -> TestResult {
    init_tracing();
    let scheduler = Scheduler::new();
    scheduler.register("A", WorkItem::action(|| Ok(())), &[])?;
    with_timeout(scheduler.run_tasks()?.wait()).await?;

    let err = scheduler
        .register("B", WorkItem::action(|| Ok(())), &[])
        .unwrap_err();
    assert_eq!(err, SchedulerError::AlreadyRun { generation: 1 });

    scheduler.reset();
    scheduler.register("B", WorkItem::action(|| Ok(())), &[])?;
    assert_eq!(scheduler.task_titles(), vec!["B".to_string()]);
    Ok(())
}
