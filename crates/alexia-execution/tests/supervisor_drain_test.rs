//! Draining a freshly started process, with and without waiting.

use alexia_execution::{ProcessControl, ProcessError, ProcessSupervisor};
use std::time::Duration;

#[tokio::test]
async fn test_immediate_drain_may_be_empty() {
    let supervisor = ProcessSupervisor::with_stop_grace(Duration::from_secs(1));
    let pid = supervisor.start("sleep 0.5; echo late", None).await.unwrap();

    // nothing has been printed yet; this must simply not fail
    let lines = supervisor.drain(pid, Duration::ZERO).await.unwrap();
    assert!(lines.len() <= 1);

    supervisor.stop(pid).await.unwrap();
}

#[tokio::test]
async fn test_drain_with_wait_collects_output() {
    let supervisor = ProcessSupervisor::with_stop_grace(Duration::from_secs(1));
    let pid = supervisor
        .start("echo serving on port 8000; sleep 30", None)
        .await
        .unwrap();

    let lines = supervisor.drain(pid, Duration::from_secs(2)).await.unwrap();
    assert_eq!(lines, vec!["serving on port 8000"]);

    supervisor.stop(pid).await.unwrap();
    assert!(supervisor.list().is_empty());
}

#[tokio::test]
async fn test_stop_unknown_leaves_table_alone() {
    let supervisor = ProcessSupervisor::new();
    let pid = supervisor.start("sleep 30", None).await.unwrap();

    let err = supervisor.stop(pid + 100_000).await.unwrap_err();
    assert!(matches!(err, ProcessError::NotFound(_)));
    assert_eq!(supervisor.list(), vec![pid]);

    supervisor.stop_all().await;
    assert!(supervisor.list().is_empty());
}
