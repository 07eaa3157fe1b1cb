mod common;

use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use common::{RecordingArchiver, Stores, assignment, stores};
use db::repositories::UploadLogRepository;
use services::scheduler::{DeadlineScheduler, ScheduleOutcome, SchedulerHandle, restart_sweep};

fn start(s: &Stores, archiver: Arc<RecordingArchiver>, max_timer: Duration) -> SchedulerHandle {
    let (scheduler, handle) = DeadlineScheduler::new(
        s.assignments.clone(),
        s.upload_log.clone(),
        archiver,
        max_timer,
    );
    tokio::spawn(scheduler.run());
    handle
}

async fn wait_archived(log: &UploadLogRepository, id: &str) -> bool {
    for _ in 0..150 {
        if log.contains(id).await.unwrap() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}

#[tokio::test]
async fn expired_deadline_archives_immediately_and_once() {
    let s = stores().await;
    let a = assignment("bt_1000", Utc::now() - ChronoDuration::minutes(5), true);
    s.assignments.insert_new(a.clone()).await.unwrap();
    let archiver = Arc::new(RecordingArchiver::default());
    let handle = start(&s, archiver.clone(), Duration::from_secs(60));

    assert_eq!(handle.schedule(&a).await.unwrap(), ScheduleOutcome::Immediate);
    assert!(wait_archived(&s.upload_log, "bt_1000").await);

    assert_eq!(handle.schedule(&a).await.unwrap(), ScheduleOutcome::AlreadyArchived);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(archiver.calls(), ["bt_1000"]);
}

#[tokio::test]
async fn fires_after_deadline_through_capped_timers() {
    let s = stores().await;
    let a = assignment("bt_1000", Utc::now() + ChronoDuration::milliseconds(400), true);
    s.assignments.insert_new(a.clone()).await.unwrap();
    let archiver = Arc::new(RecordingArchiver::default());
    // Timer cap far below the delay forces several re-arms.
    let handle = start(&s, archiver.clone(), Duration::from_millis(50));

    assert_eq!(handle.schedule(&a).await.unwrap(), ScheduleOutcome::Armed);
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(archiver.calls().is_empty());

    assert!(wait_archived(&s.upload_log, "bt_1000").await);
    assert!(Utc::now() >= a.deadline);
    assert_eq!(archiver.calls(), ["bt_1000"]);
}

#[tokio::test]
async fn duplicate_registrations_archive_once() {
    let s = stores().await;
    let a = assignment("bt_1000", Utc::now() + ChronoDuration::milliseconds(100), false);
    s.assignments.insert_new(a.clone()).await.unwrap();
    let archiver = Arc::new(RecordingArchiver::default());
    let handle = start(&s, archiver.clone(), Duration::from_secs(60));

    for _ in 0..3 {
        handle.schedule(&a).await.unwrap();
    }
    assert!(wait_archived(&s.upload_log, "bt_1000").await);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(archiver.calls().len(), 1);
}

#[tokio::test]
async fn failed_archival_is_retried_by_restart_sweep() {
    let s = stores().await;
    let a = assignment("bt_1000", Utc::now() - ChronoDuration::minutes(1), true);
    s.assignments.insert_new(a.clone()).await.unwrap();

    let broken = Arc::new(RecordingArchiver::failing());
    let handle = start(&s, broken.clone(), Duration::from_secs(60));
    handle.schedule(&a).await.unwrap();
    for _ in 0..50 {
        if !broken.calls().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(broken.calls(), ["bt_1000"]);
    assert!(!s.upload_log.contains("bt_1000").await.unwrap());

    // Simulated restart with a working backend.
    let healthy = Arc::new(RecordingArchiver::default());
    let handle = start(&s, healthy.clone(), Duration::from_secs(60));
    let report = restart_sweep(&s.assignments, &handle).await.unwrap();
    assert_eq!(report.immediate, 1);
    assert!(wait_archived(&s.upload_log, "bt_1000").await);
    assert_eq!(healthy.calls(), ["bt_1000"]);
}

#[tokio::test]
async fn restart_sweep_classifies_every_assignment() {
    let s = stores().await;
    let now = Utc::now();
    s.assignments
        .insert_new(assignment("bt_1000", now - ChronoDuration::hours(3), true))
        .await
        .unwrap();
    s.assignments
        .insert_new(assignment("bt_2000", now - ChronoDuration::hours(1), true))
        .await
        .unwrap();
    s.assignments
        .insert_new(assignment("bt_3000", now + ChronoDuration::hours(5), true))
        .await
        .unwrap();
    s.upload_log.record("bt_1000", now - ChronoDuration::hours(2)).await.unwrap();

    let archiver = Arc::new(RecordingArchiver::default());
    let handle = start(&s, archiver.clone(), Duration::from_secs(60));
    let report = restart_sweep(&s.assignments, &handle).await.unwrap();

    assert_eq!(report.already_archived, 1);
    assert_eq!(report.immediate, 1);
    assert_eq!(report.armed, 1);
    assert!(wait_archived(&s.upload_log, "bt_2000").await);
    assert_eq!(archiver.calls(), ["bt_2000"]);
}

#[tokio::test]
async fn deleted_assignment_is_not_archived() {
    let s = stores().await;
    let a = assignment("bt_1000", Utc::now() + ChronoDuration::milliseconds(100), true);
    s.assignments.insert_new(a.clone()).await.unwrap();
    let archiver = Arc::new(RecordingArchiver::default());
    let handle = start(&s, archiver.clone(), Duration::from_secs(60));

    handle.schedule(&a).await.unwrap();
    s.assignments.delete("bt_1000").await.unwrap();
    tokio::time::sleep(Duration::from_millis(400)).await;

    assert!(archiver.calls().is_empty());
    assert!(!s.upload_log.contains("bt_1000").await.unwrap());
}
