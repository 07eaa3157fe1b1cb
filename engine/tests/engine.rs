use std::path::Path;
use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use db::models::assignment::{Model, Submissions};
use db::repositories::{AssignmentRepository, UploadLogRepository};
use engine::Engine;
use migration::Migrator;
use sea_orm_migration::MigratorTrait;
use services::assignments::NewAssignment;
use services::submissions::{SubmissionOutcome, SubmissionRequest};
use tempfile::TempDir;
use util::config::AppConfig;

fn config_in(dir: &Path) -> AppConfig {
    let mut cfg = AppConfig::from_env();
    let sub = |name: &str| dir.join(name).to_string_lossy().into_owned();
    cfg.database_path = sub("engine.db");
    cfg.storage_root = sub("storage");
    cfg.archive_root = sub("archive");
    cfg.testcase_root = sub("testcases");
    cfg.workspace_root = Some(sub("work"));
    cfg.eligible_user_ids = vec!["u1".into(), "u2".into()];
    cfg.notify_webhook_url = None;
    cfg
}

fn far_future() -> NewAssignment {
    NewAssignment {
        author_id: "admin".into(),
        body: "Write a short essay".into(),
        deadline: "10:00 01/01/2099".into(),
        image_url: None,
        file_url: None,
        has_test_case: false,
    }
}

#[tokio::test]
async fn accepts_ungraded_submission_and_reports_status() {
    let dir = TempDir::new().unwrap();
    let cfg = config_in(dir.path());
    let engine = Engine::start(&cfg).await.unwrap();
    assert_eq!(engine.sweep.armed, 0);

    let now = Utc::now();
    let created = engine.assignments.create(far_future(), now).await.unwrap();

    let receipt = engine
        .submissions
        .submit(
            SubmissionRequest {
                assignment_id: created.id.clone(),
                user_id: "u1".into(),
                username: "alice".into(),
                artifact_name: "essay.java".into(),
                artifact: b"class Essay {}".to_vec(),
            },
            now,
        )
        .await
        .unwrap();
    assert_eq!(receipt.outcome, SubmissionOutcome::Accepted);
    assert!(receipt.stored_at.exists());

    let status = engine.assignments.status(Some(&created.id), now).await.unwrap();
    assert_eq!(status.accepted.len(), 1);
    assert_eq!(status.outstanding, vec!["u2".to_string()]);
    assert!(!status.archived);

    engine.shutdown();
}

#[tokio::test]
async fn restart_rearms_persisted_deadlines() {
    let dir = TempDir::new().unwrap();
    let cfg = config_in(dir.path());

    let first = Engine::start(&cfg).await.unwrap();
    first.assignments.create(far_future(), Utc::now()).await.unwrap();
    first.shutdown();

    let second = Engine::start(&cfg).await.unwrap();
    assert_eq!(second.sweep.armed, 1);
    assert_eq!(second.sweep.immediate, 0);
    second.shutdown();
}

#[tokio::test]
async fn overdue_assignment_is_archived_on_boot() {
    let dir = TempDir::new().unwrap();
    let cfg = config_in(dir.path());

    // Seed an assignment whose deadline passed while the engine was down.
    let conn = db::connect(&cfg.database_path).await.unwrap();
    Migrator::up(&conn, None).await.unwrap();
    let deadline = Utc::now() - Duration::minutes(5);
    AssignmentRepository::new(conn.clone())
        .insert_new(Model {
            id: "bt_4242".into(),
            author_id: "admin".into(),
            body: "Overdue work".into(),
            deadline,
            image_url: None,
            file_url: None,
            has_test_case: false,
            submissions: Submissions::default(),
            created_at: deadline - Duration::hours(1),
        })
        .await
        .unwrap();
    let user_dir = dir.path().join("storage/submissions/bt_4242/alice_u1");
    std::fs::create_dir_all(&user_dir).unwrap();
    std::fs::write(user_dir.join("Main.java"), "class Main {}").unwrap();

    let engine = Engine::start(&cfg).await.unwrap();
    assert_eq!(engine.sweep.immediate, 1);

    let upload_log = UploadLogRepository::new(conn);
    let mut archived = false;
    for _ in 0..100 {
        if upload_log.contains("bt_4242").await.unwrap() {
            archived = true;
            break;
        }
        tokio::time::sleep(StdDuration::from_millis(50)).await;
    }
    assert!(archived, "assignment was never archived");

    let copied = dir
        .path()
        .join("archive")
        .join(&cfg.archive_folder_name)
        .join("bt_4242 - Overdue work")
        .join("alice_u1")
        .join("Main.java");
    assert!(copied.exists());

    engine.shutdown();
}
