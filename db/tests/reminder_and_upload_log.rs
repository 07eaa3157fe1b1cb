use chrono::{Duration, TimeZone, Utc};
use db::models::reminder_state::Window;
use db::repositories::{ReminderRepository, UploadLogRepository};
use db::test_utils::setup_test_db;

#[tokio::test]
async fn upload_log_is_insert_only() {
    let log = UploadLogRepository::new(setup_test_db().await);
    let first = Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap();

    assert!(!log.contains("bt_1000").await.unwrap());
    log.record("bt_1000", first).await.unwrap();
    log.record("bt_1000", first + Duration::hours(1)).await.unwrap();

    assert!(log.contains("bt_1000").await.unwrap());
    let rows = log.list().await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].archived_at, first);
}

#[tokio::test]
async fn reminder_flags_persist_and_clear() {
    let reminders = ReminderRepository::new(setup_test_db().await);

    reminders
        .update(|state| {
            state.mark("bt_1000", "u1", Window::Long);
            state.mark("bt_1000", "u2", Window::Long);
            state.mark("bt_2000", "u1", Window::Short);
        })
        .await
        .unwrap();

    let state = reminders.load().await.unwrap();
    assert!(state.flags("bt_1000", "u1").is_sent(Window::Long));
    assert!(state.flags("bt_2000", "u1").is_sent(Window::Short));

    assert!(reminders.clear_user("bt_1000", "u1").await.unwrap());
    assert!(!reminders.clear_user("bt_1000", "u1").await.unwrap());
    assert!(reminders.clear_assignment("bt_2000").await.unwrap());

    let state = reminders.load().await.unwrap();
    assert!(!state.flags("bt_1000", "u1").is_sent(Window::Long));
    assert!(state.flags("bt_1000", "u2").is_sent(Window::Long));
    assert!(!state.flags("bt_2000", "u1").is_sent(Window::Short));
}

#[tokio::test]
async fn saving_empty_state_clears_table() {
    let reminders = ReminderRepository::new(setup_test_db().await);
    reminders.update(|s| s.mark("bt_1000", "u1", Window::Short)).await.unwrap();
    reminders.update(|s| s.clear_assignment("bt_1000")).await.unwrap();
    assert!(reminders.load().await.unwrap().is_empty());
}
