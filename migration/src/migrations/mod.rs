pub mod m202507010001_create_assignments;
pub mod m202507010002_create_upload_log;
pub mod m202507010003_create_reminder_state;
