pub mod assignment;
pub mod reminder_state;
pub mod upload_log;

pub use assignment::Entity as Assignment;
pub use reminder_state::Entity as ReminderStateEntry;
pub use upload_log::Entity as UploadLog;
