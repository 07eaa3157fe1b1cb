pub mod assignment_repository;
pub mod reminder_repository;
pub mod upload_log_repository;

pub use assignment_repository::AssignmentRepository;
pub use reminder_repository::ReminderRepository;
pub use upload_log_repository::UploadLogRepository;
