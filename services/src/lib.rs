pub mod archiver;
pub mod assignments;
pub mod collaborators;
pub mod error;
pub mod messages;
pub mod notifier;
pub mod reminder;
pub mod roster;
pub mod scheduler;
pub mod submissions;

pub use error::ServiceError;
