//! Seams to the outside world.

use async_trait::async_trait;
use db::models::reminder_state::Window;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub assignment_id: String,
    pub user_id: String,
    pub window: String,
    pub content: String,
}

impl Notification {
    pub fn reminder(assignment_id: &str, user_id: &str, window: Window, content: String) -> Self {
        Self {
            assignment_id: assignment_id.to_string(),
            user_id: user_id.to_string(),
            window: window.to_string(),
            content,
        }
    }
}

/// Delivers a message to one user.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> anyhow::Result<()>;
}

/// Moves every artifact submitted for an assignment to long-term storage.
/// Only called once the deadline has passed.
#[async_trait]
pub trait Archiver: Send + Sync {
    async fn archive(&self, assignment_id: &str) -> anyhow::Result<()>;
}

/// The cohort of users expected to submit.
#[async_trait]
pub trait Roster: Send + Sync {
    async fn eligible_users(&self) -> anyhow::Result<Vec<String>>;

    async fn is_eligible(&self, user_id: &str) -> anyhow::Result<bool> {
        Ok(self.eligible_users().await?.iter().any(|u| u == user_id))
    }
}
