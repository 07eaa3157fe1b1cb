use async_trait::async_trait;

use crate::collaborators::Roster;

/// Fixed list of eligible users, usually from `ELIGIBLE_USER_IDS`.
#[derive(Debug, Clone, Default)]
pub struct StaticRoster {
    users: Vec<String>,
}

impl StaticRoster {
    pub fn new(users: Vec<String>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl Roster for StaticRoster {
    async fn eligible_users(&self) -> anyhow::Result<Vec<String>> {
        Ok(self.users.clone())
    }
}
