use std::sync::Arc;

use sea_orm::{ActiveValue::Set, DatabaseConnection, EntityTrait, TransactionTrait};
use tokio::sync::Mutex;

use crate::error::StoreError;
use crate::models::reminder_state::{self, Entity, ReminderState};

/// Persisted reminder flags, rewritten wholesale on every save.
///
/// Clones share one write lock so the reminder tick and post-submission
/// clearances never interleave their read-modify-write cycles.
#[derive(Clone)]
pub struct ReminderRepository {
    db: DatabaseConnection,
    write_lock: Arc<Mutex<()>>,
}

impl ReminderRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub async fn load(&self) -> Result<ReminderState, StoreError> {
        let rows = Entity::find().all(&self.db).await?;
        Ok(rows.into_iter().collect())
    }

    /// Locked load-mutate-save of the whole state.
    pub async fn update<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut ReminderState) -> T,
    {
        let _guard = self.write_lock.lock().await;
        let mut state = self.load().await?;
        let out = f(&mut state);
        self.replace_all(&state).await?;
        Ok(out)
    }

    /// Drops one user's flags for one assignment.
    pub async fn clear_user(&self, assignment_id: &str, user_id: &str) -> Result<bool, StoreError> {
        self.update(|state| state.clear_user(assignment_id, user_id)).await
    }

    pub async fn clear_assignment(&self, assignment_id: &str) -> Result<bool, StoreError> {
        self.update(|state| state.clear_assignment(assignment_id)).await
    }

    async fn replace_all(&self, state: &ReminderState) -> Result<(), StoreError> {
        let txn = self.db.begin().await?;
        Entity::delete_many().exec(&txn).await?;

        let rows: Vec<reminder_state::ActiveModel> = state
            .rows()
            .map(|row| reminder_state::ActiveModel {
                assignment_id: Set(row.assignment_id),
                user_id: Set(row.user_id),
                sent_long: Set(row.sent_long),
                sent_short: Set(row.sent_short),
            })
            .collect();
        if !rows.is_empty() {
            Entity::insert_many(rows).exec_without_returning(&txn).await?;
        }
        txn.commit().await?;
        Ok(())
    }
}
