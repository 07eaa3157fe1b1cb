use chrono::{DateTime, Utc};
use sea_orm::sea_query::OnConflict;
use sea_orm::{ActiveValue::Set, DatabaseConnection, EntityTrait, QueryOrder};

use crate::error::StoreError;
use crate::models::upload_log::{self, Column, Entity};

/// Archival idempotency guard. Identifiers are only ever added.
#[derive(Clone)]
pub struct UploadLogRepository {
    db: DatabaseConnection,
}

impl UploadLogRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn contains(&self, assignment_id: &str) -> Result<bool, StoreError> {
        Ok(Entity::find_by_id(assignment_id.to_string())
            .one(&self.db)
            .await?
            .is_some())
    }

    /// Adds `assignment_id`. Recording an id twice keeps the first timestamp.
    pub async fn record(
        &self,
        assignment_id: &str,
        archived_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let row = upload_log::ActiveModel {
            assignment_id: Set(assignment_id.to_string()),
            archived_at: Set(archived_at),
        };
        Entity::insert(row)
            .on_conflict(OnConflict::column(Column::AssignmentId).do_nothing().to_owned())
            .exec_without_returning(&self.db)
            .await?;
        Ok(())
    }

    pub async fn list(&self) -> Result<Vec<upload_log::Model>, StoreError> {
        Ok(Entity::find()
            .order_by_asc(Column::ArchivedAt)
            .all(&self.db)
            .await?)
    }
}
