use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ConnectionTrait, DatabaseConnection, EntityTrait, QueryOrder, QuerySelect,
};

use crate::error::StoreError;
use crate::locks::KeyedLocks;
use crate::models::assignment::{self, Column, Entity};

/// The Entity Store for assignments.
///
/// Reads are lock-free. Every write takes the per-identifier lock, and
/// [`AssignmentRepository::update`] holds it across the whole
/// load-mutate-save so concurrent writers of one assignment cannot lose
/// each other's changes. Clones share the connection and the lock registry.
#[derive(Clone)]
pub struct AssignmentRepository {
    db: DatabaseConnection,
    locks: KeyedLocks,
}

impl AssignmentRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            locks: KeyedLocks::new(),
        }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub async fn find(&self, id: &str) -> Result<Option<assignment::Model>, StoreError> {
        Ok(Entity::find_by_id(id.to_string()).one(&self.db).await?)
    }

    pub async fn load(&self, id: &str) -> Result<assignment::Model, StoreError> {
        self.find(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    /// Every assignment, oldest first.
    pub async fn list_all(&self) -> Result<Vec<assignment::Model>, StoreError> {
        Ok(Entity::find()
            .order_by_asc(Column::CreatedAt)
            .order_by_asc(Column::Id)
            .all(&self.db)
            .await?)
    }

    pub async fn list_ids(&self) -> Result<Vec<String>, StoreError> {
        Ok(Entity::find()
            .select_only()
            .column(Column::Id)
            .order_by_asc(Column::Id)
            .into_tuple::<String>()
            .all(&self.db)
            .await?)
    }

    /// Inserts a brand-new assignment, refusing an identifier already in use.
    pub async fn insert_new(&self, model: assignment::Model) -> Result<(), StoreError> {
        let _guard = self.locks.lock(&model.id).await;
        if self.find(&model.id).await?.is_some() {
            return Err(StoreError::AlreadyExists(model.id));
        }
        Entity::insert(model.to_active_model())
            .exec_without_returning(&self.db)
            .await?;
        tracing::debug!(assignment_id = %model.id, "assignment inserted");
        Ok(())
    }

    /// Replaces the stored record with the complete snapshot `model`.
    pub async fn save(&self, model: &assignment::Model) -> Result<(), StoreError> {
        let _guard = self.locks.lock(&model.id).await;
        write_snapshot(&self.db, model).await
    }

    /// Atomic load-mutate-save of one assignment.
    ///
    /// `f` runs while the identifier is locked; its return value is passed
    /// back once the mutated snapshot has been written.
    pub async fn update<F, T>(&self, id: &str, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut assignment::Model) -> T,
    {
        let _guard = self.locks.lock(id).await;
        let mut model = self.load(id).await?;
        let out = f(&mut model);
        write_snapshot(&self.db, &model).await?;
        Ok(out)
    }

    /// Administrative removal.
    pub async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let _guard = self.locks.lock(id).await;
        let res = Entity::delete_by_id(id.to_string()).exec(&self.db).await?;
        if res.rows_affected == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        tracing::info!(assignment_id = %id, "assignment deleted");
        Ok(())
    }
}

/// Upsert of a full snapshot. Caller holds the identifier's lock.
async fn write_snapshot<C: ConnectionTrait>(
    db: &C,
    model: &assignment::Model,
) -> Result<(), StoreError> {
    if let Some(stored) = Entity::find_by_id(model.id.clone()).one(db).await? {
        if stored.deadline != model.deadline {
            return Err(StoreError::DeadlineChanged(model.id.clone()));
        }
    }

    Entity::insert(model.to_active_model())
        .on_conflict(
            OnConflict::column(Column::Id)
                .update_columns([
                    Column::AuthorId,
                    Column::Body,
                    Column::ImageUrl,
                    Column::FileUrl,
                    Column::HasTestCase,
                    Column::Submissions,
                ])
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;
    Ok(())
}
