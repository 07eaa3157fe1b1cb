//! Administrative assignment operations.

use std::sync::Arc;

use chrono::{DateTime, Duration, FixedOffset, Utc};
use db::StoreError;
use db::models::assignment::{Model, Submissions};
use db::repositories::{AssignmentRepository, ReminderRepository, UploadLogRepository};
use rand::Rng;
use util::time::parse_deadline;

use crate::collaborators::Roster;
use crate::error::ServiceError;
use crate::scheduler::SchedulerHandle;

const ID_ATTEMPTS: usize = 64;

#[derive(Debug, Clone)]
pub struct NewAssignment {
    pub author_id: String,
    pub body: String,
    /// `HH:mm` (today) or `HH:mm dd/mm/yyyy`, in the configured offset.
    pub deadline: String,
    pub image_url: Option<String>,
    pub file_url: Option<String>,
    pub has_test_case: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedUser {
    pub user_id: String,
    pub attempts: usize,
    pub last_submitted: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentStatus {
    pub assignment: Model,
    /// Ordered by latest submission, earliest first.
    pub accepted: Vec<AcceptedUser>,
    pub outstanding: Vec<String>,
    /// `None` once the deadline has passed.
    pub time_left: Option<Duration>,
    pub archived: bool,
}

#[derive(Clone)]
pub struct AssignmentService {
    store: AssignmentRepository,
    upload_log: UploadLogRepository,
    reminders: ReminderRepository,
    roster: Arc<dyn Roster>,
    scheduler: SchedulerHandle,
    offset: FixedOffset,
}

impl AssignmentService {
    pub fn new(
        store: AssignmentRepository,
        upload_log: UploadLogRepository,
        reminders: ReminderRepository,
        roster: Arc<dyn Roster>,
        scheduler: SchedulerHandle,
        offset: FixedOffset,
    ) -> Self {
        Self {
            store,
            upload_log,
            reminders,
            roster,
            scheduler,
            offset,
        }
    }

    pub async fn create(&self, new: NewAssignment, now: DateTime<Utc>) -> Result<Model, ServiceError> {
        let body = new.body.trim();
        if body.is_empty() {
            return Err(ServiceError::Validation("assignment body must not be empty".into()));
        }
        let deadline = parse_deadline(&new.deadline, now, self.offset)
            .map_err(|e| ServiceError::Validation(e.to_string()))?;
        if deadline <= now {
            return Err(ServiceError::Validation("the deadline must be in the future".into()));
        }

        let mut model = Model {
            id: String::new(),
            author_id: new.author_id,
            body: body.to_string(),
            deadline,
            image_url: new.image_url,
            file_url: new.file_url,
            has_test_case: new.has_test_case,
            submissions: Submissions::default(),
            created_at: now,
        };

        let mut inserted = false;
        for _ in 0..ID_ATTEMPTS {
            let candidate = format!("bt_{}", rand::rng().random_range(1000..=9999));
            // Archived ids stay in the upload log forever and cannot be reused.
            if self.upload_log.contains(&candidate).await? {
                continue;
            }
            model.id = candidate;
            match self.store.insert_new(model.clone()).await {
                Ok(()) => {
                    inserted = true;
                    break;
                }
                Err(StoreError::AlreadyExists(_)) => continue,
                Err(e) => return Err(e.into()),
            }
        }
        if !inserted {
            return Err(ServiceError::Validation(
                "no free assignment identifier, try again".into(),
            ));
        }

        if let Err(e) = self.scheduler.schedule(&model).await {
            tracing::error!(assignment_id = %model.id, error = %e, "assignment created but not scheduled");
        }
        tracing::info!(assignment_id = %model.id, deadline = %model.deadline, "assignment created");
        Ok(model)
    }

    /// Removes each assignment independently and reports per id.
    pub async fn delete(&self, ids: &[String]) -> Vec<(String, Result<(), ServiceError>)> {
        let mut results = Vec::with_capacity(ids.len());
        for id in ids {
            let result = match self.store.delete(id).await {
                Ok(()) => {
                    if let Err(e) = self.reminders.clear_assignment(id).await {
                        tracing::warn!(assignment_id = %id, error = %e, "reminder state left behind");
                    }
                    Ok(())
                }
                Err(e) => Err(e.into()),
            };
            results.push((id.clone(), result));
        }
        results
    }

    /// Roster-wide view of one assignment, the latest one when `id` is `None`.
    pub async fn status(
        &self,
        id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<AssignmentStatus, ServiceError> {
        let assignment = match id {
            Some(id) => self.store.load(id).await?,
            None => self
                .store
                .list_all()
                .await?
                .pop()
                .ok_or_else(|| ServiceError::Validation("there are no assignments yet".into()))?,
        };
        let users = self
            .roster
            .eligible_users()
            .await
            .map_err(ServiceError::External)?;

        let mut accepted: Vec<AcceptedUser> = assignment
            .submissions
            .0
            .iter()
            .filter(|(user_id, _)| assignment.is_compliant(user_id))
            .map(|(user_id, record)| AcceptedUser {
                user_id: user_id.clone(),
                attempts: record.attempts().len(),
                last_submitted: record.latest_timestamp(),
            })
            .collect();
        accepted.sort_by_key(|u| u.last_submitted);

        let outstanding = users
            .into_iter()
            .filter(|u| !assignment.is_compliant(u))
            .collect();

        let time_left = (!assignment.is_expired(now)).then(|| assignment.deadline - now);
        let archived = self.upload_log.contains(&assignment.id).await?;

        Ok(AssignmentStatus {
            assignment,
            accepted,
            outstanding,
            time_left,
            archived,
        })
    }

    /// Open assignments `user_id` may submit to and has not submitted yet.
    pub async fn pending_for(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<Model>, ServiceError> {
        let on_roster = self
            .roster
            .is_eligible(user_id)
            .await
            .map_err(ServiceError::External)?;

        let mut pending: Vec<Model> = self
            .store
            .list_all()
            .await?
            .into_iter()
            .filter(|a| !a.is_expired(now))
            .filter(|a| on_roster || a.author_id == user_id)
            .filter(|a| a.submission(user_id).is_none())
            .collect();
        pending.sort_by_key(|a| a.deadline);
        Ok(pending)
    }
}
