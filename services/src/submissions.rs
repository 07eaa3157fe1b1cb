//! Submission intake.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use code_runner::grader::is_supported_artifact;
use code_runner::{GradeRequest, Grader, Verdict};
use db::KeyedLocks;
use db::models::assignment::Attempt;
use db::repositories::{AssignmentRepository, ReminderRepository};
use util::paths::{sanitize_segment, user_folder_name, user_submission_dir};
use util::time::format_duration;

use crate::collaborators::Roster;
use crate::error::ServiceError;
use crate::messages;

#[derive(Debug, Clone)]
pub struct SubmissionRequest {
    pub assignment_id: String,
    pub user_id: String,
    pub username: String,
    pub artifact_name: String,
    pub artifact: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// Ungraded assignment; the artifact was stored without compiling.
    Accepted,
    Graded(Verdict),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionReceipt {
    pub assignment_id: String,
    pub outcome: SubmissionOutcome,
    pub passed: bool,
    pub attempt_count: usize,
    pub stored_at: PathBuf,
    pub message: String,
}

#[derive(Clone)]
pub struct SubmissionService {
    store: AssignmentRepository,
    reminders: ReminderRepository,
    roster: Arc<dyn Roster>,
    grader: Grader,
    storage_root: PathBuf,
    in_flight: KeyedLocks,
}

impl SubmissionService {
    pub fn new(
        store: AssignmentRepository,
        reminders: ReminderRepository,
        roster: Arc<dyn Roster>,
        grader: Grader,
        storage_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            reminders,
            roster,
            grader,
            storage_root: storage_root.into(),
            in_flight: KeyedLocks::new(),
        }
    }

    pub async fn submit(
        &self,
        req: SubmissionRequest,
        now: DateTime<Utc>,
    ) -> Result<SubmissionReceipt, ServiceError> {
        if !is_supported_artifact(&req.artifact_name) {
            return Err(ServiceError::Validation(
                "only .java or .zip files are accepted".into(),
            ));
        }

        // One submission per (assignment, user) at a time.
        let _slot = self
            .in_flight
            .lock(&format!("{}/{}", req.assignment_id, req.user_id))
            .await;

        let assignment = self.store.load(&req.assignment_id).await?;

        let eligible = assignment.author_id == req.user_id
            || self
                .roster
                .is_eligible(&req.user_id)
                .await
                .map_err(ServiceError::External)?;
        if !eligible {
            return Err(ServiceError::Unauthorized(
                "you are not allowed to submit this assignment".into(),
            ));
        }

        if assignment.is_expired(now) {
            return Err(ServiceError::Expired {
                id: assignment.id.clone(),
                overdue: format_duration(now - assignment.deadline),
            });
        }

        if assignment.has_test_case
            && assignment
                .submission(&req.user_id)
                .is_some_and(|r| r.latest_passed())
        {
            return Err(ServiceError::AlreadyPassed(assignment.id.clone()));
        }

        let stored_at = self.store_artifact(&req).await?;

        let outcome = if assignment.has_test_case {
            let verdict = self
                .grader
                .grade(&GradeRequest {
                    assignment_id: assignment.id.clone(),
                    user_id: req.user_id.clone(),
                    artifact_name: req.artifact_name.clone(),
                    artifact: req.artifact.clone(),
                    requires_grading: true,
                })
                .await?;
            SubmissionOutcome::Graded(verdict)
        } else {
            SubmissionOutcome::Accepted
        };

        let passed = match &outcome {
            SubmissionOutcome::Accepted => true,
            SubmissionOutcome::Graded(v) => v.passed(),
        };
        let attempt = Attempt {
            timestamp: now,
            passed,
        };
        let qualifying = assignment.is_qualifying(&attempt);
        let user_id = req.user_id.clone();
        let attempt_count = self
            .store
            .update(&assignment.id, move |a| {
                a.record_attempt(&user_id, attempt).attempts().len()
            })
            .await?;

        if qualifying {
            if let Err(e) = self.reminders.clear_user(&assignment.id, &req.user_id).await {
                tracing::warn!(
                    assignment_id = %assignment.id,
                    user_id = %req.user_id,
                    error = %e,
                    "could not clear reminder state"
                );
            }
        }

        tracing::info!(
            assignment_id = %assignment.id,
            user_id = %req.user_id,
            passed,
            attempt_count,
            "submission recorded"
        );

        let message = match &outcome {
            SubmissionOutcome::Accepted => "Submission received.".to_string(),
            SubmissionOutcome::Graded(v) => messages::verdict(v),
        };
        Ok(SubmissionReceipt {
            assignment_id: assignment.id,
            outcome,
            passed,
            attempt_count,
            stored_at,
            message,
        })
    }

    /// Replaces the user's previously stored artifact for this assignment.
    async fn store_artifact(&self, req: &SubmissionRequest) -> Result<PathBuf, ServiceError> {
        let dir = user_submission_dir(
            &self.storage_root,
            &req.assignment_id,
            &user_folder_name(&req.username, &req.user_id),
        );
        if tokio::fs::try_exists(&dir).await? {
            tokio::fs::remove_dir_all(&dir).await?;
        }
        tokio::fs::create_dir_all(&dir).await?;

        let file_name = Path::new(&req.artifact_name)
            .file_name()
            .map(|n| sanitize_segment(&n.to_string_lossy()))
            .unwrap_or_else(|| "submission".to_string());
        let path = dir.join(file_name);
        tokio::fs::write(&path, &req.artifact).await?;
        Ok(path)
    }
}
