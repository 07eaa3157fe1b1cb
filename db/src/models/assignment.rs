use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::Set;
use sea_orm::FromJsonQueryResult;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One recorded submission event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attempt {
    pub timestamp: DateTime<Utc>,
    pub passed: bool,
}

/// Every attempt one user made for one assignment, oldest first.
///
/// `latest_passed` and `latest_timestamp` mirror the last attempt; they are
/// only ever written through [`SubmissionRecord::push`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    #[serde(default)]
    attempts: Vec<Attempt>,
    #[serde(default)]
    latest_passed: bool,
    #[serde(default)]
    latest_timestamp: Option<DateTime<Utc>>,
}

impl SubmissionRecord {
    pub fn new(first: Attempt) -> Self {
        Self {
            latest_passed: first.passed,
            latest_timestamp: Some(first.timestamp),
            attempts: vec![first],
        }
    }

    pub fn push(&mut self, attempt: Attempt) {
        self.latest_passed = attempt.passed;
        self.latest_timestamp = Some(attempt.timestamp);
        self.attempts.push(attempt);
    }

    pub fn attempts(&self) -> &[Attempt] {
        &self.attempts
    }

    pub fn latest_passed(&self) -> bool {
        self.latest_passed
    }

    pub fn latest_timestamp(&self) -> Option<DateTime<Utc>> {
        self.latest_timestamp
    }
}

/// `user id -> SubmissionRecord`, stored as one JSON column.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct Submissions(pub BTreeMap<String, SubmissionRecord>);

/// A time-boxed assignment.
///
/// The deadline is fixed at creation; the store refuses snapshots that move it.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "assignments")]
pub struct Model {
    /// Short unique code such as `bt_1234`.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// User who created the assignment.
    pub author_id: String,
    /// Free-text instructions.
    #[sea_orm(column_type = "Text")]
    pub body: String,
    /// Submissions are accepted while `now < deadline`.
    pub deadline: DateTime<Utc>,
    pub image_url: Option<String>,
    pub file_url: Option<String>,
    /// Whether submissions are compiled and run against test cases.
    pub has_test_case: bool,
    #[sea_orm(column_type = "Json")]
    pub submissions: Submissions,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// `now == deadline` already counts as expired.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.deadline
    }

    pub fn submission(&self, user_id: &str) -> Option<&SubmissionRecord> {
        self.submissions.0.get(user_id)
    }

    pub fn attempt_count(&self, user_id: &str) -> usize {
        self.submission(user_id).map_or(0, |r| r.attempts().len())
    }

    /// Appends an attempt, creating the user's record on first submission.
    pub fn record_attempt(&mut self, user_id: &str, attempt: Attempt) -> &SubmissionRecord {
        match self.submissions.0.entry(user_id.to_string()) {
            Entry::Occupied(slot) => {
                let record = slot.into_mut();
                record.push(attempt);
                record
            }
            Entry::Vacant(slot) => slot.insert(SubmissionRecord::new(attempt)),
        }
    }

    /// Graded assignments need a passing latest attempt; ungraded ones any attempt.
    pub fn is_compliant(&self, user_id: &str) -> bool {
        match self.submission(user_id) {
            None => false,
            Some(record) if self.has_test_case => record.latest_passed(),
            Some(_) => true,
        }
    }

    /// Attempt that clears pending reminders for its user.
    pub fn is_qualifying(&self, attempt: &Attempt) -> bool {
        !self.has_test_case || attempt.passed
    }

    /// Full snapshot as an insertable active model.
    pub fn to_active_model(&self) -> ActiveModel {
        ActiveModel {
            id: Set(self.id.clone()),
            author_id: Set(self.author_id.clone()),
            body: Set(self.body.clone()),
            deadline: Set(self.deadline),
            image_url: Set(self.image_url.clone()),
            file_url: Set(self.file_url.clone()),
            has_test_case: Set(self.has_test_case),
            submissions: Set(self.submissions.clone()),
            created_at: Set(self.created_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn sample(has_test_case: bool) -> Model {
        let created = Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap();
        Model {
            id: "bt_1234".into(),
            author_id: "admin".into(),
            body: "Sum two numbers".into(),
            deadline: created + Duration::hours(4),
            image_url: None,
            file_url: None,
            has_test_case,
            submissions: Submissions::default(),
            created_at: created,
        }
    }

    #[test]
    fn latest_fields_follow_last_attempt() {
        let mut a = sample(true);
        let t0 = a.created_at + Duration::minutes(5);
        a.record_attempt("u1", Attempt { timestamp: t0, passed: true });
        let record = a.record_attempt(
            "u1",
            Attempt { timestamp: t0 + Duration::minutes(1), passed: false },
        );

        assert_eq!(record.attempts().len(), 2);
        assert!(!record.latest_passed());
        assert_eq!(record.latest_timestamp(), Some(t0 + Duration::minutes(1)));
        assert!(!a.is_compliant("u1"));
    }

    #[test]
    fn ungraded_compliance_is_any_attempt() {
        let mut a = sample(false);
        assert!(!a.is_compliant("u1"));
        let attempt = Attempt { timestamp: a.created_at, passed: false };
        assert!(a.is_qualifying(&attempt));
        a.record_attempt("u1", attempt);
        assert!(a.is_compliant("u1"));
        assert_eq!(a.attempt_count("u1"), 1);
        assert_eq!(a.attempt_count("u2"), 0);
    }

    #[test]
    fn deadline_instant_is_expired() {
        let a = sample(true);
        assert!(!a.is_expired(a.deadline - Duration::seconds(1)));
        assert!(a.is_expired(a.deadline));
    }

    #[test]
    fn missing_fields_default_when_decoding() {
        let record: SubmissionRecord = serde_json::from_str("{}").unwrap();
        assert!(record.attempts().is_empty());
        assert!(!record.latest_passed());
        assert_eq!(record.latest_timestamp(), None);
    }
}
