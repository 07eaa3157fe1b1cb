#![allow(dead_code)]

use std::collections::HashMap;
use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use code_runner::process::{ProcessOutcome, ProcessOutput};
use code_runner::{Grader, GradingError, TestCase, TestCaseSource, Toolchain};
use db::models::assignment::{Model, Submissions};
use db::repositories::{AssignmentRepository, ReminderRepository, UploadLogRepository};
use db::test_utils::setup_test_db;
use services::collaborators::{Archiver, Notification, Notifier, Roster};
use util::execution_config::ExecutionLimits;

pub struct Stores {
    pub assignments: AssignmentRepository,
    pub upload_log: UploadLogRepository,
    pub reminders: ReminderRepository,
}

pub async fn stores() -> Stores {
    let db = setup_test_db().await;
    Stores {
        assignments: AssignmentRepository::new(db.clone()),
        upload_log: UploadLogRepository::new(db.clone()),
        reminders: ReminderRepository::new(db),
    }
}

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap()
}

pub fn assignment(id: &str, deadline: DateTime<Utc>, has_test_case: bool) -> Model {
    Model {
        id: id.to_string(),
        author_id: "admin".into(),
        body: format!("Exercise {id}"),
        deadline,
        image_url: None,
        file_url: None,
        has_test_case,
        submissions: Submissions::default(),
        created_at: deadline - Duration::hours(6),
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<Notification>>,
    pub failing_users: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }

    pub fn fail_for(&self, user: &str) {
        self.failing_users.lock().unwrap().push(user.to_string());
    }

    pub fn recover(&self) {
        self.failing_users.lock().unwrap().clear();
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, n: &Notification) -> anyhow::Result<()> {
        if self.failing_users.lock().unwrap().contains(&n.user_id) {
            anyhow::bail!("chat service unavailable");
        }
        self.sent.lock().unwrap().push(n.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingArchiver {
    pub calls: Mutex<Vec<String>>,
    pub failing: AtomicBool,
}

impl RecordingArchiver {
    pub fn failing() -> Self {
        let archiver = Self::default();
        archiver.failing.store(true, Ordering::SeqCst);
        archiver
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Archiver for RecordingArchiver {
    async fn archive(&self, assignment_id: &str) -> anyhow::Result<()> {
        self.calls.lock().unwrap().push(assignment_id.to_string());
        if self.failing.load(Ordering::SeqCst) {
            anyhow::bail!("upload backend unreachable");
        }
        Ok(())
    }
}

pub struct UnavailableRoster;

#[async_trait]
impl Roster for UnavailableRoster {
    async fn eligible_users(&self) -> anyhow::Result<Vec<String>> {
        anyhow::bail!("member list request timed out")
    }
}

/// Rejects sources containing `BROKEN` at compile time; a run prints the
/// mapped answer for its stdin.
pub struct EchoToolchain {
    pub answers: HashMap<String, String>,
}

#[async_trait]
impl Toolchain for EchoToolchain {
    async fn compile(
        &self,
        sources: &[PathBuf],
        _out_dir: &Path,
        _limits: &ExecutionLimits,
    ) -> Result<ProcessOutcome, GradingError> {
        for source in sources {
            if std::fs::read_to_string(source)?.contains("BROKEN") {
                return Ok(ProcessOutcome::Completed(ProcessOutput {
                    status: ExitStatus::from_raw(1 << 8),
                    stdout: String::new(),
                    stderr: "error: cannot find symbol BROKEN".into(),
                }));
            }
        }
        Ok(completed(""))
    }

    async fn run(
        &self,
        _class_dir: &Path,
        _entry_class: &str,
        stdin: &str,
        _limits: &ExecutionLimits,
    ) -> Result<ProcessOutcome, GradingError> {
        Ok(completed(self.answers.get(stdin).map(String::as_str).unwrap_or("")))
    }
}

fn completed(stdout: &str) -> ProcessOutcome {
    ProcessOutcome::Completed(ProcessOutput {
        status: ExitStatus::from_raw(0),
        stdout: stdout.to_string(),
        stderr: String::new(),
    })
}

pub struct FixedCases(pub Vec<TestCase>);

#[async_trait]
impl TestCaseSource for FixedCases {
    async fn load(&self, _assignment_id: &str) -> Result<Option<Vec<TestCase>>, GradingError> {
        Ok(Some(self.0.clone()))
    }
}

/// One test case `1 2 -> 3`; any source without `BROKEN` passes it.
pub fn sum_grader(workspace_root: &Path) -> Grader {
    let toolchain = EchoToolchain {
        answers: HashMap::from([
            ("1 2".to_string(), "3".to_string()),
        ]),
    };
    Grader::new(
        Arc::new(toolchain),
        Arc::new(FixedCases(vec![TestCase {
            input: "1 2".into(),
            expected: "3".into(),
        }])),
        ExecutionLimits::default(),
        workspace_root,
    )
}

pub const PASSING: &str =
    "public class Sum { public static void main(String[] a) { System.out.println(3); } }";

pub const BROKEN: &str = "public class Sum { BROKEN }";
