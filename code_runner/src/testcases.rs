use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use util::execution_config::ExecutionConfig;
use util::paths::testcase_path;

use crate::error::GradingError;

/// One ordered input / expected-output pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    pub input: String,
    pub expected: String,
}

/// Read-only source of an assignment's test cases.
#[async_trait]
pub trait TestCaseSource: Send + Sync {
    /// `Ok(None)` when the assignment has no fixture at all.
    async fn load(&self, assignment_id: &str) -> Result<Option<Vec<TestCase>>, GradingError>;

    /// Per-assignment execution limits, if any.
    fn execution_override(&self, _assignment_id: &str) -> Option<ExecutionConfig> {
        None
    }
}

/// Fixtures stored as `{root}/{assignment_id}.json`.
#[derive(Debug, Clone)]
pub struct FsTestCases {
    root: PathBuf,
}

impl FsTestCases {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl TestCaseSource for FsTestCases {
    async fn load(&self, assignment_id: &str) -> Result<Option<Vec<TestCase>>, GradingError> {
        let path = testcase_path(&self.root, assignment_id);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let cases = serde_json::from_str(&raw).map_err(|e| GradingError::Fixture {
            assignment_id: assignment_id.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Some(cases))
    }

    fn execution_override(&self, assignment_id: &str) -> Option<ExecutionConfig> {
        ExecutionConfig::load_override(&self.root, assignment_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn loads_ordered_cases() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("bt_1000.json"),
            r#"[{"input":"1 2","expected":"3"},{"input":"5 5","expected":"10"}]"#,
        )
        .unwrap();

        let cases = FsTestCases::new(dir.path()).load("bt_1000").await.unwrap().unwrap();
        assert_eq!(cases.len(), 2);
        assert_eq!(cases[1], TestCase { input: "5 5".into(), expected: "10".into() });
    }

    #[tokio::test]
    async fn missing_fixture_is_none() {
        let dir = tempdir().unwrap();
        assert!(FsTestCases::new(dir.path()).load("bt_1000").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn malformed_fixture_is_an_error() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("bt_1000.json"), "{").unwrap();
        let err = FsTestCases::new(dir.path()).load("bt_1000").await.unwrap_err();
        assert!(matches!(err, GradingError::Fixture { .. }));
    }

    #[test]
    fn override_is_read_next_to_fixture() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("bt_1000.config.json"),
            r#"{"execution":{"run_timeout_ms":250}}"#,
        )
        .unwrap();
        let cfg = FsTestCases::new(dir.path()).execution_override("bt_1000").unwrap();
        assert_eq!(cfg.execution.run_timeout_ms, 250);
    }
}
