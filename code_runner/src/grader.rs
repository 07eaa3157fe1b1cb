use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use util::archive::{extract_zip, is_zip};
use util::execution_config::ExecutionLimits;
use util::paths::ensure_dir;

use crate::error::GradingError;
use crate::normalize::{SourceUnit, class_base, normalize_sources};
use crate::process::{ProcessOutcome, ProcessOutput};
use crate::testcases::TestCaseSource;
use crate::toolchain::Toolchain;

/// One submitted artifact to grade.
#[derive(Debug, Clone)]
pub struct GradeRequest {
    pub assignment_id: String,
    pub user_id: String,
    /// Original file name; its extension selects single-file or archive handling.
    pub artifact_name: String,
    pub artifact: Vec<u8>,
    /// When false the pipeline stops after a successful compile.
    pub requires_grading: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    CompileFailed { diagnostics: String },
    /// Compiled successfully; the assignment runs no tests.
    Compiled,
    NoEntryPoint,
    MissingTestCases,
    RuntimeError { diagnostics: String },
    TestFailed {
        case_index: usize,
        input: String,
        actual: String,
        expected: String,
    },
    AllTestsPassed,
}

impl Verdict {
    pub fn passed(&self) -> bool {
        matches!(self, Verdict::Compiled | Verdict::AllTestsPassed)
    }
}

/// Whether `name` is an artifact the pipeline accepts.
pub fn is_supported_artifact(name: &str) -> bool {
    let path = Path::new(name);
    is_zip(path) || is_java_source(path)
}

fn is_java_source(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("java"))
}

#[derive(Clone)]
pub struct Grader {
    toolchain: Arc<dyn Toolchain>,
    testcases: Arc<dyn TestCaseSource>,
    limits: ExecutionLimits,
    workspace_root: PathBuf,
}

impl Grader {
    pub fn new(
        toolchain: Arc<dyn Toolchain>,
        testcases: Arc<dyn TestCaseSource>,
        limits: ExecutionLimits,
        workspace_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            toolchain,
            testcases,
            limits,
            workspace_root: workspace_root.into(),
        }
    }

    /// Grades one artifact inside a fresh workspace that is removed on every
    /// exit path.
    pub async fn grade(&self, req: &GradeRequest) -> Result<Verdict, GradingError> {
        if !is_supported_artifact(&req.artifact_name) {
            return Err(GradingError::UnsupportedArtifact(req.artifact_name.clone()));
        }

        let testcases = self.testcases.clone();
        let assignment_id = req.assignment_id.clone();
        let limits = tokio::task::spawn_blocking(move || testcases.execution_override(&assignment_id))
            .await
            .map_err(|e| GradingError::Io(std::io::Error::other(e)))?
            .map(|cfg| cfg.execution)
            .unwrap_or_else(|| self.limits.clone());

        ensure_dir(&self.workspace_root)?;
        let workspace = tempfile::Builder::new()
            .prefix("grade-")
            .tempdir_in(&self.workspace_root)?;

        let verdict = self.grade_in(workspace.path(), req, &limits).await;

        let path = workspace.path().to_path_buf();
        if let Err(e) = workspace.close() {
            tracing::warn!(path = %path.display(), error = %e, "failed to remove grading workspace");
        }

        match &verdict {
            Ok(v) => tracing::info!(
                assignment_id = %req.assignment_id,
                user_id = %req.user_id,
                passed = v.passed(),
                "graded submission"
            ),
            Err(e) => tracing::warn!(
                assignment_id = %req.assignment_id,
                user_id = %req.user_id,
                error = %e,
                "grading aborted"
            ),
        }
        verdict
    }

    async fn grade_in(
        &self,
        workspace: &Path,
        req: &GradeRequest,
        limits: &ExecutionLimits,
    ) -> Result<Verdict, GradingError> {
        let src_dir = ensure_dir(workspace.join("src"))?;
        let class_dir = ensure_dir(workspace.join("classes"))?;

        let raw = collect_sources(workspace, req, limits).await?;
        if raw.is_empty() {
            return Err(GradingError::InvalidArchive(
                "archive contains no .java files".into(),
            ));
        }

        let base = class_base(&req.user_id, Utc::now().timestamp_millis());
        let units = normalize_sources(&base, raw);
        let mut paths = Vec::with_capacity(units.len());
        for unit in &units {
            let path = src_dir.join(&unit.file_name);
            tokio::fs::write(&path, &unit.source).await?;
            paths.push(path);
        }

        match self.toolchain.compile(&paths, &class_dir, limits).await? {
            ProcessOutcome::Completed(out) if out.success() => {}
            ProcessOutcome::Completed(out) => {
                return Ok(Verdict::CompileFailed {
                    diagnostics: diagnostics(&out),
                });
            }
            ProcessOutcome::TimedOut { limit } => {
                return Ok(Verdict::CompileFailed {
                    diagnostics: format!("compilation exceeded {} seconds", limit.as_secs()),
                });
            }
            ProcessOutcome::OutputLimitExceeded { limit } => {
                return Ok(Verdict::CompileFailed {
                    diagnostics: format!("compiler output exceeded {limit} bytes"),
                });
            }
        }

        if !req.requires_grading {
            return Ok(Verdict::Compiled);
        }

        let Some(entry) = entry_class(&units) else {
            return Ok(Verdict::NoEntryPoint);
        };

        let cases = match self.testcases.load(&req.assignment_id).await? {
            Some(cases) if !cases.is_empty() => cases,
            _ => return Ok(Verdict::MissingTestCases),
        };

        for (case_index, case) in cases.iter().enumerate() {
            let outcome = self
                .toolchain
                .run(&class_dir, &entry, &case.input, limits)
                .await?;
            let stdout = match outcome {
                ProcessOutcome::Completed(out) if out.success() => out.stdout,
                ProcessOutcome::Completed(out) => {
                    return Ok(Verdict::RuntimeError {
                        diagnostics: diagnostics(&out),
                    });
                }
                ProcessOutcome::TimedOut { limit } => {
                    return Ok(Verdict::RuntimeError {
                        diagnostics: format!("time limit of {} ms exceeded", limit.as_millis()),
                    });
                }
                ProcessOutcome::OutputLimitExceeded { limit } => {
                    return Ok(Verdict::RuntimeError {
                        diagnostics: format!("output exceeded {limit} bytes"),
                    });
                }
            };

            let actual = stdout.trim();
            let expected = case.expected.trim();
            if actual != expected {
                return Ok(Verdict::TestFailed {
                    case_index,
                    input: case.input.trim().to_string(),
                    actual: actual.to_string(),
                    expected: expected.to_string(),
                });
            }
        }

        Ok(Verdict::AllTestsPassed)
    }
}

/// `(file name, source)` for every Java unit in the artifact, in archive order.
async fn collect_sources(
    workspace: &Path,
    req: &GradeRequest,
    limits: &ExecutionLimits,
) -> Result<Vec<(String, String)>, GradingError> {
    let name = Path::new(&req.artifact_name);
    if !is_zip(name) {
        let file_name = name
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Main.java".into());
        return Ok(vec![(
            file_name,
            String::from_utf8_lossy(&req.artifact).into_owned(),
        )]);
    }

    let upload_dir = ensure_dir(workspace.join("upload"))?;
    let artifact = req.artifact.clone();
    let max_size = limits.max_uncompressed_size;
    tokio::task::spawn_blocking(move || read_archive(&artifact, max_size, &upload_dir))
        .await
        .map_err(|e| GradingError::Io(std::io::Error::other(e)))?
}

fn read_archive(
    artifact: &[u8],
    max_size: u64,
    upload_dir: &Path,
) -> Result<Vec<(String, String)>, GradingError> {
    let extracted = extract_zip(artifact, max_size, upload_dir)?;
    let mut sources = Vec::new();
    for path in extracted
        .iter()
        .filter(|p| is_java_source(p) && !is_archive_metadata(upload_dir, p))
    {
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        sources.push((file_name, String::from_utf8_lossy(&bytes).into_owned()));
    }
    Ok(sources)
}

/// macOS Finder adds `__MACOSX/` and `._*` resource-fork entries to zips.
fn is_archive_metadata(root: &Path, path: &Path) -> bool {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative.components().any(|c| {
        let part = c.as_os_str().to_string_lossy();
        part == "__MACOSX" || part.starts_with("._")
    })
}

fn entry_class(units: &[SourceUnit]) -> Option<String> {
    let unit = units.iter().find(|u| u.has_entry_point())?;
    unit.class_name.clone().or_else(|| {
        Path::new(&unit.file_name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
    })
}

fn diagnostics(out: &ProcessOutput) -> String {
    let stderr = out.stderr.trim();
    if !stderr.is_empty() {
        return stderr.to_string();
    }
    let stdout = out.stdout.trim();
    if !stdout.is_empty() {
        return stdout.to_string();
    }
    format!("process exited with {}", out.status)
}
