use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;
use util::execution_config::{ExecutionLimits, JavaSettings};

use crate::error::GradingError;
use crate::process::{ProcessOutcome, run_supervised};

/// Compiler and runtime used by the [`Grader`](crate::Grader).
#[async_trait]
pub trait Toolchain: Send + Sync {
    /// Compiles `sources` together, writing class files into `out_dir`.
    async fn compile(
        &self,
        sources: &[PathBuf],
        out_dir: &Path,
        limits: &ExecutionLimits,
    ) -> Result<ProcessOutcome, GradingError>;

    /// Runs `entry_class` from `class_dir`, feeding `stdin`.
    async fn run(
        &self,
        class_dir: &Path,
        entry_class: &str,
        stdin: &str,
        limits: &ExecutionLimits,
    ) -> Result<ProcessOutcome, GradingError>;
}

/// `javac` / `java` from the host.
#[derive(Debug, Clone)]
pub struct JavaToolchain {
    settings: JavaSettings,
}

impl JavaToolchain {
    pub fn new(settings: JavaSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl Toolchain for JavaToolchain {
    async fn compile(
        &self,
        sources: &[PathBuf],
        out_dir: &Path,
        limits: &ExecutionLimits,
    ) -> Result<ProcessOutcome, GradingError> {
        let mut cmd = Command::new(&self.settings.javac_path);
        cmd.arg("-encoding")
            .arg("UTF-8")
            .arg("-d")
            .arg(out_dir)
            .args(sources)
            .current_dir(out_dir);

        tracing::debug!(files = sources.len(), "compiling submission");
        Ok(run_supervised(cmd, b"", limits.compile_timeout(), limits.max_output_bytes).await?)
    }

    async fn run(
        &self,
        class_dir: &Path,
        entry_class: &str,
        stdin: &str,
        limits: &ExecutionLimits,
    ) -> Result<ProcessOutcome, GradingError> {
        let mut cmd = Command::new(&self.settings.java_path);
        cmd.args(&self.settings.java_opts)
            .arg("-cp")
            .arg(class_dir)
            .arg(entry_class)
            .current_dir(class_dir);

        Ok(run_supervised(
            cmd,
            stdin.as_bytes(),
            limits.run_timeout(),
            limits.max_output_bytes,
        )
        .await?)
    }
}
