use serde::{Deserialize, Serialize};
use std::{fs, path::Path, time::Duration};

use crate::config::AppConfig;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ExecutionLimits {
    /// Wall clock limit for one test-case run.
    #[serde(default = "default_run_timeout_ms")]
    pub run_timeout_ms: u64,

    #[serde(default = "default_compile_timeout_secs")]
    pub compile_timeout_secs: u64,

    /// Cap applied to each captured stream (stdout, stderr).
    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: usize,

    #[serde(default = "default_max_uncompressed_size")]
    pub max_uncompressed_size: u64,
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        Self {
            run_timeout_ms: default_run_timeout_ms(),
            compile_timeout_secs: default_compile_timeout_secs(),
            max_output_bytes: default_max_output_bytes(),
            max_uncompressed_size: default_max_uncompressed_size(),
        }
    }
}

impl ExecutionLimits {
    pub fn run_timeout(&self) -> Duration {
        Duration::from_millis(self.run_timeout_ms)
    }

    pub fn compile_timeout(&self) -> Duration {
        Duration::from_secs(self.compile_timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct JavaSettings {
    #[serde(default = "default_javac")]
    pub javac_path: String,
    #[serde(default = "default_java")]
    pub java_path: String,
    #[serde(default = "default_java_opts")]
    pub java_opts: Vec<String>,
}

impl Default for JavaSettings {
    fn default() -> Self {
        Self {
            javac_path: default_javac(),
            java_path: default_java(),
            java_opts: default_java_opts(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ExecutionConfig {
    #[serde(default)]
    pub execution: ExecutionLimits,

    #[serde(default)]
    pub java: JavaSettings,
}

impl ExecutionConfig {
    /// Builds the process-wide defaults from the environment configuration.
    pub fn from_app_config(cfg: &AppConfig) -> Self {
        Self {
            execution: ExecutionLimits {
                run_timeout_ms: cfg.run_timeout_ms,
                compile_timeout_secs: cfg.compile_timeout_secs,
                max_output_bytes: cfg.max_output_bytes,
                max_uncompressed_size: cfg.max_uncompressed_size,
            },
            java: JavaSettings {
                javac_path: cfg.javac_path.clone(),
                java_path: cfg.java_path.clone(),
                java_opts: cfg.java_opts.split_whitespace().map(String::from).collect(),
            },
        }
    }

    /// Reads an optional per-assignment override stored next to the fixtures
    /// as `{assignment_id}.config.json`. Missing or invalid files yield `None`.
    pub fn load_override(testcase_root: &Path, assignment_id: &str) -> Option<Self> {
        let path = testcase_root.join(format!("{assignment_id}.config.json"));
        let raw = fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&raw) {
            Ok(cfg) => Some(cfg),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "invalid execution config override");
                None
            }
        }
    }
}

//Default Functions

fn default_run_timeout_ms() -> u64 {
    5_000
}

fn default_compile_timeout_secs() -> u64 {
    30
}

fn default_max_output_bytes() -> usize {
    1024 * 1024
}

fn default_max_uncompressed_size() -> u64 {
    10 * 1024 * 1024
}

fn default_javac() -> String {
    "javac".to_string()
}

fn default_java() -> String {
    "java".to_string()
}

fn default_java_opts() -> Vec<String> {
    vec!["-Xms32m".to_string(), "-Xmx64m".to_string()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn partial_override_keeps_defaults() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("bt_1000.config.json"),
            r#"{ "execution": { "run_timeout_ms": 250 } }"#,
        )
        .unwrap();

        let cfg = ExecutionConfig::load_override(dir.path(), "bt_1000").unwrap();
        assert_eq!(cfg.execution.run_timeout_ms, 250);
        assert_eq!(cfg.execution.max_output_bytes, 1024 * 1024);
        assert_eq!(cfg.java, JavaSettings::default());
    }

    #[test]
    fn missing_or_broken_override_is_none() {
        let dir = tempdir().unwrap();
        assert!(ExecutionConfig::load_override(dir.path(), "bt_1000").is_none());
        fs::write(dir.path().join("bt_2000.config.json"), "{ nope").unwrap();
        assert!(ExecutionConfig::load_override(dir.path(), "bt_2000").is_none());
    }
}
