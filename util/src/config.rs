//! Global application configuration manager.
//!
//! `AppConfig` is a lazily initialized, globally accessible singleton containing
//! runtime configuration values loaded from environment variables. It provides
//! thread-safe access and mutation for testing or overrides in runtime environments.

use std::env;
use std::str::FromStr;
use std::sync::{OnceLock, PoisonError, RwLock, RwLockReadGuard};

/// Represents the complete application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: String,
    pub project_name: String,
    pub log_level: String,
    pub log_file: String,
    pub log_to_stdout: bool,
    pub database_path: String,
    pub storage_root: String,
    pub archive_root: String,
    pub archive_folder_name: String,
    pub testcase_root: String,
    pub workspace_root: Option<String>,
    pub eligible_user_ids: Vec<String>,
    pub notify_webhook_url: Option<String>,
    pub timezone_offset_hours: i32,
    pub reminder_interval_secs: u64,
    pub reminder_long_window_mins: i64,
    pub reminder_short_window_mins: i64,
    pub reminder_margin_secs: i64,
    pub scheduler_max_timer_secs: u64,
    pub run_timeout_ms: u64,
    pub compile_timeout_secs: u64,
    pub max_output_bytes: usize,
    pub max_uncompressed_size: u64,
    pub javac_path: String,
    pub java_path: String,
    pub java_opts: String,
}

/// Lazily-initialized, thread-safe singleton instance of `AppConfig`.
static CONFIG_INSTANCE: OnceLock<RwLock<AppConfig>> = OnceLock::new();

/// Reads `key` and parses it, falling back to `default` when unset or malformed.
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "ignoring malformed configuration value");
            default
        }),
        Err(_) => default,
    }
}

fn env_string(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.into())
}

fn env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Splits a comma separated list, dropping blanks.
pub fn parse_id_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

impl AppConfig {
    /// Loads the configuration from `.env` and environment variables.
    ///
    /// Every value has a default, so this never panics. Malformed numbers
    /// are logged and replaced by their default.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            env: env_string("APP_ENV", "development"),
            project_name: env_string("PROJECT_NAME", "deadline-grader"),
            log_level: env_string("LOG_LEVEL", "info"),
            log_file: env_string("LOG_FILE", "engine.log"),
            log_to_stdout: env_string("LOG_TO_STDOUT", "false") == "true",
            database_path: env_string("DATABASE_PATH", "data/engine.db"),
            storage_root: env_string("STORAGE_ROOT", "data/storage"),
            archive_root: env_string("ARCHIVE_ROOT", "data/archive"),
            archive_folder_name: env_string("ARCHIVE_FOLDER_NAME", "Submitted assignments"),
            testcase_root: env_string("TESTCASE_ROOT", "data/testcases"),
            workspace_root: env_optional("WORKSPACE_ROOT"),
            eligible_user_ids: parse_id_list(&env_string("ELIGIBLE_USER_IDS", "")),
            notify_webhook_url: env_optional("NOTIFY_WEBHOOK_URL"),
            timezone_offset_hours: env_or("TIMEZONE_OFFSET_HOURS", 7),
            reminder_interval_secs: env_or("REMINDER_INTERVAL_SECS", 60),
            reminder_long_window_mins: env_or("REMINDER_LONG_WINDOW_MINS", 120),
            reminder_short_window_mins: env_or("REMINDER_SHORT_WINDOW_MINS", 10),
            reminder_margin_secs: env_or("REMINDER_MARGIN_SECS", 60),
            scheduler_max_timer_secs: env_or("SCHEDULER_MAX_TIMER_SECS", 86_400),
            run_timeout_ms: env_or("RUN_TIMEOUT_MS", 5_000),
            compile_timeout_secs: env_or("COMPILE_TIMEOUT_SECS", 30),
            max_output_bytes: env_or("MAX_OUTPUT_BYTES", 1024 * 1024),
            max_uncompressed_size: env_or("MAX_UNCOMPRESSED_SIZE", 10 * 1024 * 1024),
            javac_path: env_string("JAVAC_PATH", "javac"),
            java_path: env_string("JAVA_PATH", "java"),
            java_opts: env_string("JAVA_OPTS", "-Xms32m -Xmx64m"),
        }
    }

    /// Returns a shared reference to the global configuration.
    pub fn global() -> RwLockReadGuard<'static, AppConfig> {
        CONFIG_INSTANCE
            .get_or_init(|| RwLock::new(AppConfig::from_env()))
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Resets the configuration by reloading from environment variables.
    ///
    /// Useful in tests to clear overrides.
    pub fn reset() {
        if let Some(lock) = CONFIG_INSTANCE.get() {
            let mut guard = lock.write().unwrap_or_else(PoisonError::into_inner);
            *guard = AppConfig::from_env();
        }
    }

    /// Generic internal setter for any field in the config.
    fn set_field<F>(setter: F)
    where
        F: FnOnce(&mut AppConfig),
    {
        let lock = CONFIG_INSTANCE.get_or_init(|| RwLock::new(AppConfig::from_env()));
        let mut guard = lock.write().unwrap_or_else(PoisonError::into_inner);
        setter(&mut guard);
    }

    // --- Per-field setters below ---

    pub fn set_storage_root(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.storage_root = value.into());
    }

    pub fn set_archive_root(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.archive_root = value.into());
    }

    pub fn set_testcase_root(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.testcase_root = value.into());
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn parse_id_list_drops_blanks() {
        assert_eq!(
            parse_id_list(" 11, 22 ,,33 "),
            vec!["11".to_string(), "22".to_string(), "33".to_string()]
        );
        assert!(parse_id_list("").is_empty());
    }

    #[test]
    #[serial]
    fn malformed_numbers_fall_back_to_defaults() {
        unsafe {
            env::set_var("RUN_TIMEOUT_MS", "soon");
            env::set_var("REMINDER_MARGIN_SECS", "90");
        }
        let cfg = AppConfig::from_env();
        assert_eq!(cfg.run_timeout_ms, 5_000);
        assert_eq!(cfg.reminder_margin_secs, 90);
        unsafe {
            env::remove_var("RUN_TIMEOUT_MS");
            env::remove_var("REMINDER_MARGIN_SECS");
        }
    }

    #[test]
    #[serial]
    fn setters_override_and_reset_restores() {
        AppConfig::set_storage_root("/tmp/override");
        assert_eq!(AppConfig::global().storage_root, "/tmp/override");
        AppConfig::reset();
        assert_ne!(AppConfig::global().storage_root, "/tmp/override");
    }
}
