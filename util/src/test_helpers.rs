use crate::config::AppConfig;
use tempfile::TempDir;

/// Creates a unique temporary directory and points `STORAGE_ROOT`, `ARCHIVE_ROOT`
/// and `TESTCASE_ROOT` at subfolders of it for the duration of the test. The
/// directory is automatically cleaned up when the returned `TempDir` is dropped.
///
/// Keep the returned `TempDir` in scope for as long as you need the files.
/// Tests calling this mutate process-global config and should be `#[serial]`.
pub fn setup_test_storage_root() -> TempDir {
    let tmp = TempDir::new().expect("failed to create tempdir");
    let abs = tmp
        .path()
        .canonicalize()
        .unwrap_or_else(|_| tmp.path().to_path_buf());
    AppConfig::set_storage_root(abs.join("storage").to_string_lossy());
    AppConfig::set_archive_root(abs.join("archive").to_string_lossy());
    AppConfig::set_testcase_root(abs.join("testcases").to_string_lossy());
    tmp
}
