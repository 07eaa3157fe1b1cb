use crate::config::AppConfig;
use std::{
    fs, io,
    path::{Path, PathBuf},
};

/// Create a directory (and all parents) if it doesn't exist, and return the path.
pub fn ensure_dir<P: AsRef<Path>>(path: P) -> io::Result<PathBuf> {
    let p = path.as_ref();
    fs::create_dir_all(p)?;
    Ok(p.to_path_buf())
}

/// Resolves a possibly relative configured path against current_dir().
pub fn absolute(path: &str) -> PathBuf {
    let p = PathBuf::from(path);
    if p.is_absolute() {
        p
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(p)
    }
}

/// Storage root (absolute), from `STORAGE_ROOT`.
pub fn storage_root(cfg: &AppConfig) -> PathBuf {
    absolute(&cfg.storage_root)
}

/// Archive root (absolute), from `ARCHIVE_ROOT`.
pub fn archive_root(cfg: &AppConfig) -> PathBuf {
    absolute(&cfg.archive_root)
}

/// Directory holding `{assignment_id}.json` test-case fixtures.
pub fn testcase_root(cfg: &AppConfig) -> PathBuf {
    absolute(&cfg.testcase_root)
}

/// Parent directory for ephemeral grading workspaces.
pub fn workspace_root(cfg: &AppConfig) -> PathBuf {
    match &cfg.workspace_root {
        Some(root) => absolute(root),
        None => std::env::temp_dir(),
    }
}

// ─── Submission tree ────────────────────────────────────────────────

// {root}/submissions
pub fn submissions_dir(root: &Path) -> PathBuf {
    root.join("submissions")
}

// {root}/submissions/{assignment_id}
pub fn assignment_submissions_dir(root: &Path, assignment_id: &str) -> PathBuf {
    submissions_dir(root).join(assignment_id)
}

// {root}/submissions/{assignment_id}/{username}_{user_id}
pub fn user_submission_dir(root: &Path, assignment_id: &str, user_folder: &str) -> PathBuf {
    assignment_submissions_dir(root, assignment_id).join(user_folder)
}

/// Folder name for one submitter: `{sanitized username}_{user_id}`.
pub fn user_folder_name(username: &str, user_id: &str) -> String {
    format!("{}_{}", sanitize_segment(username), sanitize_segment(user_id))
}

/// Fixture file for an assignment's ordered test cases.
pub fn testcase_path(root: &Path, assignment_id: &str) -> PathBuf {
    root.join(format!("{assignment_id}.json"))
}

/// Replaces characters that are unsafe in a single path segment with `_`.
pub fn sanitize_segment(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    match cleaned.trim() {
        "" | "." | ".." => "_".to_string(),
        trimmed => trimmed.to_string(),
    }
}
