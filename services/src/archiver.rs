use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use db::repositories::AssignmentRepository;
use util::paths::{assignment_submissions_dir, sanitize_segment};

use crate::collaborators::Archiver;

const TITLE_CHARS: usize = 50;

/// Copies stored submissions into a local archive tree:
/// `{archive_root}/{folder}/{id} - {title}/{user folder}/...`.
#[derive(Clone)]
pub struct FsArchiver {
    store: AssignmentRepository,
    storage_root: PathBuf,
    archive_root: PathBuf,
    folder_name: String,
}

impl FsArchiver {
    pub fn new(
        store: AssignmentRepository,
        storage_root: impl Into<PathBuf>,
        archive_root: impl Into<PathBuf>,
        folder_name: impl Into<String>,
    ) -> Self {
        Self {
            store,
            storage_root: storage_root.into(),
            archive_root: archive_root.into(),
            folder_name: folder_name.into(),
        }
    }
}

/// `{id} - {first 50 characters of the body}`, safe as one path segment.
pub fn archive_folder_name(assignment_id: &str, body: &str) -> String {
    let flat = body.split_whitespace().collect::<Vec<_>>().join(" ");
    let title: String = flat.chars().take(TITLE_CHARS).collect();
    sanitize_segment(&format!("{assignment_id} - {title}"))
}

#[async_trait]
impl Archiver for FsArchiver {
    async fn archive(&self, assignment_id: &str) -> anyhow::Result<()> {
        let assignment = self
            .store
            .load(assignment_id)
            .await
            .with_context(|| format!("loading assignment {assignment_id}"))?;

        let source = assignment_submissions_dir(&self.storage_root, assignment_id);
        let destination = self
            .archive_root
            .join(sanitize_segment(&self.folder_name))
            .join(archive_folder_name(assignment_id, &assignment.body));

        let copied = tokio::task::spawn_blocking(move || copy_submissions(&source, &destination))
            .await
            .context("archive task panicked")??;

        tracing::info!(assignment_id, users = copied, "submissions archived");
        Ok(())
    }
}

/// Copies each user folder under `source`. A missing `source` means nobody
/// submitted and is not an error.
fn copy_submissions(source: &Path, destination: &Path) -> anyhow::Result<usize> {
    if !source.exists() {
        return Ok(0);
    }
    fs::create_dir_all(destination)
        .with_context(|| format!("creating {}", destination.display()))?;

    let mut users = 0;
    for entry in fs::read_dir(source)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            copy_tree(&entry.path(), &destination.join(entry.file_name()))
                .with_context(|| format!("copying {}", entry.path().display()))?;
            users += 1;
        }
    }
    Ok(users)
}

fn copy_tree(from: &Path, to: &Path) -> io::Result<()> {
    fs::create_dir_all(to)?;
    for entry in fs::read_dir(from)? {
        let entry = entry?;
        let target = to.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_tree(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), target)?;
        }
    }
    Ok(())
}
