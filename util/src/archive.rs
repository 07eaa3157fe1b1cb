//! Zip extraction for submitted artifacts.

use std::fs::{self, File};
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};

use thiserror::Error;
use zip::read::ZipArchive;
use zip::result::ZipError;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("invalid zip archive: {0}")]
    Zip(#[from] ZipError),
    #[error("zip archive contains an invalid path: {0}")]
    UnsafePath(String),
    #[error("uncompressed archive size exceeds {limit} bytes")]
    TooLarge { limit: u64 },
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Checks whether the file name carries the `.zip` extension.
pub fn is_zip(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"))
}

/// Extracts every entry of a zip archive into `destination_dir`, returning the
/// extracted file paths in archive order.
///
/// Entries escaping the destination (zip slip) and archives whose declared
/// uncompressed size exceeds `max_uncompressed_size` are rejected before any
/// further file is written.
pub fn extract_zip(
    archive_bytes: &[u8],
    max_uncompressed_size: u64,
    destination_dir: &Path,
) -> Result<Vec<PathBuf>, ArchiveError> {
    let mut archive = ZipArchive::new(Cursor::new(archive_bytes))?;
    let mut total_uncompressed_size: u64 = 0;
    let mut extracted = Vec::new();

    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        let relative = file
            .enclosed_name()
            .ok_or_else(|| ArchiveError::UnsafePath(file.name().to_string()))?;
        let outpath = destination_dir.join(relative);

        total_uncompressed_size = total_uncompressed_size.saturating_add(file.size());
        if total_uncompressed_size > max_uncompressed_size {
            return Err(ArchiveError::TooLarge {
                limit: max_uncompressed_size,
            });
        }

        if file.is_dir() {
            fs::create_dir_all(&outpath)?;
        } else {
            if let Some(p) = outpath.parent() {
                fs::create_dir_all(p)?;
            }
            let mut outfile = File::create(&outpath)?;
            io::copy(&mut file, &mut outfile)?;
            extracted.push(outpath);
        }
    }

    Ok(extracted)
}
