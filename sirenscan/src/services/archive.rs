//! Zip archive unpacking with resource budgets

use std::fs;
use std::io::{self, Read, Seek};
use std::path::Path;

use sirenscan_common::ScanLimits;
use thiserror::Error;

/// Archive unpacking errors
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Not a readable zip archive
    #[error("Invalid or corrupt ZIP: {0}")]
    Invalid(String),

    /// More entries than allowed
    #[error("Archive has {count} entries, limit is {limit}")]
    TooManyEntries { count: usize, limit: usize },

    /// Uncompressed content exceeds the budget
    #[error("Archive expands beyond {limit} bytes")]
    TooLarge { limit: u64 },

    /// Filesystem error while writing entries
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl From<zip::result::ZipError> for ArchiveError {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::Io(e) => ArchiveError::Io(e),
            other => ArchiveError::Invalid(other.to_string()),
        }
    }
}

/// Counts from one unpack
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnpackSummary {
    pub files_written: usize,
    pub bytes_written: u64,
    /// Entries dropped for escaping the destination
    pub unsafe_entries: usize,
}

/// Unpack a zip archive into `dest`
///
/// The size budget is enforced on bytes actually written, not on the sizes
/// declared in entry headers. Entries whose names would land outside `dest`
/// are skipped.
pub fn unpack_zip<R: Read + Seek>(
    reader: R,
    dest: &Path,
    limits: &ScanLimits,
) -> Result<UnpackSummary, ArchiveError> {
    let mut archive = zip::ZipArchive::new(reader)?;

    if archive.len() > limits.max_archive_entries {
        return Err(ArchiveError::TooManyEntries {
            count: archive.len(),
            limit: limits.max_archive_entries,
        });
    }

    let mut summary = UnpackSummary::default();

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;

        let entry_path = match entry.enclosed_name() {
            Some(p) => p.to_path_buf(),
            None => {
                tracing::warn!("Skipping unsafe archive entry: {}", entry.name());
                summary.unsafe_entries += 1;
                continue;
            }
        };

        let output_path = dest.join(&entry_path);

        if entry.is_dir() {
            fs::create_dir_all(&output_path)?;
            continue;
        }

        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let remaining = limits.max_extracted_bytes.saturating_sub(summary.bytes_written);
        let mut outfile = fs::File::create(&output_path)?;
        let copied = io::copy(&mut (&mut entry).take(remaining.saturating_add(1)), &mut outfile)?;

        if copied > remaining {
            return Err(ArchiveError::TooLarge {
                limit: limits.max_extracted_bytes,
            });
        }

        summary.bytes_written += copied;
        summary.files_written += 1;
    }

    tracing::debug!(
        "Unpacked {} files ({} bytes) into {}",
        summary.files_written,
        summary.bytes_written,
        dest.display()
    );

    Ok(summary)
}
