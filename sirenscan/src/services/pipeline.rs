//! End-to-end scan: unpack, extract, detect conflicts
//!
//! Each scan owns its working directory. The unpacked tree is removed when
//! the scan returns, whether it succeeded or not.

use std::io::{Read, Seek};
use std::path::Path;

use sirenscan_common::ScanLimits;
use thiserror::Error;

use super::archive::{unpack_zip, ArchiveError, UnpackSummary};
use super::conflict_detector::{find_conflicts, ConflictMap};
use super::extractor::{ExtractError, Extraction, SirenExtractor};
use super::report::render_report;

/// Fatal scan errors
#[derive(Debug, Error)]
pub enum ScanError {
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    /// Temporary working directory could not be created
    #[error("Failed to create working directory: {0}")]
    WorkDir(#[source] std::io::Error),
}

/// Everything a completed scan produced
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub extraction: Extraction,
    pub conflicts: ConflictMap,
    /// Present when the scan started from an archive
    pub unpacked: Option<UnpackSummary>,
}

impl ScanOutcome {
    /// Render the downloadable text report
    pub fn report(&self) -> String {
        render_report(&self.extraction.records, &self.conflicts)
    }
}

/// Scan an already unpacked directory tree in place
pub fn scan_directory(root: &Path, limits: &ScanLimits) -> Result<ScanOutcome, ScanError> {
    let extraction = SirenExtractor::new(limits).extract(root)?;
    let conflicts = find_conflicts(&extraction.records);

    Ok(ScanOutcome {
        extraction,
        conflicts,
        unpacked: None,
    })
}

/// Unpack a zip archive into a fresh temporary directory and scan it
///
/// Groups are the archive's top-level folders.
pub fn scan_archive<R: Read + Seek>(reader: R, limits: &ScanLimits) -> Result<ScanOutcome, ScanError> {
    let workdir = tempfile::Builder::new()
        .prefix("sirenscan-")
        .tempdir()
        .map_err(ScanError::WorkDir)?;

    let unpacked = unpack_zip(reader, workdir.path(), limits)?;
    tracing::info!(
        "Archive unpacked: {} files, {} bytes",
        unpacked.files_written,
        unpacked.bytes_written
    );

    let mut outcome = scan_directory(workdir.path(), limits)?;
    outcome.unpacked = Some(unpacked);

    Ok(outcome)
}
