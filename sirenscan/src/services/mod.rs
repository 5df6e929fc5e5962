//! Scan services
//!
//! Pure scanning logic, callable without an HTTP server.

pub mod archive;
pub mod conflict_detector;
pub mod extractor;
pub mod pipeline;
pub mod report;

pub use conflict_detector::{find_conflicts, ConflictMap, ModelUsage, SirenConflict};
pub use extractor::{extract_records, Extraction, FileOutcome, Record, SirenExtractor, SkipReason, SkippedFile};
pub use pipeline::{scan_archive, scan_directory, ScanError, ScanOutcome};
pub use report::{render_report, REPORT_FILE_NAME};
