//! Plain-text scan report

use super::conflict_detector::ConflictMap;
use super::extractor::Record;

/// Download name for the rendered report
pub const REPORT_FILE_NAME: &str = "siren_conflicts_results.txt";

const EMPTY_REPORT: &str = "No sirenSettings found.";
const CONFLICTS_HEADER: &str = "--- Conflicts Detected ---";

/// Render records and conflicts as the downloadable text report
///
/// Output depends only on its inputs, so identical scans produce identical
/// bytes.
pub fn render_report(records: &[Record], conflicts: &ConflictMap) -> String {
    let mut out = String::new();

    if records.is_empty() {
        out.push_str(EMPTY_REPORT);
        out.push('\n');
        return out;
    }

    for record in records {
        out.push_str(&format!("{}: {} (in {})\n", record.model, record.siren_id, record.group));
    }

    if !conflicts.is_empty() {
        out.push('\n');
        out.push_str(CONFLICTS_HEADER);
        out.push('\n');

        for conflict in conflicts {
            out.push_str(&format!("Siren ID {} used by:\n", conflict.siren_id));
            for usage in &conflict.usages {
                out.push_str(&format!("  - {} (in {})\n", usage.model, usage.group));
            }
            out.push('\n');
        }
    }

    out
}
