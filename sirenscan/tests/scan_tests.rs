//! Directory and archive scan integration tests
//!
//! Fixtures are built in temporary directories; nothing outside them is read.

use std::fs;
use std::io::{Cursor, Write};
use std::path::Path;

use sirenscan::services::extractor::ExtractError;
use sirenscan::services::{
    extract_records, scan_archive, scan_directory, Record, ScanError, SirenExtractor, SkipReason,
};
use sirenscan_common::ScanLimits;
use tempfile::TempDir;

/// One `<Item>` as the document root yields exactly one record
fn meta(model: &str, siren: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<Item>\n  <modelName>{}</modelName>\n  <sirenSettings value=\"{}\" />\n</Item>\n",
        model, siren
    )
}

fn write_file(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn build_zip(files: &[(&str, String)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default();

    for (name, content) in files {
        writer.start_file(name.to_string(), options).unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

#[test]
fn test_groups_follow_top_level_folders() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "police_pack/stream/deep/carvariations.meta", &meta("police", "11"));
    write_file(dir.path(), "fire_pack/carvariations.meta", &meta("firetruk", "12"));
    write_file(dir.path(), "carvariations.meta", &meta("loose", "13"));

    let records = extract_records(dir.path()).unwrap();

    assert_eq!(
        records,
        vec![
            Record::new("loose", "13", ""),
            Record::new("firetruk", "12", "fire_pack"),
            Record::new("police", "11", "police_pack"),
        ]
    );
}

#[test]
fn test_file_name_match_is_case_insensitive_and_exact() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "a/CARVARIATIONS.META", &meta("upper", "1"));
    write_file(dir.path(), "b/CarVariations.meta", &meta("mixed", "2"));
    write_file(dir.path(), "c/carvariations.meta.bak", &meta("backup", "3"));
    write_file(dir.path(), "d/vehicles.meta", &meta("other", "4"));

    let records = extract_records(dir.path()).unwrap();
    let models: Vec<&str> = records.iter().map(|r| r.model.as_str()).collect();

    assert_eq!(models, vec!["upper", "mixed"]);
}

#[test]
fn test_malformed_file_does_not_abort_siblings() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "a_pack/carvariations.meta", &meta("before", "1"));
    write_file(dir.path(), "b_pack/carvariations.meta", "<Item><modelName>broken</Item>");
    write_file(dir.path(), "c_pack/carvariations.meta", &meta("after", "2"));

    let extraction = SirenExtractor::default().extract(dir.path()).unwrap();

    assert_eq!(extraction.files_matched, 3);
    assert_eq!(
        extraction.records,
        vec![Record::new("before", "1", "a_pack"), Record::new("after", "2", "c_pack")]
    );
    assert_eq!(extraction.skipped.len(), 1);
    assert!(extraction.skipped[0].path.ends_with("b_pack/carvariations.meta"));
    assert!(matches!(extraction.skipped[0].reason, SkipReason::Malformed(_)));
}

#[test]
fn test_undecodable_and_oversized_files_skipped() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("binary")).unwrap();
    fs::write(dir.path().join("binary/carvariations.meta"), [0xFFu8, 0x00, 0xC3, 0x28]).unwrap();
    write_file(
        dir.path(),
        "huge/carvariations.meta",
        &format!("{}<!-- {} -->", meta("huge", "5"), "x".repeat(500)),
    );
    write_file(dir.path(), "small/carvariations.meta", &meta("ok", "6"));

    let limits = ScanLimits {
        max_meta_file_bytes: 256,
        ..ScanLimits::default()
    };

    let extraction = SirenExtractor::new(&limits).extract(dir.path()).unwrap();
    let reasons: Vec<&SkipReason> = extraction.skipped.iter().map(|s| &s.reason).collect();

    assert_eq!(reasons.len(), 2);
    assert!(matches!(reasons[0], SkipReason::Undecodable(_)));
    assert!(matches!(reasons[1], SkipReason::TooLarge { limit: 256, .. }));
    assert_eq!(extraction.records, vec![Record::new("ok", "6", "small")]);
}

#[test]
fn test_zero_and_blank_sirens_produce_nothing() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "p/one/carvariations.meta", &meta("zero", "0"));
    write_file(dir.path(), "p/two/carvariations.meta", &meta("padded", " 0 "));
    write_file(dir.path(), "p/three/carvariations.meta", &meta("", "44"));

    let outcome = scan_directory(dir.path(), &ScanLimits::default()).unwrap();

    assert!(outcome.extraction.records.is_empty());
    assert_eq!(outcome.report(), "No sirenSettings found.\n");
}

#[test]
fn test_empty_tree_reports_nothing_found() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "pack/readme.txt", "no metadata here");

    let outcome = scan_directory(dir.path(), &ScanLimits::default()).unwrap();

    assert_eq!(outcome.extraction.files_matched, 0);
    assert_eq!(outcome.report(), "No sirenSettings found.\n");
}

#[test]
fn test_missing_root_is_error() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope");

    match scan_directory(&missing, &ScanLimits::default()) {
        Err(ScanError::Extract(ExtractError::PathNotFound(path))) => assert_eq!(path, missing),
        other => panic!("Expected PathNotFound, got {:?}", other.map(|o| o.extraction.records)),
    }
}

#[test]
fn test_archive_scan_detects_cross_pack_conflict() {
    let archive = build_zip(&[
        ("vehicles/cara/carvariations.meta", meta("CarA", "101")),
        ("props/carb/carvariations.meta", meta("CarB", "101")),
        ("vehicles/carc/carvariations.meta", meta("CarC", "202")),
    ]);

    let outcome = scan_archive(Cursor::new(archive), &ScanLimits::default()).unwrap();

    assert_eq!(outcome.unpacked.map(|u| u.files_written), Some(3));
    assert_eq!(outcome.conflicts.len(), 1);
    assert!(outcome.conflicts.contains("101"));
    assert!(!outcome.conflicts.contains("202"));
    assert_eq!(
        outcome.report(),
        "CarB: 101 (in props)\n\
         CarA: 101 (in vehicles)\n\
         CarC: 202 (in vehicles)\n\
         \n\
         --- Conflicts Detected ---\n\
         Siren ID 101 used by:\n\
         \x20 - CarB (in props)\n\
         \x20 - CarA (in vehicles)\n\
         \n"
    );
}

#[test]
fn test_same_pack_reuse_is_not_reported() {
    let archive = build_zip(&[
        ("pack/a/carvariations.meta", meta("A", "7")),
        ("pack/b/carvariations.meta", meta("B", "7")),
    ]);

    let outcome = scan_archive(Cursor::new(archive), &ScanLimits::default()).unwrap();

    assert!(outcome.conflicts.is_empty());
    assert!(!outcome.report().contains("Conflicts Detected"));
}

#[test]
fn test_archive_scan_is_repeatable() {
    let archive = build_zip(&[
        ("zeta/carvariations.meta", meta("Z", "1")),
        ("alpha/x/carvariations.meta", meta("A", "1")),
        ("mid/carvariations.meta", meta("M", "2")),
        ("alpha/y/carvariations.meta", meta("B", "2")),
    ]);

    let first = scan_archive(Cursor::new(archive.clone()), &ScanLimits::default()).unwrap();
    let second = scan_archive(Cursor::new(archive), &ScanLimits::default()).unwrap();

    assert_eq!(first.report(), second.report());
    assert_eq!(first.conflicts, second.conflicts);
}

#[test]
fn test_corrupt_archive_rejected() {
    let result = scan_archive(Cursor::new(b"PK\x03\x04 truncated".to_vec()), &ScanLimits::default());
    assert!(matches!(
        result,
        Err(ScanError::Archive(sirenscan::services::archive::ArchiveError::Invalid(_)))
    ));
}
