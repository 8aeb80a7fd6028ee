//! Writing result files to disk.

use chrono::{TimeZone, Utc};
use reelscout_core::{Count, OutputFormat, ReelRecord};
use reelscout_export::{save, CSV_HEADER};
use std::fs;

fn record(code: &str, likes: Count) -> ReelRecord {
    ReelRecord {
        source_url: format!("https://www.instagram.com/reel/{code}/"),
        thumbnail_ref: None,
        like_count: likes,
        comment_count: Count::Known(4),
        author_name: "creator".to_string(),
        audio_info: None,
        collected_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
    }
}

#[test]
fn test_save_creates_missing_directory() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join("nested").join("output");

    let path = save(&[record("A1", Count::Known(10))], &dir, OutputFormat::Json).unwrap();

    assert!(path.starts_with(&dir));
    let name = path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("reels_"));
    assert!(name.ends_with(".json"));

    let saved: Vec<ReelRecord> = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].like_count, Count::Known(10));
}

#[test]
fn test_save_csv_keeps_order() {
    let tmp = tempfile::tempdir().unwrap();
    let records = vec![record("A1", Count::Unknown), record("B2", Count::Known(1))];

    let path = save(&records, tmp.path(), OutputFormat::Csv).unwrap();
    let text = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(lines[0], CSV_HEADER.join(","));
    assert!(lines[1].starts_with("https://www.instagram.com/reel/A1/,,,4,"));
    assert!(lines[2].starts_with("https://www.instagram.com/reel/B2/,,1,4,"));
}

#[test]
fn test_save_empty_run_still_writes_file() {
    let tmp = tempfile::tempdir().unwrap();

    let json = save(&[], tmp.path(), OutputFormat::Json).unwrap();
    assert_eq!(fs::read_to_string(json).unwrap().trim(), "[]");

    let csv = save(&[], tmp.path(), OutputFormat::Csv).unwrap();
    assert_eq!(fs::read_to_string(csv).unwrap().lines().count(), 1);
}

#[test]
fn test_two_saves_do_not_overwrite() {
    let tmp = tempfile::tempdir().unwrap();

    let first = save(&[record("A1", Count::Unknown)], tmp.path(), OutputFormat::Csv).unwrap();
    let second = save(&[record("B2", Count::Unknown)], tmp.path(), OutputFormat::Csv).unwrap();

    assert_ne!(first, second);
    assert!(fs::read_to_string(first).unwrap().contains("/A1/"));
    assert!(fs::read_to_string(second).unwrap().contains("/B2/"));
}
