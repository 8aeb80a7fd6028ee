use crate::error::Result;
use crate::json::write_json;
use crate::table::write_csv;
use chrono::{DateTime, Local};
use reelscout_core::{OutputFormat, ReelRecord};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Write `records` to `writer` in `format`.
pub fn write_records<W: Write>(
    records: &[ReelRecord],
    format: OutputFormat,
    writer: W,
) -> Result<()> {
    match format {
        OutputFormat::Json => write_json(records, writer),
        OutputFormat::Csv => write_csv(records, writer),
    }
}

/// `reels_<YYYYmmdd_HHMMSS>.<ext>` for a run finishing at `at`.
#[must_use]
pub fn output_file_name(format: OutputFormat, at: DateTime<Local>) -> String {
    format!("reels_{}.{}", at.format("%Y%m%d_%H%M%S"), format.extension())
}

/// Create a new file for `name` in `dir`, numbering repeats within the same second.
///
/// Creation is exclusive, so a file written concurrently under the same name is
/// never truncated; the next suffix is tried instead.
fn create_unique(dir: &Path, name: &str, format: OutputFormat) -> Result<(PathBuf, File)> {
    let stem = name.trim_end_matches(&format!(".{}", format.extension()));
    let mut n = 1u32;
    loop {
        let path = if n == 1 {
            dir.join(name)
        } else {
            dir.join(format!("{stem}_{n}.{}", format.extension()))
        };
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => n += 1,
            Err(e) => return Err(e.into()),
        }
    }
}

/// Save `records` under `dir`, creating it if needed. Returns the written path.
///
/// An empty record list still produces a file (`[]` or a bare CSV header).
pub fn save(records: &[ReelRecord], dir: &Path, format: OutputFormat) -> Result<PathBuf> {
    if !dir.exists() {
        fs::create_dir_all(dir)?;
    }

    let name = output_file_name(format, Local::now());
    let (path, file) = create_unique(dir, &name, format)?;
    write_records(records, format, BufWriter::new(file))?;

    tracing::info!(path = %path.display(), records = records.len(), ?format, "results saved");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_file_name_format() {
        let at = Local.with_ymd_and_hms(2024, 1, 15, 7, 5, 1).unwrap();
        assert_eq!(
            output_file_name(OutputFormat::Json, at),
            "reels_20240115_070501.json"
        );
        assert_eq!(
            output_file_name(OutputFormat::Csv, at),
            "reels_20240115_070501.csv"
        );
    }

    #[test]
    fn test_existing_files_are_never_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let name = "reels_20240115_070501.csv";
        fs::write(dir.path().join(name), "earlier run").unwrap();
        fs::write(dir.path().join("reels_20240115_070501_2.csv"), "another").unwrap();

        let (path, _file) = create_unique(dir.path(), name, OutputFormat::Csv).unwrap();
        assert_eq!(path, dir.path().join("reels_20240115_070501_3.csv"));
        assert_eq!(
            fs::read_to_string(dir.path().join(name)).unwrap(),
            "earlier run"
        );
        assert_eq!(
            fs::read_to_string(dir.path().join("reels_20240115_070501_2.csv")).unwrap(),
            "another"
        );
    }

    #[test]
    fn test_first_file_keeps_plain_name() {
        let dir = tempfile::tempdir().unwrap();
        let name = "reels_20240115_070501.json";

        let (first, _file) = create_unique(dir.path(), name, OutputFormat::Json).unwrap();
        assert_eq!(first, dir.path().join(name));

        let (second, _file) = create_unique(dir.path(), name, OutputFormat::Json).unwrap();
        assert_eq!(second, dir.path().join("reels_20240115_070501_2.json"));
    }

    #[test]
    fn test_missing_directory_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent");

        let err = create_unique(&missing, "reels_20240115_070501.csv", OutputFormat::Csv).unwrap_err();
        assert!(matches!(err, crate::error::ExportError::Io(_)));
    }
}
