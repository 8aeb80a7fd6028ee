use crate::error::Result;
use reelscout_core::ReelRecord;
use std::io::Write;

/// Write `records` as a pretty-printed JSON array. Unknown counts become `null`.
pub fn write_json<W: Write>(records: &[ReelRecord], mut writer: W) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, records)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use reelscout_core::Count;

    fn sample() -> ReelRecord {
        ReelRecord {
            source_url: "https://www.instagram.com/reel/Abc/".to_string(),
            thumbnail_ref: None,
            like_count: Count::Known(12_300),
            comment_count: Count::Unknown,
            author_name: "creator".to_string(),
            audio_info: Some("Original audio".to_string()),
            collected_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_json_array_with_nulls() {
        let mut out = Vec::new();
        write_json(&[sample()], &mut out).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        let item = &value.as_array().unwrap()[0];
        assert_eq!(item["like_count"], 12_300);
        assert!(item["comment_count"].is_null());
        assert!(item["thumbnail_ref"].is_null());
        assert_eq!(item["author_name"], "creator");
        assert_eq!(item["collected_at"], "2024-05-01T12:00:00Z");
    }

    #[test]
    fn test_empty_output_is_empty_array() {
        let mut out = Vec::new();
        write_json(&[], &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap().trim(), "[]");
    }

    #[test]
    fn test_json_reads_back() {
        let mut out = Vec::new();
        write_json(&[sample()], &mut out).unwrap();
        let records: Vec<ReelRecord> = serde_json::from_slice(&out).unwrap();
        assert_eq!(records, vec![sample()]);
    }
}
