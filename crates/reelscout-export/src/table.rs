use crate::error::Result;
use chrono::SecondsFormat;
use reelscout_core::{Count, ReelRecord};
use std::io::Write;

/// Column order of the CSV output.
pub const CSV_HEADER: [&str; 7] = [
    "source_url",
    "thumbnail_ref",
    "like_count",
    "comment_count",
    "author_name",
    "audio_info",
    "collected_at",
];

fn count_cell(count: Count) -> String {
    count.get().map(|n| n.to_string()).unwrap_or_default()
}

/// Write `records` as CSV with a header row. Unknown or absent values are empty cells.
///
/// The header is written even when there are no records.
pub fn write_csv<W: Write>(records: &[ReelRecord], writer: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(CSV_HEADER)?;

    for record in records {
        let likes = count_cell(record.like_count);
        let comments = count_cell(record.comment_count);
        let collected_at = record
            .collected_at
            .to_rfc3339_opts(SecondsFormat::AutoSi, true);

        writer.write_record([
            record.source_url.as_str(),
            record.thumbnail_ref.as_deref().unwrap_or_default(),
            likes.as_str(),
            comments.as_str(),
            record.author_name.as_str(),
            record.audio_info.as_deref().unwrap_or_default(),
            collected_at.as_str(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}
