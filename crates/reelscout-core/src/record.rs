//! The scraped record and its count sentinel.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A non-negative count that the site may hide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Count {
    /// Count was visible and parsed
    Known(u64),
    /// Count was hidden, missing or unparseable
    #[default]
    Unknown,
}

impl Count {
    /// The count as an `Option`.
    #[must_use]
    pub fn get(self) -> Option<u64> {
        match self {
            Self::Known(n) => Some(n),
            Self::Unknown => None,
        }
    }

    /// Whether this is the `Unknown` sentinel.
    #[must_use]
    pub fn is_unknown(self) -> bool {
        matches!(self, Self::Unknown)
    }

    /// Keep `self` if known, otherwise fall back to `other`.
    #[must_use]
    pub fn or(self, other: Count) -> Count {
        match self {
            Self::Known(_) => self,
            Self::Unknown => other,
        }
    }
}

impl From<Option<u64>> for Count {
    fn from(value: Option<u64>) -> Self {
        value.map_or(Self::Unknown, Self::Known)
    }
}

impl fmt::Display for Count {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known(n) => write!(f, "{n}"),
            Self::Unknown => f.write_str("unknown"),
        }
    }
}

// `Unknown` travels as `null` so JSON consumers see a plain optional integer.
impl Serialize for Count {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Known(n) => serializer.serialize_u64(*n),
            Self::Unknown => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for Count {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<u64>::deserialize(deserializer).map(Self::from)
    }
}

/// One scraped reel.
///
/// `source_url` is the identity of a record: two records with the same
/// `source_url` describe the same reel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReelRecord {
    /// Canonical link to the reel
    pub source_url: String,
    /// Thumbnail URL or opaque reference
    pub thumbnail_ref: Option<String>,
    /// Like count, `null` when hidden
    pub like_count: Count,
    /// Comment count, `null` when hidden
    pub comment_count: Count,
    /// Creator's account name
    pub author_name: String,
    /// Original-audio label or track name
    pub audio_info: Option<String>,
    /// When the record was extracted
    pub collected_at: DateTime<Utc>,
}

impl ReelRecord {
    /// Compare every field except `collected_at`.
    #[must_use]
    pub fn same_content(&self, other: &ReelRecord) -> bool {
        self.source_url == other.source_url
            && self.thumbnail_ref == other.thumbnail_ref
            && self.like_count == other.like_count
            && self.comment_count == other.comment_count
            && self.author_name == other.author_name
            && self.audio_info == other.audio_info
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ReelRecord {
        ReelRecord {
            source_url: "https://www.instagram.com/reel/Cabc123/".to_string(),
            thumbnail_ref: Some("https://cdn.example.com/thumb.jpg".to_string()),
            like_count: Count::Known(12_300),
            comment_count: Count::Unknown,
            author_name: "creator".to_string(),
            audio_info: None,
            collected_at: Utc::now(),
        }
    }

    #[test]
    fn test_count_serializes_unknown_as_null() {
        assert_eq!(serde_json::to_string(&Count::Unknown).expect("serialize"), "null");
        assert_eq!(serde_json::to_string(&Count::Known(42)).expect("serialize"), "42");

        let parsed: Count = serde_json::from_str("null").expect("deserialize");
        assert_eq!(parsed, Count::Unknown);
    }

    #[test]
    fn test_count_or() {
        assert_eq!(Count::Unknown.or(Count::Known(3)), Count::Known(3));
        assert_eq!(Count::Known(1).or(Count::Known(3)), Count::Known(1));
        assert_eq!(Count::Unknown.or(Count::Unknown), Count::Unknown);
    }

    #[test]
    fn test_record_field_names() {
        let json = serde_json::to_value(sample()).expect("serialize record");
        let obj = json.as_object().expect("record is an object");
        for field in [
            "source_url",
            "thumbnail_ref",
            "like_count",
            "comment_count",
            "author_name",
            "audio_info",
            "collected_at",
        ] {
            assert!(obj.contains_key(field), "missing field {field}");
        }
        assert!(obj["comment_count"].is_null());
        assert_eq!(obj["like_count"], 12_300);
    }

    #[test]
    fn test_same_content_ignores_timestamp() {
        let a = sample();
        let mut b = a.clone();
        b.collected_at = a.collected_at + chrono::Duration::seconds(30);
        assert!(a.same_content(&b));

        b.like_count = Count::Known(1);
        assert!(!a.same_content(&b));
    }
}
