//! Text normalization for scraped values.
//!
//! Instagram renders counts in compact form (`12.3K`, `1M`, `1,234`) and
//! packs likes, comments and author into the `og:description` meta tag.
//! Everything here is pure and never fails: unparseable input becomes
//! [`Count::Unknown`] or `None`.

use regex::Regex;
use reelscout_core::{Count, INSTAGRAM_ORIGIN};
use std::sync::OnceLock;
use url::Url;

/// Longest fraction honoured when applying a multiplier.
const MAX_FRACTION_DIGITS: usize = 9;

fn compact_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^([0-9][0-9,]*)(?:\.([0-9]+))?\s*(?:([KkMmBb])\b)?").expect("valid regex")
    })
}

/// Parse a compact count such as `12.3K`, `1M`, `950` or `1,234 likes`.
///
/// Fractional results are rounded half up: `1.25K` is 1250 and `1.5` is 2.
#[must_use]
pub fn parse_compact_count(text: &str) -> Count {
    let Some(caps) = compact_regex().captures(text.trim()) else {
        return Count::Unknown;
    };

    let whole: String = caps[1].chars().filter(char::is_ascii_digit).collect();
    let Ok(whole) = whole.parse::<u128>() else {
        return Count::Unknown;
    };

    let multiplier: u128 = match caps.get(3).map(|m| m.as_str().to_ascii_uppercase()) {
        Some(s) if s == "K" => 1_000,
        Some(s) if s == "M" => 1_000_000,
        Some(s) if s == "B" => 1_000_000_000,
        _ => 1,
    };

    compact_value(whole, multiplier, caps.get(2).map(|m| m.as_str()))
        .and_then(|value| u64::try_from(value).ok())
        .map_or(Count::Unknown, Count::Known)
}

/// `whole * multiplier` plus the rounded fraction, `None` on overflow.
fn compact_value(whole: u128, multiplier: u128, fraction: Option<&str>) -> Option<u128> {
    let value = whole.checked_mul(multiplier)?;
    let Some(fraction) = fraction else {
        return Some(value);
    };

    let digits = &fraction[..fraction.len().min(MAX_FRACTION_DIGITS)];
    let numerator = digits.parse::<u128>().ok()?;
    let denominator = 10u128.pow(u32::try_from(digits.len()).ok()?);
    // round half up: floor((n * m * 2 + d) / (2 * d))
    let scaled = numerator
        .checked_mul(multiplier)?
        .checked_mul(2)?
        .checked_add(denominator)?;
    value.checked_add(scaled / (2 * denominator))
}

/// Counts and author recovered from an `og:description` string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OgSummary {
    pub likes: Count,
    pub comments: Count,
    pub author: Option<String>,
}

/// Parse `"1,234 likes, 56 comments - someone on May 1, 2024: ..."`.
#[must_use]
pub fn parse_og_description(text: &str) -> OgSummary {
    static LIKES: OnceLock<Regex> = OnceLock::new();
    static COMMENTS: OnceLock<Regex> = OnceLock::new();
    static AUTHOR: OnceLock<Regex> = OnceLock::new();

    let likes = LIKES.get_or_init(|| {
        Regex::new(r"(?i)([0-9][0-9.,]*\s*[KMB]?)\s+likes?\b").expect("valid regex")
    });
    let comments = COMMENTS.get_or_init(|| {
        Regex::new(r"(?i)([0-9][0-9.,]*\s*[KMB]?)\s+comments?\b").expect("valid regex")
    });
    let author = AUTHOR
        .get_or_init(|| Regex::new(r"\s-\s+@?([A-Za-z0-9._]+)\s+on\s").expect("valid regex"));

    OgSummary {
        likes: likes
            .captures(text)
            .map_or(Count::Unknown, |c| parse_compact_count(&c[1])),
        comments: comments
            .captures(text)
            .map_or(Count::Unknown, |c| parse_compact_count(&c[1])),
        author: author.captures(text).map(|c| c[1].to_string()),
    }
}

/// Canonical `https://www.instagram.com/reel/<code>/` form of a reel or post link.
///
/// Accepts relative hrefs, profile-scoped paths (`/someone/reel/<code>/`) and
/// either Instagram host; returns `None` for anything that is not a reel or post.
#[must_use]
pub fn canonical_reel_url(base: &str, href: &str) -> Option<String> {
    static PATH: OnceLock<Regex> = OnceLock::new();
    let path_re = PATH.get_or_init(|| {
        Regex::new(r"^/(?:[A-Za-z0-9._]+/)?(reels?|p)/([A-Za-z0-9_-]+)/?$").expect("valid regex")
    });

    let url = Url::parse(base).ok()?.join(href.trim()).ok()?;
    let host = url.host_str()?;
    if host != "instagram.com" && host != "www.instagram.com" {
        return None;
    }

    let caps = path_re.captures(url.path())?;
    let kind = if &caps[1] == "p" { "p" } else { "reel" };
    Some(format!("{INSTAGRAM_ORIGIN}/{kind}/{}/", &caps[2]))
}

/// Collapse whitespace runs and drop empty strings.
#[must_use]
pub fn clean_text(text: &str) -> Option<String> {
    let joined = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if joined.is_empty() {
        None
    } else {
        Some(joined)
    }
}
