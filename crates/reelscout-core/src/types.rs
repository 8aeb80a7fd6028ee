//! Shared types used across reelscout.
//!
//! Newtypes here validate on construction so that a `ScrapeTarget` or
//! `Credentials` value is always well-formed once it exists.

use crate::error::CoreError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;
use url::Url;
use zeroize::Zeroizing;

/// Origin every relative Instagram link is resolved against.
pub const INSTAGRAM_ORIGIN: &str = "https://www.instagram.com";

/// A hashtag without its leading `#`.
///
/// Hashtags must be one or more letters, digits or underscores (any script).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Hashtag(String);

impl Hashtag {
    /// Create a new `Hashtag`, stripping a leading `#` and surrounding whitespace.
    ///
    /// # Errors
    /// Returns error if the remaining tag is empty or contains non-word characters.
    pub fn new(tag: impl AsRef<str>) -> Result<Self, CoreError> {
        let tag = tag.as_ref().trim().trim_start_matches('#');
        Self::validate(tag)?;
        Ok(Self(tag.to_string()))
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// URL of the public hashtag feed, e.g. `https://www.instagram.com/explore/tags/fitness/`.
    #[must_use]
    pub fn feed_url(&self) -> String {
        let mut url = Url::parse(INSTAGRAM_ORIGIN).expect("valid origin URL");
        url.path_segments_mut()
            .expect("http URL has path segments")
            .pop_if_empty()
            .extend(["explore", "tags", self.0.as_str(), ""]);
        url.to_string()
    }

    fn validate(tag: &str) -> Result<(), CoreError> {
        static TAG_REGEX: OnceLock<Regex> = OnceLock::new();
        let regex = TAG_REGEX.get_or_init(|| Regex::new(r"^[\p{L}\p{N}_]+$").expect("valid regex"));

        if tag.is_empty() {
            return Err(CoreError::Validation("hashtag must not be empty".to_string()));
        }
        if regex.is_match(tag) {
            Ok(())
        } else {
            Err(CoreError::Validation(format!(
                "invalid hashtag: must contain only letters, digits or underscores, got '{tag}'"
            )))
        }
    }
}

impl TryFrom<String> for Hashtag {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Hashtag> for String {
    fn from(tag: Hashtag) -> Self {
        tag.0
    }
}

impl fmt::Display for Hashtag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An absolute `http`/`https` URL pointing at a single reel or post.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TargetUrl(String);

impl TargetUrl {
    /// Create a new `TargetUrl`.
    ///
    /// # Errors
    /// Returns error if the value is not an absolute http(s) URL with a host.
    pub fn new(url: impl AsRef<str>) -> Result<Self, CoreError> {
        let raw = url.as_ref().trim();
        let parsed = Url::parse(raw)
            .map_err(|e| CoreError::Validation(format!("invalid target URL '{raw}': {e}")))?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(CoreError::Validation(format!(
                "invalid target URL: scheme must be http or https, got '{}'",
                parsed.scheme()
            )));
        }
        if parsed.host_str().is_none() {
            return Err(CoreError::Validation(format!(
                "invalid target URL: no host in '{raw}'"
            )));
        }
        Ok(Self(raw.to_string()))
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TargetUrl {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TargetUrl> for String {
    fn from(url: TargetUrl) -> Self {
        url.0
    }
}

impl fmt::Display for TargetUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a run scrapes: a hashtag feed or one specific reel.
///
/// Serialized tagged by the populated variant: `{"hashtag": "fitness"}` or
/// `{"url": "https://..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrapeTarget {
    /// A public hashtag feed
    Hashtag(Hashtag),
    /// A single reel URL
    Url(TargetUrl),
}

impl ScrapeTarget {
    /// Build a hashtag target.
    pub fn hashtag(tag: impl AsRef<str>) -> Result<Self, CoreError> {
        Hashtag::new(tag).map(Self::Hashtag)
    }

    /// Build a single-URL target.
    pub fn url(url: impl AsRef<str>) -> Result<Self, CoreError> {
        TargetUrl::new(url).map(Self::Url)
    }

    /// Build a target from two optional inputs, exactly one of which must be set.
    ///
    /// Blank strings count as unset.
    ///
    /// # Errors
    /// Returns error if both or neither are set, or if the set value is invalid.
    pub fn from_parts(hashtag: Option<&str>, url: Option<&str>) -> Result<Self, CoreError> {
        let hashtag = hashtag.filter(|s| !s.trim().is_empty());
        let url = url.filter(|s| !s.trim().is_empty());

        match (hashtag, url) {
            (Some(tag), None) => Self::hashtag(tag),
            (None, Some(url)) => Self::url(url),
            (Some(_), Some(_)) => Err(CoreError::Validation(
                "target must be either a hashtag or a URL, not both".to_string(),
            )),
            (None, None) => Err(CoreError::Validation(
                "a hashtag or a target URL is required".to_string(),
            )),
        }
    }
}

impl fmt::Display for ScrapeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hashtag(tag) => write!(f, "{tag}"),
            Self::Url(url) => write!(f, "{url}"),
        }
    }
}

/// Login credentials. The password is wiped from memory on drop.
#[derive(Clone)]
pub struct Credentials {
    username: String,
    password: Zeroizing<String>,
}

impl Credentials {
    /// Create credentials.
    ///
    /// # Errors
    /// Returns error if either value is empty.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Result<Self, CoreError> {
        let username = username.into().trim().to_string();
        let password = Zeroizing::new(password.into());

        if username.is_empty() || password.is_empty() {
            return Err(CoreError::Validation(
                "username and password are both required".to_string(),
            ));
        }
        Ok(Self { username, password })
    }

    /// Account name.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Account password.
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Authentication state of a browser session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthState {
    /// No login was attempted, or it was skipped
    #[default]
    Anonymous,
    /// Login landmark was observed
    Authenticated,
}
