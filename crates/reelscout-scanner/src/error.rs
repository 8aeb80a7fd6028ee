use reelscout_browser::BrowserError;
use reelscout_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Login challenge required: {0}")]
    ChallengeRequired(String),

    #[error("Extraction failed for {entry_point}: {reason}")]
    Extraction { entry_point: String, reason: String },

    #[error("Feed requires login: {0}")]
    LoginRequired(String),

    #[error("Browser error: {0}")]
    Browser(#[from] BrowserError),

    #[error("Invalid run options: {0}")]
    Core(#[from] CoreError),
}

impl ScanError {
    pub(crate) fn extraction(entry_point: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Extraction {
            entry_point: entry_point.into(),
            reason: reason.into(),
        }
    }

    /// Whether a retry with backoff may succeed.
    ///
    /// Only page-load failures and lost sessions qualify; extraction and
    /// authentication outcomes are final.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Browser(e) => e.is_navigation() || e.is_session_lost(),
            _ => false,
        }
    }

    #[must_use]
    pub fn is_session_lost(&self) -> bool {
        matches!(self, Self::Browser(e) if e.is_session_lost())
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;
