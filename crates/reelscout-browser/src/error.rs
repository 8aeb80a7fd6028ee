use thiserror::Error;

pub type Result<T> = std::result::Result<T, BrowserError>;

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("browser launch failed: {0}")]
    Launch(String),

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("browser session lost: {0}")]
    SessionLost(String),

    #[error("invalid selector: {0}")]
    InvalidSelector(String),

    #[error("element interaction failed: {0}")]
    Interaction(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("unknown page handle: {0}")]
    UnknownPage(u64),
}

impl BrowserError {
    /// Whether the underlying browser session is gone.
    #[must_use]
    pub fn is_session_lost(&self) -> bool {
        matches!(self, Self::SessionLost(_))
    }

    /// Whether the failure was a page load or wait that may succeed on retry.
    #[must_use]
    pub fn is_navigation(&self) -> bool {
        matches!(self, Self::Navigation(_) | Self::Timeout(_))
    }
}
