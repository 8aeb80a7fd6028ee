use reelscout_browser::{BrowserError, SessionDriver};
use reelscout_core::AuthState;

/// One live browser session plus the state a run accumulates on it.
///
/// Components borrow the session mutably for each step; nothing about it is
/// global. Dropping a session without calling [`close`](Self::close) leaks
/// the browser process, so the orchestrator always closes it.
pub struct ScrapeSession {
    driver: Box<dyn SessionDriver>,
    auth_state: AuthState,
    collected: usize,
    closed: bool,
}

impl ScrapeSession {
    #[must_use]
    pub fn new(driver: Box<dyn SessionDriver>) -> Self {
        Self {
            driver,
            auth_state: AuthState::Anonymous,
            collected: 0,
            closed: false,
        }
    }

    pub fn driver(&mut self) -> &mut dyn SessionDriver {
        self.driver.as_mut()
    }

    #[must_use]
    pub fn auth_state(&self) -> AuthState {
        self.auth_state
    }

    pub fn set_auth_state(&mut self, state: AuthState) {
        self.auth_state = state;
    }

    /// Items collected so far. Never decreases.
    #[must_use]
    pub fn collected(&self) -> usize {
        self.collected
    }

    pub fn record_collected(&mut self) -> usize {
        self.collected += 1;
        self.collected
    }

    /// Close the underlying driver. Later calls are no-ops.
    pub async fn close(&mut self) -> Result<(), BrowserError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.driver.close().await
    }
}

impl std::fmt::Debug for ScrapeSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScrapeSession")
            .field("auth_state", &self.auth_state)
            .field("collected", &self.collected)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}
