//! Instagram login flow.
//!
//! Credentials are submitted exactly once. After submission the controller
//! polls the page until it can classify the outcome as a success, a
//! challenge (2FA, checkpoint, captcha) or a rejection.

use crate::error::{Result, ScanError};
use crate::selectors::{Locator, SelectorChain};
use crate::session::ScrapeSession;
use reelscout_browser::pacing::human_pause;
use reelscout_browser::{BrowserError, PageHandle, SessionDriver};
use reelscout_core::{AuthState, Credentials};
use std::time::Duration;

/// Login page URL.
pub const LOGIN_URL: &str = "https://www.instagram.com/accounts/login/";

const LOGIN_PATH_MARKER: &str = "/accounts/login";

/// URL fragments of challenge interstitials.
const CHALLENGE_PATHS: &[&str] = &["/challenge/", "/two_factor", "/auth_platform/"];

const COOKIE_ACCEPT: SelectorChain = SelectorChain::new(
    "cookie banner",
    &[
        Locator::text("button._a9--._ap36._a9_0"),
        Locator::text("div[role=\"dialog\"] button._a9--._a9_0"),
        Locator::text("button[data-cookiebanner=\"accept_button\"]"),
    ],
);

const USERNAME_INPUT: SelectorChain = SelectorChain::new(
    "username input",
    &[
        Locator::text("input[name=\"username\"]"),
        Locator::text("#loginForm input[type=\"text\"]"),
        Locator::text("input[aria-label*=\"username\"]"),
    ],
);

const PASSWORD_INPUT: SelectorChain = SelectorChain::new(
    "password input",
    &[
        Locator::text("input[name=\"password\"]"),
        Locator::text("#loginForm input[type=\"password\"]"),
        Locator::text("input[type=\"password\"]"),
    ],
);

const SUBMIT_BUTTON: SelectorChain = SelectorChain::new(
    "login button",
    &[
        Locator::text("#loginForm button[type=\"submit\"]"),
        Locator::text("button[type=\"submit\"]"),
    ],
);

const LOGGED_IN: SelectorChain = SelectorChain::new(
    "post-login landmark",
    &[
        Locator::text("svg[aria-label=\"Home\"]"),
        Locator::text("a[href=\"/direct/inbox/\"]"),
        Locator::text("nav a[href*=\"/explore/\"]"),
    ],
);

const CHALLENGE_MARKERS: SelectorChain = SelectorChain::new(
    "challenge",
    &[
        Locator::text("input[name=\"verificationCode\"]"),
        Locator::text("input[name=\"security_code\"]"),
        Locator::text("iframe[src*=\"captcha\"]"),
        Locator::text("#recaptcha"),
    ],
);

const LOGIN_ERROR: SelectorChain = SelectorChain::new(
    "login error",
    &[
        Locator::text("#slfErrorAlert"),
        Locator::text("div[role=\"alert\"]"),
        Locator::text("p[data-testid=\"login-error-message\"]"),
    ],
);

const NOT_NOW: SelectorChain = SelectorChain::new(
    "not now",
    &[
        Locator::text("div[role=\"dialog\"] button._a9--._ap36._a9_1"),
        Locator::text("div[role=\"button\"]._ac8f"),
        Locator::text("button._acan._acao._acas"),
    ],
);

/// Outcome of one poll after submitting credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Probe {
    Authenticated,
    Challenge(String),
    Rejected(String),
    Pending,
}

/// Drives the login form.
#[derive(Debug, Clone)]
pub struct AuthController {
    form_timeout: Duration,
    outcome_timeout: Duration,
    poll_interval: Duration,
}

impl Default for AuthController {
    fn default() -> Self {
        Self {
            form_timeout: Duration::from_secs(10),
            outcome_timeout: Duration::from_secs(20),
            poll_interval: Duration::from_millis(500),
        }
    }
}

impl AuthController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// How long to wait for a verdict after submitting.
    #[must_use]
    pub fn with_outcome_timeout(mut self, timeout: Duration) -> Self {
        self.outcome_timeout = timeout;
        self
    }

    /// Log in with `credentials`, returning the resulting auth state.
    ///
    /// # Errors
    /// - [`ScanError::ChallengeRequired`] when Instagram asks for a code or captcha
    /// - [`ScanError::Authentication`] when the login is rejected or never completes
    /// - [`ScanError::Browser`] when the login page fails to load, its form is missing,
    ///   or the session dies
    pub async fn login(
        &self,
        session: &mut ScrapeSession,
        credentials: &Credentials,
    ) -> Result<AuthState> {
        tracing::info!(username = credentials.username(), "logging in");
        let driver = session.driver();
        let page = driver.open(LOGIN_URL).await?;

        let outcome = self.login_on_page(driver, page, credentials).await;

        if let Err(e) = driver.close_page(page).await {
            tracing::debug!("failed to close login tab: {}", e);
        }

        let state = outcome?;
        session.set_auth_state(state);
        tracing::info!("login succeeded");
        Ok(state)
    }

    async fn login_on_page(
        &self,
        driver: &mut dyn SessionDriver,
        page: PageHandle,
        credentials: &Credentials,
    ) -> Result<AuthState> {
        dismiss(driver, page, &COOKIE_ACCEPT).await?;

        let username = USERNAME_INPUT
            .find_present(driver, page, self.form_timeout)
            .await?
            .ok_or_else(|| missing_form_element("username field not found"))?;
        let password = PASSWORD_INPUT
            .find_present(driver, page, self.form_timeout)
            .await?
            .ok_or_else(|| missing_form_element("password field not found"))?;
        let submit = SUBMIT_BUTTON
            .find_present(driver, page, self.form_timeout)
            .await?
            .ok_or_else(|| missing_form_element("login button not found"))?;

        driver.fill(page, username, credentials.username()).await?;
        human_pause(Duration::from_millis(300), Duration::from_millis(800)).await;
        driver.fill(page, password, credentials.password()).await?;
        human_pause(Duration::from_millis(300), Duration::from_millis(800)).await;
        driver.click(page, submit).await?;

        let deadline = tokio::time::Instant::now() + self.outcome_timeout;
        loop {
            match self.probe(driver, page).await? {
                Probe::Authenticated => break,
                Probe::Challenge(reason) => {
                    tracing::warn!(%reason, "login challenge");
                    return Err(ScanError::ChallengeRequired(reason));
                }
                Probe::Rejected(reason) => {
                    tracing::warn!(%reason, "login rejected");
                    return Err(ScanError::Authentication(reason));
                }
                Probe::Pending => {}
            }

            if tokio::time::Instant::now() >= deadline {
                return Err(ScanError::Authentication(
                    "still on the login page after submitting".into(),
                ));
            }
            tokio::time::sleep(self.poll_interval).await;
        }

        // "Save login info" and notification prompts
        for _ in 0..2 {
            if !dismiss(driver, page, &NOT_NOW).await? {
                break;
            }
        }

        Ok(AuthState::Authenticated)
    }

    async fn probe(&self, driver: &mut dyn SessionDriver, page: PageHandle) -> Result<Probe> {
        let url = driver.current_url(page).await?.unwrap_or_default();

        if let Some(path) = CHALLENGE_PATHS.iter().find(|p| url.contains(**p)) {
            return Ok(Probe::Challenge(format!("redirected to {path}")));
        }
        if CHALLENGE_MARKERS.any_present(driver, page).await? {
            return Ok(Probe::Challenge("verification required".into()));
        }
        if LOGIN_ERROR.any_present(driver, page).await? {
            let message = LOGIN_ERROR
                .resolve(driver, page)
                .await?
                .unwrap_or_else(|| "login rejected".into());
            return Ok(Probe::Rejected(message));
        }
        if LOGGED_IN.any_present(driver, page).await? {
            return Ok(Probe::Authenticated);
        }
        if !url.is_empty() && !url.contains(LOGIN_PATH_MARKER) {
            return Ok(Probe::Authenticated);
        }
        Ok(Probe::Pending)
    }
}

/// Click the first present element of `chain`, if any. Only a lost session
/// is an error; a dialog that vanishes before the click is ignored.
async fn dismiss(
    driver: &mut dyn SessionDriver,
    page: PageHandle,
    chain: &SelectorChain,
) -> Result<bool> {
    let Some(selector) = chain.find_present(driver, page, Duration::from_secs(2)).await? else {
        return Ok(false);
    };
    match driver.click(page, selector).await {
        Ok(()) => {
            tracing::debug!(dialog = chain.field, "dismissed");
            human_pause(Duration::from_millis(500), Duration::from_millis(1000)).await;
            Ok(true)
        }
        Err(e) if e.is_session_lost() => Err(e.into()),
        Err(e) => {
            tracing::debug!(dialog = chain.field, "dismiss failed: {}", e);
            Ok(false)
        }
    }
}

/// A login form that never rendered says nothing about the credentials.
fn missing_form_element(what: &str) -> ScanError {
    ScanError::Browser(BrowserError::Interaction(what.to_string()))
}
