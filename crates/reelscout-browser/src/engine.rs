use crate::driver::{PageHandle, SessionDriver, SessionLauncher};
use crate::error::{BrowserError, Result};
use crate::pacing::{human_pause, scroll_steps};
use chromiumoxide::browser::{Browser, BrowserConfig as CdpBrowserConfig};
use chromiumoxide::cdp::browser_protocol::fetch::{
    AuthChallengeResponse, AuthChallengeResponseResponse, ContinueRequestParams,
    ContinueWithAuthParams, EnableParams, EventAuthRequired, EventRequestPaused,
};
use chromiumoxide::error::CdpError;
use chromiumoxide::Page;
use futures_util::stream::StreamExt;
use reelscout_core::{BrowserConfig, BrowserKind};
use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Desktop user agent sent instead of the default `HeadlessChrome` one.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Interval between selector polls in `wait_for`.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Browser automation engine backed by a Chromium-family browser over CDP.
pub struct BrowserEngine {
    browser: Option<Browser>,
    handler: Option<JoinHandle<()>>,
    /// Set once the CDP handler stream ends
    disconnected: Arc<AtomicBool>,
    pages: HashMap<PageHandle, Page>,
    next_page_id: u64,
    timeout: Duration,
    proxy_auth: Option<ProxyAuth>,
}

impl BrowserEngine {
    /// Launch a browser with the given settings
    pub async fn launch(config: &BrowserConfig) -> Result<Self> {
        let cdp_config = build_cdp_config(config)?;

        let (browser, mut handler) = Browser::launch(cdp_config)
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        let disconnected = Arc::new(AtomicBool::new(false));
        let flag = disconnected.clone();

        // Drive the CDP connection; when the stream ends the session is gone
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::warn!("browser handler event error: {}", e);
                }
            }
            flag.store(true, Ordering::SeqCst);
        });

        tracing::info!(
            engine = %config.engine,
            headless = config.headless,
            "browser session started"
        );

        Ok(Self {
            browser: Some(browser),
            handler: Some(handler),
            disconnected,
            pages: HashMap::new(),
            next_page_id: 1,
            timeout: config.navigation_timeout(),
            proxy_auth: ProxyAuth::from_config(config),
        })
    }

    fn ensure_alive(&self) -> Result<&Browser> {
        if self.disconnected.load(Ordering::SeqCst) {
            return Err(BrowserError::SessionLost(
                "browser connection closed".to_string(),
            ));
        }
        self.browser
            .as_ref()
            .ok_or_else(|| BrowserError::SessionLost("session already closed".to_string()))
    }

    fn page(&self, handle: PageHandle) -> Result<&Page> {
        self.ensure_alive()?;
        self.pages
            .get(&handle)
            .ok_or(BrowserError::UnknownPage(handle.id()))
    }

    /// Classify a CDP error. Transport failures mean the session is gone.
    fn classify(&self, err: CdpError, context: &str) -> BrowserError {
        if self.disconnected.load(Ordering::SeqCst)
            || matches!(
                err,
                CdpError::Ws(_) | CdpError::ChannelSendError(_) | CdpError::NoResponse
            )
        {
            return BrowserError::SessionLost(format!("{context}: {err}"));
        }
        match err {
            CdpError::Timeout => BrowserError::Timeout(context.to_string()),
            other => BrowserError::Navigation(format!("{context}: {other}")),
        }
    }

    async fn with_timeout<T, F>(&self, context: &str, fut: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, CdpError>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(self.classify(e, context)),
            Err(_) => Err(BrowserError::Navigation(format!(
                "{context}: timed out after {:?}",
                self.timeout
            ))),
        }
    }

    /// Arm proxy authentication for `page`, then navigate it to `url`.
    async fn load(&self, page: &Page, url: &str) -> Result<()> {
        if let Some(auth) = &self.proxy_auth {
            auth.install(page)
                .await
                .map_err(|e| self.classify(e, "proxy auth"))?;
        }
        self.with_timeout(url, page.goto(url)).await?;
        Ok(())
    }

    /// Tabs open in the browser, including ones this engine did not open.
    pub async fn tab_count(&self) -> Result<usize> {
        let browser = self.ensure_alive()?;
        let pages = browser
            .pages()
            .await
            .map_err(|e| self.classify(e, "list tabs"))?;
        Ok(pages.len())
    }

    /// Lookup that treats "element not found" as `None`.
    async fn find_optional(
        &self,
        page: &Page,
        selector: &str,
    ) -> Result<Option<chromiumoxide::Element>> {
        match page.find_element(selector).await {
            Ok(el) => Ok(Some(el)),
            Err(e) => match self.classify(e, selector) {
                lost @ BrowserError::SessionLost(_) => Err(lost),
                _ => Ok(None),
            },
        }
    }
}

#[async_trait::async_trait]
impl SessionDriver for BrowserEngine {
    async fn open(&mut self, url: &str) -> Result<PageHandle> {
        let browser = self.ensure_alive()?;
        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| self.classify(e, "new tab"))?;

        if let Err(e) = self.load(&page, url).await {
            // The tab is not tracked yet, so it has to go here
            if let Err(close_err) = page.close().await {
                tracing::debug!(url, "failed to close tab after load error: {}", close_err);
            }
            return Err(e);
        }

        let handle = PageHandle::new(self.next_page_id);
        self.next_page_id += 1;
        self.pages.insert(handle, page);
        tracing::debug!(%handle, url, "opened page");
        Ok(handle)
    }

    async fn scroll(&mut self, handle: PageHandle, amount: i64) -> Result<()> {
        let page = self.page(handle)?.clone();
        for step in scroll_steps(amount) {
            self.with_timeout("scroll", page.evaluate(format!("window.scrollBy(0, {step})")))
                .await?;
            human_pause(Duration::from_millis(100), Duration::from_millis(300)).await;
        }
        Ok(())
    }

    async fn wait_for(
        &mut self,
        handle: PageHandle,
        selector: &str,
        timeout: Duration,
    ) -> Result<bool> {
        let page = self.page(handle)?.clone();
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.find_optional(&page, selector).await?.is_some() {
                return Ok(true);
            }
            if tokio::time::Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn extract_text(&mut self, handle: PageHandle, selector: &str) -> Result<Option<String>> {
        let page = self.page(handle)?.clone();
        let Some(el) = self.find_optional(&page, selector).await? else {
            return Ok(None);
        };
        let text = el
            .inner_text()
            .await
            .map_err(|e| self.classify(e, selector))?;
        Ok(text
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty()))
    }

    async fn extract_attribute(
        &mut self,
        handle: PageHandle,
        selector: &str,
        attribute: &str,
    ) -> Result<Option<String>> {
        let page = self.page(handle)?.clone();
        let Some(el) = self.find_optional(&page, selector).await? else {
            return Ok(None);
        };
        let value = el
            .attribute(attribute)
            .await
            .map_err(|e| self.classify(e, selector))?;
        Ok(value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty()))
    }

    async fn extract_all_attributes(
        &mut self,
        handle: PageHandle,
        selector: &str,
        attribute: &str,
    ) -> Result<Vec<String>> {
        let page = self.page(handle)?.clone();
        let script = format!(
            "Array.from(document.querySelectorAll({sel})).map(e => e.getAttribute({attr}))",
            sel = serde_json::to_string(selector)
                .map_err(|e| BrowserError::InvalidSelector(e.to_string()))?,
            attr = serde_json::to_string(attribute)
                .map_err(|e| BrowserError::InvalidSelector(e.to_string()))?,
        );
        let result = self.with_timeout(selector, page.evaluate(script)).await?;
        let values: Vec<Option<String>> = result
            .into_value()
            .map_err(|e| BrowserError::InvalidSelector(format!("{selector}: {e}")))?;
        Ok(values.into_iter().flatten().collect())
    }

    async fn fill(&mut self, handle: PageHandle, selector: &str, value: &str) -> Result<()> {
        let page = self.page(handle)?.clone();
        let el = self
            .find_optional(&page, selector)
            .await?
            .ok_or_else(|| BrowserError::Interaction(format!("no element for {selector}")))?;
        el.click()
            .await
            .map_err(|e| self.classify(e, selector))?;
        el.type_str(value)
            .await
            .map_err(|e| self.classify(e, selector))?;
        Ok(())
    }

    async fn click(&mut self, handle: PageHandle, selector: &str) -> Result<()> {
        let page = self.page(handle)?.clone();
        let el = self
            .find_optional(&page, selector)
            .await?
            .ok_or_else(|| BrowserError::Interaction(format!("no element for {selector}")))?;
        el.click()
            .await
            .map_err(|e| self.classify(e, selector))?;
        Ok(())
    }

    async fn current_url(&mut self, handle: PageHandle) -> Result<Option<String>> {
        let page = self.page(handle)?.clone();
        page.url().await.map_err(|e| self.classify(e, "current url"))
    }

    async fn close_page(&mut self, handle: PageHandle) -> Result<()> {
        let page = self
            .pages
            .remove(&handle)
            .ok_or(BrowserError::UnknownPage(handle.id()))?;
        self.ensure_alive()?;
        page.close()
            .await
            .map_err(|e| self.classify(e, "close tab"))?;
        tracing::debug!(%handle, "closed page");
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if self.browser.is_some() {
            match self.tab_count().await {
                Ok(tabs) => tracing::debug!(tabs, tracked = self.pages.len(), "closing browser"),
                Err(e) => tracing::debug!("could not list tabs before close: {}", e),
            }
        }
        self.pages.clear();
        let Some(mut browser) = self.browser.take() else {
            return Ok(());
        };

        if !self.disconnected.load(Ordering::SeqCst) {
            if let Err(e) = browser.close().await {
                tracing::warn!("browser close failed: {}", e);
            }
        }
        if let Err(e) = browser.wait().await {
            tracing::warn!("waiting for browser exit failed: {}", e);
        }
        if let Some(handler) = self.handler.take() {
            handler.abort();
        }
        tracing::info!("browser session closed");
        Ok(())
    }
}

/// Credentials answered to proxy `Fetch.authRequired` challenges.
#[derive(Clone)]
struct ProxyAuth {
    username: String,
    password: String,
}

impl ProxyAuth {
    /// Present only when a proxy and both credentials are configured.
    fn from_config(config: &BrowserConfig) -> Option<Self> {
        config.proxy_server.as_ref()?;
        match (&config.proxy_username, &config.proxy_password) {
            (Some(username), Some(password)) => Some(Self {
                username: username.clone(),
                password: password.clone(),
            }),
            _ => None,
        }
    }

    fn challenge_response(&self) -> AuthChallengeResponse {
        AuthChallengeResponse {
            response: AuthChallengeResponseResponse::ProvideCredentials,
            username: Some(self.username.clone()),
            password: Some(self.password.clone()),
        }
    }

    /// Enable request interception on `page`. Paused requests are resumed
    /// untouched and auth challenges get the proxy credentials. The listener
    /// task ends when the tab's event streams close.
    async fn install(&self, page: &Page) -> std::result::Result<(), CdpError> {
        let mut paused = page.event_listener::<EventRequestPaused>().await?;
        let mut challenges = page.event_listener::<EventAuthRequired>().await?;
        page.execute(EnableParams::builder().handle_auth_requests(true).build())
            .await?;

        let page = page.clone();
        let auth = self.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    Some(event) = paused.next() => {
                        let params = ContinueRequestParams::new(event.request_id.clone());
                        if let Err(e) = page.execute(params).await {
                            tracing::debug!("failed to resume request: {}", e);
                        }
                    }
                    Some(event) = challenges.next() => {
                        let params = ContinueWithAuthParams::new(
                            event.request_id.clone(),
                            auth.challenge_response(),
                        );
                        if let Err(e) = page.execute(params).await {
                            tracing::warn!("failed to answer proxy auth challenge: {}", e);
                        }
                    }
                    else => break,
                }
            }
        });
        Ok(())
    }
}

impl std::fmt::Debug for ProxyAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyAuth")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Launches [`BrowserEngine`] sessions from a fixed configuration.
pub struct ChromiumLauncher {
    config: BrowserConfig,
}

impl ChromiumLauncher {
    pub fn new(config: BrowserConfig) -> Self {
        Self { config }
    }
}

#[async_trait::async_trait]
impl SessionLauncher for ChromiumLauncher {
    async fn launch(&self) -> Result<Box<dyn SessionDriver>> {
        let engine = BrowserEngine::launch(&self.config).await?;
        Ok(Box::new(engine))
    }
}

fn build_cdp_config(config: &BrowserConfig) -> Result<CdpBrowserConfig> {
    let mut builder = CdpBrowserConfig::builder()
        .no_sandbox()
        .window_size(config.window_width, config.window_height)
        .request_timeout(config.navigation_timeout())
        .arg(format!("--user-agent={USER_AGENT}"))
        .arg("--lang=en-US");

    if !config.headless {
        builder = builder.with_head();
    }
    if let Some(proxy) = &config.proxy_server {
        builder = builder.arg(format!("--proxy-server={proxy}"));
    }
    if config.engine != BrowserKind::Chromium {
        let path = find_executable(config.engine).ok_or_else(|| {
            BrowserError::Launch(format!("no {} executable found", config.engine))
        })?;
        builder = builder.chrome_executable(path);
    }

    builder.build().map_err(BrowserError::Launch)
}

fn executable_candidates(kind: BrowserKind) -> Vec<PathBuf> {
    let paths: &[&str] = match kind {
        BrowserKind::Chromium => &[],
        BrowserKind::Chrome if cfg!(target_os = "windows") => &[
            r"C:\Program Files\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
        ],
        BrowserKind::Chrome if cfg!(target_os = "macos") => {
            &["/Applications/Google Chrome.app/Contents/MacOS/Google Chrome"]
        }
        BrowserKind::Chrome => &[
            "/usr/bin/google-chrome",
            "/usr/bin/google-chrome-stable",
            "/opt/google/chrome/chrome",
        ],
        BrowserKind::Edge if cfg!(target_os = "windows") => &[
            r"C:\Program Files (x86)\Microsoft\Edge\Application\msedge.exe",
            r"C:\Program Files\Microsoft\Edge\Application\msedge.exe",
        ],
        BrowserKind::Edge if cfg!(target_os = "macos") => {
            &["/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge"]
        }
        BrowserKind::Edge => &["/usr/bin/microsoft-edge", "/usr/bin/microsoft-edge-stable"],
    };
    paths.iter().map(PathBuf::from).collect()
}

fn find_executable(kind: BrowserKind) -> Option<PathBuf> {
    executable_candidates(kind).into_iter().find(|p| p.exists())
}
