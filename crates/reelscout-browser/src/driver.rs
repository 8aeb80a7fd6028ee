use crate::error::Result;
use std::fmt;
use std::time::Duration;

/// Opaque reference to one open tab of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageHandle(u64);

impl PageHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page#{}", self.0)
    }
}

/// Page-level primitives over one live browser session.
///
/// A driver is owned by exactly one caller at a time, so every method takes
/// `&mut self`. Lookups that find nothing return `Ok(None)`; only session and
/// navigation failures are errors.
#[async_trait::async_trait]
pub trait SessionDriver: Send {
    /// Open a new tab and navigate it to `url`
    async fn open(&mut self, url: &str) -> Result<PageHandle>;

    /// Scroll the page down by `amount` pixels (negative scrolls up)
    async fn scroll(&mut self, page: PageHandle, amount: i64) -> Result<()>;

    /// Wait for a selector to appear; `Ok(false)` on timeout
    async fn wait_for(&mut self, page: PageHandle, selector: &str, timeout: Duration)
        -> Result<bool>;

    /// Trimmed text of the first element matching `selector`
    async fn extract_text(&mut self, page: PageHandle, selector: &str) -> Result<Option<String>>;

    /// Attribute of the first element matching `selector`
    async fn extract_attribute(
        &mut self,
        page: PageHandle,
        selector: &str,
        attribute: &str,
    ) -> Result<Option<String>>;

    /// Attribute of every element matching `selector`, in document order
    async fn extract_all_attributes(
        &mut self,
        page: PageHandle,
        selector: &str,
        attribute: &str,
    ) -> Result<Vec<String>>;

    /// Focus an input and type `value` into it
    async fn fill(&mut self, page: PageHandle, selector: &str, value: &str) -> Result<()>;

    /// Click the first element matching `selector`
    async fn click(&mut self, page: PageHandle, selector: &str) -> Result<()>;

    /// Current URL of the tab
    async fn current_url(&mut self, page: PageHandle) -> Result<Option<String>>;

    /// Close one tab
    async fn close_page(&mut self, page: PageHandle) -> Result<()>;

    /// Tear down the session. Safe to call repeatedly and after failures.
    async fn close(&mut self) -> Result<()>;
}

/// Produces fresh driver sessions.
#[async_trait::async_trait]
pub trait SessionLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn SessionDriver>>;
}
