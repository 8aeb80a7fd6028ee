//! Scripted in-memory browser for exercising the engine without Chrome.
#![allow(dead_code)]

use reelscout_browser::{BrowserError, PageHandle, SessionDriver, SessionLauncher};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

pub const FEED_LINKS: &str = "a[href*=\"/reel/\"], a[href*=\"/p/\"]";
pub const SUBMIT: &str = "#loginForm button[type=\"submit\"]";

/// Static content served for one URL.
#[derive(Debug, Clone, Default)]
pub struct FakePage {
    pub texts: HashMap<String, String>,
    pub attrs: HashMap<(String, String), String>,
    pub present: HashSet<String>,
    /// Feed links revealed per scroll: batch `n` becomes visible after `n` scrolls
    pub link_batches: Vec<Vec<String>>,
    /// URL reported after the page loads
    pub redirect: Option<String>,
    /// Clicking a selector replaces the tab with `(url, page)`
    pub on_click: HashMap<String, (String, FakePage)>,
}

impl FakePage {
    pub fn text(mut self, selector: &str, value: &str) -> Self {
        self.texts.insert(selector.to_string(), value.to_string());
        self
    }

    pub fn attr(mut self, selector: &str, attribute: &str, value: &str) -> Self {
        self.attrs
            .insert((selector.to_string(), attribute.to_string()), value.to_string());
        self
    }

    pub fn with(mut self, selector: &str) -> Self {
        self.present.insert(selector.to_string());
        self
    }

    pub fn redirect_to(mut self, url: &str) -> Self {
        self.redirect = Some(url.to_string());
        self
    }

    pub fn on_click(mut self, selector: &str, url: &str, page: FakePage) -> Self {
        self.present.insert(selector.to_string());
        self.on_click
            .insert(selector.to_string(), (url.to_string(), page));
        self
    }

    /// A hashtag feed revealing `batches` of hrefs as it scrolls.
    pub fn feed(batches: Vec<Vec<String>>) -> Self {
        Self {
            link_batches: batches,
            ..Self::default()
        }
        .with(FEED_LINKS)
    }

    /// A fully populated reel detail page.
    pub fn reel(code: &str, author: &str, likes: &str, comments: &str) -> Self {
        Self::default()
            .with("article")
            .attr(
                "link[rel=\"canonical\"]",
                "href",
                &format!("https://www.instagram.com/reel/{code}/"),
            )
            .attr(
                "meta[property=\"og:image\"]",
                "content",
                &format!("https://cdn.example.com/{code}.jpg"),
            )
            .text("article header a[role=\"link\"]", author)
            .text("section a[href$=\"/liked_by/\"] span", likes)
            .text("a[href$=\"/comments/\"] span", comments)
            .text("a[href*=\"/reels/audio/\"]", "Original audio")
    }

    fn is_present(&self, selector: &str) -> bool {
        self.present.contains(selector)
            || self.texts.contains_key(selector)
            || self.attrs.keys().any(|(s, _)| s == selector)
    }
}

/// How a scripted failure behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    Navigation,
    SessionLost,
}

#[derive(Debug, Clone, Copy)]
struct FailPlan {
    failure: Failure,
    /// `None` fails forever
    remaining: Option<usize>,
}

#[derive(Debug)]
struct Tab {
    url: String,
    page: FakePage,
    scrolls: usize,
}

/// Shared state behind every driver a [`ScriptedLauncher`] hands out.
#[derive(Debug, Default)]
pub struct World {
    site: HashMap<String, FakePage>,
    failures: HashMap<String, FailPlan>,
    tabs: HashMap<u64, Tab>,
    next_id: u64,
    pub opened: Vec<String>,
    /// When each URL in `opened` was requested
    opened_at: Vec<Instant>,
    /// Feed scans that fail after a scroll before one succeeds
    scan_failures: usize,
    pub fills: Vec<(String, String)>,
    pub clicks: Vec<String>,
    pub scrolls: usize,
    pub close_calls: usize,
    closed: bool,
}

impl World {
    pub fn opens_of(&self, url: &str) -> usize {
        self.opened.iter().filter(|u| *u == url).count()
    }

    /// Times at which `url` was requested, in order.
    pub fn open_times(&self, url: &str) -> Vec<Instant> {
        self.opened
            .iter()
            .zip(&self.opened_at)
            .filter(|(u, _)| *u == url)
            .map(|(_, at)| *at)
            .collect()
    }

    pub fn open_tabs(&self) -> usize {
        self.tabs.len()
    }
}

/// A scripted site plus launcher.
#[derive(Clone, Default)]
pub struct Scenario {
    world: Arc<Mutex<World>>,
    launch_error: Option<String>,
}

impl Scenario {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(self, url: &str, page: FakePage) -> Self {
        self.world
            .lock()
            .unwrap()
            .site
            .insert(url.to_string(), page);
        self
    }

    /// Fail `open` of `url` `times` times (`None` = always).
    pub fn fail(self, url: &str, failure: Failure, times: Option<usize>) -> Self {
        self.world.lock().unwrap().failures.insert(
            url.to_string(),
            FailPlan {
                failure,
                remaining: times,
            },
        );
        self
    }

    /// The next `times` feed scans that follow a scroll fail with a navigation error.
    pub fn fail_scans_after_scroll(self, times: usize) -> Self {
        self.world.lock().unwrap().scan_failures = times;
        self
    }

    pub fn failing_launch(mut self, reason: &str) -> Self {
        self.launch_error = Some(reason.to_string());
        self
    }

    pub fn world(&self) -> std::sync::MutexGuard<'_, World> {
        self.world.lock().unwrap()
    }

    pub fn launcher(&self) -> Arc<dyn SessionLauncher> {
        Arc::new(ScriptedLauncher {
            world: self.world.clone(),
            launch_error: self.launch_error.clone(),
        })
    }

    /// A driver over this scenario, for exercising components directly.
    pub fn driver(&self) -> Box<dyn SessionDriver> {
        Box::new(ScriptedDriver {
            world: self.world.clone(),
        })
    }
}

struct ScriptedLauncher {
    world: Arc<Mutex<World>>,
    launch_error: Option<String>,
}

#[async_trait::async_trait]
impl SessionLauncher for ScriptedLauncher {
    async fn launch(&self) -> reelscout_browser::Result<Box<dyn SessionDriver>> {
        if let Some(reason) = &self.launch_error {
            return Err(BrowserError::Launch(reason.clone()));
        }
        Ok(Box::new(ScriptedDriver {
            world: self.world.clone(),
        }))
    }
}

pub struct ScriptedDriver {
    world: Arc<Mutex<World>>,
}

type DriverResult<T> = reelscout_browser::Result<T>;

impl ScriptedDriver {
    fn with_tab<T>(
        &self,
        page: PageHandle,
        f: impl FnOnce(&mut Tab) -> DriverResult<T>,
    ) -> DriverResult<T> {
        let mut world = self.world.lock().unwrap();
        if world.closed {
            return Err(BrowserError::SessionLost("session closed".into()));
        }
        let tab = world
            .tabs
            .get_mut(&page.id())
            .ok_or(BrowserError::UnknownPage(page.id()))?;
        f(tab)
    }

    fn load(world: &mut World, url: &str) -> DriverResult<(String, FakePage)> {
        if world.closed {
            return Err(BrowserError::SessionLost("session closed".into()));
        }
        world.opened.push(url.to_string());
        world.opened_at.push(Instant::now());

        if let Some(plan) = world.failures.get_mut(url) {
            let active = match plan.remaining.as_mut() {
                None => true,
                Some(0) => false,
                Some(n) => {
                    *n -= 1;
                    true
                }
            };
            if active {
                return Err(match plan.failure {
                    Failure::Navigation => BrowserError::Navigation(format!("{url}: net::ERR_FAILED")),
                    Failure::SessionLost => BrowserError::SessionLost("websocket closed".into()),
                });
            }
        }

        let page = world
            .site
            .get(url)
            .cloned()
            .ok_or_else(|| BrowserError::Navigation(format!("{url}: 404")))?;
        let landed = page.redirect.clone().unwrap_or_else(|| url.to_string());
        Ok((landed, page))
    }
}

#[async_trait::async_trait]
impl SessionDriver for ScriptedDriver {
    async fn open(&mut self, url: &str) -> DriverResult<PageHandle> {
        let mut world = self.world.lock().unwrap();
        let (landed, page) = Self::load(&mut world, url)?;
        world.next_id += 1;
        let id = world.next_id;
        world.tabs.insert(
            id,
            Tab {
                url: landed,
                page,
                scrolls: 0,
            },
        );
        Ok(PageHandle::new(id))
    }

    async fn scroll(&mut self, page: PageHandle, _amount: i64) -> DriverResult<()> {
        self.with_tab(page, |tab| {
            tab.scrolls += 1;
            Ok(())
        })?;
        self.world.lock().unwrap().scrolls += 1;
        Ok(())
    }

    async fn wait_for(
        &mut self,
        page: PageHandle,
        selector: &str,
        _timeout: Duration,
    ) -> DriverResult<bool> {
        self.with_tab(page, |tab| Ok(tab.page.is_present(selector)))
    }

    async fn extract_text(&mut self, page: PageHandle, selector: &str) -> DriverResult<Option<String>> {
        self.with_tab(page, |tab| Ok(tab.page.texts.get(selector).cloned()))
    }

    async fn extract_attribute(
        &mut self,
        page: PageHandle,
        selector: &str,
        attribute: &str,
    ) -> DriverResult<Option<String>> {
        self.with_tab(page, |tab| {
            Ok(tab
                .page
                .attrs
                .get(&(selector.to_string(), attribute.to_string()))
                .cloned())
        })
    }

    async fn extract_all_attributes(
        &mut self,
        page: PageHandle,
        selector: &str,
        _attribute: &str,
    ) -> DriverResult<Vec<String>> {
        {
            let mut world = self.world.lock().unwrap();
            let scrolled = world.tabs.get(&page.id()).is_some_and(|tab| tab.scrolls > 0);
            if selector == FEED_LINKS && scrolled && world.scan_failures > 0 {
                world.scan_failures -= 1;
                return Err(BrowserError::Navigation("feed scan: net::ERR_NETWORK_CHANGED".into()));
            }
        }
        self.with_tab(page, |tab| {
            if selector != FEED_LINKS || tab.page.link_batches.is_empty() {
                return Ok(Vec::new());
            }
            let visible = (tab.scrolls + 1).min(tab.page.link_batches.len());
            Ok(tab.page.link_batches[..visible].concat())
        })
    }

    async fn fill(&mut self, page: PageHandle, selector: &str, value: &str) -> DriverResult<()> {
        self.with_tab(page, |tab| {
            if tab.page.is_present(selector) {
                Ok(())
            } else {
                Err(BrowserError::Interaction(format!("no element for {selector}")))
            }
        })?;
        self.world
            .lock()
            .unwrap()
            .fills
            .push((selector.to_string(), value.to_string()));
        Ok(())
    }

    async fn click(&mut self, page: PageHandle, selector: &str) -> DriverResult<()> {
        self.with_tab(page, |tab| {
            if !tab.page.is_present(selector) {
                return Err(BrowserError::Interaction(format!("no element for {selector}")));
            }
            if let Some((url, next)) = tab.page.on_click.get(selector).cloned() {
                tab.url = url;
                tab.page = next;
            }
            Ok(())
        })?;
        self.world.lock().unwrap().clicks.push(selector.to_string());
        Ok(())
    }

    async fn current_url(&mut self, page: PageHandle) -> DriverResult<Option<String>> {
        self.with_tab(page, |tab| Ok(Some(tab.url.clone())))
    }

    async fn close_page(&mut self, page: PageHandle) -> DriverResult<()> {
        let mut world = self.world.lock().unwrap();
        world
            .tabs
            .remove(&page.id())
            .map(|_| ())
            .ok_or(BrowserError::UnknownPage(page.id()))
    }

    async fn close(&mut self) -> DriverResult<()> {
        let mut world = self.world.lock().unwrap();
        world.close_calls += 1;
        world.closed = true;
        world.tabs.clear();
        Ok(())
    }
}

pub fn reel_url(code: &str) -> String {
    format!("https://www.instagram.com/reel/{code}/")
}

pub fn feed_url(tag: &str) -> String {
    format!("https://www.instagram.com/explore/tags/{tag}/")
}

/// Relative hrefs as they appear in the feed grid.
pub fn hrefs(codes: &[&str]) -> Vec<String> {
    codes.iter().map(|c| format!("/reel/{c}/")).collect()
}

/// Login form whose submit button lands on `url` showing `after`.
pub fn login_page(url: &str, after: FakePage) -> FakePage {
    FakePage::default()
        .with("input[name=\"username\"]")
        .with("input[name=\"password\"]")
        .on_click(SUBMIT, url, after)
}
