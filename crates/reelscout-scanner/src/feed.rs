//! Entry-point discovery for a scrape target.
//!
//! A URL target yields itself once. A hashtag target opens the public tag
//! feed in its own tab and alternates scanning for reel links with
//! scrolling, until the item bound, the end of the feed, or the iteration
//! ceiling is reached.

use crate::error::{Result, ScanError};
use crate::normalize::canonical_reel_url;
use crate::session::ScrapeSession;
use reelscout_browser::pacing::human_pause;
use reelscout_browser::PageHandle;
use reelscout_core::ScrapeTarget;
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::time::Duration;

/// Consecutive scrolls without a new link after which the feed is considered exhausted.
pub const EMPTY_SCROLL_LIMIT: u32 = 3;

/// Hard upper bound on scroll iterations per run.
pub const MAX_SCROLL_ITERATIONS: u32 = 60;

/// Pixels per scroll.
const SCROLL_AMOUNT: i64 = 1_600;

/// Links to reels and posts in the feed grid.
const ENTRY_LINKS: &str = "a[href*=\"/reel/\"], a[href*=\"/p/\"]";

/// How long the first scan waits for the grid to render.
const GRID_TIMEOUT: Duration = Duration::from_secs(10);

/// A navigable reference to one reel's detail view.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntryPoint {
    pub url: String,
}

impl EntryPoint {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl fmt::Display for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

/// Snapshot reported after every feed scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscoveryProgress {
    /// Distinct entry points found so far
    pub discovered: usize,
    /// New entry points in the latest scan
    pub new_in_scan: usize,
    /// Scrolls performed so far
    pub scrolls: u32,
    /// Current run of scrolls that found nothing new
    pub empty_scrolls: u32,
}

/// Why discovery ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryEnd {
    ItemLimit,
    EndOfFeed,
    IterationCeiling,
    SingleTarget,
}

/// Callback receiving discovery progress.
pub type ProgressFn = Box<dyn FnMut(&DiscoveryProgress) + Send>;

/// Lazily produces entry points for one run. Not resumable.
pub struct FeedNavigator {
    target: ScrapeTarget,
    max_items: Option<usize>,
    on_progress: Option<ProgressFn>,
    page: Option<PageHandle>,
    seen: HashSet<String>,
    pending: VecDeque<EntryPoint>,
    scrolls: u32,
    empty_scrolls: u32,
    scanned: bool,
    /// A scroll went through but the scan after it did not
    scroll_pending: bool,
    ended: Option<DiscoveryEnd>,
}

/// Start discovery for `target`, yielding at most `max_items` entry points.
///
/// `on_progress` is called after every scan of a hashtag feed.
#[must_use]
pub fn discover(
    target: ScrapeTarget,
    max_items: Option<usize>,
    on_progress: Option<ProgressFn>,
) -> FeedNavigator {
    FeedNavigator {
        target,
        max_items,
        on_progress,
        page: None,
        seen: HashSet::new(),
        pending: VecDeque::new(),
        scrolls: 0,
        empty_scrolls: 0,
        scanned: false,
        scroll_pending: false,
        ended: None,
    }
}

impl FeedNavigator {
    /// Next entry point in feed order, or `None` once discovery is over.
    /// The feed tab is closed when `None` is first returned.
    ///
    /// # Errors
    /// [`ScanError::LoginRequired`] when the feed redirects to the login page;
    /// browser errors from loading or scrolling the feed. A failed call can be
    /// retried: state only advances on success.
    pub async fn next(&mut self, session: &mut ScrapeSession) -> Result<Option<EntryPoint>> {
        loop {
            if let Some(entry) = self.pending.pop_front() {
                return Ok(Some(entry));
            }
            if self.ended.is_some() {
                self.close(session).await;
                return Ok(None);
            }

            match &self.target {
                ScrapeTarget::Url(url) => {
                    // A single reel is yielded regardless of max_items
                    self.pending.push_back(EntryPoint::new(url.as_str()));
                    self.finish(DiscoveryEnd::SingleTarget);
                }
                ScrapeTarget::Hashtag(_) if self.limit_reached() => {
                    self.finish(DiscoveryEnd::ItemLimit);
                }
                ScrapeTarget::Hashtag(tag) => {
                    let feed_url = tag.feed_url();
                    self.scan(session, &feed_url).await?;
                }
            }
        }
    }

    /// Why discovery ended, once it has.
    #[must_use]
    pub fn end_reason(&self) -> Option<DiscoveryEnd> {
        self.ended
    }

    /// Close the feed tab, if one is open. Safe to call repeatedly.
    pub async fn close(&mut self, session: &mut ScrapeSession) {
        if let Some(page) = self.page.take() {
            if let Err(e) = session.driver().close_page(page).await {
                tracing::debug!("failed to close feed tab: {}", e);
            }
        }
    }

    /// Distinct entry points found so far.
    #[must_use]
    pub fn discovered(&self) -> usize {
        self.seen.len()
    }

    fn limit_reached(&self) -> bool {
        self.max_items.is_some_and(|max| self.seen.len() >= max)
    }

    fn finish(&mut self, reason: DiscoveryEnd) {
        tracing::debug!(?reason, discovered = self.seen.len(), "discovery finished");
        self.ended = Some(reason);
    }

    async fn feed_page(
        &mut self,
        session: &mut ScrapeSession,
        feed_url: &str,
    ) -> Result<PageHandle> {
        if let Some(page) = self.page {
            return Ok(page);
        }
        tracing::info!(url = feed_url, "opening hashtag feed");

        let driver = session.driver();
        let page = driver.open(feed_url).await?;

        if let Some(current) = driver.current_url(page).await? {
            if current.contains("/accounts/login") {
                if let Err(e) = driver.close_page(page).await {
                    tracing::debug!("failed to close feed tab: {}", e);
                }
                return Err(ScanError::LoginRequired(format!(
                    "{feed_url} redirected to the login page"
                )));
            }
        }
        self.page = Some(page);
        Ok(page)
    }

    /// One iteration: scroll (except before the first scan), then collect links.
    async fn scan(&mut self, session: &mut ScrapeSession, feed_url: &str) -> Result<()> {
        let page = self.feed_page(session, feed_url).await?;
        let driver = session.driver();

        if self.scanned && !self.scroll_pending {
            if self.scrolls >= MAX_SCROLL_ITERATIONS {
                tracing::warn!(scrolls = self.scrolls, "discovery ceiling reached");
                self.finish(DiscoveryEnd::IterationCeiling);
                return Ok(());
            }
            driver.scroll(page, SCROLL_AMOUNT).await?;
            self.scroll_pending = true;
            human_pause(Duration::from_millis(1000), Duration::from_millis(2000)).await;
        } else if !self.scanned && !driver.wait_for(page, ENTRY_LINKS, GRID_TIMEOUT).await? {
            tracing::warn!("no reel links rendered on the feed");
        }

        let hrefs = driver
            .extract_all_attributes(page, ENTRY_LINKS, "href")
            .await?;
        if std::mem::take(&mut self.scroll_pending) {
            self.scrolls += 1;
        }
        self.scanned = true;

        let mut new_in_scan = 0;
        for href in hrefs {
            if self.limit_reached() {
                break;
            }
            let Some(url) = canonical_reel_url(reelscout_core::INSTAGRAM_ORIGIN, &href) else {
                continue;
            };
            if self.seen.insert(url.clone()) {
                self.pending.push_back(EntryPoint::new(url));
                new_in_scan += 1;
            }
        }

        if new_in_scan == 0 && self.scrolls > 0 {
            self.empty_scrolls += 1;
        } else if new_in_scan > 0 {
            self.empty_scrolls = 0;
        }

        let progress = DiscoveryProgress {
            discovered: self.seen.len(),
            new_in_scan,
            scrolls: self.scrolls,
            empty_scrolls: self.empty_scrolls,
        };
        tracing::debug!(?progress, "feed scanned");
        if let Some(callback) = self.on_progress.as_mut() {
            callback(&progress);
        }

        if self.empty_scrolls >= EMPTY_SCROLL_LIMIT {
            self.finish(DiscoveryEnd::EndOfFeed);
        }
        Ok(())
    }
}

impl fmt::Debug for FeedNavigator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeedNavigator")
            .field("target", &self.target)
            .field("max_items", &self.max_items)
            .field("discovered", &self.seen.len())
            .field("scrolls", &self.scrolls)
            .field("ended", &self.ended)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants() {
        const _: () = assert!(EMPTY_SCROLL_LIMIT >= 1);
        const _: () = assert!(MAX_SCROLL_ITERATIONS > EMPTY_SCROLL_LIMIT);
    }

    #[test]
    fn test_entry_point_display() {
        let entry = EntryPoint::new("https://www.instagram.com/reel/abc/");
        assert_eq!(entry.to_string(), "https://www.instagram.com/reel/abc/");
    }
}
