//! Field extraction from a reel's detail page.

use crate::error::{Result, ScanError};
use crate::feed::EntryPoint;
use crate::normalize::{
    canonical_reel_url, clean_text, parse_compact_count, parse_og_description, OgSummary,
};
use crate::selectors::{Locator, SelectorChain};
use crate::session::ScrapeSession;
use chrono::Utc;
use reelscout_browser::{PageHandle, SessionDriver};
use reelscout_core::{Count, ReelRecord};
use std::time::Duration;

/// Elements that mark the detail view as rendered.
const CONTENT_LANDMARK: SelectorChain = SelectorChain::new(
    "content",
    &[
        Locator::text("article"),
        Locator::text("main"),
        Locator::text("meta[property=\"og:description\"]"),
    ],
);

const SOURCE_URL: SelectorChain = SelectorChain::new(
    "source_url",
    &[
        Locator::attr("link[rel=\"canonical\"]", "href"),
        Locator::attr("meta[property=\"og:url\"]", "content"),
    ],
);

const THUMBNAIL: SelectorChain = SelectorChain::new(
    "thumbnail_ref",
    &[
        Locator::attr("meta[property=\"og:image\"]", "content"),
        Locator::attr("video", "poster"),
        Locator::attr("article img", "src"),
    ],
);

const AUTHOR: SelectorChain = SelectorChain::new(
    "author_name",
    &[
        Locator::text("article header a[role=\"link\"]"),
        Locator::text("header a[href^=\"/\"] span"),
        Locator::text("main header a"),
    ],
);

const LIKES: SelectorChain = SelectorChain::new(
    "like_count",
    &[
        Locator::text("section a[href$=\"/liked_by/\"] span"),
        Locator::text("a[href*=\"/liked_by/\"]"),
        Locator::text("section span[class*=\"like\"]"),
    ],
);

const COMMENTS: SelectorChain = SelectorChain::new(
    "comment_count",
    &[
        Locator::text("a[href$=\"/comments/\"] span"),
        Locator::text("span[aria-label*=\"comment\"]"),
    ],
);

const AUDIO: SelectorChain = SelectorChain::new(
    "audio_info",
    &[
        Locator::text("a[href*=\"/reels/audio/\"]"),
        Locator::text("a[href*=\"/audio/\"] span"),
        Locator::text("div[aria-label*=\"audio\"]"),
    ],
);

const OG_DESCRIPTION: SelectorChain = SelectorChain::new(
    "og:description",
    &[Locator::attr("meta[property=\"og:description\"]", "content")],
);

/// Reads one reel into a [`ReelRecord`].
#[derive(Debug, Clone)]
pub struct ReelExtractor {
    landmark_timeout: Duration,
}

impl Default for ReelExtractor {
    fn default() -> Self {
        Self {
            landmark_timeout: Duration::from_secs(10),
        }
    }
}

impl ReelExtractor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_landmark_timeout(mut self, timeout: Duration) -> Self {
        self.landmark_timeout = timeout;
        self
    }

    /// Open `entry` in its own tab and extract its fields.
    ///
    /// Missing optional fields become `None` / [`Count::Unknown`]. Only a
    /// missing author or an unresolvable canonical link fails the record.
    ///
    /// # Errors
    /// [`ScanError::Extraction`] for a record that cannot be built, browser
    /// errors (retryable) for navigation or session failures.
    pub async fn extract(
        &self,
        session: &mut ScrapeSession,
        entry: &EntryPoint,
    ) -> Result<ReelRecord> {
        let driver = session.driver();
        let page = driver.open(&entry.url).await?;

        let result = self.read_page(driver, page, entry).await;

        if let Err(e) = driver.close_page(page).await {
            tracing::debug!(entry = %entry, "failed to close reel tab: {}", e);
        }
        result
    }

    async fn read_page(
        &self,
        driver: &mut dyn SessionDriver,
        page: PageHandle,
        entry: &EntryPoint,
    ) -> Result<ReelRecord> {
        if CONTENT_LANDMARK
            .find_present(driver, page, self.landmark_timeout)
            .await?
            .is_none()
        {
            tracing::warn!(entry = %entry, "content landmark not found, extracting anyway");
        }

        let source_url = resolve_source_url(driver, page, entry).await?;
        let og = match OG_DESCRIPTION.resolve(driver, page).await? {
            Some(text) => parse_og_description(&text),
            None => OgSummary::default(),
        };

        let author_name = match AUTHOR.resolve(driver, page).await? {
            Some(text) => clean_text(&text),
            None => None,
        }
        .or(og.author)
        .ok_or_else(|| ScanError::extraction(&entry.url, "author name not found"))?;

        let like_count = count_field(driver, page, &LIKES).await?.or(og.likes);
        let comment_count = count_field(driver, page, &COMMENTS).await?.or(og.comments);

        let thumbnail_ref = THUMBNAIL.resolve(driver, page).await?;
        let audio_info = AUDIO
            .resolve(driver, page)
            .await?
            .and_then(|text| clean_text(&text));

        tracing::debug!(
            source_url = %source_url,
            author = %author_name,
            likes = %like_count,
            comments = %comment_count,
            "extracted reel"
        );

        Ok(ReelRecord {
            source_url,
            thumbnail_ref,
            like_count,
            comment_count,
            author_name,
            audio_info,
            collected_at: Utc::now(),
        })
    }
}

async fn count_field(
    driver: &mut dyn SessionDriver,
    page: PageHandle,
    chain: &SelectorChain,
) -> Result<Count> {
    Ok(chain
        .resolve(driver, page)
        .await?
        .map_or(Count::Unknown, |text| parse_compact_count(&text)))
}

/// Canonical link from the page, falling back to the entry URL itself.
async fn resolve_source_url(
    driver: &mut dyn SessionDriver,
    page: PageHandle,
    entry: &EntryPoint,
) -> Result<String> {
    let from_page = SOURCE_URL.resolve(driver, page).await?;

    from_page
        .iter()
        .map(String::as_str)
        .chain(std::iter::once(entry.url.as_str()))
        .find_map(|href| canonical_reel_url(&entry.url, href))
        .ok_or_else(|| ScanError::extraction(&entry.url, "no canonical reel link"))
}
