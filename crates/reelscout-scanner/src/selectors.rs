//! Ordered selector fallback chains.
//!
//! Instagram's markup changes often, so every field is located through a
//! list of candidates tried in order. The first candidate that yields a
//! non-empty value wins; a chain that finds nothing resolves to `None`.

use reelscout_browser::{PageHandle, SessionDriver};
use std::time::Duration;

/// One way of reading a value off the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Locator {
    pub selector: &'static str,
    /// Attribute to read; `None` reads the element's text
    pub attribute: Option<&'static str>,
}

impl Locator {
    #[must_use]
    pub const fn text(selector: &'static str) -> Self {
        Self {
            selector,
            attribute: None,
        }
    }

    #[must_use]
    pub const fn attr(selector: &'static str, attribute: &'static str) -> Self {
        Self {
            selector,
            attribute: Some(attribute),
        }
    }
}

/// A named, ordered list of locators for one field.
#[derive(Debug, Clone, Copy)]
pub struct SelectorChain {
    pub field: &'static str,
    pub locators: &'static [Locator],
}

impl SelectorChain {
    #[must_use]
    pub const fn new(field: &'static str, locators: &'static [Locator]) -> Self {
        Self { field, locators }
    }

    /// First non-empty value along the chain.
    ///
    /// Driver errors propagate: a lost session must not read as "field absent".
    pub async fn resolve(
        &self,
        driver: &mut dyn SessionDriver,
        page: PageHandle,
    ) -> reelscout_browser::Result<Option<String>> {
        for locator in self.locators {
            let value = match locator.attribute {
                None => driver.extract_text(page, locator.selector).await?,
                Some(attr) => {
                    driver
                        .extract_attribute(page, locator.selector, attr)
                        .await?
                }
            };
            if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
                tracing::trace!(field = self.field, selector = locator.selector, "resolved");
                return Ok(Some(value));
            }
        }
        tracing::debug!(field = self.field, "no selector matched");
        Ok(None)
    }

    /// Selector of the first locator currently present on the page.
    ///
    /// Each locator gets an equal share of `timeout`, with a floor so fast
    /// chains still give the page a moment to render.
    pub async fn find_present(
        &self,
        driver: &mut dyn SessionDriver,
        page: PageHandle,
        timeout: Duration,
    ) -> reelscout_browser::Result<Option<&'static str>> {
        let count = u32::try_from(self.locators.len().max(1)).unwrap_or(u32::MAX);
        let share = (timeout / count).max(Duration::from_millis(200)).min(timeout);

        for locator in self.locators {
            if driver.wait_for(page, locator.selector, share).await? {
                return Ok(Some(locator.selector));
            }
        }
        Ok(None)
    }

    /// Whether any locator is present right now, without waiting.
    pub async fn any_present(
        &self,
        driver: &mut dyn SessionDriver,
        page: PageHandle,
    ) -> reelscout_browser::Result<bool> {
        for locator in self.locators {
            if driver.wait_for(page, locator.selector, Duration::ZERO).await? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
