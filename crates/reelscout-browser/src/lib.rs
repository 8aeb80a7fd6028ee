//! Browser session driver for JavaScript-heavy feeds.
//!
//! Exposes page-level primitives (open, scroll, wait, extract, fill, click)
//! behind the [`SessionDriver`] trait, with a Chromium-backed implementation
//! driven over the DevTools protocol.

pub mod driver;
pub mod engine;
pub mod error;
pub mod pacing;

pub use driver::{PageHandle, SessionDriver, SessionLauncher};
pub use engine::{BrowserEngine, ChromiumLauncher};
pub use error::{BrowserError, Result};
