//! Reelscout Scanner - the scraping engine.
//!
//! This crate drives a browser session through one scrape run: optional
//! login, hashtag feed discovery, per-reel extraction and run
//! orchestration. It is built to keep going under flaky and rate-limited
//! conditions, reporting partial results instead of failing outright.
//!
//! # Features
//!
//! - Selector fallback chains for every extracted field
//! - Compact-number normalization (`12.3K` → 12300)
//! - Bounded exponential backoff for navigation and session failures
//! - Request spacing with random jitter
//! - Cancellation and wall-clock budget checked between entry points
//!
//! # Example
//!
//! ```rust,ignore
//! use reelscout_browser::ChromiumLauncher;
//! use reelscout_scanner::{RunOptions, ScrapeOrchestrator};
//! use std::sync::Arc;
//!
//! let launcher = Arc::new(ChromiumLauncher::new(config.browser.clone()));
//! let orchestrator = ScrapeOrchestrator::new(launcher);
//!
//! let result = orchestrator
//!     .run(config.target()?, &RunOptions::from_config(&config), None)
//!     .await?;
//! println!("{:?}: {} records", result.status, result.records.len());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

#[allow(missing_docs)]
pub mod auth;
#[allow(missing_docs)]
pub mod backoff;
#[allow(missing_docs)]
pub mod error;
#[allow(missing_docs)]
pub mod extractor;
#[allow(missing_docs)]
pub mod feed;
#[allow(missing_docs)]
pub mod normalize;
#[allow(missing_docs)]
pub mod orchestrator;
#[allow(missing_docs)]
pub mod rate_limit;
#[allow(missing_docs)]
pub mod selectors;
#[allow(missing_docs)]
pub mod session;

// Re-export commonly used types
pub use auth::{AuthController, LOGIN_URL};
pub use backoff::{Backoff, BackoffPolicy};
pub use error::{Result, ScanError};
pub use extractor::ReelExtractor;
pub use feed::{discover, DiscoveryEnd, DiscoveryProgress, EntryPoint, FeedNavigator};
pub use normalize::{canonical_reel_url, parse_compact_count, parse_og_description};
pub use orchestrator::{
    FailureKind, ItemFailure, ProgressEvent, RunOptions, RunStatus, ScrapeOrchestrator,
    ScrapeResult,
};
pub use rate_limit::{RateLimit, RateLimiter};
pub use selectors::{Locator, SelectorChain};
pub use session::ScrapeSession;
