//! Reelscout Core - Foundation crate for the reelscout scraper.
//!
//! This crate provides shared types, error handling and configuration
//! management that all other reelscout crates depend on.
//!
//! # Modules
//!
//! - [`error`] - Central error types using thiserror
//! - [`config`] - TOML-based configuration with XDG paths and env overrides
//! - [`types`] - Validated newtypes (`Hashtag`, `TargetUrl`, `ScrapeTarget`, `Credentials`)
//! - [`record`] - The scraped `ReelRecord` and its `Count` sentinel
//!
//! # Example
//!
//! ```rust
//! use reelscout_core::{AppConfig, ScrapeTarget};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::default();
//! config.validate()?;
//!
//! let target = ScrapeTarget::hashtag("#fitness")?;
//! assert_eq!(target.to_string(), "#fitness");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
pub mod record;
pub mod types;

// Re-export commonly used types
pub use config::{
    AppConfig, AuthConfig, AuthFailurePolicy, BrowserConfig, BrowserKind, OutputConfig,
    OutputFormat, ScrapeConfig,
};
pub use error::{ConfigError, ConfigResult, CoreError, Result};
pub use record::{Count, ReelRecord};
pub use types::{AuthState, Credentials, Hashtag, ScrapeTarget, TargetUrl, INSTAGRAM_ORIGIN};
