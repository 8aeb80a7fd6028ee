//! Configuration management for reelscout.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides.

use crate::error::{ConfigError, ConfigResult, CoreError};
use crate::types::{Credentials, ScrapeTarget};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Lower bound for `browser.navigation_timeout_ms`.
pub const MIN_NAVIGATION_TIMEOUT_MS: u64 = 1_000;

/// Upper bound for `browser.navigation_timeout_ms`.
pub const MAX_NAVIGATION_TIMEOUT_MS: u64 = 120_000;

/// Main application configuration.
///
/// This is loaded from `~/.config/reelscout/config.toml` (or platform equivalent).
/// If the file doesn't exist, default values are used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// What to scrape and how fast
    pub scrape: ScrapeConfig,
    /// Browser automation settings
    pub browser: BrowserConfig,
    /// Where and how records are written
    pub output: OutputConfig,
    /// Optional login
    pub auth: AuthConfig,
}

impl AppConfig {
    /// Load configuration from the default path, falling back to defaults if not found.
    ///
    /// # Errors
    /// Returns error if:
    /// - Config directory cannot be determined
    /// - File exists but cannot be read
    /// - File contents are not valid TOML
    pub fn load() -> ConfigResult<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from an explicit path, falling back to defaults if it doesn't exist.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if path.exists() {
            tracing::debug!("Loading config from {}", path.display());
            let contents = fs::read_to_string(path)?;
            let config = toml::from_str(&contents)?;
            Ok(config)
        } else {
            tracing::debug!("Config file not found at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Load configuration with environment variable overrides.
    ///
    /// See [`AppConfig::apply_env`] for the supported variables.
    pub fn load_with_env() -> ConfigResult<Self> {
        let mut config = Self::load()?;
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply `REELSCOUT_*` overrides read through `lookup`.
    ///
    /// Supported variables:
    /// - `REELSCOUT_HASHTAG`, `REELSCOUT_TARGET_URL`
    /// - `REELSCOUT_MAX_ITEMS`, `REELSCOUT_REQUEST_DELAY` (seconds)
    /// - `REELSCOUT_HEADLESS` (true/false), `REELSCOUT_NAVIGATION_TIMEOUT_MS`
    /// - `REELSCOUT_BROWSER` (chromium/chrome/edge), `REELSCOUT_PROXY_SERVER`
    /// - `REELSCOUT_PROXY_USERNAME`, `REELSCOUT_PROXY_PASSWORD`
    /// - `REELSCOUT_USERNAME`, `REELSCOUT_PASSWORD`
    /// - `REELSCOUT_OUTPUT_DIR`, `REELSCOUT_OUTPUT_FORMAT` (json/csv)
    ///
    /// Empty values are ignored. Unparseable values are reported rather than
    /// silently dropped.
    pub fn apply_env<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(val) = get("REELSCOUT_HASHTAG") {
            self.scrape.hashtag = Some(val);
        }
        if let Some(val) = get("REELSCOUT_TARGET_URL") {
            self.scrape.target_url = Some(val);
        }
        if let Some(val) = get("REELSCOUT_MAX_ITEMS") {
            self.scrape.max_items = Some(parse_env("REELSCOUT_MAX_ITEMS", &val)?);
        }
        if let Some(val) = get("REELSCOUT_REQUEST_DELAY") {
            self.scrape.request_delay_secs = parse_env("REELSCOUT_REQUEST_DELAY", &val)?;
        }
        if let Some(val) = get("REELSCOUT_HEADLESS") {
            self.browser.headless = parse_env("REELSCOUT_HEADLESS", &val)?;
            tracing::debug!("Override browser.headless from env: {}", self.browser.headless);
        }
        if let Some(val) = get("REELSCOUT_NAVIGATION_TIMEOUT_MS") {
            self.browser.navigation_timeout_ms = parse_env("REELSCOUT_NAVIGATION_TIMEOUT_MS", &val)?;
        }
        if let Some(val) = get("REELSCOUT_BROWSER") {
            self.browser.engine = parse_env("REELSCOUT_BROWSER", &val)?;
        }
        if let Some(val) = get("REELSCOUT_PROXY_SERVER") {
            self.browser.proxy_server = Some(val);
        }
        if let Some(val) = get("REELSCOUT_PROXY_USERNAME") {
            self.browser.proxy_username = Some(val);
        }
        if let Some(val) = get("REELSCOUT_PROXY_PASSWORD") {
            self.browser.proxy_password = Some(val);
        }
        if let Some(val) = get("REELSCOUT_USERNAME") {
            self.auth.username = Some(val);
        }
        if let Some(val) = get("REELSCOUT_PASSWORD") {
            self.auth.password = Some(val);
        }
        if let Some(val) = get("REELSCOUT_OUTPUT_DIR") {
            self.output.dir = PathBuf::from(val);
        }
        if let Some(val) = get("REELSCOUT_OUTPUT_FORMAT") {
            self.output.format = parse_env("REELSCOUT_OUTPUT_FORMAT", &val)?;
        }

        Ok(())
    }

    /// Check value ranges and cross-field constraints.
    ///
    /// The target itself is checked by [`AppConfig::target`].
    pub fn validate(&self) -> ConfigResult<()> {
        if self.scrape.max_items == Some(0) {
            return Err(ConfigError::invalid("scrape.max_items", "must be a positive integer"));
        }
        if !self.scrape.request_delay_secs.is_finite() || self.scrape.request_delay_secs < 0.0 {
            return Err(ConfigError::invalid(
                "scrape.request_delay_secs",
                "must be a non-negative number of seconds",
            ));
        }
        if !(MIN_NAVIGATION_TIMEOUT_MS..=MAX_NAVIGATION_TIMEOUT_MS)
            .contains(&self.browser.navigation_timeout_ms)
        {
            return Err(ConfigError::invalid(
                "browser.navigation_timeout_ms",
                format!(
                    "must be between {MIN_NAVIGATION_TIMEOUT_MS} and {MAX_NAVIGATION_TIMEOUT_MS}"
                ),
            ));
        }
        if self.browser.window_width == 0 || self.browser.window_height == 0 {
            return Err(ConfigError::invalid("browser.window_size", "must be non-zero"));
        }
        if self.browser.proxy_username.is_some() != self.browser.proxy_password.is_some() {
            return Err(ConfigError::invalid(
                "browser.proxy_username",
                "proxy username and password must be set together",
            ));
        }
        if self.browser.proxy_username.is_some() && self.browser.proxy_server.is_none() {
            return Err(ConfigError::invalid(
                "browser.proxy_server",
                "proxy credentials need a proxy server",
            ));
        }
        if self.auth.username.is_some() != self.auth.password.is_some() {
            return Err(ConfigError::invalid(
                "auth",
                "username and password must be set together",
            ));
        }
        Ok(())
    }

    /// Resolve the configured target.
    pub fn target(&self) -> Result<ScrapeTarget, CoreError> {
        ScrapeTarget::from_parts(
            self.scrape.hashtag.as_deref(),
            self.scrape.target_url.as_deref(),
        )
    }

    /// Resolve configured credentials, if any.
    pub fn credentials(&self) -> Result<Option<Credentials>, CoreError> {
        match (&self.auth.username, &self.auth.password) {
            (Some(user), Some(pass)) => Credentials::new(user.clone(), pass.clone()).map(Some),
            _ => Ok(None),
        }
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/reelscout/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        let dirs =
            ProjectDirs::from("com", "reelscout", "reelscout").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }
}

fn parse_env<T: FromStr>(key: &str, value: &str) -> ConfigResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::invalid(key, format!("cannot parse '{value}'")))
}

/// What happens when login fails for reasons other than bad credentials or a challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthFailurePolicy {
    /// Log the failure and scrape anonymously
    #[default]
    ContinueAnonymous,
    /// Fail the run
    Abort,
}

/// Scrape target and pacing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapeConfig {
    /// Hashtag to scrape (mutually exclusive with `target_url`)
    pub hashtag: Option<String>,
    /// Single reel URL to scrape
    pub target_url: Option<String>,
    /// Maximum number of reels; unset means bounded only by the discovery ceiling
    pub max_items: Option<usize>,
    /// Delay between extractions in seconds
    pub request_delay_secs: f64,
    /// Extra random delay added on top of `request_delay_secs`
    pub jitter_ms: u64,
    /// Stop between items once this much wall time has passed
    pub max_runtime_secs: Option<u64>,
    /// Handling of non-credential login failures
    pub auth_failure_policy: AuthFailurePolicy,
}

impl ScrapeConfig {
    /// `request_delay_secs` as a `Duration`.
    #[must_use]
    pub fn request_delay(&self) -> Duration {
        Duration::from_secs_f64(self.request_delay_secs.max(0.0))
    }

    /// `max_runtime_secs` as a `Duration`.
    #[must_use]
    pub fn max_runtime(&self) -> Option<Duration> {
        self.max_runtime_secs.map(Duration::from_secs)
    }
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            hashtag: None,
            target_url: None,
            max_items: None,
            request_delay_secs: 2.0,
            jitter_ms: 750,
            max_runtime_secs: None,
            auth_failure_policy: AuthFailurePolicy::default(),
        }
    }
}

/// Supported browser engines. All are Chromium-family and driven over CDP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrowserKind {
    /// Chromium, located automatically
    #[default]
    Chromium,
    /// Google Chrome
    Chrome,
    /// Microsoft Edge
    Edge,
}

impl FromStr for BrowserKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chromium" => Ok(Self::Chromium),
            "chrome" => Ok(Self::Chrome),
            "edge" | "msedge" => Ok(Self::Edge),
            other => Err(CoreError::Validation(format!(
                "unsupported browser '{other}': expected chromium, chrome or edge"
            ))),
        }
    }
}

impl fmt::Display for BrowserKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Chromium => "chromium",
            Self::Chrome => "chrome",
            Self::Edge => "edge",
        })
    }
}

/// Browser automation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Run browser in headless mode
    pub headless: bool,
    /// Per navigation/wait timeout in milliseconds
    pub navigation_timeout_ms: u64,
    /// Browser engine
    pub engine: BrowserKind,
    /// Browser window width
    pub window_width: u32,
    /// Browser window height
    pub window_height: u32,
    /// Proxy server, e.g. `http://proxy.example.com:8080`
    pub proxy_server: Option<String>,
    /// Proxy account name, never written back
    #[serde(skip_serializing)]
    pub proxy_username: Option<String>,
    /// Proxy password, never written back
    #[serde(skip_serializing)]
    pub proxy_password: Option<String>,
}

impl BrowserConfig {
    /// `navigation_timeout_ms` as a `Duration`.
    #[must_use]
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            navigation_timeout_ms: 30_000,
            engine: BrowserKind::default(),
            window_width: 1920,
            window_height: 1080,
            proxy_server: None,
            proxy_username: None,
            proxy_password: None,
        }
    }
}

/// Output file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// JSON array of records
    #[default]
    Json,
    /// CSV with a header row
    Csv,
}

impl OutputFormat {
    /// File extension without the dot.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            other => Err(CoreError::Validation(format!(
                "output format must be 'json' or 'csv', got '{other}'"
            ))),
        }
    }
}

/// Output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory the output file is written to
    pub dir: PathBuf,
    /// File format
    pub format: OutputFormat,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("output"),
            format: OutputFormat::default(),
        }
    }
}

/// Optional login credentials. Read from the file or environment, never written back.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Account name
    #[serde(skip_serializing)]
    pub username: Option<String>,
    /// Account password
    #[serde(skip_serializing)]
    pub password: Option<String>,
}
