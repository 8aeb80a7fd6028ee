use clap::Parser;
use reelscout_core::{AppConfig, AuthFailurePolicy, BrowserKind, OutputFormat};
use std::path::PathBuf;

/// Collect public reel metadata from an Instagram hashtag feed or a single reel.
///
/// Flags override the config file and `REELSCOUT_*` environment variables.
/// Credentials are only read from the config file or the environment.
#[derive(Debug, Parser)]
#[command(name = "reelscout", version, about)]
pub struct Cli {
    /// Hashtag to scrape, with or without the leading '#'
    #[arg(long, short = 't', conflicts_with = "url")]
    pub hashtag: Option<String>,

    /// Single reel URL to scrape
    #[arg(long, short = 'u')]
    pub url: Option<String>,

    /// Stop after this many reels
    #[arg(long, short = 'n')]
    pub max_items: Option<usize>,

    /// Seconds to wait between reels
    #[arg(long)]
    pub delay: Option<f64>,

    /// Show the browser window
    #[arg(long)]
    pub headful: bool,

    /// Browser to drive: chromium, chrome or edge
    #[arg(long)]
    pub browser: Option<BrowserKind>,

    /// Output format: json or csv
    #[arg(long, short = 'f')]
    pub format: Option<OutputFormat>,

    /// Directory for the result file
    #[arg(long, short = 'o')]
    pub output_dir: Option<PathBuf>,

    /// Stop between reels once this many seconds have passed
    #[arg(long)]
    pub max_runtime: Option<u64>,

    /// Fail the run when login fails instead of continuing anonymously
    #[arg(long)]
    pub abort_on_login_failure: bool,

    /// Config file to use instead of the default location
    #[arg(long, env = "REELSCOUT_CONFIG")]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Overlay the flags that were given onto `config`.
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(hashtag) = &self.hashtag {
            config.scrape.hashtag = Some(hashtag.clone());
            config.scrape.target_url = None;
        }
        if let Some(url) = &self.url {
            config.scrape.target_url = Some(url.clone());
            config.scrape.hashtag = None;
        }
        if let Some(max) = self.max_items {
            config.scrape.max_items = Some(max);
        }
        if let Some(delay) = self.delay {
            config.scrape.request_delay_secs = delay;
        }
        if self.headful {
            config.browser.headless = false;
        }
        if let Some(engine) = self.browser {
            config.browser.engine = engine;
        }
        if let Some(format) = self.format {
            config.output.format = format;
        }
        if let Some(dir) = &self.output_dir {
            config.output.dir = dir.clone();
        }
        if let Some(secs) = self.max_runtime {
            config.scrape.max_runtime_secs = Some(secs);
        }
        if self.abort_on_login_failure {
            config.scrape.auth_failure_policy = AuthFailurePolicy::Abort;
        }
    }
}
