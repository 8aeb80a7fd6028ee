//! `reelscout` binary: config and flags in, one scrape run, one result file out.

mod args;

use anyhow::Context;
use args::Cli;
use clap::Parser;
use reelscout_browser::ChromiumLauncher;
use reelscout_core::AppConfig;
use reelscout_scanner::{RunOptions, RunStatus, ScrapeOrchestrator, ScrapeResult};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};

fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,reelscout=debug"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    match execute(&cli).await {
        Ok(RunStatus::Failed) => ExitCode::FAILURE,
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(2)
        }
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let mut config = AppConfig::load_from(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            config.apply_env(|key| std::env::var(key).ok())?;
            config
        }
        None => AppConfig::load_with_env().context("failed to load config")?,
    };

    cli.apply(&mut config);
    config.validate().context("invalid configuration")?;
    Ok(config)
}

async fn execute(cli: &Cli) -> anyhow::Result<RunStatus> {
    let config = load_config(cli)?;
    let target = config
        .target()
        .context("set a target with --hashtag or --url")?;
    let credentials = config.credentials()?;
    let options = RunOptions::from_config(&config);

    info!("Starting reelscout v{}", env!("CARGO_PKG_VERSION"));

    // Per-item progress is logged by the orchestrator itself.
    let launcher = Arc::new(ChromiumLauncher::new(config.browser.clone()));
    let orchestrator = ScrapeOrchestrator::new(launcher);

    let token = orchestrator.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping after the current reel");
            token.cancel();
        }
    });

    let result = orchestrator
        .run(target, &options, credentials.as_ref())
        .await?;

    let path = reelscout_export::save(&result.records, &config.output.dir, config.output.format)
        .context("failed to write results")?;

    print_summary(&result, &path);
    Ok(result.status)
}

fn print_summary(result: &ScrapeResult, path: &std::path::Path) {
    let elapsed = result.finished_at - result.started_at;

    println!("target:   {}", result.target);
    println!("status:   {:?}", result.status);
    println!("records:  {}", result.records.len());
    println!("failures: {}", result.failures.len());
    println!("elapsed:  {}s", elapsed.num_seconds());
    println!("output:   {}", path.display());

    for failure in &result.failures {
        println!("  - [{:?}] {}: {}", failure.kind, failure.entry_point, failure.reason);
    }
}
