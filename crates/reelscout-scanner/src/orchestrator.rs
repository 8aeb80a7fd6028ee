//! Run orchestrator for one scrape.
//!
//! This module provides the `ScrapeOrchestrator` which owns a browser
//! session for the length of a run, optionally logs in, walks the feed and
//! extracts each reel with retry, backoff and rate limiting. Per-item
//! failures are recorded and never abort the run; the session is closed on
//! every exit path.

use crate::auth::AuthController;
use crate::backoff::BackoffPolicy;
use crate::error::{Result, ScanError};
use crate::extractor::ReelExtractor;
use crate::feed::{discover, DiscoveryProgress, EntryPoint, FeedNavigator};
use crate::rate_limit::{RateLimit, RateLimiter};
use crate::session::ScrapeSession;
use chrono::{DateTime, Utc};
use reelscout_browser::SessionLauncher;
use reelscout_core::{
    AppConfig, AuthFailurePolicy, AuthState, CoreError, Credentials, ReelRecord, ScrapeTarget,
};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Terminal status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Discovery ran to its end and at least one record was collected
    Complete,
    /// Stopped early with at least one record
    Partial,
    /// No records, or aborted before discovery
    Failed,
}

/// What kind of step a failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Launch,
    Authentication,
    Discovery,
    Extraction,
    Navigation,
    SessionLost,
}

/// One recorded failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemFailure {
    /// Entry point URL, or the target for run-level failures
    pub entry_point: String,
    pub reason: String,
    pub kind: FailureKind,
}

/// Outcome of a run, including everything collected before it stopped.
#[derive(Debug, Clone, Serialize)]
pub struct ScrapeResult {
    pub run_id: Uuid,
    pub target: ScrapeTarget,
    /// Records in discovery order
    pub records: Vec<ReelRecord>,
    pub failures: Vec<ItemFailure>,
    pub status: RunStatus,
    pub auth_state: AuthState,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Events emitted while a run progresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    ItemCollected {
        index: usize,
        source_url: String,
    },
    ItemFailed {
        entry_point: String,
        reason: String,
    },
    RunCompleted {
        status: RunStatus,
        records: usize,
        failures: usize,
    },
}

/// Per-run knobs.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Upper bound on entry points to visit; `None` means until the feed ends
    pub max_items: Option<usize>,
    pub rate_limit: RateLimit,
    pub auth_failure_policy: AuthFailurePolicy,
    /// Wall-clock budget, checked between entry points
    pub max_runtime: Option<Duration>,
}

impl RunOptions {
    /// Build options from the `[scrape]` section of the config.
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            max_items: config.scrape.max_items,
            rate_limit: RateLimit::new(
                config.scrape.request_delay(),
                Duration::from_millis(config.scrape.jitter_ms),
            ),
            auth_failure_policy: config.scrape.auth_failure_policy,
            max_runtime: config.scrape.max_runtime(),
        }
    }

    fn validate(&self) -> std::result::Result<(), CoreError> {
        if self.max_items == Some(0) {
            return Err(CoreError::Validation(
                "max_items must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Mutable bookkeeping for one run.
#[derive(Debug, Default)]
struct RunState {
    records: Vec<ReelRecord>,
    failures: Vec<ItemFailure>,
    seen: HashSet<String>,
    stopped_early: bool,
    aborted: bool,
}

impl RunState {
    fn status(&self) -> RunStatus {
        if self.aborted || self.records.is_empty() {
            RunStatus::Failed
        } else if self.stopped_early {
            RunStatus::Partial
        } else {
            RunStatus::Complete
        }
    }
}

/// Coordinates one scrape from session launch to teardown.
pub struct ScrapeOrchestrator {
    launcher: Arc<dyn SessionLauncher>,
    auth: AuthController,
    extractor: ReelExtractor,
    backoff: BackoffPolicy,
    cancel: CancellationToken,
    events: Option<UnboundedSender<ProgressEvent>>,
}

impl ScrapeOrchestrator {
    /// Create a new orchestrator over `launcher`.
    #[must_use]
    pub fn new(launcher: Arc<dyn SessionLauncher>) -> Self {
        Self {
            launcher,
            auth: AuthController::default(),
            extractor: ReelExtractor::default(),
            backoff: BackoffPolicy::default(),
            cancel: CancellationToken::new(),
            events: None,
        }
    }

    /// Cancel the run through `token`. Checked between entry points.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Send progress events to `sender` in addition to the log.
    #[must_use]
    pub fn with_events(mut self, sender: UnboundedSender<ProgressEvent>) -> Self {
        self.events = Some(sender);
        self
    }

    #[must_use]
    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    #[must_use]
    pub fn with_auth(mut self, auth: AuthController) -> Self {
        self.auth = auth;
        self
    }

    #[must_use]
    pub fn with_extractor(mut self, extractor: ReelExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    /// Token that cancels this orchestrator's runs.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run one scrape of `target`.
    ///
    /// Runtime failures (launch, login, navigation, extraction, lost session)
    /// are reported in the returned [`ScrapeResult`], never as `Err`.
    ///
    /// # Errors
    /// [`ScanError::Core`] when `options` are invalid. No session is opened
    /// in that case.
    pub async fn run(
        &self,
        target: ScrapeTarget,
        options: &RunOptions,
        credentials: Option<&Credentials>,
    ) -> Result<ScrapeResult> {
        options.validate()?;

        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let mut state = RunState::default();
        tracing::info!(%run_id, %target, max_items = ?options.max_items, "starting scrape");

        let auth_state = match self.launcher.launch().await {
            Ok(driver) => {
                let mut session = ScrapeSession::new(driver);
                self.drive(&mut session, &target, options, credentials, &mut state)
                    .await;

                if let Err(e) = session.close().await {
                    tracing::warn!(%run_id, "session close failed: {}", e);
                }
                session.auth_state()
            }
            Err(e) => {
                tracing::error!(%run_id, "browser launch failed: {}", e);
                state.failures.push(ItemFailure {
                    entry_point: target.to_string(),
                    reason: e.to_string(),
                    kind: FailureKind::Launch,
                });
                state.aborted = true;
                AuthState::Anonymous
            }
        };

        let status = state.status();
        self.emit(ProgressEvent::RunCompleted {
            status,
            records: state.records.len(),
            failures: state.failures.len(),
        });

        Ok(ScrapeResult {
            run_id,
            target,
            records: state.records,
            failures: state.failures,
            status,
            auth_state,
            started_at,
            finished_at: Utc::now(),
        })
    }

    /// Steps between launch and teardown. Never fails: outcomes land in `state`.
    async fn drive(
        &self,
        session: &mut ScrapeSession,
        target: &ScrapeTarget,
        options: &RunOptions,
        credentials: Option<&Credentials>,
        state: &mut RunState,
    ) {
        if let Some(credentials) = credentials {
            if !self
                .authenticate(session, target, credentials, options, state)
                .await
            {
                return;
            }
        }

        let deadline = options.max_runtime.map(|d| Instant::now() + d);
        let mut feed = discover(
            target.clone(),
            options.max_items,
            Some(Box::new(|progress: &DiscoveryProgress| {
                tracing::debug!(
                    discovered = progress.discovered,
                    scrolls = progress.scrolls,
                    "discovery progress"
                );
            })),
        );
        let mut limiter = RateLimiter::new(options.rate_limit);

        loop {
            if self.cancel.is_cancelled() {
                tracing::info!("run cancelled");
                state.stopped_early = true;
                break;
            }
            if deadline.is_some_and(|d| Instant::now() >= d) {
                tracing::info!("max runtime reached");
                state.stopped_early = true;
                break;
            }

            let entry = match self.next_entry(&mut feed, session).await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    tracing::error!("discovery failed: {}", e);
                    state.failures.push(ItemFailure {
                        entry_point: target.to_string(),
                        reason: e.to_string(),
                        kind: FailureKind::Discovery,
                    });
                    state.stopped_early = true;
                    break;
                }
            };

            limiter.acquire().await;
            let outcome = self.extract_with_retry(session, &entry, &limiter).await;
            limiter.finish_item();

            match outcome {
                Ok(record) => {
                    if state.seen.insert(record.source_url.clone()) {
                        let index = session.record_collected();
                        tracing::info!(index, source_url = %record.source_url, "reel collected");
                        self.emit(ProgressEvent::ItemCollected {
                            index,
                            source_url: record.source_url.clone(),
                        });
                        state.records.push(record);
                    } else {
                        tracing::debug!(source_url = %record.source_url, "duplicate dropped");
                    }
                }
                Err(e) => {
                    let lost = e.is_session_lost();
                    self.record_item_failure(state, &entry, &e);
                    if lost {
                        tracing::error!("session lost, stopping run");
                        state.stopped_early = true;
                        break;
                    }
                }
            }
        }

        feed.close(session).await;
        tracing::debug!(
            discovered = feed.discovered(),
            collected = session.collected(),
            end = ?feed.end_reason(),
            "item loop finished"
        );
    }

    /// Log in. Returns whether the run should continue.
    async fn authenticate(
        &self,
        session: &mut ScrapeSession,
        target: &ScrapeTarget,
        credentials: &Credentials,
        options: &RunOptions,
        state: &mut RunState,
    ) -> bool {
        let err = match self.auth.login(session, credentials).await {
            Ok(_) => return true,
            Err(e) => e,
        };

        let fatal = matches!(
            err,
            ScanError::Authentication(_) | ScanError::ChallengeRequired(_)
        ) || options.auth_failure_policy == AuthFailurePolicy::Abort;

        if fatal {
            tracing::error!("login failed, aborting run: {}", err);
            state.failures.push(ItemFailure {
                entry_point: target.to_string(),
                reason: err.to_string(),
                kind: FailureKind::Authentication,
            });
            state.aborted = true;
            return false;
        }

        tracing::warn!("login failed, continuing anonymously: {}", err);
        session.set_auth_state(AuthState::Anonymous);
        true
    }

    /// Next entry point, retrying retryable discovery errors with backoff.
    async fn next_entry(
        &self,
        feed: &mut FeedNavigator,
        session: &mut ScrapeSession,
    ) -> Result<Option<EntryPoint>> {
        let mut backoff = self.backoff.start();
        loop {
            match feed.next(session).await {
                Ok(entry) => return Ok(entry),
                Err(e) if e.is_retryable() => match backoff.next_delay() {
                    Some(delay) => {
                        tracing::warn!(
                            "Discovery failed (retry {}/{}), retrying in {:?}: {}",
                            backoff.retries(),
                            self.backoff.max_retries,
                            delay,
                            e
                        );
                        tokio::time::sleep(delay).await;
                    }
                    None => return Err(e),
                },
                Err(e) => return Err(e),
            }
        }
    }

    /// Extract one entry point, retrying navigation and session failures
    /// after the request delay plus an exponential backoff step. Extraction
    /// errors are not retried.
    async fn extract_with_retry(
        &self,
        session: &mut ScrapeSession,
        entry: &EntryPoint,
        limiter: &RateLimiter,
    ) -> Result<ReelRecord> {
        let mut backoff = self.backoff.start();
        loop {
            match self.extractor.extract(session, entry).await {
                Ok(record) => return Ok(record),
                Err(e) if e.is_retryable() => match backoff.next_delay() {
                    Some(step) => {
                        let delay = limiter.retry_delay(step);
                        tracing::warn!(
                            "Extraction of {} failed (retry {}/{}), retrying in {:?}: {}",
                            entry,
                            backoff.retries(),
                            self.backoff.max_retries,
                            delay,
                            e
                        );
                        tokio::time::sleep(delay).await;
                    }
                    None => return Err(e),
                },
                Err(e) => return Err(e),
            }
        }
    }

    fn record_item_failure(&self, state: &mut RunState, entry: &EntryPoint, err: &ScanError) {
        let kind = match err {
            ScanError::Extraction { .. } => FailureKind::Extraction,
            e if e.is_session_lost() => FailureKind::SessionLost,
            _ => FailureKind::Navigation,
        };
        tracing::warn!(entry = %entry, ?kind, "item failed: {}", err);
        state.failures.push(ItemFailure {
            entry_point: entry.url.clone(),
            reason: err.to_string(),
            kind,
        });
        self.emit(ProgressEvent::ItemFailed {
            entry_point: entry.url.clone(),
            reason: err.to_string(),
        });
    }

    fn emit(&self, event: ProgressEvent) {
        if let ProgressEvent::RunCompleted {
            status,
            records,
            failures,
        } = &event
        {
            tracing::info!(?status, records, failures, "scrape finished");
        }
        if let Some(sender) = &self.events {
            // Receiver may be gone; progress is best-effort
            let _ = sender.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(url: &str) -> ReelRecord {
        ReelRecord {
            source_url: url.to_string(),
            thumbnail_ref: None,
            like_count: reelscout_core::Count::Unknown,
            comment_count: reelscout_core::Count::Unknown,
            author_name: "someone".to_string(),
            audio_info: None,
            collected_at: Utc::now(),
        }
    }

    #[test]
    fn test_status_rules() {
        let mut state = RunState::default();
        assert_eq!(state.status(), RunStatus::Failed);

        state.records.push(record("https://www.instagram.com/reel/a/"));
        assert_eq!(state.status(), RunStatus::Complete);

        state.stopped_early = true;
        assert_eq!(state.status(), RunStatus::Partial);

        state.aborted = true;
        assert_eq!(state.status(), RunStatus::Failed);
    }

    #[test]
    fn test_zero_max_items_rejected() {
        let options = RunOptions {
            max_items: Some(0),
            ..RunOptions::default()
        };
        assert!(options.validate().is_err());
        assert!(RunOptions::default().validate().is_ok());
    }

    #[test]
    fn test_options_from_config() {
        let mut config = AppConfig::default();
        config.scrape.max_items = Some(5);
        config.scrape.max_runtime_secs = Some(60);

        let options = RunOptions::from_config(&config);
        assert_eq!(options.max_items, Some(5));
        assert_eq!(options.rate_limit.delay, Duration::from_secs(2));
        assert_eq!(options.max_runtime, Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(
            serde_json::to_string(&RunStatus::Partial).unwrap(),
            "\"partial\""
        );
    }
}
