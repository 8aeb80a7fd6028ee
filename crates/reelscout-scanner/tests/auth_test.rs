mod common;

use common::{login_page, FakePage, Scenario, SUBMIT};
use reelscout_browser::BrowserError;
use reelscout_core::{AuthState, Credentials};
use reelscout_scanner::{AuthController, ScanError, ScrapeSession, LOGIN_URL};
use std::time::Duration;

fn credentials() -> Credentials {
    Credentials::new("reel_fan", "hunter2").unwrap()
}

fn controller() -> AuthController {
    AuthController::new().with_outcome_timeout(Duration::from_secs(3))
}

#[tokio::test(start_paused = true)]
async fn test_successful_login() {
    let home = FakePage::default().with("svg[aria-label=\"Home\"]");
    let scenario =
        Scenario::new().page(LOGIN_URL, login_page("https://www.instagram.com/", home));
    let mut session = ScrapeSession::new(scenario.driver());

    let state = controller()
        .login(&mut session, &credentials())
        .await
        .expect("login");

    assert_eq!(state, AuthState::Authenticated);
    assert_eq!(session.auth_state(), AuthState::Authenticated);

    let world = scenario.world();
    assert_eq!(
        world.fills,
        vec![
            ("input[name=\"username\"]".to_string(), "reel_fan".to_string()),
            ("input[name=\"password\"]".to_string(), "hunter2".to_string()),
        ]
    );
    // Credentials are submitted exactly once
    assert_eq!(world.clicks.iter().filter(|c| *c == SUBMIT).count(), 1);
    assert_eq!(world.open_tabs(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_challenge_is_detected() {
    let scenario = Scenario::new().page(
        LOGIN_URL,
        login_page(
            "https://www.instagram.com/challenge/action/AbC/",
            FakePage::default(),
        ),
    );
    let mut session = ScrapeSession::new(scenario.driver());

    let err = controller()
        .login(&mut session, &credentials())
        .await
        .unwrap_err();
    assert!(matches!(err, ScanError::ChallengeRequired(_)));
    assert_eq!(session.auth_state(), AuthState::Anonymous);
}

#[tokio::test(start_paused = true)]
async fn test_verification_code_input_is_a_challenge() {
    let two_factor = FakePage::default().with("input[name=\"verificationCode\"]");
    let scenario = Scenario::new().page(LOGIN_URL, login_page(LOGIN_URL, two_factor));
    let mut session = ScrapeSession::new(scenario.driver());

    let err = controller()
        .login(&mut session, &credentials())
        .await
        .unwrap_err();
    assert!(matches!(err, ScanError::ChallengeRequired(_)));
}

#[tokio::test(start_paused = true)]
async fn test_rejected_password() {
    let rejected = FakePage::default().text(
        "#slfErrorAlert",
        "Sorry, your password was incorrect.",
    );
    let scenario = Scenario::new().page(LOGIN_URL, login_page(LOGIN_URL, rejected));
    let mut session = ScrapeSession::new(scenario.driver());

    let err = controller()
        .login(&mut session, &credentials())
        .await
        .unwrap_err();
    match err {
        ScanError::Authentication(reason) => assert!(reason.contains("incorrect")),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_stuck_on_login_page_times_out() {
    let scenario = Scenario::new().page(LOGIN_URL, login_page(LOGIN_URL, FakePage::default()));
    let mut session = ScrapeSession::new(scenario.driver());

    let start = tokio::time::Instant::now();
    let err = controller()
        .login(&mut session, &credentials())
        .await
        .unwrap_err();
    assert!(matches!(err, ScanError::Authentication(_)));
    assert!(start.elapsed() >= Duration::from_secs(3));
    assert_eq!(scenario.world().clicks.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_missing_form_is_not_a_credential_failure() {
    let scenario = Scenario::new().page(LOGIN_URL, FakePage::default());
    let mut session = ScrapeSession::new(scenario.driver());

    let err = controller()
        .login(&mut session, &credentials())
        .await
        .unwrap_err();
    assert!(
        matches!(err, ScanError::Browser(BrowserError::Interaction(ref reason)) if reason.contains("username")),
        "unexpected error: {err:?}"
    );
    assert!(scenario.world().fills.is_empty());
    assert_eq!(scenario.world().open_tabs(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_login_page_failure_is_a_browser_error() {
    let scenario = Scenario::new();
    let mut session = ScrapeSession::new(scenario.driver());

    let err = controller()
        .login(&mut session, &credentials())
        .await
        .unwrap_err();
    assert!(matches!(err, ScanError::Browser(_)));
}
