mod utils;
#[allow(unused)]
use utils::*;

use mock_service::{Behavior, Endpoint, MockService, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use vigil::prelude::*;
use vigil_core::{read_batch, JourneyConfig};

fn executor(mock: &MockService, users: usize) -> JourneyExecutor {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("users.json");
    write_users(&path, users);
    let pool = CredentialPool::new(read_batch(&path).unwrap());

    JourneyExecutor::new(
        Arc::new(pool),
        ApiClient::new(&mock.base_url()).unwrap(),
        Recorder::new(),
    )
}

#[tracing_test::traced_test]
#[tokio::test]
async fn completes_the_journey() {
    let mock = mock().await;
    let state = mock.state();
    state.fixed_id(Endpoint::Prayer, "p-1");
    state.fixed_id(Endpoint::Testimony, "t-1");
    state.fixed_id(Endpoint::Comment, "c-1");

    let executor = executor(&mock, 2);
    let outcome = executor.iteration(1, 0).await;

    assert_eq!(outcome, JourneyOutcome::Completed);
    assert_eq!(executor.recorder().journeys(), 1);
    assert_eq!(executor.recorder().requests(), 4);
    assert_eq!(executor.recorder().failed_requests(), 0);
    assert!(logs_contain("Prayer created with uuid: p-1"));
    assert!(logs_contain("Testimony created with uuid: t-1"));
    assert!(logs_contain("Post-login actions completed."));
    assert!(!logs_contain("ERROR"));
}

#[tracing_test::traced_test]
#[tokio::test]
async fn prayer_failure_skips_dependent_steps() {
    let mock = mock().await;
    let state = mock.state();
    state.set_behavior(
        Endpoint::Prayer,
        Behavior::Status(StatusCode::INTERNAL_SERVER_ERROR),
    );

    let executor = executor(&mock, 1);
    let outcome = executor.iteration(1, 0).await;

    assert_eq!(outcome, JourneyOutcome::PrayerFailed);
    assert_eq!(state.hits(Endpoint::Prayer), 1);
    assert_eq!(state.hits(Endpoint::Testimony), 0);
    assert_eq!(state.hits(Endpoint::Comment), 0);
    assert_eq!(executor.recorder().journeys(), 1);
    assert_eq!(executor.recorder().failed_requests(), 1);
    assert!(logs_contain("Skipping testimony and comment creation"));
}

#[tracing_test::traced_test]
#[tokio::test]
async fn missing_prayer_uuid_counts_as_failure() {
    let mock = mock().await;
    let state = mock.state();
    state.set_behavior(Endpoint::Prayer, Behavior::MissingField);

    let executor = executor(&mock, 1);
    let outcome = executor.iteration(1, 0).await;

    assert_eq!(outcome, JourneyOutcome::PrayerFailed);
    assert_eq!(state.hits(Endpoint::Testimony), 0);
    // A well-formed 200 is not a failed request, only a failed step.
    assert_eq!(executor.recorder().failed_requests(), 0);
    assert!(logs_contain("data.uuid"));
}

#[tracing_test::traced_test]
#[tokio::test]
async fn testimony_failure_skips_comment() {
    let mock = mock().await;
    let state = mock.state();
    state.set_behavior(
        Endpoint::Testimony,
        Behavior::Status(StatusCode::BAD_REQUEST),
    );

    let executor = executor(&mock, 1);
    let outcome = executor.iteration(1, 0).await;

    assert_eq!(outcome, JourneyOutcome::TestimonyFailed);
    assert_eq!(state.hits(Endpoint::Testimony), 1);
    assert_eq!(state.hits(Endpoint::Comment), 0);
    assert!(logs_contain("Skipping comment creation"));
}

#[tracing_test::traced_test]
#[tokio::test]
async fn rejected_login_ends_the_iteration() {
    let mock = mock().await;
    let state = mock.state();
    state.set_behavior(Endpoint::Login, Behavior::Status(StatusCode::UNAUTHORIZED));

    let executor = executor(&mock, 3);
    let outcome = executor.iteration(2, 5).await;

    assert_eq!(outcome, JourneyOutcome::LoginFailed);
    assert_eq!(state.hits(Endpoint::Login), 1);
    assert_eq!(state.hits(Endpoint::Prayer), 0);
    assert_eq!(state.hits(Endpoint::Testimony), 0);
    assert_eq!(state.hits(Endpoint::Comment), 0);
    assert_eq!(executor.recorder().journeys(), 1);
    assert!(logs_contain("Login failed"));
}

#[tracing_test::traced_test]
#[tokio::test]
async fn login_without_token_is_classified() {
    let mock = mock().await;
    let state = mock.state();
    state.set_behavior(Endpoint::Login, Behavior::MissingField);

    let executor = executor(&mock, 1);
    assert_eq!(
        executor.iteration(1, 0).await,
        JourneyOutcome::LoginFailed
    );
    assert!(logs_contain("is missing from the response"));

    state.set_behavior(Endpoint::Login, Behavior::Malformed);
    assert_eq!(
        executor.iteration(1, 1).await,
        JourneyOutcome::LoginFailed
    );
    assert!(logs_contain("Failed to parse login response JSON"));
    assert_eq!(state.hits(Endpoint::Prayer), 0);
}

#[tracing_test::traced_test]
#[tokio::test]
async fn comment_failure_ends_the_iteration() {
    let mock = mock().await;
    let state = mock.state();
    state.set_behavior(
        Endpoint::Comment,
        Behavior::Status(StatusCode::INTERNAL_SERVER_ERROR),
    );

    let executor = executor(&mock, 1);
    let outcome = executor.iteration(1, 0).await;

    assert_eq!(outcome, JourneyOutcome::CommentFailed);
    assert_eq!(state.hits(Endpoint::Comment), 1);
    assert_eq!(executor.recorder().journeys(), 1);
    assert_eq!(executor.recorder().requests(), 4);
    assert_eq!(executor.recorder().failed_requests(), 1);
    assert!(logs_contain("Comment post failed"));
    assert!(!logs_contain("Post-login actions completed."));
}

#[tracing_test::traced_test]
#[tokio::test]
async fn steps_without_parent_ids_send_nothing() {
    let mock = mock().await;
    let state = mock.state();
    let runner = JourneyRunner::new(ApiClient::new(&mock.base_url()).unwrap());

    assert_eq!(runner.create_testimony("token", None).await, None);
    assert!(!runner.add_comment("token", Some("p"), None).await);
    assert!(!runner.add_comment("token", None, Some("t")).await);

    assert_eq!(state.hits(Endpoint::Testimony), 0);
    assert_eq!(state.hits(Endpoint::Comment), 0);
    assert!(logs_contain("Testimony creation skipped: prayer uuid is missing."));
    assert!(logs_contain("Comment post skipped: testimony uuid is missing."));
    assert!(logs_contain("Comment post skipped: prayer uuid is missing."));
}

#[tracing_test::traced_test]
#[tokio::test]
async fn login_needs_identity_and_secret() {
    let mock = mock().await;
    let state = mock.state();
    let api = ApiClient::new(&mock.base_url()).unwrap();

    assert_eq!(vigil::auth::login(&api, "", "pw").await, None);
    assert_eq!(vigil::auth::login(&api, "user@example.com", "").await, None);

    assert_eq!(state.hits(Endpoint::Login), 0);
    assert!(logs_contain("Login called with a missing email or password."));
}

#[tokio::test]
#[ntest::timeout(20_000)]
async fn staged_run_writes_a_passing_summary() {
    let mock = mock().await;
    let dir = tempfile::tempdir().unwrap();
    let users = dir.path().join("users.json");
    let summary = dir.path().join("journey_results.json");
    write_users(&users, 3);

    let config = JourneyConfig::new(
        &mock.base_url(),
        vec![
            Stage::new(Duration::from_millis(400), 3),
            Stage::new(Duration::from_millis(400), 3),
            Stage::new(Duration::from_millis(200), 0),
        ],
    )
    .unwrap()
    .users(&users)
    .summary(&summary);

    let stats = vigil::load::run_load_test(&config).await.unwrap();

    assert!(stats.iterations > 0);
    assert_eq!(stats.max_workers, 3);
    assert_eq!(stats.requests, stats.iterations * 4);
    assert_eq!(stats.failed_requests, 0);
    assert_eq!(stats.thresholds.len(), 3);
    assert!(stats.passed());
    assert_eq!(mock.state().hits(Endpoint::Comment), stats.iterations);

    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&summary).unwrap()).unwrap();
    assert_eq!(written["iterations"], stats.iterations);
    assert_eq!(written["max_workers"], 3);
}

#[tokio::test]
#[ntest::timeout(20_000)]
async fn failing_api_breaches_thresholds() {
    let mock = mock().await;
    mock.state().set_behavior(
        Endpoint::Prayer,
        Behavior::Status(StatusCode::SERVICE_UNAVAILABLE),
    );
    let dir = tempfile::tempdir().unwrap();
    let users = dir.path().join("users.json");
    write_users(&users, 1);

    let config = JourneyConfig::new(
        &mock.base_url(),
        vec![
            Stage::new(Duration::from_millis(100), 1),
            Stage::new(Duration::from_millis(300), 1),
        ],
    )
    .unwrap()
    .users(&users)
    .summary(dir.path().join("journey_results.json"));

    let stats = vigil::load::run_load_test(&config).await.unwrap();

    assert!(stats.failed_rate > 0.4);
    assert!(!stats.passed());
    assert!(stats
        .thresholds
        .iter()
        .any(|t| t.name.starts_with("http_req_failed") && !t.passed));
}
