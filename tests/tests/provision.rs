mod utils;
#[allow(unused)]
use utils::*;

use mock_service::{Behavior, Endpoint, StatusCode};
use std::sync::atomic::Ordering;
use vigil::api::ApiClient;
use vigil::error::ProvisionError;
use vigil::provision::UserProvisioner;
use vigil_core::read_batch;

#[tokio::test]
#[ntest::timeout(10_000)]
async fn prepares_every_requested_user() {
    let mock = mock().await;
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("prepared_users.json");

    let store = MockOtpStore::new(mock.state());
    let closed = store.closed();
    let config = provision_config(&mock.base_url(), 3, &output);
    let api = ApiClient::new(&mock.base_url()).unwrap();

    let users = UserProvisioner::new(config, api, store).run().await.unwrap();

    assert_eq!(users.len(), 3);
    assert!(users.iter().all(|u| !u.session_token.is_empty()));
    assert!(users
        .iter()
        .all(|u| u.identity.starts_with("user_loadtest_") && u.identity.ends_with("@example.com")));
    assert_eq!(read_batch(&output).unwrap(), users);
    assert_eq!(mock.state().hits(Endpoint::Login), 3);
    assert!(closed.load(Ordering::Relaxed));
}

#[tokio::test]
#[ntest::timeout(10_000)]
async fn failures_only_drop_the_failing_identity() {
    let mock = mock().await;
    let state = mock.state();
    state.fail_email(
        Endpoint::Register,
        "_0@",
        Behavior::Status(StatusCode::CONFLICT),
    );
    state.fail_email(
        Endpoint::VerifyOtp,
        "_2@",
        Behavior::Status(StatusCode::BAD_REQUEST),
    );
    state.fail_email(
        Endpoint::Login,
        "_3@",
        Behavior::Status(StatusCode::UNAUTHORIZED),
    );
    state.fail_email(Endpoint::Login, "_4@", Behavior::MissingField);
    state.fail_email(Endpoint::Login, "_5@", Behavior::Malformed);

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("prepared_users.json");
    let store = MockOtpStore::new(state.clone())
        .withhold("_1@")
        .break_for("_6@");
    let config = provision_config(&mock.base_url(), 8, &output);
    let api = ApiClient::new(&mock.base_url()).unwrap();

    let users = UserProvisioner::new(config, api, store).run().await.unwrap();

    assert_eq!(users.len(), 1);
    assert!(users[0].identity.ends_with("_7@example.com"));
    assert_eq!(read_batch(&output).unwrap(), users);

    assert_eq!(state.hits(Endpoint::Register), 8);
    // 1 has no code, 6 cannot be looked up
    assert_eq!(state.hits(Endpoint::VerifyOtp), 5);
    assert_eq!(state.hits(Endpoint::Login), 4);
}

#[tokio::test]
#[ntest::timeout(10_000)]
async fn code_found_on_kth_attempt_is_used() {
    let mock = mock().await;
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("prepared_users.json");

    let store = MockOtpStore::new(mock.state()).deliver_on(7);
    let lookups = store.lookups();
    let config = provision_config(&mock.base_url(), 1, &output);
    let api = ApiClient::new(&mock.base_url()).unwrap();

    let users = UserProvisioner::new(config, api, store).run().await.unwrap();

    assert_eq!(users.len(), 1);
    assert_eq!(lookups.load(Ordering::Relaxed), 7);
    assert_eq!(mock.state().hits(Endpoint::VerifyOtp), 1);
}

#[tokio::test]
#[ntest::timeout(10_000)]
async fn empty_batch_is_fatal_and_writes_nothing() {
    let mock = mock().await;
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("prepared_users.json");

    let store = MockOtpStore::new(mock.state()).withhold("@");
    let lookups = store.lookups();
    let closed = store.closed();
    let config = provision_config(&mock.base_url(), 1, &output);
    let api = ApiClient::new(&mock.base_url()).unwrap();

    let err = UserProvisioner::new(config, api, store)
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, ProvisionError::NoUsers { attempted: 1 }));
    assert_eq!(lookups.load(Ordering::Relaxed), 30);
    assert_eq!(mock.state().hits(Endpoint::VerifyOtp), 0);
    assert!(!output.exists());
    assert!(closed.load(Ordering::Relaxed));
}

#[tokio::test]
#[ntest::timeout(10_000)]
async fn batch_is_overwritten_on_each_run() {
    let mock = mock().await;
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("prepared_users.json");
    write_users(&output, 5);

    let config = provision_config(&mock.base_url(), 2, &output);
    let api = ApiClient::new(&mock.base_url()).unwrap();
    UserProvisioner::new(config, api, MockOtpStore::new(mock.state()))
        .run()
        .await
        .unwrap();

    let batch = read_batch(&output).unwrap();
    assert_eq!(batch.len(), 2);
    assert!(batch.iter().all(|u| u.identity.starts_with("user_loadtest_")));
}
