//! Integration tests for the session guard's timer and cross-tab behavior.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::json;
use stockpanel_core::auth::{
    ManualClock, Navigator, SessionCallback, SessionGuard, SessionState, SharedStorage,
};

const NOW: i64 = 1_700_000_000_000;

#[derive(Default)]
struct RecordingNavigator {
    visits: Mutex<Vec<String>>,
}

impl Navigator for RecordingNavigator {
    fn replace(&self, path: &str) {
        self.visits.lock().unwrap().push(path.to_string());
    }
}

fn counter() -> (Arc<AtomicUsize>, SessionCallback) {
    let count = Arc::new(AtomicUsize::new(0));
    let inner = Arc::clone(&count);
    let callback: SessionCallback = Arc::new(move || {
        inner.fetch_add(1, Ordering::SeqCst);
    });
    (count, callback)
}

fn token_expiring_in(ms: i64) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(json!({ "sub": "7", "exp": (NOW + ms) / 1000 }).to_string());
    format!("{}.{}.sig", header, payload)
}

fn tab(storage: &SharedStorage) -> (Arc<SessionGuard>, Arc<RecordingNavigator>) {
    let navigator = Arc::new(RecordingNavigator::default());
    let guard = SessionGuard::new(
        storage.open_tab(),
        Arc::new(ManualClock::new(NOW)),
        navigator.clone(),
    );
    (guard, navigator)
}

/// Let spawned tasks run without moving the paused clock meaningfully.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

#[tokio::test(start_paused = true)]
async fn test_timer_fires_once_after_remaining_time() {
    let storage = SharedStorage::in_memory();
    let (guard, _) = tab(&storage);
    guard.set_auth_token(&token_expiring_in(10_000), None);

    let (fired, on_logout) = counter();
    assert!(guard.schedule_auto_logout(on_logout).is_some());
    assert!(guard.has_pending_timer());

    tokio::time::sleep(Duration::from_millis(9_990)).await;
    assert_eq!(fired.load(Ordering::SeqCst), 0);

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(fired.load(Ordering::SeqCst), 1);
    assert!(!guard.has_pending_timer());

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_rescheduling_supersedes_previous_timer() {
    let storage = SharedStorage::in_memory();
    let (guard, _) = tab(&storage);
    guard.set_auth_token(&token_expiring_in(10_000), None);

    let (first, first_cb) = counter();
    let (second, second_cb) = counter();
    let first_id = guard.schedule_auto_logout(first_cb).unwrap();
    tokio::time::sleep(Duration::from_millis(2_000)).await;
    let second_id = guard.schedule_auto_logout(second_cb).unwrap();
    assert_ne!(first_id, second_id);
    assert!(guard.has_pending_timer());

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(first.load(Ordering::SeqCst), 0);
    assert_eq!(second.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_remove_auth_token_cancels_timer() {
    let storage = SharedStorage::in_memory();
    let (guard, _) = tab(&storage);
    guard.set_auth_token("abc", Some(NOW + 1_000));
    let remaining = guard.token_remaining_ms().unwrap();
    assert!(remaining > 0 && remaining <= 1_000);

    let (fired, on_logout) = counter();
    guard.schedule_auto_logout(on_logout);
    guard.remove_auth_token();
    assert!(!guard.has_pending_timer());
    assert_eq!(guard.token_remaining_ms(), None);

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(fired.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_init_logs_out_expired_session_immediately() {
    let storage = SharedStorage::in_memory();
    let (guard, _) = tab(&storage);
    guard.set_auth_token(&token_expiring_in(3_000), None);
    assert_eq!(guard.state(), SessionState::AuthenticatedExpired);

    let (logouts, on_logout) = counter();
    let (logins, on_login) = counter();
    guard.init_auth_guard(on_logout, on_login);

    assert_eq!(logouts.load(Ordering::SeqCst), 1);
    assert_eq!(logins.load(Ordering::SeqCst), 0);
    assert!(!guard.has_pending_timer());
}

#[tokio::test(start_paused = true)]
async fn test_init_arms_timer_for_valid_session() {
    let storage = SharedStorage::in_memory();
    let (guard, _) = tab(&storage);
    guard.set_auth_token(&token_expiring_in(60_000), None);

    let (logouts, on_logout) = counter();
    let (_, on_login) = counter();
    guard.init_auth_guard(on_logout, on_login);
    assert!(guard.has_pending_timer());
    assert_eq!(logouts.load(Ordering::SeqCst), 0);

    tokio::time::sleep(Duration::from_secs(61)).await;
    assert_eq!(logouts.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cross_tab_removal_logs_out_once() {
    let storage = SharedStorage::in_memory();
    let (tab_a, _) = tab(&storage);
    let (tab_b, _) = tab(&storage);
    tab_a.set_auth_token(&token_expiring_in(3_600_000), None);

    let (logouts, on_logout) = counter();
    let (logins, on_login) = counter();
    tab_b.init_auth_guard(on_logout, on_login);
    assert!(tab_b.has_pending_timer());

    tab_a.remove_auth_token();
    settle().await;

    assert_eq!(logouts.load(Ordering::SeqCst), 1);
    assert_eq!(logins.load(Ordering::SeqCst), 0);
    assert!(!tab_b.has_pending_timer());
}

#[tokio::test(start_paused = true)]
async fn test_cross_tab_login_arms_one_timer() {
    let storage = SharedStorage::in_memory();
    let (tab_a, _) = tab(&storage);
    let (tab_b, _) = tab(&storage);

    let (logouts, on_logout) = counter();
    let (logins, on_login) = counter();
    tab_b.init_auth_guard(on_logout, on_login);
    assert!(!tab_b.has_pending_timer());

    tab_a.set_auth_token(&token_expiring_in(60_000), None);
    tab_a.set_user_data(&json!({ "email": "clerk@example.com" }));
    settle().await;

    assert_eq!(logins.load(Ordering::SeqCst), 1);
    assert_eq!(logouts.load(Ordering::SeqCst), 0);
    assert!(tab_b.has_pending_timer());

    tokio::time::sleep(Duration::from_secs(61)).await;
    assert_eq!(logouts.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_own_changes_do_not_trigger_callbacks() {
    let storage = SharedStorage::in_memory();
    let (guard, _) = tab(&storage);

    let (logouts, on_logout) = counter();
    let (logins, on_login) = counter();
    guard.init_auth_guard(on_logout, on_login);

    guard.set_auth_token(&token_expiring_in(60_000), None);
    settle().await;
    guard.remove_auth_token();
    settle().await;

    assert_eq!(logouts.load(Ordering::SeqCst), 0);
    assert_eq!(logins.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_logout_clears_everything_and_navigates() {
    let storage = SharedStorage::in_memory();
    let (guard, navigator) = tab(&storage);
    guard.set_auth_token("abc", Some(NOW + 60_000));
    guard.set_user_data(&json!({ "email": "clerk@example.com" }));
    let (_, on_logout) = counter();
    guard.schedule_auto_logout(on_logout);

    guard.logout("/login");

    assert!(!guard.is_authenticated());
    assert!(!guard.has_user_data());
    assert!(!guard.has_pending_timer());
    assert_eq!(guard.token_remaining_ms(), None);
    assert_eq!(*navigator.visits.lock().unwrap(), vec!["/login".to_string()]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_cross_tab_login_sees_fallback_expiry_on_worker_threads() {
    for _ in 0..200 {
        let storage = SharedStorage::in_memory();
        let (tab_a, _) = tab(&storage);
        let (tab_b, _) = tab(&storage);

        let (_, on_logout) = counter();
        let (tx, mut logins) = tokio::sync::mpsc::unbounded_channel();
        let on_login: SessionCallback = Arc::new(move || {
            let _ = tx.send(());
        });
        tab_b.init_auth_guard(on_logout, on_login);

        tab_a.set_auth_token("opaque-token", Some(NOW + 60_000));

        tokio::time::timeout(Duration::from_secs(5), logins.recv())
            .await
            .expect("other tab saw the login")
            .expect("login signal");
        assert!(tab_b.has_pending_timer());
        assert_eq!(tab_b.token_remaining_ms(), Some(60_000));
    }
}

#[tokio::test(start_paused = true)]
async fn test_logout_in_another_process_ends_session() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("storage.json");
    let first = SharedStorage::open(&path).unwrap();
    let second = SharedStorage::open(&path).unwrap();
    let (first_guard, _) = tab(&first);
    let (second_guard, _) = tab(&second);

    let (logouts, on_logout) = counter();
    let (logins, on_login) = counter();
    second_guard.init_auth_guard(on_logout, on_login);

    first_guard.set_user_data(&json!({ "email": "a@b.co" }));
    first_guard.set_auth_token(&token_expiring_in(60_000), None);
    second.sync_from_disk();
    settle().await;
    assert_eq!(logins.load(Ordering::SeqCst), 1);
    assert!(second_guard.is_authenticated());
    assert!(second_guard.has_user_data());
    assert!(second_guard.has_pending_timer());

    first_guard.logout("/login");
    second.sync_from_disk();
    settle().await;
    assert_eq!(logouts.load(Ordering::SeqCst), 1);
    assert!(!second_guard.has_pending_timer());
    assert!(!second_guard.is_authenticated());
}
