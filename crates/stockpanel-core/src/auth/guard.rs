//! Session guard: owns the stored credential and its expiry.
//!
//! The guard keeps three storage keys in step (token, user profile, and a
//! fallback expiry recorded at login), answers authentication/expiry
//! questions without side effects, and notifies the application exactly once
//! when a session runs out:
//!
//! - a one-shot timer fires `on_logout` when the token's expiry passes
//! - another tab removing the token fires `on_logout` here too
//! - another tab storing a token re-arms the timer and fires `on_login`
//!
//! At most one logout timer is pending per guard. Arming a new one always
//! cancels the previous timer first.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::clock::Clock;
use super::jwt;
use super::storage::StorageHandle;

/// Storage key for the bearer token.
pub const TOKEN_KEY: &str = "stockpanel.token";

/// Storage key for the JSON-serialized user profile.
pub const USER_KEY: &str = "stockpanel.user";

/// Storage key for the fallback expiry (milliseconds since epoch, as text).
pub const TOKEN_EXPIRES_AT_KEY: &str = "stockpanel.token_expires_at";

/// Tokens this close to expiry are already treated as expired, so a request
/// sent now cannot arrive after the server stops accepting the token.
pub const EXPIRY_SKEW_MS: i64 = 5_000;

/// Argument-less notification handed to the guard by the application.
pub type SessionCallback = Arc<dyn Fn() + Send + Sync>;

/// Performs full navigations that discard all in-memory client state.
pub trait Navigator: Send + Sync {
    fn replace(&self, path: &str);
}

/// Identifies one armed logout timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

/// Authentication state of one tab, derived from storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    AuthenticatedValid,
    AuthenticatedExpired,
}

struct ArmedTimer {
    id: TimerId,
    /// Filled in once the task is spawned.
    task: Option<JoinHandle<()>>,
}

type TimerSlot = Arc<Mutex<Option<ArmedTimer>>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub struct SessionGuard {
    storage: StorageHandle,
    clock: Arc<dyn Clock>,
    navigator: Arc<dyn Navigator>,
    timer: TimerSlot,
    next_timer_id: AtomicU64,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl SessionGuard {
    /// Create the guard for one tab. Construct once and share the `Arc`.
    pub fn new(
        storage: StorageHandle,
        clock: Arc<dyn Clock>,
        navigator: Arc<dyn Navigator>,
    ) -> Arc<Self> {
        Arc::new(Self {
            storage,
            clock,
            navigator,
            timer: Arc::new(Mutex::new(None)),
            next_timer_id: AtomicU64::new(1),
            listener: Mutex::new(None),
        })
    }

    // =========================================================================
    // Token and profile storage
    // =========================================================================

    pub fn auth_token(&self) -> Option<String> {
        self.storage.get_item(TOKEN_KEY)
    }

    /// True iff a token is stored. Expiry is not considered.
    pub fn is_authenticated(&self) -> bool {
        self.auth_token().is_some()
    }

    /// Store a token. An explicit expiry becomes the fallback expiry; without
    /// one, any fallback left by an earlier session is cleared so the token's
    /// own `exp` claim is authoritative.
    ///
    /// The token is written last, so a tab woken by the token change already
    /// sees the matching expiry.
    pub fn set_auth_token(&self, token: &str, expires_at_ms: Option<i64>) {
        match expires_at_ms {
            Some(at) => self.storage.set_item(TOKEN_EXPIRES_AT_KEY, at.to_string()),
            None => self.storage.remove_item(TOKEN_EXPIRES_AT_KEY),
        }
        self.storage.set_item(TOKEN_KEY, token);
        debug!(has_fallback_expiry = expires_at_ms.is_some(), "Auth token stored");
    }

    /// Clear the token and fallback expiry, cancelling any pending timer.
    pub fn remove_auth_token(&self) {
        self.cancel_auto_logout();
        self.storage.remove_item(TOKEN_KEY);
        self.storage.remove_item(TOKEN_EXPIRES_AT_KEY);
    }

    pub fn set_user_data<T: Serialize>(&self, user: &T) {
        match serde_json::to_string(user) {
            Ok(json) => self.storage.set_item(USER_KEY, json),
            Err(e) => warn!(error = %e, "Failed to serialize user profile"),
        }
    }

    /// The stored profile, or `None` if absent or not parseable as `T`.
    pub fn user_data<T: DeserializeOwned>(&self) -> Option<T> {
        let raw = self.storage.get_item(USER_KEY)?;
        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                debug!(error = %e, "Stored user profile is unreadable");
                None
            }
        }
    }

    /// True if a non-null profile is stored.
    pub fn has_user_data(&self) -> bool {
        matches!(self.user_data::<serde_json::Value>(), Some(v) if !v.is_null())
    }

    pub fn remove_user_data(&self) {
        self.storage.remove_item(USER_KEY);
        self.storage.remove_item(TOKEN_EXPIRES_AT_KEY);
    }

    // =========================================================================
    // Expiry
    // =========================================================================

    fn fallback_expiry_ms(&self) -> Option<i64> {
        self.storage
            .get_item(TOKEN_EXPIRES_AT_KEY)
            .and_then(|raw| raw.trim().parse().ok())
    }

    /// Effective expiry: the token's `exp` claim, else the fallback expiry.
    /// `None` when no token is stored or neither source is usable.
    pub fn expiry_ms(&self) -> Option<i64> {
        let token = self.auth_token()?;
        jwt::expiry_ms(&token).or_else(|| self.fallback_expiry_ms())
    }

    /// False without a token, and false when expiry cannot be determined.
    /// Otherwise true once expiry is within `EXPIRY_SKEW_MS` of now.
    pub fn is_token_expired(&self) -> bool {
        match self.expiry_ms() {
            Some(expiry) => expiry <= self.clock.now_ms() + EXPIRY_SKEW_MS,
            None => false,
        }
    }

    /// Milliseconds until expiry, floored at zero. `None` when unknown.
    pub fn token_remaining_ms(&self) -> Option<i64> {
        self.expiry_ms()
            .map(|expiry| (expiry - self.clock.now_ms()).max(0))
    }

    pub fn state(&self) -> SessionState {
        if !self.is_authenticated() {
            SessionState::Unauthenticated
        } else if self.is_token_expired() {
            SessionState::AuthenticatedExpired
        } else {
            SessionState::AuthenticatedValid
        }
    }

    // =========================================================================
    // Auto-logout
    // =========================================================================

    pub fn has_pending_timer(&self) -> bool {
        lock(&self.timer).is_some()
    }

    pub fn cancel_auto_logout(&self) {
        if let Some(armed) = lock(&self.timer).take() {
            if let Some(task) = armed.task {
                task.abort();
            }
            debug!(timer = armed.id.0, "Auto-logout timer cancelled");
        }
    }

    /// Arm the logout timer for the current token, replacing any pending one.
    ///
    /// Does nothing when unauthenticated or when the expiry is unknown. If the
    /// token has already run out, `on_logout` runs before this returns.
    pub fn schedule_auto_logout(&self, on_logout: SessionCallback) -> Option<TimerId> {
        self.cancel_auto_logout();

        if !self.is_authenticated() {
            return None;
        }

        let remaining = self.token_remaining_ms()?;
        if remaining <= 0 {
            info!("Session already expired, logging out");
            on_logout();
            return None;
        }

        let runtime = match Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!("No async runtime available, auto-logout timer not armed");
                return None;
            }
        };

        let id = TimerId(self.next_timer_id.fetch_add(1, Ordering::Relaxed));
        let slot = Arc::clone(&self.timer);

        // Claim the slot before spawning: a task that wakes early still finds
        // its id, and the lock is never held across the spawn.
        let replaced = lock(&self.timer).replace(ArmedTimer { id, task: None });
        if let Some(task) = replaced.and_then(|armed| armed.task) {
            task.abort();
        }
        let task = runtime.spawn(async move {
            tokio::time::sleep(Duration::from_millis(remaining as u64)).await;
            let still_current = {
                let mut current = lock(&slot);
                if current.as_ref().map(|armed| armed.id) == Some(id) {
                    current.take();
                    true
                } else {
                    false
                }
            };
            if still_current {
                info!(timer = id.0, "Session expired, auto-logout timer fired");
                on_logout();
            }
        });

        {
            let mut current = lock(&self.timer);
            match current.as_mut() {
                Some(armed) if armed.id == id => armed.task = Some(task),
                // Cancelled or replaced while spawning
                _ => task.abort(),
            }
        }

        debug!(timer = id.0, remaining_ms = remaining, "Auto-logout timer armed");
        Some(id)
    }

    /// One-time boot routine.
    ///
    /// Logs out immediately if the stored token is already expired, otherwise
    /// arms the logout timer. Then follows token changes made by other tabs
    /// for as long as the guard lives. Calling it again replaces the earlier
    /// subscription.
    pub fn init_auth_guard(self: &Arc<Self>, on_logout: SessionCallback, on_login: SessionCallback) {
        if self.is_authenticated() {
            if self.is_token_expired() {
                info!("Stored session expired before startup");
                on_logout();
            } else {
                self.schedule_auto_logout(Arc::clone(&on_logout));
            }
        }

        let runtime = match Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!("No async runtime available, cross-tab session sync disabled");
                return;
            }
        };

        let mut events = self.storage.subscribe();
        let guard = Arc::downgrade(self);
        let task = runtime.spawn(async move {
            while let Some(event) = events.recv().await {
                if event.key != TOKEN_KEY {
                    continue;
                }
                let Some(guard) = guard.upgrade() else {
                    break;
                };
                match event.new_value {
                    None => {
                        info!("Token removed by another tab");
                        guard.cancel_auto_logout();
                        on_logout();
                    }
                    Some(_) => {
                        info!("Token stored by another tab");
                        guard.schedule_auto_logout(Arc::clone(&on_logout));
                        on_login();
                    }
                }
            }
            debug!("Cross-tab session listener stopped");
        });

        if let Some(previous) = lock(&self.listener).replace(task) {
            previous.abort();
        }
    }

    /// End the session: cancel the timer, clear token, profile and fallback
    /// expiry, then hard-navigate to `redirect_to`.
    pub fn logout(&self, redirect_to: &str) {
        self.cancel_auto_logout();
        self.remove_auth_token();
        self.remove_user_data();
        info!(redirect_to, "Logged out");
        self.navigator.replace(redirect_to);
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.cancel_auto_logout();
        if let Some(listener) = lock(&self.listener).take() {
            listener.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::clock::ManualClock;
    use crate::auth::jwt::encode_token;
    use crate::auth::storage::SharedStorage;
    use serde_json::json;

    const NOW: i64 = 1_700_000_000_000;

    struct NullNavigator;

    impl Navigator for NullNavigator {
        fn replace(&self, _path: &str) {}
    }

    fn guard() -> Arc<SessionGuard> {
        SessionGuard::new(
            SharedStorage::in_memory().open_tab(),
            Arc::new(ManualClock::new(NOW)),
            Arc::new(NullNavigator),
        )
    }

    fn token_expiring_at(ms: i64) -> String {
        encode_token(&json!({ "sub": "1", "exp": ms / 1000 }))
    }

    #[test]
    fn test_authenticated_iff_token_present() {
        let guard = guard();
        assert!(!guard.is_authenticated());
        guard.set_auth_token("abc", None);
        assert!(guard.is_authenticated());
        guard.remove_auth_token();
        assert!(!guard.is_authenticated());
    }

    #[test]
    fn test_no_token_is_never_expired_even_with_stale_fallback() {
        let guard = guard();
        guard.storage.set_item(TOKEN_EXPIRES_AT_KEY, (NOW - 60_000).to_string());
        assert!(!guard.is_token_expired());
        assert_eq!(guard.token_remaining_ms(), None);
        assert_eq!(guard.state(), SessionState::Unauthenticated);
    }

    #[test]
    fn test_expiry_respects_safety_skew() {
        let guard = guard();
        guard.set_auth_token(&token_expiring_at(NOW + 10_000), None);
        assert!(!guard.is_token_expired());
        assert_eq!(guard.state(), SessionState::AuthenticatedValid);

        guard.set_auth_token(&token_expiring_at(NOW + 4_000), None);
        assert!(guard.is_token_expired());
        assert_eq!(guard.state(), SessionState::AuthenticatedExpired);
    }

    #[test]
    fn test_zero_exp_is_expired() {
        let guard = guard();
        guard.set_auth_token(&encode_token(&json!({ "exp": 0 })), None);
        assert!(guard.is_token_expired());
        assert_eq!(guard.token_remaining_ms(), Some(0));
    }

    #[test]
    fn test_decoded_exp_wins_over_fallback() {
        let guard = guard();
        guard.set_auth_token(&token_expiring_at(NOW + 60_000), Some(NOW - 1_000));
        assert!(!guard.is_token_expired());
        assert_eq!(guard.token_remaining_ms(), Some(60_000));
    }

    #[test]
    fn test_opaque_token_uses_fallback_expiry() {
        let guard = guard();
        guard.set_auth_token("abc", Some(NOW + 1_000));
        let remaining = guard.token_remaining_ms().unwrap();
        assert!(remaining > 0 && remaining <= 1_000);

        guard.remove_auth_token();
        assert_eq!(guard.token_remaining_ms(), None);
    }

    #[test]
    fn test_opaque_token_without_expiry_is_valid_indefinitely() {
        let guard = guard();
        guard.set_auth_token("abc", None);
        assert!(!guard.is_token_expired());
        assert_eq!(guard.token_remaining_ms(), None);
        assert_eq!(guard.state(), SessionState::AuthenticatedValid);
    }

    #[test]
    fn test_set_without_expiry_clears_stale_fallback() {
        let guard = guard();
        guard.set_auth_token("first", Some(NOW + 1_000));
        guard.set_auth_token("second", None);
        assert_eq!(guard.storage.get_item(TOKEN_EXPIRES_AT_KEY), None);
    }

    #[test]
    fn test_user_data_round_trip_and_tolerates_garbage() {
        let guard = guard();
        assert!(!guard.has_user_data());

        guard.set_user_data(&json!({ "email": "a@b.c", "role": "admin" }));
        let user: serde_json::Value = guard.user_data().unwrap();
        assert_eq!(user["role"], "admin");
        assert!(guard.has_user_data());

        guard.storage.set_item(USER_KEY, "{broken");
        assert!(guard.user_data::<serde_json::Value>().is_none());
        assert!(!guard.has_user_data());

        guard.remove_user_data();
        assert_eq!(guard.storage.get_item(USER_KEY), None);
    }

    #[test]
    fn test_schedule_without_token_returns_none() {
        let guard = guard();
        let fired = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&fired);
        let id = guard.schedule_auto_logout(Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        assert!(id.is_none());
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert!(!guard.has_pending_timer());
    }

    #[test]
    fn test_schedule_fires_synchronously_when_already_expired() {
        let guard = guard();
        guard.set_auth_token("abc", Some(NOW - 1));
        let fired = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&fired);
        let id = guard.schedule_auto_logout(Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        assert!(id.is_none());
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!guard.has_pending_timer());
    }
}
