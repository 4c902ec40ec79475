//! Wiring between the session guard and the UI loop.
//!
//! Guard callbacks run on timer and listener tasks, so they only post an
//! `AppEvent`; the UI loop drains the channel between frames. A navigation
//! to `/login` is handled as a full reload: every piece of in-memory data is
//! dropped before the login overlay is shown.

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

use stockpanel_core::auth::{Navigator, Route, SessionCallback, SessionGuard};

/// Shown when the session ends on its own.
pub const SESSION_EXPIRED_MESSAGE: &str = "Your session expired. Please log in again.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// Full navigation requested by the guard.
    Navigate(String),
    /// The session ended (timer, other tab, or a 401).
    SessionExpired,
    /// Another tab signed in.
    SessionRestored,
}

pub struct ChannelNavigator {
    tx: UnboundedSender<AppEvent>,
}

impl ChannelNavigator {
    pub fn new(tx: UnboundedSender<AppEvent>) -> Self {
        Self { tx }
    }
}

impl Navigator for ChannelNavigator {
    fn replace(&self, path: &str) {
        if self.tx.send(AppEvent::Navigate(path.to_string())).is_err() {
            debug!(path, "UI loop gone, navigation dropped");
        }
    }
}

/// `on_logout` for the guard: announce the expiry, then log out to `/login`.
pub fn logout_callback(session: &Arc<SessionGuard>, tx: UnboundedSender<AppEvent>) -> SessionCallback {
    let guard = Arc::downgrade(session);
    Arc::new(move || {
        let _ = tx.send(AppEvent::SessionExpired);
        if let Some(guard) = guard.upgrade() {
            guard.logout(Route::Login.path());
        }
    })
}

/// `on_login` for the guard.
pub fn login_callback(tx: UnboundedSender<AppEvent>) -> SessionCallback {
    Arc::new(move || {
        let _ = tx.send(AppEvent::SessionRestored);
    })
}
