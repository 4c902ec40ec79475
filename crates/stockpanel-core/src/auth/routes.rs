//! Route table and navigation guards.
//!
//! Protected screens require a stored, unexpired token. Public screens (login,
//! register) bounce a signed-in user whose profile is stored to the dashboard;
//! an expired token never bounces, so the two guards cannot redirect in a
//! cycle. The root path picks whichever of the two landing pages applies.

use super::guard::SessionGuard;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Root,
    Login,
    Register,
    Dashboard,
    Products,
    Reports,
    Categories,
    Warehouses,
    Inventory,
    Users,
    Stock,
}

/// Outcome of consulting a route guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    Allow,
    Redirect(Route),
}

impl Route {
    pub const PROTECTED: [Route; 8] = [
        Route::Dashboard,
        Route::Products,
        Route::Reports,
        Route::Categories,
        Route::Warehouses,
        Route::Inventory,
        Route::Users,
        Route::Stock,
    ];

    pub fn path(&self) -> &'static str {
        match self {
            Route::Root => "/",
            Route::Login => "/login",
            Route::Register => "/register",
            Route::Dashboard => "/dashboard",
            Route::Products => "/products",
            Route::Reports => "/reports",
            Route::Categories => "/categories",
            Route::Warehouses => "/warehouses",
            Route::Inventory => "/inventory",
            Route::Users => "/users",
            Route::Stock => "/stock",
        }
    }

    /// Look up a route by path. A trailing slash is ignored.
    pub fn from_path(path: &str) -> Option<Self> {
        let trimmed = if path.len() > 1 {
            path.trim_end_matches('/')
        } else {
            path
        };
        match trimmed {
            "/" => Some(Route::Root),
            "/login" => Some(Route::Login),
            "/register" => Some(Route::Register),
            "/dashboard" => Some(Route::Dashboard),
            "/products" => Some(Route::Products),
            "/reports" => Some(Route::Reports),
            "/categories" => Some(Route::Categories),
            "/warehouses" => Some(Route::Warehouses),
            "/inventory" => Some(Route::Inventory),
            "/users" => Some(Route::Users),
            "/stock" => Some(Route::Stock),
            _ => None,
        }
    }

    pub fn is_protected(&self) -> bool {
        Self::PROTECTED.contains(self)
    }

    pub fn is_public(&self) -> bool {
        matches!(self, Route::Login | Route::Register)
    }

    /// Decide whether the current session may enter this route.
    pub fn guard(&self, session: &SessionGuard) -> RouteDecision {
        let signed_in = session.is_authenticated() && !session.is_token_expired();
        match self {
            Route::Root if signed_in => RouteDecision::Redirect(Route::Dashboard),
            Route::Root => RouteDecision::Redirect(Route::Login),
            route if route.is_protected() => {
                if signed_in {
                    RouteDecision::Allow
                } else {
                    RouteDecision::Redirect(Route::Login)
                }
            }
            // An expired token counts as signed out here too, or the login
            // page and the dashboard would redirect to each other
            _ => {
                if signed_in && session.has_user_data() {
                    RouteDecision::Redirect(Route::Dashboard)
                } else {
                    RouteDecision::Allow
                }
            }
        }
    }

    /// Follow redirects from `self` until a route admits the session.
    pub fn resolve(&self, session: &SessionGuard) -> Route {
        let mut route = *self;
        for _ in 0..3 {
            match route.guard(session) {
                RouteDecision::Allow => return route,
                RouteDecision::Redirect(next) => route = next,
            }
        }
        route
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::clock::ManualClock;
    use crate::auth::guard::Navigator;
    use crate::auth::storage::SharedStorage;
    use serde_json::json;
    use std::sync::Arc;

    const NOW: i64 = 1_700_000_000_000;

    struct NullNavigator;

    impl Navigator for NullNavigator {
        fn replace(&self, _path: &str) {}
    }

    fn session() -> Arc<SessionGuard> {
        SessionGuard::new(
            SharedStorage::in_memory().open_tab(),
            Arc::new(ManualClock::new(NOW)),
            Arc::new(NullNavigator),
        )
    }

    #[test]
    fn test_path_round_trip() {
        for route in Route::PROTECTED {
            assert_eq!(Route::from_path(route.path()), Some(route));
        }
        assert_eq!(Route::from_path("/login/"), Some(Route::Login));
        assert_eq!(Route::from_path("/"), Some(Route::Root));
        assert_eq!(Route::from_path("/admin/dashboard"), None);
    }

    #[test]
    fn test_root_redirects_by_session() {
        let session = session();
        assert_eq!(Route::Root.guard(&session), RouteDecision::Redirect(Route::Login));

        session.set_auth_token("abc", Some(NOW + 60_000));
        assert_eq!(Route::Root.guard(&session), RouteDecision::Redirect(Route::Dashboard));

        session.set_auth_token("abc", Some(NOW + 1_000));
        assert_eq!(Route::Root.guard(&session), RouteDecision::Redirect(Route::Login));
    }

    #[test]
    fn test_protected_routes_require_unexpired_token() {
        let session = session();
        assert_eq!(Route::Stock.guard(&session), RouteDecision::Redirect(Route::Login));

        session.set_auth_token("abc", None);
        assert_eq!(Route::Stock.guard(&session), RouteDecision::Allow);

        session.set_auth_token("abc", Some(NOW - 1));
        assert_eq!(Route::Reports.guard(&session), RouteDecision::Redirect(Route::Login));
    }

    #[test]
    fn test_public_routes_bounce_signed_in_users_with_profile() {
        let session = session();
        assert_eq!(Route::Login.guard(&session), RouteDecision::Allow);

        // Profile without token is not a session
        session.set_user_data(&json!({ "email": "a@b.c" }));
        assert_eq!(Route::Login.guard(&session), RouteDecision::Allow);

        session.set_auth_token("abc", None);
        assert_eq!(
            Route::Register.guard(&session),
            RouteDecision::Redirect(Route::Dashboard)
        );

        // Token without profile stays on the public page
        session.set_auth_token("abc", None);
        session.remove_user_data();
        assert_eq!(Route::Login.guard(&session), RouteDecision::Allow);
    }

    #[test]
    fn test_expired_session_with_profile_stays_on_login() {
        let session = session();
        session.set_user_data(&json!({ "email": "a@b.c" }));
        session.set_auth_token("abc", Some(NOW - 1));
        assert!(session.is_authenticated());

        assert_eq!(Route::Login.guard(&session), RouteDecision::Allow);
        assert_eq!(Route::Register.guard(&session), RouteDecision::Allow);
        assert_eq!(Route::Dashboard.resolve(&session), Route::Login);
        assert_eq!(Route::Root.resolve(&session), Route::Login);
    }

    #[test]
    fn test_resolve_follows_redirects() {
        let session = session();
        assert_eq!(Route::Root.resolve(&session), Route::Login);
        assert_eq!(Route::Users.resolve(&session), Route::Login);

        session.set_auth_token("abc", None);
        session.set_user_data(&json!({ "email": "a@b.c" }));
        assert_eq!(Route::Root.resolve(&session), Route::Dashboard);
        assert_eq!(Route::Login.resolve(&session), Route::Dashboard);
    }
}
