//! Authentication module for managing the stored credential and its lifetime.
//!
//! This module provides:
//! - `SharedStorage` / `StorageHandle`: process-wide key/value storage with
//!   per-tab change notifications
//! - `SessionGuard`: token persistence, expiry detection, auto-logout timer,
//!   and cross-tab logout/login synchronization
//! - `routes`: navigation guards that consult the session guard
//!
//! Tokens are JWT-shaped; when the payload carries no usable `exp` claim the
//! expiry recorded at login time is used instead.

pub mod clock;
pub mod guard;
pub mod jwt;
pub mod routes;
pub mod storage;

pub use clock::{Clock, ManualClock, SystemClock};
pub use guard::{Navigator, SessionCallback, SessionGuard, SessionState, TimerId};
pub use routes::{Route, RouteDecision};
pub use storage::{SharedStorage, StorageEvent, StorageEvents, StorageHandle};
