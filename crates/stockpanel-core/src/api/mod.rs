//! REST client for the inventory backend.
//!
//! Every endpoint lives under `/api/v1` and answers with an envelope
//! `{ code, data, error }`; `code == "OK"` carries the payload. Requests
//! read the bearer token from the `SessionGuard` each time they are built,
//! so a token stored or cleared in another tab takes effect on the next
//! call.

pub mod client;
pub mod envelope;
pub mod error;

pub use client::{ApiClient, DashboardOverview};
pub use envelope::ApiEnvelope;
pub use error::ApiError;
