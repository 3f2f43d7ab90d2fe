//! Common type aliases used across Mailroom crates

use chrono::{DateTime as ChronoDateTime, Utc};

/// Standard UTC DateTime type used across all Mailroom crates
///
/// This is the canonical datetime type for job timestamps and API
/// responses (serializes as ISO 8601 with 'Z' suffix).
///
/// # Example
/// ```rust
/// use mailroom_core::UtcDateTime;
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// pub struct Response {
///     pub created_at: UtcDateTime,
/// }
/// ```
pub type UtcDateTime = ChronoDateTime<Utc>;

/// Opaque identifier for a send job, assigned at creation.
pub type JobId = uuid::Uuid;
