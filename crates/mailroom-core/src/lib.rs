//! Core utilities and types shared across all Mailroom crates

pub mod config;
pub mod dispatch;
pub mod error_builder;
pub mod problemdetails;
pub mod types;

// Re-export commonly used types
pub use config::*;
pub use dispatch::*;
pub use error_builder::*;
pub use problemdetails::{Problem, ProblemDetails};
pub use types::*;

// Re-export external dependencies
pub use anyhow;
pub use async_trait;
pub use chrono;
pub use serde;
pub use serde_json;
pub use thiserror;
pub use tokio;
pub use tracing;
pub use uuid;
