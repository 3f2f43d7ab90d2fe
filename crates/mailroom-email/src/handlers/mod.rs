//! HTTP surface of the email pipeline

pub mod emails;
pub mod types;

pub use emails::routes;
pub use types::AppState;
