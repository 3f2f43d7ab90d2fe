//! Pipeline services

pub mod email_service;

pub use email_service::{
    AnalyticsOverview, EmailService, SendEmailRequest, SendEmailResponse,
};
