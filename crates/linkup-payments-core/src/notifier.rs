//! Notification delivery
//!
//! The dispatcher hands composed messages to a [`Notifier`]. The HTTP
//! implementation posts them to the platform's notification service; the log
//! implementation is used when no service is configured.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument};

use linkup_types::UserId;

use crate::retry::RetryableError;

/// In-app/push notification addressed to one user
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersonalNotification {
    /// Recipient
    pub user: UserId,
    pub title: String,
    pub description: String,
    /// Notification category, e.g. `EVENT`
    #[serde(rename = "type")]
    pub kind: String,
    /// Deep-link payload
    pub data: serde_json::Value,
}

/// Templated email
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub template_name: String,
    pub template_data: serde_json::Value,
}

/// Delivery errors
#[derive(Error, Debug)]
pub enum NotifyError {
    /// Connection or timeout failure
    #[error("transport error: {0}")]
    Transport(String),

    /// The notification service answered with an error status
    #[error("notification service returned {0}")]
    Status(u16),
}

impl RetryableError for NotifyError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Status(code) => *code == 429 || *code >= 500,
        }
    }
}

/// Notification sink
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a personal notification
    async fn send_personal(&self, notification: &PersonalNotification) -> Result<(), NotifyError>;

    /// Deliver an email
    async fn send_email(&self, email: &EmailMessage) -> Result<(), NotifyError>;
}

/// Notifier posting JSON to the notification service
#[derive(Clone)]
pub struct HttpNotifier {
    client: Client,
    base_url: String,
}

impl HttpNotifier {
    /// Create a notifier for the service at `base_url`
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn post<T: Serialize + Sync>(&self, path: &str, body: &T) -> Result<(), NotifyError> {
        let url = format!("{}{path}", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(NotifyError::Status(status.as_u16()))
        }
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    #[instrument(skip(self, notification), fields(user = %notification.user))]
    async fn send_personal(&self, notification: &PersonalNotification) -> Result<(), NotifyError> {
        debug!(title = %notification.title, "Sending personal notification");
        self.post("/notifications/personal", notification).await
    }

    #[instrument(skip(self, email), fields(template = %email.template_name))]
    async fn send_email(&self, email: &EmailMessage) -> Result<(), NotifyError> {
        debug!(to = %email.to, "Sending email");
        self.post("/emails", email).await
    }
}

/// Notifier that only logs
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_personal(&self, notification: &PersonalNotification) -> Result<(), NotifyError> {
        info!(
            user = %notification.user,
            title = %notification.title,
            "notification (no delivery service configured)"
        );
        Ok(())
    }

    async fn send_email(&self, email: &EmailMessage) -> Result<(), NotifyError> {
        info!(
            to = %email.to,
            template = %email.template_name,
            "email (no delivery service configured)"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_statuses() {
        assert!(NotifyError::Transport("reset".into()).is_retryable());
        assert!(NotifyError::Status(503).is_retryable());
        assert!(NotifyError::Status(429).is_retryable());
        assert!(!NotifyError::Status(400).is_retryable());
        assert!(!NotifyError::Status(404).is_retryable());
    }

    #[test]
    fn test_email_serializes_camel_case() {
        let email = EmailMessage {
            to: "host@example.com".into(),
            subject: "s".into(),
            template_name: "eventBoostedUpdate".into(),
            template_data: serde_json::json!({}),
        };
        let json = serde_json::to_value(&email).unwrap();
        assert_eq!(json["templateName"], "eventBoostedUpdate");
        assert!(json.get("templateData").is_some());
    }
}
