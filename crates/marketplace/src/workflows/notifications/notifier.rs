use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;

use super::domain::{EmailMessage, InAppNotification, Mailer, NotificationSink};
use crate::config::NotificationConfig;
use crate::workflows::directory::UserId;

/// Best-effort delivery: failures are logged and reported, never propagated.
#[derive(Clone)]
pub struct Notifier {
    mailer: Arc<dyn Mailer>,
    sink: Arc<dyn NotificationSink>,
    config: NotificationConfig,
}

impl Notifier {
    pub fn new(
        mailer: Arc<dyn Mailer>,
        sink: Arc<dyn NotificationSink>,
        config: NotificationConfig,
    ) -> Self {
        Self {
            mailer,
            sink,
            config,
        }
    }

    pub fn config(&self) -> &NotificationConfig {
        &self.config
    }

    pub fn admin_email(&self) -> &str {
        &self.config.admin_email
    }

    /// Builds a link into the public client.
    pub fn client_link(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.client_base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub fn email(&self, message: &EmailMessage) -> bool {
        match self.mailer.send(message) {
            Ok(()) => {
                tracing::debug!(to = %message.to, subject = %message.subject, "email sent");
                true
            }
            Err(err) => {
                tracing::warn!(
                    to = %message.to,
                    subject = %message.subject,
                    error = %err,
                    "email delivery failed"
                );
                false
            }
        }
    }

    /// Sends each message in order and returns how many were delivered.
    pub fn email_all<'a, I>(&self, messages: I) -> usize
    where
        I: IntoIterator<Item = &'a EmailMessage>,
    {
        messages
            .into_iter()
            .filter(|message| self.email(message))
            .count()
    }

    pub fn notify(&self, user_id: &UserId, title: &str, message: &str, meta: Value) -> bool {
        let notification = InAppNotification {
            user_id: user_id.clone(),
            title: title.to_string(),
            message: message.to_string(),
            meta,
            created_at: Utc::now(),
        };

        match self.sink.push(notification) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(user = %user_id.0, error = %err, "in-app notification failed");
                false
            }
        }
    }
}
