//! Email and in-app notification dispatch.

pub mod domain;
pub mod notifier;
pub mod templates;

pub use domain::{DeliveryError, EmailMessage, InAppNotification, Mailer, NotificationSink};
pub use notifier::Notifier;
pub use templates::{format_naira, EmailBody};
