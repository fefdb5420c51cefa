//! Agent plan subscriptions: checkout, activation, renewal and expiry.

pub mod domain;
pub mod plans;
pub mod repository;
pub mod router;
pub mod service;

pub use domain::{PlanSnapshot, Subscription, SubscriptionId, SubscriptionStatus};
pub use plans::PlanCatalog;
pub use repository::SubscriptionRepository;
pub use router::subscription_router;
pub use service::{
    RenewalReport, SubscribeRequest, SubscriptionError, SubscriptionReceipt, SubscriptionService,
};
