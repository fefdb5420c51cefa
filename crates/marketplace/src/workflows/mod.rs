pub mod activity;
pub mod bookings;
pub mod directory;
pub mod documents;
pub mod http;
pub mod inspections;
pub mod maintenance;
pub mod notifications;
pub mod payments;
pub mod store;
pub mod subscriptions;
pub mod validation;
