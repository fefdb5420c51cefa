use chrono::{DateTime, Utc};

use super::domain::{Subscription, SubscriptionId};
use crate::workflows::payments::TransactionId;
use crate::workflows::store::RepositoryError;

pub trait SubscriptionRepository: Send + Sync {
    fn insert(&self, subscription: Subscription) -> Result<Subscription, RepositoryError>;
    fn fetch(&self, id: &SubscriptionId) -> Result<Option<Subscription>, RepositoryError>;
    fn by_transaction(
        &self,
        transaction_id: &TransactionId,
    ) -> Result<Option<Subscription>, RepositoryError>;
    /// Active subscriptions whose expiry is at or before `now`.
    fn lapsed(&self, now: DateTime<Utc>) -> Result<Vec<Subscription>, RepositoryError>;
    fn update(
        &self,
        subscription: Subscription,
        expected_version: u64,
    ) -> Result<Subscription, RepositoryError>;
}
