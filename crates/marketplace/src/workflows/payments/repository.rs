use chrono::{DateTime, Utc};

use super::domain::{NewTransaction, TransactionId};
use crate::workflows::store::RepositoryError;

/// Storage abstraction for payment transactions keyed by id and reference.
pub trait TransactionRepository: Send + Sync {
    fn insert(&self, transaction: NewTransaction) -> Result<NewTransaction, RepositoryError>;
    fn fetch(&self, id: &TransactionId) -> Result<Option<NewTransaction>, RepositoryError>;
    fn by_reference(&self, reference: &str) -> Result<Option<NewTransaction>, RepositoryError>;
    /// Persists `transaction` if the stored version still equals `expected_version`.
    fn update(
        &self,
        transaction: NewTransaction,
        expected_version: u64,
    ) -> Result<NewTransaction, RepositoryError>;
    fn pending_created_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<NewTransaction>, RepositoryError>;
}
