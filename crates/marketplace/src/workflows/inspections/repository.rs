use super::domain::{InspectionBooking, InspectionId};
use crate::workflows::payments::TransactionId;
use crate::workflows::store::RepositoryError;

/// Storage abstraction for inspection records.
pub trait InspectionRepository: Send + Sync {
    fn insert(&self, inspection: InspectionBooking) -> Result<InspectionBooking, RepositoryError>;
    fn fetch(&self, id: &InspectionId) -> Result<Option<InspectionBooking>, RepositoryError>;
    /// Every inspection created together under one payment.
    fn by_transaction(
        &self,
        transaction_id: &TransactionId,
    ) -> Result<Vec<InspectionBooking>, RepositoryError>;
    /// Persists `inspection` if the stored version still equals `expected_version`.
    fn update(
        &self,
        inspection: InspectionBooking,
        expected_version: u64,
    ) -> Result<InspectionBooking, RepositoryError>;
}
