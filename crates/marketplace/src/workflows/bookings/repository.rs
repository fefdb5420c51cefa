use super::domain::{Booking, BookingId};
use crate::workflows::payments::TransactionId;
use crate::workflows::store::RepositoryError;

pub trait BookingRepository: Send + Sync {
    fn insert(&self, booking: Booking) -> Result<Booking, RepositoryError>;
    fn fetch(&self, id: &BookingId) -> Result<Option<Booking>, RepositoryError>;
    fn by_transaction(
        &self,
        transaction_id: &TransactionId,
    ) -> Result<Option<Booking>, RepositoryError>;
    fn by_code(&self, booking_code: &str) -> Result<Option<Booking>, RepositoryError>;
    /// Persists `booking` if the stored version still equals `expected_version`.
    fn update(&self, booking: Booking, expected_version: u64) -> Result<Booking, RepositoryError>;
}
