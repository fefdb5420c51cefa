use super::domain::{DocumentVerification, DocumentVerificationId};
use crate::workflows::payments::TransactionId;
use crate::workflows::store::RepositoryError;

pub trait DocumentRepository: Send + Sync {
    fn insert(
        &self,
        verification: DocumentVerification,
    ) -> Result<DocumentVerification, RepositoryError>;
    fn fetch(
        &self,
        id: &DocumentVerificationId,
    ) -> Result<Option<DocumentVerification>, RepositoryError>;
    fn by_transaction(
        &self,
        transaction_id: &TransactionId,
    ) -> Result<Option<DocumentVerification>, RepositoryError>;
    fn update(
        &self,
        verification: DocumentVerification,
        expected_version: u64,
    ) -> Result<DocumentVerification, RepositoryError>;
}
