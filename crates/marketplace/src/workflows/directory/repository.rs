use super::domain::{Buyer, BuyerContact, DealSite, Property, PropertyId};
use crate::workflows::store::RepositoryError;

/// Read access to listings and storefronts plus buyer upserts.
pub trait DirectoryRepository: Send + Sync {
    fn property(&self, id: &PropertyId) -> Result<Option<Property>, RepositoryError>;
    fn deal_site(&self, public_slug: &str) -> Result<Option<DealSite>, RepositoryError>;
    /// Returns the existing buyer for the email (case-insensitive) or creates one.
    fn upsert_buyer(&self, contact: &BuyerContact) -> Result<Buyer, RepositoryError>;
    fn save_property(&self, property: Property) -> Result<(), RepositoryError>;
    fn save_deal_site(&self, deal_site: DealSite) -> Result<(), RepositoryError>;
}
