//! Listings, deal sites, and buyer records consulted by the booking and inspection flows.

pub mod catalog;
pub mod domain;
pub mod guard;
pub mod repository;

pub use catalog::{CatalogImportError, CatalogImporter};
pub use domain::{
    BookingMode, Buyer, BuyerContact, DealSite, DealSiteStatus, PartyContact, Property,
    PropertyId, PropertyType, ShortletTerms, UserId,
};
pub use guard::{
    available_property, ensure_amount, require_type, running_deal_site, AmountMismatch,
    ListingError,
};
pub use repository::DirectoryRepository;
