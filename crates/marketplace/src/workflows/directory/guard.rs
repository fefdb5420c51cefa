use axum::http::StatusCode;
use rust_decimal::Decimal;
use serde_json::{json, Value};

use super::domain::{DealSite, DealSiteStatus, Property, PropertyId, PropertyType};
use super::repository::DirectoryRepository;
use crate::workflows::http::WorkflowError;
use crate::workflows::store::RepositoryError;

/// Listing preconditions shared by booking and inspection submissions.
#[derive(Debug, thiserror::Error)]
pub enum ListingError {
    #[error("deal site '{0}' was not found")]
    DealSiteNotFound(String),
    #[error("deal site '{slug}' is not accepting requests (status: {})", .status.label())]
    DealSiteNotRunning { slug: String, status: DealSiteStatus },
    #[error("property {0} was not found")]
    PropertyNotFound(PropertyId),
    #[error("property {0} is not available")]
    PropertyUnavailable(PropertyId),
    #[error("property {id} is a {} listing, expected {}", .found.label(), .expected.label())]
    InvalidPropertyType {
        id: PropertyId,
        expected: PropertyType,
        found: PropertyType,
    },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl WorkflowError for ListingError {
    fn status(&self) -> StatusCode {
        match self {
            ListingError::DealSiteNotFound(_) | ListingError::PropertyNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            ListingError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            ListingError::DealSiteNotFound(_) => "DEAL_SITE_NOT_FOUND",
            ListingError::DealSiteNotRunning { .. } => "DEAL_SITE_NOT_RUNNING",
            ListingError::PropertyNotFound(_) => "PROPERTY_NOT_FOUND",
            ListingError::PropertyUnavailable(_) => "PROPERTY_UNAVAILABLE",
            ListingError::InvalidPropertyType { .. } => "INVALID_PROPERTY_TYPE",
            ListingError::Repository(_) => "STORAGE_UNAVAILABLE",
        }
    }
}

/// Loads a deal site and requires it to be running.
pub fn running_deal_site(
    directory: &dyn DirectoryRepository,
    public_slug: &str,
) -> Result<DealSite, ListingError> {
    let site = directory
        .deal_site(public_slug)?
        .ok_or_else(|| ListingError::DealSiteNotFound(public_slug.to_string()))?;

    if site.status != DealSiteStatus::Running {
        return Err(ListingError::DealSiteNotRunning {
            slug: site.public_slug,
            status: site.status,
        });
    }

    Ok(site)
}

/// Loads a property and requires it to be listed as available.
pub fn available_property(
    directory: &dyn DirectoryRepository,
    id: &PropertyId,
) -> Result<Property, ListingError> {
    let property = directory
        .property(id)?
        .ok_or_else(|| ListingError::PropertyNotFound(id.clone()))?;

    if !property.is_available {
        return Err(ListingError::PropertyUnavailable(property.id));
    }

    Ok(property)
}

pub fn require_type(property: &Property, expected: PropertyType) -> Result<(), ListingError> {
    if property.property_type == expected {
        Ok(())
    } else {
        Err(ListingError::InvalidPropertyType {
            id: property.id.clone(),
            expected,
            found: property.property_type,
        })
    }
}

/// Client-declared payment differs from the server-computed amount.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("amount to be paid does not match: expected {expected}, received {received}")]
pub struct AmountMismatch {
    pub expected: Decimal,
    pub received: Decimal,
}

impl AmountMismatch {
    pub fn details(&self) -> Value {
        json!({
            "expected": self.expected,
            "received": self.received,
        })
    }
}

/// Exact equality; there is no tolerance.
pub fn ensure_amount(expected: Decimal, received: Decimal) -> Result<(), AmountMismatch> {
    if expected == received {
        Ok(())
    } else {
        Err(AmountMismatch { expected, received })
    }
}
