//! Paid verification of title documents submitted by buyers.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;

pub use domain::{DocumentReference, DocumentStatus, DocumentVerification, DocumentVerificationId};
pub use repository::DocumentRepository;
pub use router::{document_admin_router, document_router};
pub use service::{
    DocumentError, DocumentReceipt, DocumentReview, DocumentSubmission,
    DocumentVerificationService, ReviewOutcome,
};
