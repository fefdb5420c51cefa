//! Inspection requests and the buyer/seller negotiation that follows payment.

pub mod domain;
pub mod emails;
pub mod negotiation;
pub mod repository;
pub mod router;
pub mod service;
pub mod transitions;

#[cfg(test)]
mod tests;

pub use domain::{
    InspectionBooking, InspectionId, InspectionMode, InspectionRecordStatus, InspectionStatus,
    InspectionType, NegotiationAction, Party, Stage, UserType,
};
pub use negotiation::{apply_action, InspectionUpdate, NegotiationOutcome, NegotiationRequest};
pub use repository::InspectionRepository;
pub use router::{inspection_admin_router, inspection_router};
pub use service::{
    ActionReceipt, CancelRequest, InspectionError, InspectionReceipt, InspectionService,
    InspectionSubmission, PropertySelection,
};
pub use transitions::{resolve, Transition, TransitionRefusal};
