//! Shortlet bookings: pricing, guest submission, owner responses, and payment effects.

pub mod domain;
pub mod emails;
pub mod pricing;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    Booking, BookingDetails, BookingId, BookingStatus, OwnerResponse, OwnerResponseKind,
    ReceiverMode,
};
pub use pricing::{calculate_shortlet_amount, nights_between, ShortletQuote, StayRates};
pub use repository::BookingRepository;
pub use router::booking_router;
pub use service::{
    BookingChannel, BookingError, BookingReceipt, BookingRequest, BookingService, OwnerDecision,
    OwnerReply,
};
