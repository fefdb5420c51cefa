//! Payment provider adapter, transaction records, and post-verification dispatch.

pub mod dispatcher;
pub mod domain;
pub mod gateway;
pub mod repository;
pub mod router;
pub mod service;

pub use dispatcher::{
    DispatchError, EffectError, EffectReport, PaymentEffectDispatcher, TransactionEffect,
    VerificationOutcome,
};
pub use domain::{
    NewTransaction, SplitInstruction, TransactionId, TransactionStatus, TransactionType,
};
pub use gateway::{
    AutoCharge, Checkout, GatewayError, GatewayStatus, PaymentGateway, PaymentInit, SplitTerms,
    Verification,
};
pub use repository::TransactionRepository;
pub use router::payment_router;
pub use service::{CheckoutRequest, PaymentError, PaymentService, PaymentSession, Settlement};
