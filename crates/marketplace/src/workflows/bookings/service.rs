use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use super::domain::{
    Booking, BookingDetails, BookingId, BookingStatus, OwnerResponse, OwnerResponseKind,
    ReceiverMode,
};
use super::emails;
use super::pricing::{calculate_shortlet_amount, ShortletQuote};
use super::repository::BookingRepository;
use crate::workflows::activity::{self, ActivityLog, ActivitySubject, NewActivity, SenderRole};
use crate::workflows::directory::{
    available_property, ensure_amount, require_type, running_deal_site, AmountMismatch,
    BookingMode, BuyerContact, DealSite, DirectoryRepository, ListingError, PropertyId,
    PropertyType, UserId,
};
use crate::workflows::http::{
    repository_code, repository_status, validation_details, WorkflowError,
};
use crate::workflows::notifications::Notifier;
use crate::workflows::payments::{
    CheckoutRequest, EffectError, EffectReport, NewTransaction, PaymentError, PaymentService,
    PaymentSession, TransactionEffect, TransactionType,
};
use crate::workflows::store::RepositoryError;
use crate::workflows::validation::{FieldErrors, ValidationError};

static BOOKING_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_booking_id() -> BookingId {
    let id = BOOKING_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    BookingId(format!("bkg-{id:06}"))
}

fn generate_booking_code() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(|byte| char::from(byte).to_ascii_uppercase())
        .collect()
}

fn generate_pass_code() -> String {
    format!("{:06}", rand::thread_rng().gen_range(0..1_000_000))
}

/// Where a booking request arrived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingChannel {
    General,
    DealSite(String),
}

/// Body of the book-request endpoints.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    pub property_id: PropertyId,
    pub booking_details: BookingDetails,
    pub buyer: BuyerContact,
    pub amount_to_be_paid: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OwnerDecision {
    Accept,
    Decline,
}

/// Body of `POST /bookings/:booking_id/owner-response`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerReply {
    pub owner_id: UserId,
    pub response: OwnerDecision,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingReceipt {
    pub booking: Booking,
    /// Present once a checkout has been opened for the stay.
    pub payment: Option<PaymentSession>,
    pub emails_sent: usize,
}

/// Shortlet booking intake, owner responses, and payment effects.
pub struct BookingService {
    directory: Arc<dyn DirectoryRepository>,
    bookings: Arc<dyn BookingRepository>,
    activity: Arc<dyn ActivityLog>,
    payments: Arc<PaymentService>,
    notifier: Notifier,
}

impl BookingService {
    pub fn new(
        directory: Arc<dyn DirectoryRepository>,
        bookings: Arc<dyn BookingRepository>,
        activity: Arc<dyn ActivityLog>,
        payments: Arc<PaymentService>,
        notifier: Notifier,
    ) -> Self {
        Self {
            directory,
            bookings,
            activity,
            payments,
            notifier,
        }
    }

    pub fn get(&self, id: &BookingId) -> Result<Booking, BookingError> {
        self.bookings
            .fetch(id)?
            .ok_or_else(|| BookingError::NotFound(id.0.clone()))
    }

    /// Prices a stay for a listed shortlet without creating anything.
    pub fn quote(
        &self,
        property_id: &PropertyId,
        check_in: DateTime<Utc>,
        check_out: DateTime<Utc>,
    ) -> Result<ShortletQuote, BookingError> {
        let property = available_property(self.directory.as_ref(), property_id)?;
        require_type(&property, PropertyType::Shortlet)?;
        ensure_dates(check_in, check_out)?;
        Ok(calculate_shortlet_amount(&property, check_in, check_out))
    }

    pub fn submit(
        &self,
        channel: BookingChannel,
        request: BookingRequest,
    ) -> Result<BookingReceipt, BookingError> {
        validate_request(&request)?;
        let site = match &channel {
            BookingChannel::DealSite(slug) => {
                Some(running_deal_site(self.directory.as_ref(), slug)?)
            }
            BookingChannel::General => None,
        };

        let property = available_property(self.directory.as_ref(), &request.property_id)?;
        require_type(&property, PropertyType::Shortlet)?;
        let details = request.booking_details;
        ensure_dates(details.check_in, details.check_out)?;

        let quote = calculate_shortlet_amount(&property, details.check_in, details.check_out);
        ensure_amount(quote.total_price, request.amount_to_be_paid)?;

        let buyer = self.directory.upsert_buyer(&request.buyer)?;
        let receiver_mode = match &site {
            Some(site) => ReceiverMode::DealSite {
                public_slug: site.public_slug.clone(),
            },
            None => ReceiverMode::General,
        };
        let now = Utc::now();
        let mut booking = Booking {
            id: next_booking_id(),
            booking_code: generate_booking_code(),
            pass_code: generate_pass_code(),
            property_id: property.id.clone(),
            property_title: property.title.clone(),
            buyer: buyer.contact(),
            owner: property.owner.clone(),
            transaction_id: None,
            booking_details: details,
            booking_mode: property.shortlet.booking_mode,
            status: BookingStatus::Requested,
            owner_response: OwnerResponse::pending(),
            meta: quote,
            receiver_mode,
            version: 0,
            created_at: now,
            updated_at: now,
        };

        match property.shortlet.booking_mode {
            BookingMode::Instant => {
                let payment = self.open_checkout(&booking, site.as_ref())?;
                booking.status = BookingStatus::Pending;
                booking.transaction_id = Some(payment.transaction.id.clone());
                booking.owner_response = OwnerResponse {
                    response: OwnerResponseKind::Accepted,
                    responded_at: Some(now),
                    note: Some("instant booking".to_string()),
                };
                let booking = self.bookings.insert(booking)?;
                self.log(
                    &booking,
                    Some(&booking.buyer.id),
                    SenderRole::Buyer,
                    "Instant booking created; awaiting payment",
                );
                info!(
                    booking = %booking.id,
                    reference = %payment.transaction.reference,
                    total = %booking.meta.total_price,
                    "instant booking submitted"
                );
                Ok(BookingReceipt {
                    booking,
                    payment: Some(payment),
                    emails_sent: 0,
                })
            }
            BookingMode::Manual => {
                let booking = self.bookings.insert(booking)?;
                self.log(
                    &booking,
                    Some(&booking.buyer.id),
                    SenderRole::Buyer,
                    "Booking requested; awaiting owner response",
                );
                let emails_sent = self.notifier.email_all(&[
                    emails::request_received(&booking, &self.lookup_link(&booking)),
                    emails::owner_new_request(
                        &booking,
                        &self
                            .notifier
                            .client_link(&format!("dashboard/bookings/{}", booking.id)),
                    ),
                ]);
                self.notifier.notify(
                    &booking.owner.id,
                    "New Booking Request",
                    &format!(
                        "{} requested to book {}",
                        booking.buyer.full_name, booking.property_title
                    ),
                    json!({ "bookingId": booking.id }),
                );
                info!(booking = %booking.id, "manual booking requested");
                Ok(BookingReceipt {
                    booking,
                    payment: None,
                    emails_sent,
                })
            }
        }
    }

    /// Owner accepts (opening checkout) or declines a manual booking request.
    pub fn respond(
        &self,
        id: &BookingId,
        reply: OwnerReply,
    ) -> Result<BookingReceipt, BookingError> {
        let current = self.get(id)?;
        if current.owner.id != reply.owner_id {
            return Err(BookingError::Forbidden {
                user: reply.owner_id,
            });
        }
        if current.status != BookingStatus::Requested
            || current.owner_response.response != OwnerResponseKind::Pending
        {
            return Err(BookingError::NotAwaitingOwner {
                id: current.id,
                status: current.status,
            });
        }

        let now = Utc::now();
        let note = reply
            .note
            .as_deref()
            .map(str::trim)
            .filter(|note| !note.is_empty())
            .map(str::to_string);
        let version = current.version;

        match reply.response {
            OwnerDecision::Accept => {
                let site = match current.receiver_mode.deal_site() {
                    Some(slug) => Some(running_deal_site(self.directory.as_ref(), slug)?),
                    None => None,
                };
                let payment = self.open_checkout(&current, site.as_ref())?;
                let mut next = current;
                next.status = BookingStatus::Pending;
                next.transaction_id = Some(payment.transaction.id.clone());
                next.owner_response = OwnerResponse {
                    response: OwnerResponseKind::Accepted,
                    responded_at: Some(now),
                    note,
                };
                next.updated_at = now;
                let booking = self.bookings.update(next, version)?;

                self.log(
                    &booking,
                    Some(&booking.owner.id),
                    SenderRole::Seller,
                    "Owner accepted the booking request",
                );
                let sent = self.notifier.email(&emails::payment_link(
                    &booking,
                    &payment.checkout.authorization_url,
                ));
                self.notifier.notify(
                    &booking.buyer.id,
                    "Booking Accepted",
                    &format!("Your request for {} was accepted", booking.property_title),
                    json!({ "bookingId": booking.id }),
                );
                Ok(BookingReceipt {
                    booking,
                    payment: Some(payment),
                    emails_sent: usize::from(sent),
                })
            }
            OwnerDecision::Decline => {
                let mut next = current;
                next.status = BookingStatus::Unavailable;
                next.owner_response = OwnerResponse {
                    response: OwnerResponseKind::Declined,
                    responded_at: Some(now),
                    note,
                };
                next.updated_at = now;
                let booking = self.bookings.update(next, version)?;

                self.log(
                    &booking,
                    Some(&booking.owner.id),
                    SenderRole::Seller,
                    "Owner declined the booking request",
                );
                let sent = self.notifier.email(&emails::request_declined(&booking));
                self.notifier.notify(
                    &booking.buyer.id,
                    "Booking Declined",
                    &format!("Your request for {} was declined", booking.property_title),
                    json!({ "bookingId": booking.id }),
                );
                Ok(BookingReceipt {
                    booking,
                    payment: None,
                    emails_sent: usize::from(sent),
                })
            }
        }
    }

    /// Guest lookup without an account; a wrong pass code reads as not found.
    pub fn lookup(&self, booking_code: &str, pass_code: &str) -> Result<Booking, BookingError> {
        let code = booking_code.trim().to_ascii_uppercase();
        match self.bookings.by_code(&code)? {
            Some(booking) if booking.pass_code == pass_code.trim() => Ok(booking),
            _ => Err(BookingError::NotFound(code)),
        }
    }

    fn open_checkout(
        &self,
        booking: &Booking,
        site: Option<&DealSite>,
    ) -> Result<PaymentSession, BookingError> {
        Ok(self.payments.open_checkout(CheckoutRequest {
            transaction_type: TransactionType::ShortletBooking,
            email: booking.buyer.email.clone(),
            amount: booking.meta.total_price,
            split_subaccount: site.and_then(|site| site.subaccount_code.clone()),
            metadata: json!({
                "bookingId": booking.id,
                "bookingCode": booking.booking_code,
                "propertyId": booking.property_id,
            }),
        })?)
    }

    fn lookup_link(&self, booking: &Booking) -> String {
        self.notifier
            .client_link(&format!("bookings/lookup?bookingCode={}", booking.booking_code))
    }

    fn log(
        &self,
        booking: &Booking,
        sender: Option<&UserId>,
        role: SenderRole,
        message: &str,
    ) -> bool {
        activity::record(
            self.activity.as_ref(),
            NewActivity {
                subject: ActivitySubject::Booking(booking.id.0.clone()),
                sender_id: sender.cloned(),
                sender_role: role,
                message: message.to_string(),
                status: booking.status.label().to_string(),
                stage: None,
                metadata: json!({ "bookingCode": booking.booking_code }),
            },
        )
    }

    /// Moves a payment-pending booking; `None` when it already left `pending`.
    fn settle(
        &self,
        transaction: &NewTransaction,
        status: BookingStatus,
    ) -> Result<Option<Booking>, EffectError> {
        let booking = self
            .bookings
            .by_transaction(&transaction.id)?
            .ok_or_else(|| EffectError::Unlinked {
                kind: "booking",
                reference: transaction.reference.clone(),
            })?;
        if booking.status != BookingStatus::Pending {
            return Ok(None);
        }

        let version = booking.version;
        let mut next = booking;
        next.status = status;
        next.updated_at = Utc::now();
        match self.bookings.update(next, version) {
            Ok(updated) => Ok(Some(updated)),
            Err(RepositoryError::VersionMismatch { .. }) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

impl TransactionEffect for BookingService {
    fn on_success(&self, transaction: &NewTransaction) -> Result<EffectReport, EffectError> {
        let Some(booking) = self.settle(transaction, BookingStatus::Confirmed)? else {
            return Ok(EffectReport::skipped());
        };

        self.log(&booking, None, SenderRole::System, "Booking payment confirmed");
        let emails_sent = self.notifier.email_all(&[
            emails::buyer_confirmed(&booking, &self.lookup_link(&booking)),
            emails::owner_confirmed(&booking),
        ]);
        let mut notifications_sent = 0;
        for (user, title) in [
            (&booking.owner.id, "New Confirmed Booking"),
            (&booking.buyer.id, "Booking Confirmed"),
        ] {
            let sent = self.notifier.notify(
                user,
                title,
                &format!("{} is booked", booking.property_title),
                json!({ "bookingId": booking.id, "reference": transaction.reference }),
            );
            notifications_sent += usize::from(sent);
        }

        info!(booking = %booking.id, reference = %transaction.reference, "booking confirmed");
        Ok(EffectReport {
            applied: true,
            records: 1,
            emails_sent,
            notifications_sent,
        })
    }

    fn on_failure(&self, transaction: &NewTransaction) -> Result<EffectReport, EffectError> {
        let Some(booking) = self.settle(transaction, BookingStatus::Cancelled)? else {
            return Ok(EffectReport::skipped());
        };

        self.log(&booking, None, SenderRole::System, "Booking payment failed");
        let sent = self
            .notifier
            .email(&emails::payment_failed(&booking, &transaction.reference));

        warn!(booking = %booking.id, reference = %transaction.reference, "booking payment failed");
        Ok(EffectReport {
            applied: true,
            records: 1,
            emails_sent: usize::from(sent),
            notifications_sent: 0,
        })
    }
}

fn ensure_dates(check_in: DateTime<Utc>, check_out: DateTime<Utc>) -> Result<(), BookingError> {
    if check_out > check_in {
        Ok(())
    } else {
        Err(BookingError::InvalidDates {
            check_in,
            check_out,
        })
    }
}

fn validate_request(request: &BookingRequest) -> Result<(), ValidationError> {
    let mut errors = FieldErrors::new();
    errors.require_text(&request.property_id.0, "propertyId");
    errors.require_text(&request.buyer.full_name, "buyer.fullName");
    errors.require_email(&request.buyer.email, "buyer.email");
    errors.ensure(
        request.booking_details.guests >= 1,
        "bookingDetails.guests",
        "at least one guest is required",
    );
    errors.ensure(
        request.amount_to_be_paid >= Decimal::ZERO,
        "amountToBePaid",
        "amountToBePaid cannot be negative",
    );
    errors.finish()
}

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Listing(#[from] ListingError),
    #[error("check-out ({check_out}) must be after check-in ({check_in})")]
    InvalidDates {
        check_in: DateTime<Utc>,
        check_out: DateTime<Utc>,
    },
    #[error(transparent)]
    AmountMismatch(#[from] AmountMismatch),
    #[error("booking {0} was not found")]
    NotFound(String),
    #[error("user {} is not the owner of this booking", .user.0)]
    Forbidden { user: UserId },
    #[error("booking {id} is {} and no longer awaiting the owner", .status.label())]
    NotAwaitingOwner { id: BookingId, status: BookingStatus },
    #[error(transparent)]
    Payment(#[from] PaymentError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl WorkflowError for BookingError {
    fn status(&self) -> StatusCode {
        match self {
            BookingError::Validation(_)
            | BookingError::InvalidDates { .. }
            | BookingError::AmountMismatch(_)
            | BookingError::NotAwaitingOwner { .. } => StatusCode::BAD_REQUEST,
            BookingError::Listing(err) => err.status(),
            BookingError::NotFound(_) => StatusCode::NOT_FOUND,
            BookingError::Forbidden { .. } => StatusCode::FORBIDDEN,
            BookingError::Payment(PaymentError::Gateway(_)) => StatusCode::BAD_GATEWAY,
            BookingError::Payment(PaymentError::Repository(err))
            | BookingError::Repository(err) => repository_status(err),
            BookingError::Payment(PaymentError::UnknownReference(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            BookingError::Validation(_) => "VALIDATION_ERROR",
            BookingError::Listing(err) => err.error_code(),
            BookingError::InvalidDates { .. } => "INVALID_BOOKING_DATES",
            BookingError::AmountMismatch(_) => "PAYMENT_AMOUNT_MISMATCH",
            BookingError::NotFound(_) => "BOOKING_NOT_FOUND",
            BookingError::Forbidden { .. } => "FORBIDDEN",
            BookingError::NotAwaitingOwner { .. } => "BOOKING_NOT_AWAITING_OWNER",
            BookingError::Payment(PaymentError::Gateway(_)) => "PAYMENT_PROVIDER_ERROR",
            BookingError::Payment(PaymentError::Repository(err))
            | BookingError::Repository(err) => repository_code(err),
            BookingError::Payment(PaymentError::UnknownReference(_)) => "TRANSACTION_NOT_FOUND",
        }
    }

    fn details(&self) -> Option<Value> {
        match self {
            BookingError::Validation(err) => Some(validation_details(err)),
            BookingError::AmountMismatch(err) => Some(err.details()),
            _ => None,
        }
    }
}
