use std::sync::Arc;

use axum::response::Response;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::Value;

use crate::config::{NotificationConfig, PaymentConfig};
use crate::memory::{InMemoryMailer, InMemoryNotifications, InMemoryStore, SandboxGateway};
use crate::workflows::bookings::{
    Booking, BookingDetails, BookingId, BookingRepository, BookingRequest, BookingService,
};
use crate::workflows::directory::{
    BookingMode, BuyerContact, DealSite, DealSiteStatus, DirectoryRepository, PartyContact,
    Property, PropertyId, PropertyType, ShortletTerms, UserId,
};
use crate::workflows::http::parse_instant;
use crate::workflows::notifications::Notifier;
use crate::workflows::payments::{PaymentEffectDispatcher, PaymentService, TransactionType};

pub(super) const SLUG: &str = "abuja-stays";
pub(super) const GUEST_EMAIL: &str = "tunde@example.com";
pub(super) const OWNER_EMAIL: &str = "host@example.com";

pub(super) struct Harness {
    pub(super) store: Arc<InMemoryStore>,
    pub(super) gateway: Arc<SandboxGateway>,
    pub(super) mailer: Arc<InMemoryMailer>,
    pub(super) service: Arc<BookingService>,
    pub(super) dispatcher: Arc<PaymentEffectDispatcher>,
}

pub(super) fn host() -> PartyContact {
    PartyContact {
        id: UserId("host-1".to_string()),
        full_name: "Halima Host".to_string(),
        email: OWNER_EMAIL.to_string(),
    }
}

fn shortlet(id: &str, nightly: Decimal, mode: BookingMode) -> Property {
    Property {
        id: PropertyId(id.to_string()),
        title: format!("Apartment {id}"),
        location: "Maitama, Abuja".to_string(),
        property_type: PropertyType::Shortlet,
        price: nightly,
        inspection_fee: Decimal::ZERO,
        shortlet: ShortletTerms {
            weekly_discount_percent: dec!(10),
            monthly_discount_percent: dec!(20),
            booking_mode: mode,
            ..ShortletTerms::default()
        },
        is_available: true,
        owner: host(),
    }
}

pub(super) fn harness() -> Harness {
    let store = Arc::new(InMemoryStore::new());
    store
        .save_deal_site(DealSite {
            public_slug: SLUG.to_string(),
            title: "Abuja Stays".to_string(),
            owner: host(),
            status: DealSiteStatus::Running,
            subaccount_code: Some("ACCT_abuja".to_string()),
        })
        .expect("seed deal site");
    store
        .save_property(shortlet("prop-loft", dec!(100000), BookingMode::Instant))
        .expect("seed loft");
    store
        .save_property(shortlet("prop-villa", dec!(50000), BookingMode::Manual))
        .expect("seed villa");
    let mut duplex = shortlet("prop-duplex", dec!(90000000), BookingMode::Instant);
    duplex.property_type = PropertyType::Sale;
    store.save_property(duplex).expect("seed duplex");

    let gateway = Arc::new(SandboxGateway::new());
    let mailer = Arc::new(InMemoryMailer::new());
    let notifier = Notifier::new(
        mailer.clone(),
        Arc::new(InMemoryNotifications::new()),
        NotificationConfig::default(),
    );
    let payments = Arc::new(PaymentService::new(
        gateway.clone(),
        store.clone(),
        PaymentConfig::default(),
    ));
    let service = Arc::new(BookingService::new(
        store.clone(),
        store.clone(),
        store.clone(),
        payments.clone(),
        notifier,
    ));
    let dispatcher = Arc::new(
        PaymentEffectDispatcher::new(payments)
            .register(TransactionType::ShortletBooking, service.clone()),
    );

    Harness {
        store,
        gateway,
        mailer,
        service,
        dispatcher,
    }
}

pub(super) fn at(raw: &str) -> DateTime<Utc> {
    parse_instant(raw).expect("valid instant")
}

/// Seven nights, 1-8 January 2024.
pub(super) fn week_request(property_id: &str, amount: Decimal) -> BookingRequest {
    BookingRequest {
        property_id: PropertyId(property_id.to_string()),
        booking_details: BookingDetails {
            check_in: at("2024-01-01"),
            check_out: at("2024-01-08"),
            guests: 2,
            note: None,
        },
        buyer: BuyerContact {
            full_name: "Tunde Guest".to_string(),
            email: GUEST_EMAIL.to_string(),
            phone: Some("+2348000000000".to_string()),
        },
        amount_to_be_paid: amount,
    }
}

pub(super) fn reload(harness: &Harness, id: &BookingId) -> Booking {
    BookingRepository::fetch(harness.store.as_ref(), id)
        .expect("store readable")
        .expect("booking stored")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
