#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use marketplace::config::{NotificationConfig, PaymentConfig};
use marketplace::memory::{InMemoryMailer, InMemoryNotifications, InMemoryStore, SandboxGateway};
use marketplace::workflows::bookings::{BookingDetails, BookingRequest, BookingService};
use marketplace::workflows::directory::{
    BookingMode, BuyerContact, DealSite, DealSiteStatus, DirectoryRepository, PartyContact,
    Property, PropertyId, PropertyType, ShortletTerms, UserId,
};
use marketplace::workflows::documents::{
    DocumentReference, DocumentSubmission, DocumentVerificationService,
};
use marketplace::workflows::inspections::{
    InspectionMode, InspectionService, InspectionSubmission, PropertySelection,
};
use marketplace::workflows::maintenance::MaintenanceJobs;
use marketplace::workflows::notifications::Notifier;
use marketplace::workflows::payments::{PaymentEffectDispatcher, PaymentService, TransactionType};
use marketplace::workflows::subscriptions::{
    PlanCatalog, SubscribeRequest, SubscriptionService,
};

pub const SLUG: &str = "ikeja-realty";
pub const BUYER_EMAIL: &str = "chioma@example.com";
pub const ADMIN_EMAIL: &str = "admin@marketplace.local";

/// Every workflow wired onto one in-memory store, the way the server wires them.
pub struct Marketplace {
    pub store: Arc<InMemoryStore>,
    pub gateway: Arc<SandboxGateway>,
    pub mailer: Arc<InMemoryMailer>,
    pub notifications: Arc<InMemoryNotifications>,
    pub inspections: Arc<InspectionService>,
    pub bookings: Arc<BookingService>,
    pub documents: Arc<DocumentVerificationService>,
    pub subscriptions: Arc<SubscriptionService>,
    pub dispatcher: Arc<PaymentEffectDispatcher>,
    pub maintenance: MaintenanceJobs,
}

pub fn owner() -> PartyContact {
    PartyContact {
        id: UserId("agent-7".to_string()),
        full_name: "Emeka Agent".to_string(),
        email: "emeka@example.com".to_string(),
    }
}

pub fn marketplace() -> Marketplace {
    let store = Arc::new(InMemoryStore::new());
    store
        .save_deal_site(DealSite {
            public_slug: SLUG.to_string(),
            title: "Ikeja Realty".to_string(),
            owner: owner(),
            status: DealSiteStatus::Running,
            subaccount_code: Some("ACCT_ikeja".to_string()),
        })
        .expect("seed deal site");
    store
        .save_property(Property {
            id: PropertyId("prop-gra".to_string()),
            title: "Four bedroom detached house".to_string(),
            location: "GRA, Ikeja".to_string(),
            property_type: PropertyType::Sale,
            price: dec!(120000000),
            inspection_fee: dec!(10000),
            shortlet: ShortletTerms::default(),
            is_available: true,
            owner: owner(),
        })
        .expect("seed sale listing");
    store
        .save_property(Property {
            id: PropertyId("prop-studio".to_string()),
            title: "Serviced studio".to_string(),
            location: "Allen, Ikeja".to_string(),
            property_type: PropertyType::Shortlet,
            price: dec!(40000),
            inspection_fee: Decimal::ZERO,
            shortlet: ShortletTerms {
                booking_mode: BookingMode::Instant,
                ..ShortletTerms::default()
            },
            is_available: true,
            owner: owner(),
        })
        .expect("seed shortlet");

    let gateway = Arc::new(SandboxGateway::new());
    let mailer = Arc::new(InMemoryMailer::new());
    let notifications = Arc::new(InMemoryNotifications::new());
    let notifier = Notifier::new(
        mailer.clone(),
        notifications.clone(),
        NotificationConfig::default(),
    );
    let payments = Arc::new(PaymentService::new(
        gateway.clone(),
        store.clone(),
        PaymentConfig::default(),
    ));

    let inspections = Arc::new(InspectionService::new(
        store.clone(),
        store.clone(),
        store.clone(),
        payments.clone(),
        notifier.clone(),
    ));
    let bookings = Arc::new(BookingService::new(
        store.clone(),
        store.clone(),
        store.clone(),
        payments.clone(),
        notifier.clone(),
    ));
    let documents = Arc::new(DocumentVerificationService::new(
        store.clone(),
        store.clone(),
        payments.clone(),
        notifier.clone(),
    ));
    let subscriptions = Arc::new(SubscriptionService::new(
        store.clone(),
        payments.clone(),
        notifier,
        PlanCatalog::standard(),
    ));
    let dispatcher = Arc::new(
        PaymentEffectDispatcher::new(payments)
            .register(TransactionType::Inspection, inspections.clone())
            .register(TransactionType::ShortletBooking, bookings.clone())
            .register(TransactionType::DocumentVerification, documents.clone())
            .register(TransactionType::Subscription, subscriptions.clone()),
    );
    let maintenance = MaintenanceJobs::new(subscriptions.clone(), dispatcher.clone());

    Marketplace {
        store,
        gateway,
        mailer,
        notifications,
        inspections,
        bookings,
        documents,
        subscriptions,
        dispatcher,
        maintenance,
    }
}

pub fn buyer() -> BuyerContact {
    BuyerContact {
        full_name: "Chioma Buyer".to_string(),
        email: BUYER_EMAIL.to_string(),
        phone: None,
    }
}

pub fn inspection_submission() -> InspectionSubmission {
    InspectionSubmission {
        requester: buyer(),
        properties: vec![PropertySelection {
            property_id: PropertyId("prop-gra".to_string()),
            negotiation_price: Some(dec!(110000000)),
            letter_of_intention: None,
        }],
        inspection_date: NaiveDate::from_ymd_opt(2024, 5, 14).expect("valid date"),
        inspection_time: "14:30".to_string(),
        inspection_mode: InspectionMode::InPerson,
        amount_to_be_paid: dec!(10000),
    }
}

pub fn three_night_stay() -> BookingRequest {
    BookingRequest {
        property_id: PropertyId("prop-studio".to_string()),
        booking_details: BookingDetails {
            check_in: instant("2024-06-01T14:00:00Z"),
            check_out: instant("2024-06-04T11:00:00Z"),
            guests: 1,
            note: Some("Late arrival".to_string()),
        },
        buyer: buyer(),
        amount_to_be_paid: dec!(129600),
    }
}

pub fn document_submission(amount: Decimal) -> DocumentSubmission {
    DocumentSubmission {
        requester: buyer(),
        documents: vec![
            DocumentReference {
                name: "Certificate of Occupancy".to_string(),
                url: "https://files.example.com/c-of-o.pdf".to_string(),
            },
            DocumentReference {
                name: "Survey plan".to_string(),
                url: "https://files.example.com/survey.pdf".to_string(),
            },
        ],
        amount_to_be_paid: amount,
    }
}

pub fn subscribe_request(plan_code: &str) -> SubscribeRequest {
    SubscribeRequest {
        user_id: owner().id,
        full_name: owner().full_name,
        email: owner().email,
        plan_code: plan_code.to_string(),
        auto_renew: true,
    }
}

pub fn instant(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .expect("valid timestamp")
        .with_timezone(&Utc)
}

pub async fn read_json_body(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub fn post_json(uri: &str, body: serde_json::Value) -> axum::http::Request<axum::body::Body> {
    axum::http::Request::post(uri)
        .header(axum::http::header::CONTENT_TYPE, "application/json")
        .body(axum::body::Body::from(body.to_string()))
        .expect("request builds")
}
