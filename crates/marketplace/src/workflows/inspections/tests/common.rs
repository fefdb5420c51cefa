use std::sync::Arc;

use axum::response::Response;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::Value;

use crate::config::{NotificationConfig, PaymentConfig};
use crate::memory::{InMemoryMailer, InMemoryNotifications, InMemoryStore, SandboxGateway};
use crate::workflows::directory::{
    BuyerContact, DealSite, DealSiteStatus, DirectoryRepository, PartyContact, Property,
    PropertyId, PropertyType, ShortletTerms, UserId,
};
use crate::workflows::inspections::{
    InspectionBooking, InspectionId, InspectionMode, InspectionRepository, InspectionService,
    InspectionSubmission, InspectionType, NegotiationAction, NegotiationRequest,
    PropertySelection, UserType,
};
use crate::workflows::notifications::Notifier;
use crate::workflows::payments::{PaymentEffectDispatcher, PaymentService, TransactionType};

pub(super) const SLUG: &str = "lagos-homes";
pub(super) const BUYER_EMAIL: &str = "ada@example.com";

pub(super) struct Harness {
    pub(super) store: Arc<InMemoryStore>,
    pub(super) gateway: Arc<SandboxGateway>,
    pub(super) mailer: Arc<InMemoryMailer>,
    pub(super) notifications: Arc<InMemoryNotifications>,
    pub(super) service: Arc<InspectionService>,
    pub(super) dispatcher: Arc<PaymentEffectDispatcher>,
}

pub(super) fn seller(n: u8) -> PartyContact {
    PartyContact {
        id: UserId(format!("seller-{n}")),
        full_name: format!("Seller {n}"),
        email: format!("seller{n}@example.com"),
    }
}

fn property(id: &str, owner: PartyContact, fee: Decimal, available: bool) -> Property {
    Property {
        id: PropertyId(id.to_string()),
        title: format!("Duplex {id}"),
        location: "Lagos".to_string(),
        property_type: PropertyType::Sale,
        price: dec!(45000000),
        inspection_fee: fee,
        shortlet: ShortletTerms::default(),
        is_available: available,
        owner,
    }
}

pub(super) fn harness() -> Harness {
    let store = Arc::new(InMemoryStore::new());
    store
        .save_deal_site(DealSite {
            public_slug: SLUG.to_string(),
            title: "Lagos Homes".to_string(),
            owner: seller(9),
            status: DealSiteStatus::Running,
            subaccount_code: Some("ACCT_lagos".to_string()),
        })
        .expect("seed deal site");
    store
        .save_deal_site(DealSite {
            public_slug: "paused-site".to_string(),
            title: "Paused".to_string(),
            owner: seller(9),
            status: DealSiteStatus::Paused,
            subaccount_code: None,
        })
        .expect("seed paused site");
    for listing in [
        property("prop-ikoyi", seller(1), dec!(5000), true),
        property("prop-lekki", seller(2), dec!(7500), true),
        property("prop-yaba", seller(1), dec!(2500), true),
        property("prop-closed", seller(2), dec!(5000), false),
    ] {
        store.save_property(listing).expect("seed property");
    }

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
    let service = Arc::new(InspectionService::new(
        store.clone(),
        store.clone(),
        store.clone(),
        payments.clone(),
        notifier,
    ));
    let dispatcher = Arc::new(
        PaymentEffectDispatcher::new(payments).register(TransactionType::Inspection, service.clone()),
    );

    Harness {
        store,
        gateway,
        mailer,
        notifications,
        service,
        dispatcher,
    }
}

pub(super) fn select(property_id: &str) -> PropertySelection {
    PropertySelection {
        property_id: PropertyId(property_id.to_string()),
        negotiation_price: None,
        letter_of_intention: None,
    }
}

pub(super) fn offer(property_id: &str, price: Decimal) -> PropertySelection {
    PropertySelection {
        negotiation_price: Some(price),
        ..select(property_id)
    }
}

pub(super) fn submission(properties: Vec<PropertySelection>, amount: Decimal) -> InspectionSubmission {
    InspectionSubmission {
        requester: BuyerContact {
            full_name: "Ada Obi".to_string(),
            email: BUYER_EMAIL.to_string(),
            phone: None,
        },
        properties,
        inspection_date: NaiveDate::from_ymd_opt(2024, 3, 8).expect("valid date"),
        inspection_time: "10:00".to_string(),
        inspection_mode: InspectionMode::InPerson,
        amount_to_be_paid: amount,
    }
}

/// Submits and verifies the checkout, returning the settled records.
pub(super) fn submit_and_pay(
    harness: &Harness,
    properties: Vec<PropertySelection>,
    amount: Decimal,
) -> Vec<InspectionBooking> {
    let receipt = harness
        .service
        .submit_request(SLUG, submission(properties, amount))
        .expect("submission accepted");
    harness
        .dispatcher
        .verify(&receipt.payment.transaction.reference)
        .expect("verification dispatched");
    receipt
        .inspections
        .iter()
        .map(|inspection| reload(harness, &inspection.id))
        .collect()
}

pub(super) fn reload(harness: &Harness, id: &InspectionId) -> InspectionBooking {
    InspectionRepository::fetch(harness.store.as_ref(), id)
        .expect("store readable")
        .expect("inspection stored")
}

pub(super) fn request(
    action: NegotiationAction,
    user_type: UserType,
    inspection_type: InspectionType,
) -> NegotiationRequest {
    NegotiationRequest {
        action,
        inspection_type,
        user_type,
        counter_price: None,
        letter_of_intention: None,
        inspection_date: None,
        inspection_time: None,
        rejection_reason: None,
        inspection_mode: None,
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
