use crate::infra::{parse_amount, Services};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use clap::Args;
use marketplace::config::{NotificationConfig, PaymentConfig};
use marketplace::error::AppError;
use marketplace::memory::InMemoryMailer;
use marketplace::workflows::bookings::{
    BookingChannel, BookingDetails, BookingRequest, ShortletQuote, StayRates,
};
use marketplace::workflows::directory::{
    BookingMode, BuyerContact, DealSite, DealSiteStatus, DirectoryRepository, PartyContact,
    Property, PropertyId, PropertyType, ShortletTerms, UserId,
};
use marketplace::workflows::documents::{
    DocumentReference, DocumentReview, DocumentSubmission, ReviewOutcome,
};
use marketplace::workflows::http::parse_instant;
use marketplace::workflows::maintenance::MaintenanceReport;
use marketplace::workflows::inspections::{
    InspectionMode, InspectionSubmission, InspectionType, NegotiationAction, NegotiationRequest,
    PropertySelection, UserType,
};
use marketplace::workflows::notifications::format_naira;
use marketplace::workflows::payments::GatewayStatus;
use marketplace::workflows::subscriptions::SubscribeRequest;
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;

const DEMO_SLUG: &str = "demo-realty";

#[derive(Args, Debug)]
pub(crate) struct QuoteArgs {
    /// Nightly rate in naira
    #[arg(long, value_parser = parse_amount)]
    pub(crate) nightly_rate: Decimal,
    /// Check-in (YYYY-MM-DD or RFC 3339)
    #[arg(long, value_parser = parse_instant)]
    pub(crate) check_in: DateTime<Utc>,
    /// Check-out (YYYY-MM-DD or RFC 3339)
    #[arg(long, value_parser = parse_instant)]
    pub(crate) check_out: DateTime<Utc>,
    /// Percent off stays of 7 nights or more
    #[arg(long, value_parser = parse_amount, default_value = "0")]
    pub(crate) weekly_discount: Decimal,
    /// Percent off stays of 30 nights or more
    #[arg(long, value_parser = parse_amount, default_value = "0")]
    pub(crate) monthly_discount: Decimal,
    #[arg(long, value_parser = parse_amount, default_value = "0")]
    pub(crate) cleaning_fee: Decimal,
    #[arg(long, value_parser = parse_amount, default_value = "0")]
    pub(crate) security_deposit: Decimal,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Let the shortlet checkout be abandoned to show the failure path
    #[arg(long)]
    pub(crate) abandon_booking: bool,
    /// Skip the simulated renewal sweep 31 days ahead
    #[arg(long)]
    pub(crate) skip_maintenance: bool,
    /// Print a JSON summary after the walkthrough
    #[arg(long)]
    pub(crate) json: bool,
}

/// Final state of each record the demo created.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DemoSummary {
    pub(crate) inspection: Option<&'static str>,
    pub(crate) booking: Option<&'static str>,
    pub(crate) documents: Option<&'static str>,
    pub(crate) subscription: Option<&'static str>,
    pub(crate) maintenance: Option<MaintenanceReport>,
    pub(crate) emails_sent: usize,
    pub(crate) notifications_sent: usize,
}

pub(crate) fn run_quote(args: QuoteArgs) -> Result<(), AppError> {
    let rates = StayRates {
        nightly_rate: args.nightly_rate,
        weekly_discount_percent: args.weekly_discount,
        monthly_discount_percent: args.monthly_discount,
        cleaning_fee: args.cleaning_fee,
        security_deposit: args.security_deposit,
    };
    let quote = rates.quote(args.check_in, args.check_out);
    render_quote(&quote);
    Ok(())
}

fn render_quote(quote: &ShortletQuote) {
    println!(
        "{} night(s) at {} per night",
        quote.nights,
        format_naira(quote.nightly_rate)
    );
    println!("- Base price:       {}", format_naira(quote.base_price));
    println!(
        "- Discount ({}%):    -{}",
        quote.discount_percent,
        format_naira(quote.discount_amount)
    );
    println!("- Subtotal:         {}", format_naira(quote.subtotal));
    println!("- Cleaning fee:     {}", format_naira(quote.cleaning_fee));
    println!("- Security deposit: {}", format_naira(quote.security_deposit));
    println!("- Service charge:   {}", format_naira(quote.service_charge));
    println!("Total due:          {}", format_naira(quote.total_price));
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let mailer = Arc::new(InMemoryMailer::new());
    let services = Services::build(
        PaymentConfig::default(),
        NotificationConfig::default(),
        mailer.clone(),
    );
    seed_demo_directory(services.store.as_ref())?;

    println!("Marketplace workflow demo");

    let mut summary = DemoSummary::default();

    println!("\nInspection request and negotiation");
    summary.inspection = demo_inspection(&services);

    println!("\nShortlet booking");
    summary.booking = demo_booking(&services, args.abandon_booking);

    println!("\nDocument verification");
    summary.documents = demo_documents(&services);

    println!("\nAgent subscription");
    summary.subscription = demo_subscription(&services);
    if !args.skip_maintenance {
        let report = services
            .maintenance()
            .run_daily(Utc::now() + Duration::days(31));
        println!(
            "- Maintenance 31 days ahead: {} renewed, {} renewal failure(s), {} expired, {} stale checkout(s)",
            report.renewed, report.renewal_failures, report.expired, report.stale_failed
        );
        summary.maintenance = Some(report);
    }

    let sent = mailer.sent();
    summary.emails_sent = sent.len();
    summary.notifications_sent = services.notifications.all().len();
    println!(
        "\n{} email(s) and {} in-app notification(s) dispatched",
        summary.emails_sent, summary.notifications_sent
    );
    for message in sent {
        println!("- {} -> {}", message.subject, message.to);
    }

    if args.json {
        match serde_json::to_string_pretty(&summary) {
            Ok(json) => println!("{json}"),
            Err(err) => println!("Summary unavailable: {}", err),
        }
    }

    Ok(())
}

fn demo_agent() -> PartyContact {
    PartyContact {
        id: UserId("agent-demo".to_string()),
        full_name: "Kemi Agent".to_string(),
        email: "kemi.agent@example.com".to_string(),
    }
}

fn demo_buyer() -> BuyerContact {
    BuyerContact {
        full_name: "Segun Buyer".to_string(),
        email: "segun@example.com".to_string(),
        phone: None,
    }
}

fn seed_demo_directory(directory: &dyn DirectoryRepository) -> Result<(), AppError> {
    let seeded = directory
        .save_deal_site(DealSite {
            public_slug: DEMO_SLUG.to_string(),
            title: "Demo Realty".to_string(),
            owner: demo_agent(),
            status: DealSiteStatus::Running,
            subaccount_code: Some("ACCT_demo".to_string()),
        })
        .and_then(|()| {
            directory.save_property(Property {
                id: PropertyId("demo-duplex".to_string()),
                title: "Semi-detached duplex".to_string(),
                location: "Lekki Phase 1".to_string(),
                property_type: PropertyType::Sale,
                price: Decimal::from(95_000_000),
                inspection_fee: Decimal::from(10_000),
                shortlet: ShortletTerms::default(),
                is_available: true,
                owner: demo_agent(),
            })
        })
        .and_then(|()| {
            directory.save_property(Property {
                id: PropertyId("demo-loft".to_string()),
                title: "Waterfront loft".to_string(),
                location: "Victoria Island".to_string(),
                property_type: PropertyType::Shortlet,
                price: Decimal::from(80_000),
                inspection_fee: Decimal::ZERO,
                shortlet: ShortletTerms {
                    weekly_discount_percent: Decimal::from(10),
                    cleaning_fee: Decimal::from(15_000),
                    booking_mode: BookingMode::Instant,
                    ..ShortletTerms::default()
                },
                is_available: true,
                owner: demo_agent(),
            })
        });

    Ok(seeded?)
}

fn demo_inspection(services: &Services) -> Option<&'static str> {
    let inspection_date = (Utc::now() + Duration::days(5)).date_naive();
    let submission = InspectionSubmission {
        requester: demo_buyer(),
        properties: vec![PropertySelection {
            property_id: PropertyId("demo-duplex".to_string()),
            negotiation_price: Some(Decimal::from(88_000_000)),
            letter_of_intention: None,
        }],
        inspection_date,
        inspection_time: "11:00".to_string(),
        inspection_mode: InspectionMode::InPerson,
        amount_to_be_paid: Decimal::from(10_000),
    };

    let receipt = match services.inspections.submit_request(DEMO_SLUG, submission) {
        Ok(receipt) => receipt,
        Err(err) => {
            println!("  Request rejected: {}", err);
            return None;
        }
    };
    println!(
        "- Checkout {} opened for {}",
        receipt.payment.transaction.reference,
        format_naira(receipt.payment.transaction.amount)
    );
    if let Err(err) = services
        .dispatcher
        .verify(&receipt.payment.transaction.reference)
    {
        println!("  Verification failed: {}", err);
        return None;
    }

    let inspection = receipt.inspections.first()?;
    let paid = match services.inspections.get(&inspection.id) {
        Ok(paid) => paid,
        Err(err) => {
            println!("  Inspection unavailable: {}", err);
            return None;
        }
    };
    println!(
        "- Paid: status {} | stage {} | waiting on {}",
        paid.status.label(),
        paid.stage.label(),
        paid.pending_response_from.label()
    );

    let mut counter = negotiation(NegotiationAction::Counter, UserType::Seller);
    counter.counter_price = Some(Decimal::from(92_000_000));
    let steps = [
        (demo_agent().id, counter, "Seller countered"),
        (
            paid.requester.id.clone(),
            negotiation(NegotiationAction::Accept, UserType::Buyer),
            "Buyer accepted",
        ),
    ];
    let mut status = paid.status;
    for (user_id, request, label) in steps {
        match services.inspections.apply_action(&inspection.id, &user_id, request) {
            Ok(receipt) => {
                println!(
                    "- {}: price {} | status {} | stage {}",
                    label,
                    receipt
                        .inspection
                        .negotiation_price
                        .map(format_naira)
                        .unwrap_or_else(|| "-".to_string()),
                    receipt.inspection.status.label(),
                    receipt.inspection.stage.label()
                );
                status = receipt.inspection.status;
            }
            Err(err) => {
                println!("  {} failed: {}", label, err);
                break;
            }
        }
    }
    Some(status.label())
}

fn negotiation(action: NegotiationAction, user_type: UserType) -> NegotiationRequest {
    NegotiationRequest {
        action,
        inspection_type: InspectionType::Price,
        user_type,
        counter_price: None,
        letter_of_intention: None,
        inspection_date: None,
        inspection_time: None,
        rejection_reason: None,
        inspection_mode: None,
    }
}

fn demo_booking(services: &Services, abandon: bool) -> Option<&'static str> {
    let check_in = (Utc::now() + Duration::days(14)).date_naive();
    let check_out = check_in + Duration::days(7);
    let (check_in, check_out) = (midnight(check_in), midnight(check_out));

    let property_id = PropertyId("demo-loft".to_string());
    let quote = match services.bookings.quote(&property_id, check_in, check_out) {
        Ok(quote) => quote,
        Err(err) => {
            println!("  Quote unavailable: {}", err);
            return None;
        }
    };
    render_quote(&quote);

    let request = BookingRequest {
        property_id,
        booking_details: BookingDetails {
            check_in,
            check_out,
            guests: 2,
            note: None,
        },
        buyer: demo_buyer(),
        amount_to_be_paid: quote.total_price,
    };
    let receipt = match services
        .bookings
        .submit(BookingChannel::DealSite(DEMO_SLUG.to_string()), request)
    {
        Ok(receipt) => receipt,
        Err(err) => {
            println!("  Booking rejected: {}", err);
            return None;
        }
    };
    println!(
        "- Booking {} created (code {}, status {})",
        receipt.booking.id,
        receipt.booking.booking_code,
        receipt.booking.status.label()
    );

    if let Some(payment) = &receipt.payment {
        if abandon {
            services
                .gateway
                .set_outcome(&payment.transaction.reference, GatewayStatus::Abandoned);
        }
        match services.dispatcher.verify(&payment.transaction.reference) {
            Ok(outcome) => println!(
                "- Payment {}: transaction {}",
                outcome.transaction.reference,
                outcome.transaction.status.label()
            ),
            Err(err) => println!("  Verification failed: {}", err),
        }
    }

    let booking = services.bookings.get(&receipt.booking.id).ok()?;
    println!("- Booking is now {}", booking.status.label());
    Some(booking.status.label())
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}

fn demo_documents(services: &Services) -> Option<&'static str> {
    let fee = services.dispatcher.payments().config().document_verification_fee;
    let submission = DocumentSubmission {
        requester: demo_buyer(),
        documents: vec![DocumentReference {
            name: "Governor's consent".to_string(),
            url: "https://files.example.com/demo/consent.pdf".to_string(),
        }],
        amount_to_be_paid: fee,
    };
    let receipt = match services.documents.submit(submission) {
        Ok(receipt) => receipt,
        Err(err) => {
            println!("  Submission rejected: {}", err);
            return None;
        }
    };
    if let Err(err) = services
        .dispatcher
        .verify(&receipt.payment.transaction.reference)
    {
        println!("  Verification failed: {}", err);
        return None;
    }

    let review = DocumentReview {
        outcome: ReviewOutcome::Verified,
        note: Some("Matches the land registry record".to_string()),
    };
    match services.documents.review(&receipt.verification.id, review) {
        Ok(verification) => {
            println!(
                "- {} paid {} and was {}",
                verification.id,
                format_naira(verification.fee),
                verification.status.label()
            );
            Some(verification.status.label())
        }
        Err(err) => {
            println!("  Review failed: {}", err);
            None
        }
    }
}

fn demo_subscription(services: &Services) -> Option<&'static str> {
    let agent = demo_agent();
    let request = SubscribeRequest {
        user_id: agent.id,
        full_name: agent.full_name,
        email: agent.email,
        plan_code: "basic-monthly".to_string(),
        auto_renew: true,
    };
    let receipt = match services.subscriptions.subscribe(request) {
        Ok(receipt) => receipt,
        Err(err) => {
            println!("  Subscription rejected: {}", err);
            return None;
        }
    };
    if let Err(err) = services
        .dispatcher
        .verify(&receipt.payment.transaction.reference)
    {
        println!("  Verification failed: {}", err);
        return None;
    }

    let active = services.subscriptions.get(&receipt.subscription.id).ok()?;
    println!(
        "- {} plan {} until {}",
        active.plan.name,
        active.status.label(),
        active
            .expires_at
            .map(|expiry| expiry.format("%Y-%m-%d").to_string())
            .unwrap_or_default()
    );
    Some(active.status.label())
}
