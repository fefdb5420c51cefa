use super::common::*;
use rust_decimal_macros::dec;

use crate::workflows::bookings::{
    BookingChannel, BookingError, BookingStatus, OwnerDecision, OwnerReply, OwnerResponseKind,
    ReceiverMode,
};
use crate::workflows::directory::{
    DealSiteStatus, DirectoryRepository, ListingError, PropertyId, UserId,
};
use crate::workflows::payments::GatewayStatus;

fn accept() -> OwnerReply {
    OwnerReply {
        owner_id: UserId("host-1".to_string()),
        response: OwnerDecision::Accept,
        note: None,
    }
}

#[test]
fn instant_booking_with_exact_total_opens_split_checkout() {
    let harness = harness();
    let receipt = harness
        .service
        .submit(
            BookingChannel::DealSite(SLUG.to_string()),
            week_request("prop-loft", dec!(680400)),
        )
        .expect("booking accepted");

    let booking = &receipt.booking;
    assert_eq!(booking.status, BookingStatus::Pending);
    assert_eq!(booking.owner_response.response, OwnerResponseKind::Accepted);
    assert_eq!(booking.meta.nights, 7);
    assert_eq!(booking.meta.total_price, dec!(680400));
    assert_eq!(booking.booking_code.len(), 8);
    assert!(booking
        .booking_code
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    assert_eq!(booking.pass_code.len(), 6);
    assert!(booking.pass_code.chars().all(|c| c.is_ascii_digit()));
    assert_eq!(
        booking.receiver_mode,
        ReceiverMode::DealSite {
            public_slug: SLUG.to_string()
        }
    );

    let payment = receipt.payment.expect("instant bookings open checkout");
    assert_eq!(booking.transaction_id.as_ref(), Some(&payment.transaction.id));
    let split = harness
        .gateway
        .split_for(&payment.transaction.reference)
        .expect("deal site bookings are split");
    assert_eq!(split.subaccount_code, "ACCT_abuja");
}

#[test]
fn one_naira_short_is_an_amount_mismatch() {
    let harness = harness();
    match harness
        .service
        .submit(BookingChannel::General, week_request("prop-loft", dec!(680399)))
    {
        Err(BookingError::AmountMismatch(mismatch)) => {
            assert_eq!(mismatch.expected, dec!(680400));
            assert_eq!(mismatch.received, dec!(680399));
        }
        other => panic!("expected amount mismatch, got {other:?}"),
    }
    assert_eq!(harness.gateway.initialized(), 0);
}

#[test]
fn general_channel_does_not_split() {
    let harness = harness();
    let receipt = harness
        .service
        .submit(BookingChannel::General, week_request("prop-loft", dec!(680400)))
        .expect("booking accepted");

    assert_eq!(receipt.booking.receiver_mode, ReceiverMode::General);
    let payment = receipt.payment.expect("checkout opened");
    assert!(harness.gateway.split_for(&payment.transaction.reference).is_none());
}

#[test]
fn rejects_reversed_dates_and_non_shortlets() {
    let harness = harness();
    let mut reversed = week_request("prop-loft", dec!(0));
    reversed.booking_details.check_in = at("2024-01-08");
    reversed.booking_details.check_out = at("2024-01-01");
    assert!(matches!(
        harness.service.submit(BookingChannel::General, reversed),
        Err(BookingError::InvalidDates { .. })
    ));

    assert!(matches!(
        harness
            .service
            .submit(BookingChannel::General, week_request("prop-duplex", dec!(0))),
        Err(BookingError::Listing(ListingError::InvalidPropertyType { .. }))
    ));

    let mut nobody = week_request("prop-loft", dec!(680400));
    nobody.booking_details.guests = 0;
    assert!(matches!(
        harness.service.submit(BookingChannel::General, nobody),
        Err(BookingError::Validation(_))
    ));
}

#[test]
fn manual_booking_waits_for_owner_and_emails_both_parties() {
    let harness = harness();
    let receipt = harness
        .service
        .submit(BookingChannel::General, week_request("prop-villa", dec!(340200)))
        .expect("manual request accepted");

    assert_eq!(receipt.booking.status, BookingStatus::Requested);
    assert!(receipt.payment.is_none());
    assert!(receipt.booking.transaction_id.is_none());
    assert_eq!(receipt.emails_sent, 2);
    assert_eq!(harness.mailer.sent_to(GUEST_EMAIL)[0].subject, "Booking Request Received");
    assert_eq!(harness.mailer.sent_to(OWNER_EMAIL)[0].subject, "New Booking Request");
    assert_eq!(harness.gateway.initialized(), 0);
}

#[test]
fn owner_acceptance_sends_payment_link_and_payment_confirms() {
    let harness = harness();
    let requested = harness
        .service
        .submit(BookingChannel::General, week_request("prop-villa", dec!(340200)))
        .expect("manual request accepted")
        .booking;

    let accepted = harness
        .service
        .respond(&requested.id, accept())
        .expect("owner accepted");
    assert_eq!(accepted.booking.status, BookingStatus::Pending);
    assert_eq!(accepted.emails_sent, 1);
    let payment = accepted.payment.expect("checkout opened on acceptance");
    let link_email = harness
        .mailer
        .sent_to(GUEST_EMAIL)
        .into_iter()
        .last()
        .expect("payment link sent");
    assert_eq!(link_email.subject, "Booking Accepted - Complete Your Payment");
    assert!(link_email.text.contains(&payment.checkout.authorization_url));

    let outcome = harness
        .dispatcher
        .verify(&payment.transaction.reference)
        .expect("verification dispatched");
    let report = outcome.effect.expect("effects ran");
    assert_eq!(report.emails_sent, 2);
    assert_eq!(report.notifications_sent, 2);
    assert_eq!(reload(&harness, &requested.id).status, BookingStatus::Confirmed);
}

#[test]
fn owner_decline_marks_unavailable() {
    let harness = harness();
    let requested = harness
        .service
        .submit(BookingChannel::General, week_request("prop-villa", dec!(340200)))
        .expect("manual request accepted")
        .booking;

    let declined = harness
        .service
        .respond(
            &requested.id,
            OwnerReply {
                response: OwnerDecision::Decline,
                note: Some("Closed for repairs".to_string()),
                ..accept()
            },
        )
        .expect("owner declined");
    assert_eq!(declined.booking.status, BookingStatus::Unavailable);
    assert_eq!(
        declined.booking.owner_response.note.as_deref(),
        Some("Closed for repairs")
    );
    assert_eq!(
        harness
            .mailer
            .sent_to(GUEST_EMAIL)
            .last()
            .map(|message| message.subject.clone()),
        Some("Booking Request Declined".to_string())
    );

    assert!(matches!(
        harness.service.respond(&requested.id, accept()),
        Err(BookingError::NotAwaitingOwner {
            status: BookingStatus::Unavailable,
            ..
        })
    ));
}

#[test]
fn only_the_listing_owner_may_respond() {
    let harness = harness();
    let requested = harness
        .service
        .submit(BookingChannel::General, week_request("prop-villa", dec!(340200)))
        .expect("manual request accepted")
        .booking;

    let result = harness.service.respond(
        &requested.id,
        OwnerReply {
            owner_id: UserId("someone-else".to_string()),
            ..accept()
        },
    );
    assert!(matches!(result, Err(BookingError::Forbidden { .. })));
}

#[test]
fn failed_payment_cancels_and_emails_guest() {
    let harness = harness();
    let receipt = harness
        .service
        .submit(BookingChannel::General, week_request("prop-loft", dec!(680400)))
        .expect("booking accepted");
    let reference = receipt
        .payment
        .expect("checkout opened")
        .transaction
        .reference;
    harness.gateway.set_outcome(&reference, GatewayStatus::Abandoned);

    let report = harness
        .dispatcher
        .verify(&reference)
        .expect("verification dispatched")
        .effect
        .expect("effects ran");
    assert_eq!(report.records, 1);
    assert_eq!(report.emails_sent, 1);
    assert_eq!(reload(&harness, &receipt.booking.id).status, BookingStatus::Cancelled);
    assert_eq!(
        harness
            .mailer
            .sent_to(GUEST_EMAIL)
            .last()
            .map(|message| message.subject.clone()),
        Some("Booking Payment Failed".to_string())
    );
}

#[test]
fn underpaid_verification_fails_the_booking() {
    let harness = harness();
    let receipt = harness
        .service
        .submit(BookingChannel::General, week_request("prop-loft", dec!(680400)))
        .expect("booking accepted");
    let reference = receipt
        .payment
        .expect("checkout opened")
        .transaction
        .reference;
    harness.gateway.set_paid_amount(&reference, dec!(600000));

    harness.dispatcher.verify(&reference).expect("verification dispatched");
    assert_eq!(reload(&harness, &receipt.booking.id).status, BookingStatus::Cancelled);
}

#[test]
fn lookup_requires_matching_pass_code() {
    let harness = harness();
    let booking = harness
        .service
        .submit(BookingChannel::General, week_request("prop-loft", dec!(680400)))
        .expect("booking accepted")
        .booking;

    let found = harness
        .service
        .lookup(&booking.booking_code.to_ascii_lowercase(), &booking.pass_code)
        .expect("lookup succeeds");
    assert_eq!(found.id, booking.id);

    let wrong_pass = if booking.pass_code == "000000" {
        "111111"
    } else {
        "000000"
    };
    assert!(matches!(
        harness.service.lookup(&booking.booking_code, wrong_pass),
        Err(BookingError::NotFound(_))
    ));
}

#[test]
fn quote_prices_without_side_effects() {
    let harness = harness();
    let quote = harness
        .service
        .quote(
            &PropertyId("prop-loft".to_string()),
            at("2024-01-01"),
            at("2024-01-31"),
        )
        .expect("quote computed");

    assert_eq!(quote.nights, 30);
    assert_eq!(quote.discount_percent, dec!(20));
    assert_eq!(quote.total_price, dec!(2592000));
    assert_eq!(harness.gateway.initialized(), 0);
    assert!(harness.mailer.sent().is_empty());
}

fn pause_deal_site(harness: &Harness) {
    let mut site = harness
        .store
        .deal_site(SLUG)
        .expect("directory readable")
        .expect("deal site seeded");
    site.status = DealSiteStatus::Paused;
    harness.store.save_deal_site(site).expect("deal site saved");
}

#[test]
fn paused_deal_site_takes_no_bookings() {
    let harness = harness();
    pause_deal_site(&harness);

    match harness.service.submit(
        BookingChannel::DealSite(SLUG.to_string()),
        week_request("prop-loft", dec!(680400)),
    ) {
        Err(BookingError::Listing(ListingError::DealSiteNotRunning { status, .. })) => {
            assert_eq!(status, DealSiteStatus::Paused)
        }
        other => panic!("expected paused deal site, got {other:?}"),
    }
    assert!(harness.store.bookings().expect("bookings readable").is_empty());
    assert!(harness
        .store
        .transactions()
        .expect("transactions readable")
        .is_empty());
    assert_eq!(harness.gateway.initialized(), 0);
}

#[test]
fn unavailable_shortlet_takes_no_bookings() {
    let harness = harness();
    let mut loft = harness
        .store
        .property(&PropertyId("prop-loft".to_string()))
        .expect("directory readable")
        .expect("loft seeded");
    loft.is_available = false;
    harness.store.save_property(loft).expect("loft saved");

    assert!(matches!(
        harness
            .service
            .submit(BookingChannel::General, week_request("prop-loft", dec!(680400))),
        Err(BookingError::Listing(ListingError::PropertyUnavailable(_)))
    ));
    assert!(harness.store.bookings().expect("bookings readable").is_empty());
    assert!(harness
        .store
        .transactions()
        .expect("transactions readable")
        .is_empty());
    assert!(harness.mailer.sent().is_empty());
}

#[test]
fn owner_cannot_accept_after_deal_site_is_paused() {
    let harness = harness();
    let requested = harness
        .service
        .submit(
            BookingChannel::DealSite(SLUG.to_string()),
            week_request("prop-villa", dec!(340200)),
        )
        .expect("manual request accepted")
        .booking;
    pause_deal_site(&harness);

    assert!(matches!(
        harness.service.respond(&requested.id, accept()),
        Err(BookingError::Listing(ListingError::DealSiteNotRunning { .. }))
    ));
    let unchanged = reload(&harness, &requested.id);
    assert_eq!(unchanged.status, BookingStatus::Requested);
    assert!(unchanged.transaction_id.is_none());
    assert_eq!(harness.gateway.initialized(), 0);
}
