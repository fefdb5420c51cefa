use super::domain::Booking;
use crate::workflows::notifications::{format_naira, EmailBody, EmailMessage};

fn stay(booking: &Booking) -> String {
    format!(
        "{} to {} ({} night{})",
        booking.booking_details.check_in.format("%d %b %Y"),
        booking.booking_details.check_out.format("%d %b %Y"),
        booking.meta.nights,
        if booking.meta.nights == 1 { "" } else { "s" }
    )
}

fn with_stay(body: EmailBody, booking: &Booking) -> EmailBody {
    body.detail("Property", booking.property_title.clone())
        .detail("Stay", stay(booking))
        .detail("Guests", booking.booking_details.guests.to_string())
        .detail("Total", format_naira(booking.meta.total_price))
}

fn with_codes(body: EmailBody, booking: &Booking) -> EmailBody {
    body.detail("Booking code", booking.booking_code.clone())
        .detail("Pass code", booking.pass_code.clone())
}

pub fn request_received(booking: &Booking, lookup_link: &str) -> EmailMessage {
    let subject = "Booking Request Received";
    let body = EmailBody::new(&booking.buyer.full_name, subject).paragraph(
        "Your booking request has been sent to the host. We will email you a payment link once they accept.",
    );
    with_codes(with_stay(body, booking), booking)
        .action("Check your booking", lookup_link)
        .render(&booking.buyer.email, subject)
}

pub fn owner_new_request(booking: &Booking, respond_link: &str) -> EmailMessage {
    let subject = "New Booking Request";
    let mut body = EmailBody::new(&booking.owner.full_name, subject).paragraph(format!(
        "{} would like to book {}. Please accept or decline the request.",
        booking.buyer.full_name, booking.property_title
    ));
    body = with_stay(body, booking);
    if let Some(note) = &booking.booking_details.note {
        body = body.detail("Guest note", note.clone());
    }
    body.action("Respond to request", respond_link)
        .render(&booking.owner.email, subject)
}

pub fn payment_link(booking: &Booking, checkout_url: &str) -> EmailMessage {
    let subject = "Booking Accepted - Complete Your Payment";
    let body = EmailBody::new(&booking.buyer.full_name, subject).paragraph(format!(
        "Good news! The host accepted your request for {}. Complete payment to confirm your stay.",
        booking.property_title
    ));
    with_stay(body, booking)
        .action("Pay now", checkout_url)
        .render(&booking.buyer.email, subject)
}

pub fn request_declined(booking: &Booking) -> EmailMessage {
    let subject = "Booking Request Declined";
    let mut body = EmailBody::new(&booking.buyer.full_name, subject).paragraph(format!(
        "Unfortunately the host could not accept your request for {}.",
        booking.property_title
    ));
    if let Some(note) = &booking.owner_response.note {
        body = body.detail("Host note", note.clone());
    }
    with_stay(body, booking).render(&booking.buyer.email, subject)
}

pub fn buyer_confirmed(booking: &Booking, lookup_link: &str) -> EmailMessage {
    let subject = "Booking Confirmed";
    let body = EmailBody::new(&booking.buyer.full_name, subject)
        .paragraph("Your payment was received and your stay is confirmed.");
    with_codes(with_stay(body, booking), booking)
        .action("View booking", lookup_link)
        .render(&booking.buyer.email, subject)
}

pub fn owner_confirmed(booking: &Booking) -> EmailMessage {
    let subject = "New Confirmed Booking";
    let body = EmailBody::new(&booking.owner.full_name, subject).paragraph(format!(
        "{} has paid for a stay at {}.",
        booking.buyer.full_name, booking.property_title
    ));
    with_stay(body, booking)
        .detail("Booking code", booking.booking_code.clone())
        .render(&booking.owner.email, subject)
}

pub fn payment_failed(booking: &Booking, reference: &str) -> EmailMessage {
    let subject = "Booking Payment Failed";
    let body = EmailBody::new(&booking.buyer.full_name, subject).paragraph(format!(
        "We could not confirm payment for your stay at {}, so the booking has been cancelled.",
        booking.property_title
    ));
    with_stay(body, booking)
        .detail("Reference", reference)
        .render(&booking.buyer.email, subject)
}
