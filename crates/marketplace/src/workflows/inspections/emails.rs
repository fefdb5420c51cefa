use rust_decimal::Decimal;

use super::domain::{InspectionBooking, InspectionMode, InspectionType, NegotiationAction};
use super::negotiation::NegotiationEmail;
use crate::workflows::directory::PartyContact;
use crate::workflows::notifications::{format_naira, EmailBody, EmailMessage};

fn schedule_line(date: chrono::NaiveDate, time: &str) -> String {
    format!("{} at {}", date.format("%A, %d %B %Y"), time)
}

/// Counterparty email for an accept, reject, or counter.
pub fn negotiation_update(
    recipient: &PartyContact,
    subject: &str,
    data: &NegotiationEmail,
    link: &str,
) -> EmailMessage {
    let actor = data.actor.title().to_lowercase();
    let opening = match data.action {
        NegotiationAction::Accept => format!(
            "The {actor} has accepted the {} for {}.",
            data.inspection_type.noun().to_lowercase(),
            data.property_title
        ),
        NegotiationAction::Reject => format!(
            "The {actor} has declined the {} for {}. The inspection can still go ahead as scheduled below.",
            data.inspection_type.noun().to_lowercase(),
            data.property_title
        ),
        NegotiationAction::Counter if data.reschedule_only => format!(
            "The {actor} has proposed changes to the inspection of {}.",
            data.property_title
        ),
        NegotiationAction::Counter => format!(
            "The {actor} has sent a counter proposal for {}.",
            data.property_title
        ),
    };

    let mut body = EmailBody::new(&recipient.full_name, subject).paragraph(opening);
    match (data.inspection_type, data.negotiation_price, &data.letter_of_intention) {
        (InspectionType::Price, Some(price), _) => {
            body = body.detail("Offer", format_naira(price));
        }
        (InspectionType::Loi, _, Some(letter)) => {
            body = body.detail("Letter of intent", letter.clone());
        }
        _ => {}
    }
    body = body
        .detail(
            "Inspection",
            schedule_line(data.inspection_date, &data.inspection_time),
        )
        .detail("Mode", data.inspection_mode.label());
    if data.date_time_changed {
        body = body.paragraph("Please note the inspection date or time has changed.");
    }
    if data.mode_changed {
        body = body.paragraph(format!(
            "The inspection will now take place {}.",
            match data.inspection_mode {
                InspectionMode::InPerson => "in person",
                InspectionMode::Virtual => "virtually",
            }
        ));
    }
    if let Some(reason) = &data.reason {
        body = body.detail("Reason", reason.clone());
    }
    if data.action == NegotiationAction::Counter {
        body = body
            .detail("Counter offers so far", data.counter_count.to_string())
            .paragraph("Please respond to keep the negotiation moving.");
    }

    body.action("Respond to this inspection", link)
        .render(&recipient.email, subject)
}

/// One email per owner listing every property of theirs in the paid request.
pub fn seller_new_request(
    owner: &PartyContact,
    buyer: &PartyContact,
    inspections: &[&InspectionBooking],
    link: &str,
) -> EmailMessage {
    let subject = if inspections.len() == 1 {
        "New Inspection Request".to_string()
    } else {
        format!("{} New Inspection Requests", inspections.len())
    };
    let mut body = EmailBody::new(&owner.full_name, subject.clone()).paragraph(format!(
        "{} has paid for an inspection and is waiting for your response.",
        buyer.full_name
    ));

    for inspection in inspections {
        let mut line = schedule_line(inspection.inspection_date, &inspection.inspection_time);
        match (inspection.inspection_type, inspection.negotiation_price) {
            (InspectionType::Price, Some(price)) if inspection.is_negotiating => {
                line.push_str(&format!(", offer {}", format_naira(price)));
            }
            (InspectionType::Loi, _) if inspection.letter_of_intention.is_some() => {
                line.push_str(", letter of intent attached");
            }
            _ => {}
        }
        body = body.detail(inspection.property_title.clone(), line);
    }

    body.action("Review requests", link)
        .render(&owner.email, &subject)
}

pub fn buyer_payment_confirmed(
    buyer: &PartyContact,
    inspections: &[InspectionBooking],
    amount: Decimal,
    reference: &str,
) -> EmailMessage {
    let subject = "Inspection Request Confirmed";
    let mut body = EmailBody::new(&buyer.full_name, subject)
        .paragraph("Your payment was received and the property owners have been notified.")
        .detail("Amount paid", format_naira(amount))
        .detail("Reference", reference);
    for inspection in inspections {
        body = body.detail(
            inspection.property_title.clone(),
            schedule_line(inspection.inspection_date, &inspection.inspection_time),
        );
    }
    body.render(&buyer.email, subject)
}

pub fn buyer_payment_failed(inspection: &InspectionBooking, reference: &str) -> EmailMessage {
    let subject = "Inspection Payment Failed";
    EmailBody::new(&inspection.requester.full_name, subject)
        .paragraph(format!(
            "We could not confirm payment for your inspection of {}, so the request has been cancelled.",
            inspection.property_title
        ))
        .detail("Reference", reference)
        .paragraph("You can submit a new request at any time.")
        .render(&inspection.requester.email, subject)
}

pub fn inspection_cancelled(
    recipient: &PartyContact,
    inspection: &InspectionBooking,
    cancelled_by: &str,
    reason: Option<&str>,
) -> EmailMessage {
    let subject = "Inspection Cancelled";
    let mut body = EmailBody::new(&recipient.full_name, subject).paragraph(format!(
        "The inspection of {} has been cancelled by the {cancelled_by}.",
        inspection.property_title
    ));
    if let Some(reason) = reason {
        body = body.detail("Reason", reason);
    }
    body.render(&recipient.email, subject)
}

pub fn inspection_completed(recipient: &PartyContact, inspection: &InspectionBooking) -> EmailMessage {
    let subject = "Inspection Completed";
    EmailBody::new(&recipient.full_name, subject)
        .paragraph(format!(
            "The inspection of {} has been marked as completed.",
            inspection.property_title
        ))
        .render(&recipient.email, subject)
}
