//! Pure accept/reject/counter handler. Produces the record patch plus the audit
//! and email payloads; persistence and delivery belong to the caller.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::domain::{
    InspectionBooking, InspectionMode, InspectionRecordStatus, InspectionStatus, InspectionType,
    NegotiationAction, Party, Stage, UserType,
};
use super::transitions::Transition;
use crate::workflows::http::deserialize_optional_date;
use crate::workflows::notifications::format_naira;

/// Body of `POST /inspections/:inspection_id/actions/:user_id`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NegotiationRequest {
    pub action: NegotiationAction,
    pub inspection_type: InspectionType,
    pub user_type: UserType,
    #[serde(default)]
    pub counter_price: Option<Decimal>,
    #[serde(default)]
    pub letter_of_intention: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub inspection_date: Option<NaiveDate>,
    #[serde(default)]
    pub inspection_time: Option<String>,
    #[serde(default)]
    pub rejection_reason: Option<String>,
    #[serde(default)]
    pub inspection_mode: Option<InspectionMode>,
}

/// Partial record patch; `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectionUpdate {
    pub stage: Option<Stage>,
    pub pending_response_from: Option<Party>,
    pub status: Option<InspectionRecordStatus>,
    pub inspection_status: Option<InspectionStatus>,
    pub is_negotiating: Option<bool>,
    pub is_loi: Option<bool>,
    pub counter_count: Option<u32>,
    pub negotiation_price: Option<Decimal>,
    pub letter_of_intention: Option<String>,
    pub inspection_date: Option<NaiveDate>,
    pub inspection_time: Option<String>,
    pub inspection_mode: Option<InspectionMode>,
    pub schedule_revised: Option<bool>,
    pub reason: Option<String>,
}

impl InspectionUpdate {
    pub fn apply(self, record: &mut InspectionBooking) {
        if let Some(stage) = self.stage {
            record.stage = stage;
        }
        if let Some(pending) = self.pending_response_from {
            record.pending_response_from = pending;
        }
        if let Some(status) = self.status {
            record.status = status;
        }
        if let Some(inspection_status) = self.inspection_status {
            record.inspection_status = Some(inspection_status);
        }
        if let Some(is_negotiating) = self.is_negotiating {
            record.is_negotiating = is_negotiating;
        }
        if let Some(is_loi) = self.is_loi {
            record.is_loi = is_loi;
        }
        if let Some(counter_count) = self.counter_count {
            record.counter_count = counter_count;
        }
        if let Some(price) = self.negotiation_price {
            record.negotiation_price = Some(price);
        }
        if let Some(letter) = self.letter_of_intention {
            record.letter_of_intention = Some(letter);
        }
        if let Some(date) = self.inspection_date {
            record.inspection_date = date;
        }
        if let Some(time) = self.inspection_time {
            record.inspection_time = time;
        }
        if let Some(mode) = self.inspection_mode {
            record.inspection_mode = mode;
        }
        if let Some(revised) = self.schedule_revised {
            record.schedule_revised = revised;
        }
        if let Some(reason) = self.reason {
            record.reason = Some(reason);
        }
    }
}

/// Structured payload the email templates render for the counterparty.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NegotiationEmail {
    pub action: NegotiationAction,
    pub actor: UserType,
    pub inspection_type: InspectionType,
    pub property_title: String,
    pub negotiation_price: Option<Decimal>,
    pub letter_of_intention: Option<String>,
    pub inspection_date: NaiveDate,
    pub inspection_time: String,
    pub inspection_mode: InspectionMode,
    pub date_time_changed: bool,
    pub mode_changed: bool,
    pub reason: Option<String>,
    pub counter_count: u32,
    /// True when a counter only moved the schedule or mode.
    pub reschedule_only: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NegotiationOutcome {
    pub update: InspectionUpdate,
    pub log_message: String,
    pub email_subject: String,
    pub email_data: NegotiationEmail,
}

/// Which schedule fields the request actually moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ScheduleChange {
    date_time: bool,
    mode: bool,
}

impl ScheduleChange {
    fn detect(record: &InspectionBooking, request: &NegotiationRequest) -> Self {
        let date_changed = request
            .inspection_date
            .is_some_and(|date| date != record.inspection_date);
        let time_changed = request
            .inspection_time
            .as_deref()
            .map(str::trim)
            .is_some_and(|time| !time.is_empty() && time != record.inspection_time);
        let mode = request
            .inspection_mode
            .is_some_and(|mode| mode != record.inspection_mode);

        Self {
            date_time: date_changed || time_changed,
            mode,
        }
    }

    fn any(self) -> bool {
        self.date_time || self.mode
    }
}

/// Price carried by a counter on a price inspection.
fn offered_price(request: &NegotiationRequest) -> Option<Decimal> {
    request
        .counter_price
        .filter(|price| *price > Decimal::ZERO)
        .filter(|_| request.inspection_type == InspectionType::Price)
}

/// Letter carried by a counter on an LOI inspection.
fn offered_letter(request: &NegotiationRequest) -> Option<&str> {
    request
        .letter_of_intention
        .as_deref()
        .map(str::trim)
        .filter(|letter| !letter.is_empty())
        .filter(|_| request.inspection_type == InspectionType::Loi)
}

/// Whether a counter would change the record: a price or letter that applies
/// to its inspection type, or a date, time or mode different from the stored one.
pub fn counter_changes_terms(record: &InspectionBooking, request: &NegotiationRequest) -> bool {
    offered_price(request).is_some()
        || offered_letter(request).is_some()
        || ScheduleChange::detect(record, request).any()
}

/// Computes the patch for an action the transition table already allowed.
pub fn apply_action(
    record: &InspectionBooking,
    request: &NegotiationRequest,
    transition: &Transition,
) -> NegotiationOutcome {
    let change = ScheduleChange::detect(record, request);
    let mut update = InspectionUpdate {
        stage: Some(transition.next_stage),
        pending_response_from: Some(transition.next_pending),
        schedule_revised: Some(change.any()),
        ..InspectionUpdate::default()
    };
    apply_schedule(&mut update, request, change);

    let date = update.inspection_date.unwrap_or(record.inspection_date);
    let time = update
        .inspection_time
        .clone()
        .unwrap_or_else(|| record.inspection_time.clone());
    let mode = update.inspection_mode.unwrap_or(record.inspection_mode);
    let schedule = ScheduleText {
        date,
        time: &time,
        mode,
    };
    let noun = request.inspection_type.noun();
    let actor = request.user_type.title();
    let mut reschedule_only = false;

    let (log_message, email_subject) = match request.action {
        NegotiationAction::Accept => {
            update.is_negotiating = Some(false);
            update.is_loi = Some(request.inspection_type == InspectionType::Loi);
            update.status = Some(InspectionRecordStatus::NegotiationAccepted);
            update.inspection_status = Some(if change.date_time {
                InspectionStatus::Countered
            } else {
                InspectionStatus::Accepted
            });

            let log = format!(
                "{actor} accepted the {}{}",
                offer_phrase(request.inspection_type, record.negotiation_price),
                schedule.suffix(change)
            );
            (log, format!("{noun} Accepted - {}", outcome_suffix(change)))
        }
        NegotiationAction::Reject => {
            let reason = request
                .rejection_reason
                .as_deref()
                .map(str::trim)
                .filter(|reason| !reason.is_empty())
                .map(str::to_string);
            update.is_negotiating = Some(false);
            update.status = Some(InspectionRecordStatus::NegotiationRejected);
            if change.date_time {
                update.inspection_status = Some(InspectionStatus::Countered);
            }

            let mut log = format!(
                "{actor} rejected the {}{}",
                offer_phrase(request.inspection_type, record.negotiation_price),
                schedule.suffix(change)
            );
            if let Some(reason) = &reason {
                log.push_str(&format!(". Reason: {reason}"));
            }
            update.reason = reason;
            (log, format!("{noun} Rejected - {}", outcome_suffix(change)))
        }
        NegotiationAction::Counter => {
            update.counter_count = Some(record.counter_count + 1);
            update.status = Some(InspectionRecordStatus::NegotiationCountered);
            update.inspection_status = Some(InspectionStatus::Countered);

            let counter_price = offered_price(request);
            let counter_letter = offered_letter(request);

            if let Some(price) = counter_price {
                update.negotiation_price = Some(price);
                update.is_negotiating = Some(true);
                let log = format!(
                    "{actor} countered with {}{}",
                    format_naira(price),
                    schedule.suffix(change)
                );
                (log, "Counter Offer Received".to_string())
            } else if let Some(letter) = counter_letter {
                update.letter_of_intention = Some(letter.to_string());
                update.is_negotiating = Some(true);
                update.is_loi = Some(true);
                let log = format!(
                    "{actor} submitted an updated letter of intent{}",
                    schedule.suffix(change)
                );
                (log, "Updated Letter of Intent Received".to_string())
            } else {
                reschedule_only = change.any();
                (
                    schedule.proposal(actor, change),
                    proposal_subject(change).to_string(),
                )
            }
        }
    };

    let email_data = NegotiationEmail {
        action: request.action,
        actor: request.user_type,
        inspection_type: request.inspection_type,
        property_title: record.property_title.clone(),
        negotiation_price: update.negotiation_price.or(record.negotiation_price),
        letter_of_intention: update
            .letter_of_intention
            .clone()
            .or_else(|| record.letter_of_intention.clone()),
        inspection_date: date,
        inspection_time: time.clone(),
        inspection_mode: mode,
        date_time_changed: change.date_time,
        mode_changed: change.mode,
        reason: update.reason.clone(),
        counter_count: update.counter_count.unwrap_or(record.counter_count),
        reschedule_only,
    };

    NegotiationOutcome {
        update,
        log_message,
        email_subject,
        email_data,
    }
}

fn apply_schedule(update: &mut InspectionUpdate, request: &NegotiationRequest, change: ScheduleChange) {
    if change.date_time {
        update.inspection_date = request.inspection_date;
        update.inspection_time = request
            .inspection_time
            .as_deref()
            .map(str::trim)
            .filter(|time| !time.is_empty())
            .map(str::to_string);
    }
    if change.mode {
        update.inspection_mode = request.inspection_mode;
    }
}

fn offer_phrase(inspection_type: InspectionType, price: Option<Decimal>) -> String {
    match (inspection_type, price) {
        (InspectionType::Price, Some(price)) => format!("offer of {}", format_naira(price)),
        (InspectionType::Price, None) => "offer".to_string(),
        (InspectionType::Loi, _) => "letter of intent".to_string(),
    }
}

fn outcome_suffix(change: ScheduleChange) -> &'static str {
    match (change.date_time, change.mode) {
        (false, false) => "Inspection Confirmed",
        (true, false) => "Inspection Rescheduled",
        (false, true) => "Inspection Mode Changed",
        (true, true) => "Inspection Rescheduled and Mode Changed",
    }
}

fn proposal_subject(change: ScheduleChange) -> &'static str {
    match (change.date_time, change.mode) {
        (true, false) => "New Inspection Schedule Proposed",
        (false, true) => "Inspection Mode Change Proposed",
        (true, true) => "New Inspection Schedule and Mode Proposed",
        (false, false) => "Inspection Update Received",
    }
}

struct ScheduleText<'a> {
    date: NaiveDate,
    time: &'a str,
    mode: InspectionMode,
}

impl ScheduleText<'_> {
    fn when(&self) -> String {
        format!("{} at {}", self.date.format("%Y-%m-%d"), self.time)
    }

    fn suffix(&self, change: ScheduleChange) -> String {
        let mut suffix = String::new();
        if change.date_time {
            suffix.push_str(&format!(" and rescheduled the inspection to {}", self.when()));
        }
        if change.mode {
            suffix.push_str(&format!(
                " and changed the inspection mode to {}",
                self.mode.label()
            ));
        }
        suffix
    }

    fn proposal(&self, actor: &str, change: ScheduleChange) -> String {
        match (change.date_time, change.mode) {
            (true, false) => format!("{actor} proposed a new inspection schedule: {}", self.when()),
            (false, true) => format!(
                "{actor} proposed changing the inspection mode to {}",
                self.mode.label()
            ),
            (true, true) => format!(
                "{actor} proposed a new inspection schedule: {}, {}",
                self.when(),
                self.mode.label()
            ),
            (false, false) => format!("{actor} responded without changing the inspection"),
        }
    }
}
