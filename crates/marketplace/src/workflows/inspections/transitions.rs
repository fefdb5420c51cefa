//! Declarative negotiation transition table, consulted before any action is applied.

use serde::Serialize;

use super::domain::{NegotiationAction, Party, Stage, UserType};

/// `(current stage, action) -> next stage`. Anything absent is refused.
const TRANSITIONS: &[(Stage, NegotiationAction, Stage)] = &[
    (Stage::Negotiation, NegotiationAction::Accept, Stage::Inspection),
    (Stage::Negotiation, NegotiationAction::Reject, Stage::Inspection),
    (Stage::Negotiation, NegotiationAction::Counter, Stage::Negotiation),
    (Stage::Inspection, NegotiationAction::Accept, Stage::Inspection),
    // inspection is sticky: a counter here only reschedules or reprices
    (Stage::Inspection, NegotiationAction::Counter, Stage::Inspection),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transition {
    pub next_stage: Stage,
    pub next_pending: Party,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TransitionRefusal {
    #[error("inspection is already {} and accepts no further actions", .0.label())]
    Closed(Stage),
    #[error("inspection payment has not been confirmed yet")]
    PaymentPending,
    #[error("waiting on the {} to respond", .pending.label())]
    AwaitingOtherParty { pending: Party },
    #[error("an offer cannot be rejected once the inspection stage has been reached")]
    RejectAfterInspectionStage,
    #[error("{} is not permitted at the {} stage", .action.label(), .stage.label())]
    NotPermitted {
        stage: Stage,
        action: NegotiationAction,
    },
}

impl TransitionRefusal {
    pub const fn error_code(self) -> &'static str {
        match self {
            Self::Closed(_) => "INSPECTION_CLOSED",
            Self::PaymentPending => "PAYMENT_PENDING",
            Self::AwaitingOtherParty { .. } => "AWAITING_OTHER_PARTY",
            Self::RejectAfterInspectionStage => "REJECT_AFTER_INSPECTION_STAGE",
            Self::NotPermitted { .. } => "ACTION_NOT_PERMITTED",
        }
    }
}

pub fn next_stage(stage: Stage, action: NegotiationAction) -> Option<Stage> {
    TRANSITIONS
        .iter()
        .find(|(from, candidate, _)| *from == stage && *candidate == action)
        .map(|(_, _, to)| *to)
}

/// Resolves whether `actor` may take `action` and where the record goes next.
pub fn resolve(
    stage: Stage,
    action: NegotiationAction,
    actor: UserType,
    pending: Party,
) -> Result<Transition, TransitionRefusal> {
    if stage.is_terminal() {
        return Err(TransitionRefusal::Closed(stage));
    }
    if pending == Party::Admin {
        return Err(TransitionRefusal::PaymentPending);
    }
    if pending != actor.party() {
        return Err(TransitionRefusal::AwaitingOtherParty { pending });
    }

    match next_stage(stage, action) {
        Some(next_stage) => Ok(Transition {
            next_stage,
            next_pending: actor.counterpart().party(),
        }),
        None if stage == Stage::Inspection && action == NegotiationAction::Reject => {
            Err(TransitionRefusal::RejectAfterInspectionStage)
        }
        None => Err(TransitionRefusal::NotPermitted { stage, action }),
    }
}
