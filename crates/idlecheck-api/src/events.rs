//! Membership events delivered by the session transport

use idlecheck_util::{AreaId, ParticipantId};
use serde::{Deserialize, Serialize};

/// Why a participant left the session, as reported by the host
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveReason {
    /// Host-specific reason code
    pub code: Option<u32>,

    /// Human-readable reason message
    pub message: Option<String>,
}

impl LeaveReason {
    pub fn new(code: u32, message: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            message: Some(message.into()),
        }
    }
}

/// Membership events the idle check subscribes to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// Participant disconnected from the session
    ParticipantLeft {
        participant_id: ParticipantId,
        #[serde(default)]
        reason: LeaveReason,
    },

    /// Participant joined the session
    ParticipantEntered {
        participant_id: ParticipantId,
    },

    /// Participant moved to another area
    ParticipantMoved {
        participant_id: ParticipantId,
        destination_area: AreaId,
    },
}

impl SessionEvent {
    /// The participant this event is about
    pub fn participant_id(&self) -> ParticipantId {
        match self {
            SessionEvent::ParticipantLeft { participant_id, .. }
            | SessionEvent::ParticipantEntered { participant_id }
            | SessionEvent::ParticipantMoved { participant_id, .. } => *participant_id,
        }
    }
}
