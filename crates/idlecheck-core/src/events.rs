//! Events emitted by the idle scheduler

use idlecheck_util::{AreaId, ParticipantId};
use std::time::Duration;

/// Why a timer entry was dropped without relocating
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    /// Participant left the session before the check completed
    Vanished,

    /// Store lookup failed; treated as if the participant had left
    LookupFailed(String),
}

/// Outcome of a deferred idle check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdleEvent {
    /// Participant was idle and has been moved into the holding area
    Relocated {
        participant_id: ParticipantId,
        holding_area: AreaId,
        idle: Duration,
    },

    /// Participant was idle but already in the holding area; only the
    /// store's idle state was reset
    IdleReset {
        participant_id: ParticipantId,
    },

    /// Participant had been active since the timer was armed
    Rearmed {
        participant_id: ParticipantId,
        delay: Duration,
    },

    /// Relocation command failed; the participant is checked again later
    RelocateFailed {
        participant_id: ParticipantId,
        error: String,
        retry_in: Duration,
    },

    /// Timer entry dropped without acting
    Dropped {
        participant_id: ParticipantId,
        reason: DropReason,
    },
}

impl IdleEvent {
    pub fn participant_id(&self) -> ParticipantId {
        match self {
            IdleEvent::Relocated { participant_id, .. }
            | IdleEvent::IdleReset { participant_id }
            | IdleEvent::Rearmed { participant_id, .. }
            | IdleEvent::RelocateFailed { participant_id, .. }
            | IdleEvent::Dropped { participant_id, .. } => *participant_id,
        }
    }
}
