//! Shared types for the idlecheck data model

use chrono::{DateTime, Local};
use idlecheck_util::{AreaId, ParticipantId, TimerId};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One row of the session roster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub participant_id: ParticipantId,
    pub current_area: AreaId,
}

impl RosterEntry {
    pub fn new(participant_id: ParticipantId, current_area: AreaId) -> Self {
        Self {
            participant_id,
            current_area,
        }
    }
}

/// Live view of a single participant as held by the membership store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantInfo {
    /// Time since the participant's last recorded activity
    pub idle_duration: Duration,

    /// Area the participant currently occupies
    pub current_area: AreaId,
}

impl ParticipantInfo {
    pub fn new(idle_duration: Duration, current_area: AreaId) -> Self {
        Self {
            idle_duration,
            current_area,
        }
    }
}

/// Lifecycle state of a timer entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerState {
    /// Waiting for the deadline to elapse
    Armed,

    /// Deadline elapsed and idleness confirmed; relocation in flight
    Relocating,
}

/// Point-in-time view of one timer entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerSnapshot {
    pub participant_id: ParticipantId,
    pub timer_id: TimerId,
    pub state: TimerState,

    /// Delay the timer was armed with
    pub armed_for: Duration,

    /// Wall-clock deadline (for display)
    pub deadline: DateTime<Local>,
}
