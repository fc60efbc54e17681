//! Event router: membership events -> scheduler operations

use idlecheck_api::{LeaveReason, SessionEvent};
use idlecheck_util::{AreaId, ParticipantId};
use std::time::Duration;
use tracing::debug;

use crate::IdleScheduler;

/// Translates session notifications into cancel/reset calls.
///
/// Events are handled one at a time and to completion; nothing here awaits.
#[derive(Clone)]
pub struct EventRouter {
    scheduler: IdleScheduler,
    self_id: ParticipantId,
}

impl EventRouter {
    pub fn new(scheduler: IdleScheduler, self_id: ParticipantId) -> Self {
        Self { scheduler, self_id }
    }

    /// Route one session event
    pub fn dispatch(&self, event: &SessionEvent) {
        if event.participant_id() == self.self_id {
            return;
        }

        match event {
            SessionEvent::ParticipantLeft {
                participant_id,
                reason,
            } => self.on_participant_left(*participant_id, reason),
            SessionEvent::ParticipantEntered { participant_id } => {
                self.on_participant_entered(*participant_id)
            }
            SessionEvent::ParticipantMoved {
                participant_id,
                destination_area,
            } => self.on_participant_moved(*participant_id, *destination_area),
        }
    }

    pub fn on_participant_left(&self, id: ParticipantId, reason: &LeaveReason) {
        debug!(
            participant_id = %id,
            reason_code = ?reason.code,
            reason = reason.message.as_deref().unwrap_or(""),
            "Participant disconnected"
        );
        self.scheduler.cancel(id);
    }

    pub fn on_participant_entered(&self, id: ParticipantId) {
        debug!(participant_id = %id, "Participant connected");
        self.scheduler.reset(id, Duration::ZERO);
    }

    /// Any area change counts as activity, except arriving in the holding
    /// area, where there is nothing left to time.
    pub fn on_participant_moved(&self, id: ParticipantId, destination: AreaId) {
        debug!(participant_id = %id, destination = %destination, "Participant moved");

        if self.scheduler.config().is_holding_area(destination) {
            self.scheduler.cancel(id);
        } else {
            self.scheduler.reset(id, Duration::ZERO);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use idlecheck_config::IdleConfig;
    use idlecheck_host_api::MockSession;
    use std::sync::Arc;

    const SELF_ID: ParticipantId = ParticipantId::new(1);
    const HOLDING: AreaId = AreaId::new(1);
    const LOBBY: AreaId = AreaId::new(2);

    fn make_router() -> (EventRouter, IdleScheduler) {
        let session = Arc::new(MockSession::new(SELF_ID));
        let scheduler = IdleScheduler::new(IdleConfig::default(), session.clone(), session);
        (EventRouter::new(scheduler.clone(), SELF_ID), scheduler)
    }

    #[tokio::test(start_paused = true)]
    async fn entered_arms_full_idle_time() {
        let (router, scheduler) = make_router();
        let id = ParticipantId::new(5);

        router.dispatch(&SessionEvent::ParticipantEntered { participant_id: id });

        let snapshot = scheduler.snapshot(id).unwrap();
        assert_eq!(snapshot.armed_for, scheduler.config().idle_time);
    }

    #[tokio::test(start_paused = true)]
    async fn left_cancels() {
        let (router, scheduler) = make_router();
        let id = ParticipantId::new(5);

        router.on_participant_entered(id);
        router.dispatch(&SessionEvent::ParticipantLeft {
            participant_id: id,
            reason: LeaveReason::default(),
        });

        assert!(!scheduler.is_tracked(id));

        // Leaving twice is harmless.
        router.on_participant_left(id, &LeaveReason::default());
        assert!(scheduler.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn move_into_holding_area_cancels() {
        let (router, scheduler) = make_router();
        let id = ParticipantId::new(5);

        router.on_participant_entered(id);
        router.dispatch(&SessionEvent::ParticipantMoved {
            participant_id: id,
            destination_area: HOLDING,
        });

        assert!(!scheduler.is_tracked(id));
    }

    #[tokio::test(start_paused = true)]
    async fn move_elsewhere_resets() {
        let (router, scheduler) = make_router();
        let id = ParticipantId::new(5);

        router.on_participant_entered(id);
        let before = scheduler.snapshot(id).unwrap().timer_id;

        router.dispatch(&SessionEvent::ParticipantMoved {
            participant_id: id,
            destination_area: LOBBY,
        });

        let after = scheduler.snapshot(id).unwrap();
        assert_ne!(before, after.timer_id);
        assert_eq!(scheduler.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn own_identity_is_ignored() {
        let (router, scheduler) = make_router();

        router.dispatch(&SessionEvent::ParticipantEntered {
            participant_id: SELF_ID,
        });
        router.dispatch(&SessionEvent::ParticipantMoved {
            participant_id: SELF_ID,
            destination_area: LOBBY,
        });

        assert!(scheduler.is_empty());
    }
}
