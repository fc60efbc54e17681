//! Roster reconciliation
//!
//! Membership changes that happened before the plugin attached were never
//! observed as events, so the timer map is seeded from the live roster.
//! The same pass runs periodically when a resync interval is configured,
//! which also drops entries for participants whose leave event was lost.

use idlecheck_host_api::HostResult;
use idlecheck_util::{ParticipantId, as_millis_u64, remaining_idle};
use std::collections::HashSet;
use tracing::{debug, warn};

use crate::IdleScheduler;

/// What one reconciliation pass did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    /// Participants armed with a timer
    pub armed: usize,

    /// Participants in the holding area (no timer)
    pub exempt: usize,

    /// Timer entries removed: participant absent from the roster or
    /// unresolvable
    pub dropped: usize,

    /// Roster entries skipped (this service's own identity)
    pub skipped: usize,

    /// Participants left alone because their relocation was in flight
    pub in_flight: usize,
}

/// Seed timer state from the current roster.
///
/// Each eligible participant is armed for the inactivity it has left, not
/// the full idle time, since its idle duration may already be accruing.
pub async fn reconcile(
    scheduler: &IdleScheduler,
    self_id: ParticipantId,
) -> HostResult<ReconcileSummary> {
    let store = scheduler.store().clone();
    let config = scheduler.config().clone();
    let roster = store.fetch_roster().await?;

    let mut summary = ReconcileSummary::default();

    let present: HashSet<ParticipantId> = roster.iter().map(|r| r.participant_id).collect();
    summary.dropped += scheduler.retain(|id| present.contains(&id));

    for entry in roster {
        let id = entry.participant_id;

        if id == self_id {
            summary.skipped += 1;
            continue;
        }

        if config.is_holding_area(entry.current_area) {
            scheduler.cancel(id);
            summary.exempt += 1;
            continue;
        }

        match store.fetch_participant_info(id).await {
            Ok(info) if config.is_holding_area(info.current_area) => {
                scheduler.cancel(id);
                summary.exempt += 1;
            }
            Ok(info) => {
                debug!(
                    participant_id = %id,
                    remaining_ms = as_millis_u64(remaining_idle(config.idle_time, info.idle_duration)),
                    "Seeding idle timer"
                );
                if scheduler.reseed(id, info.idle_duration).is_some() {
                    summary.armed += 1;
                } else {
                    summary.in_flight += 1;
                }
            }
            Err(e) => {
                if !e.is_not_found() {
                    warn!(participant_id = %id, error = %e, "Failed to fetch participant during reconciliation");
                }
                scheduler.cancel(id);
                summary.dropped += 1;
            }
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use idlecheck_config::IdleConfig;
    use idlecheck_host_api::MockSession;
    use idlecheck_util::{AreaId, millis};
    use std::sync::Arc;
    use std::time::Duration;

    const SELF_ID: ParticipantId = ParticipantId::new(1);
    const HOLDING: AreaId = AreaId::new(1);
    const LOBBY: AreaId = AreaId::new(2);

    fn make_scheduler() -> (IdleScheduler, Arc<MockSession>) {
        let session = Arc::new(MockSession::new(SELF_ID));
        let scheduler = IdleScheduler::new(IdleConfig::default(), session.clone(), session.clone());
        (scheduler, session)
    }

    #[tokio::test(start_paused = true)]
    async fn seeds_remaining_time_from_live_idle() {
        let (scheduler, session) = make_scheduler();
        session.insert_participant(ParticipantId::new(10), LOBBY, Duration::ZERO);
        session.insert_participant(ParticipantId::new(11), LOBBY, millis(850_000));
        session.insert_participant(ParticipantId::new(12), LOBBY, millis(905_000));

        let summary = reconcile(&scheduler, SELF_ID).await.unwrap();
        assert_eq!(summary.armed, 3);

        let armed: Vec<Duration> = scheduler.snapshots().iter().map(|s| s.armed_for).collect();
        assert_eq!(armed, vec![millis(900_000), millis(50_000), Duration::ZERO]);
    }

    #[tokio::test(start_paused = true)]
    async fn skips_self_and_holding_area() {
        let (scheduler, session) = make_scheduler();
        session.insert_participant(SELF_ID, LOBBY, millis(500_000));
        session.insert_participant(ParticipantId::new(10), HOLDING, millis(500_000));

        let summary = reconcile(&scheduler, SELF_ID).await.unwrap();

        assert_eq!(
            summary,
            ReconcileSummary {
                armed: 0,
                exempt: 1,
                dropped: 0,
                skipped: 1,
                in_flight: 0,
            }
        );
        assert!(scheduler.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn clears_stale_entries() {
        let (scheduler, session) = make_scheduler();
        let gone = ParticipantId::new(20);
        let parked = ParticipantId::new(21);
        session.insert_participant(parked, HOLDING, Duration::ZERO);
        scheduler.reset(gone, Duration::ZERO);
        scheduler.reset(parked, Duration::ZERO);

        let summary = reconcile(&scheduler, SELF_ID).await.unwrap();

        assert_eq!(summary.dropped, 1);
        assert_eq!(summary.exempt, 1);
        assert!(scheduler.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn resync_leaves_relocation_in_flight_alone() {
        let (scheduler, session) = make_scheduler();
        let id = ParticipantId::new(10);
        session.insert_participant(id, LOBBY, millis(950_000));
        *session.relocate_delay.lock().unwrap() = Some(Duration::from_secs(5));

        scheduler.reset(id, millis(950_000));
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }

        // The store still reports the lobby while the send is pending.
        let summary = reconcile(&scheduler, SELF_ID).await.unwrap();
        assert_eq!(summary.in_flight, 1);
        assert_eq!(summary.armed, 0);

        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(session.relocations(), vec![(id, HOLDING)]);
        assert!(!scheduler.is_tracked(id));
    }

    #[tokio::test(start_paused = true)]
    async fn roster_failure_is_reported() {
        let (scheduler, session) = make_scheduler();
        *session.fail_store.lock().unwrap() = true;

        assert!(reconcile(&scheduler, SELF_ID).await.is_err());
    }
}
