//! Idle scheduler: one deferred idle check per participant

use chrono::{DateTime, Local};
use idlecheck_api::{ParticipantInfo, TimerSnapshot, TimerState};
use idlecheck_config::IdleConfig;
use idlecheck_host_api::{MembershipStore, SessionTransport};
use idlecheck_util::{ParticipantId, TimerId, as_millis_u64, deadline_after, remaining_idle};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::{DropReason, IdleEvent};

/// What a fire should do, given live participant data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireDecision {
    /// Idle past the threshold outside the holding area
    Relocate,

    /// Idle past the threshold but already in the holding area
    ResetOnly,

    /// Active since the timer was armed; check again later
    Rearm { observed: Duration },
}

/// Decide the outcome of an elapsed deadline from live store data
pub fn decide(config: &IdleConfig, info: &ParticipantInfo) -> FireDecision {
    if info.idle_duration < config.idle_time {
        FireDecision::Rearm {
            observed: info.idle_duration,
        }
    } else if config.is_holding_area(info.current_area) {
        FireDecision::ResetOnly
    } else {
        FireDecision::Relocate
    }
}

/// A live timer entry
#[derive(Debug)]
struct TimerEntry {
    timer_id: TimerId,
    state: TimerState,
    armed_for: Duration,
    deadline: DateTime<Local>,
    handle: JoinHandle<()>,
}

#[derive(Debug, Default)]
struct SchedulerState {
    timers: HashMap<ParticipantId, TimerEntry>,
    shut_down: bool,
}

impl SchedulerState {
    fn owns(&self, id: ParticipantId, timer_id: TimerId) -> bool {
        !self.shut_down
            && self
                .timers
                .get(&id)
                .is_some_and(|entry| entry.timer_id == timer_id)
    }
}

struct Shared {
    config: IdleConfig,
    store: Arc<dyn MembershipStore>,
    transport: Arc<dyn SessionTransport>,
    state: Mutex<SchedulerState>,
    listeners: Mutex<Vec<mpsc::UnboundedSender<IdleEvent>>>,
}

/// Owner of every participant's idle timer.
///
/// Cloning is cheap and every clone drives the same timer map. All map
/// mutations happen inside one short critical section; store and transport
/// round-trips never hold the lock.
#[derive(Clone)]
pub struct IdleScheduler {
    shared: Arc<Shared>,
}

impl IdleScheduler {
    /// Create a new scheduler
    pub fn new(
        config: IdleConfig,
        store: Arc<dyn MembershipStore>,
        transport: Arc<dyn SessionTransport>,
    ) -> Self {
        info!(
            idle_time_ms = as_millis_u64(config.idle_time),
            idle_channel = %config.idle_channel,
            "Idle scheduler initialized"
        );

        Self {
            shared: Arc::new(Shared {
                config,
                store,
                transport,
                state: Mutex::new(SchedulerState::default()),
                listeners: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Get the settings this scheduler runs with
    pub fn config(&self) -> &IdleConfig {
        &self.shared.config
    }

    /// Get the membership store
    pub fn store(&self) -> &Arc<dyn MembershipStore> {
        &self.shared.store
    }

    /// Subscribe to fire outcomes
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<IdleEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        lock(&self.shared.listeners).push(tx);
        rx
    }

    /// Cancel and remove the participant's timer, if any.
    ///
    /// Returns whether an entry existed.
    pub fn cancel(&self, id: ParticipantId) -> bool {
        let removed = lock(&self.shared.state).timers.remove(&id);

        match removed {
            Some(entry) => {
                entry.handle.abort();
                debug!(participant_id = %id, timer_id = %entry.timer_id, "Idle timer cancelled");
                true
            }
            None => false,
        }
    }

    /// Replace the participant's timer with one due after
    /// `max(idle_time - observed_idle, 0)`.
    ///
    /// Returns the new timer's id, or None once the scheduler is shut down.
    pub fn reset(&self, id: ParticipantId, observed_idle: Duration) -> Option<TimerId> {
        let delay = remaining_idle(self.shared.config.idle_time, observed_idle);

        let mut state = lock(&self.shared.state);
        if state.shut_down {
            debug!(participant_id = %id, "Ignoring reset after shutdown");
            return None;
        }

        if let Some(old) = state.timers.remove(&id) {
            old.handle.abort();
        }

        Some(self.shared.arm_locked(&mut state, id, delay))
    }

    /// Like [`reset`](Self::reset), but leaves an entry whose relocation is
    /// already in flight untouched.
    ///
    /// Roster data read while a relocation is on the wire is stale by
    /// construction; re-arming from it would abort the send and relocate a
    /// second time. Returns None when nothing was armed.
    pub fn reseed(&self, id: ParticipantId, observed_idle: Duration) -> Option<TimerId> {
        let delay = remaining_idle(self.shared.config.idle_time, observed_idle);

        let mut state = lock(&self.shared.state);
        if state.shut_down {
            return None;
        }

        match state.timers.get(&id) {
            Some(entry) if entry.state == TimerState::Relocating => {
                debug!(participant_id = %id, "Relocation in flight, not reseeding");
                return None;
            }
            _ => {}
        }

        if let Some(old) = state.timers.remove(&id) {
            old.handle.abort();
        }

        Some(self.shared.arm_locked(&mut state, id, delay))
    }

    /// Drop every timer whose participant fails `keep`.
    ///
    /// Returns how many entries were removed.
    pub fn retain(&self, mut keep: impl FnMut(ParticipantId) -> bool) -> usize {
        let mut state = lock(&self.shared.state);
        let before = state.timers.len();

        state.timers.retain(|id, entry| {
            let kept = keep(*id);
            if !kept {
                entry.handle.abort();
                debug!(participant_id = %id, "Idle timer dropped");
            }
            kept
        });

        before - state.timers.len()
    }

    /// Get a snapshot of one participant's timer
    pub fn snapshot(&self, id: ParticipantId) -> Option<TimerSnapshot> {
        lock(&self.shared.state)
            .timers
            .get(&id)
            .map(|entry| to_snapshot(id, entry))
    }

    /// Get snapshots of every live timer, ordered by participant
    pub fn snapshots(&self) -> Vec<TimerSnapshot> {
        let state = lock(&self.shared.state);
        let mut snapshots: Vec<_> = state
            .timers
            .iter()
            .map(|(id, entry)| to_snapshot(*id, entry))
            .collect();
        snapshots.sort_by_key(|s| s.participant_id);
        snapshots
    }

    /// Check if a participant has a live timer
    pub fn is_tracked(&self, id: ParticipantId) -> bool {
        lock(&self.shared.state).timers.contains_key(&id)
    }

    /// Number of live timers
    pub fn len(&self) -> usize {
        lock(&self.shared.state).timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_shut_down(&self) -> bool {
        lock(&self.shared.state).shut_down
    }

    /// Cancel every timer and wait for in-flight checks to stop.
    ///
    /// After this returns no timer armed by this scheduler sends a
    /// relocation, and later resets are ignored. A check whose relocation
    /// was already sent may still be finishing its store updates.
    pub async fn shutdown(&self) {
        let handles: Vec<JoinHandle<()>> = {
            let mut state = lock(&self.shared.state);
            state.shut_down = true;
            state.timers.drain().map(|(_, entry)| entry.handle).collect()
        };

        let cancelled = handles.len();
        for handle in &handles {
            handle.abort();
        }
        for handle in handles {
            // Cancelled or already finished; either way it is done.
            let _ = handle.await;
        }

        info!(cancelled, "Idle scheduler shut down");
    }
}

impl Shared {
    /// Install a fresh timer. The caller has already removed any previous
    /// entry for `id` and holds the state lock.
    fn arm_locked(
        self: &Arc<Self>,
        state: &mut SchedulerState,
        id: ParticipantId,
        delay: Duration,
    ) -> TimerId {
        let timer_id = TimerId::new();
        let weak = Arc::downgrade(self);

        // The task cannot observe the map before the insert below because
        // it has to take the same lock first.
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(shared) = weak.upgrade() {
                shared.fire(id, timer_id).await;
            }
        });

        state.timers.insert(
            id,
            TimerEntry {
                timer_id,
                state: TimerState::Armed,
                armed_for: delay,
                deadline: deadline_after(delay),
                handle,
            },
        );

        debug!(
            participant_id = %id,
            timer_id = %timer_id,
            delay_ms = as_millis_u64(delay),
            "Idle timer armed"
        );

        timer_id
    }

    /// Remove the entry if it still belongs to `timer_id`.
    ///
    /// The owning task's handle is dropped rather than aborted, since the
    /// caller is that task.
    fn release(&self, id: ParticipantId, timer_id: TimerId) -> bool {
        let mut state = lock(&self.state);
        if state.owns(id, timer_id) {
            state.timers.remove(&id);
            true
        } else {
            false
        }
    }

    /// Deadline elapsed: re-validate against live data, then act.
    async fn fire(self: Arc<Self>, id: ParticipantId, timer_id: TimerId) {
        if !lock(&self.state).owns(id, timer_id) {
            return;
        }

        let info = match self.store.fetch_participant_info(id).await {
            Ok(info) => info,
            Err(e) => {
                if self.release(id, timer_id) {
                    let reason = if e.is_not_found() {
                        debug!(participant_id = %id, "Participant gone before idle check");
                        DropReason::Vanished
                    } else {
                        warn!(participant_id = %id, error = %e, "Idle check lookup failed, dropping timer");
                        DropReason::LookupFailed(e.to_string())
                    };
                    self.emit(IdleEvent::Dropped {
                        participant_id: id,
                        reason,
                    });
                }
                return;
            }
        };

        let decision = decide(&self.config, &info);

        {
            let mut state = lock(&self.state);
            if !state.owns(id, timer_id) {
                debug!(participant_id = %id, "Idle check superseded while fetching");
                return;
            }

            match decision {
                FireDecision::Rearm { observed } => {
                    state.timers.remove(&id);
                    let delay = remaining_idle(self.config.idle_time, observed);
                    self.arm_locked(&mut state, id, delay);
                    drop(state);

                    debug!(
                        participant_id = %id,
                        idle_ms = as_millis_u64(observed),
                        "Participant not idle, resetting timer"
                    );
                    self.emit(IdleEvent::Rearmed {
                        participant_id: id,
                        delay,
                    });
                    return;
                }
                FireDecision::Relocate | FireDecision::ResetOnly => {
                    // Keep the entry while the relocation is in flight so a
                    // concurrent cancel or reset still aborts it.
                    if let Some(entry) = state.timers.get_mut(&id) {
                        entry.state = TimerState::Relocating;
                    }
                }
            }
        }

        let holding_area = self.config.idle_channel;

        if decision == FireDecision::Relocate {
            info!(
                participant_id = %id,
                holding_area = %holding_area,
                idle_ms = as_millis_u64(info.idle_duration),
                "Moving idle participant"
            );

            if let Err(e) = self.transport.send_relocate(id, holding_area).await {
                let retry_in = self.config.relocate_retry;
                warn!(
                    participant_id = %id,
                    error = %e,
                    retry_ms = as_millis_u64(retry_in),
                    "Failed to move idle participant"
                );

                let mut state = lock(&self.state);
                if state.owns(id, timer_id) {
                    state.timers.remove(&id);
                    self.arm_locked(&mut state, id, retry_in);
                    drop(state);
                    self.emit(IdleEvent::RelocateFailed {
                        participant_id: id,
                        error: e.to_string(),
                        retry_in,
                    });
                }
                return;
            }

            // Only the send is abortable. Once it is on the wire the entry
            // goes away, so the echoed move finds nothing to cancel and the
            // store updates below always run.
            self.release(id, timer_id);
            self.emit(IdleEvent::Relocated {
                participant_id: id,
                holding_area,
                idle: info.idle_duration,
            });
        } else {
            self.release(id, timer_id);
            debug!(participant_id = %id, "Idle participant already in holding area");
            self.emit(IdleEvent::IdleReset { participant_id: id });
        }

        if let Err(e) = self.store.request_idle_duration_reset(id).await {
            warn!(participant_id = %id, error = %e, "Failed to reset idle duration");
        }
        if let Err(e) = self.store.request_location_update(id, holding_area).await {
            warn!(participant_id = %id, error = %e, "Failed to update participant location");
        }
    }

    fn emit(&self, event: IdleEvent) {
        lock(&self.listeners).retain(|tx| tx.send(event.clone()).is_ok());
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        for entry in state.timers.values() {
            entry.handle.abort();
        }
    }
}

fn to_snapshot(id: ParticipantId, entry: &TimerEntry) -> TimerSnapshot {
    TimerSnapshot {
        participant_id: id,
        timer_id: entry.timer_id,
        state: entry.state,
        armed_for: entry.armed_for,
        deadline: entry.deadline,
    }
}

/// Lock ignoring poisoning: the guarded maps stay consistent across panics
/// because every mutation is a single insert or remove.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
