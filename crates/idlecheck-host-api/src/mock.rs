//! Mock session for testing

use async_trait::async_trait;
use idlecheck_api::{LeaveReason, ParticipantInfo, RosterEntry, SessionEvent};
use idlecheck_util::{AreaId, ParticipantId};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::{HostError, HostResult, MembershipStore, SessionTransport};

/// Mock participant state for testing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockParticipant {
    pub area: AreaId,
    pub idle: Duration,
}

/// In-memory membership store and session transport for unit/integration
/// testing.
///
/// Idle durations do not advance on their own; tests set them explicitly.
pub struct MockSession {
    self_id: ParticipantId,
    participants: Arc<Mutex<BTreeMap<ParticipantId, MockParticipant>>>,
    subscribers: Arc<Mutex<Vec<mpsc::UnboundedSender<SessionEvent>>>>,
    connected: AtomicBool,

    /// Relocation commands that reached the transport
    pub relocations: Arc<Mutex<Vec<(ParticipantId, AreaId)>>>,

    /// Idle-duration reset requests that reached the store
    pub idle_resets: Arc<Mutex<Vec<ParticipantId>>>,

    /// Location update requests that reached the store
    pub location_updates: Arc<Mutex<Vec<(ParticipantId, AreaId)>>>,

    /// Number of participant info fetches served
    pub info_fetches: Arc<Mutex<usize>>,

    /// Configure relocation sends to fail
    pub fail_relocate: Arc<Mutex<bool>>,

    /// Configure every store call to fail as unavailable
    pub fail_store: Arc<Mutex<bool>>,

    /// Configure idle resets and location updates to fail; fetches still work
    pub fail_updates: Arc<Mutex<bool>>,

    /// Delay participant info fetches, to exercise events racing a check
    pub fetch_delay: Arc<Mutex<Option<Duration>>>,

    /// Delay idle resets and location updates
    pub update_delay: Arc<Mutex<Option<Duration>>>,

    /// Delay relocation sends before they reach the wire
    pub relocate_delay: Arc<Mutex<Option<Duration>>>,

    /// Emit a moved event after each successful relocation, like a real
    /// server echoing the move back
    pub echo_moves: Arc<Mutex<bool>>,
}

impl MockSession {
    pub fn new(self_id: ParticipantId) -> Self {
        Self {
            self_id,
            participants: Arc::new(Mutex::new(BTreeMap::new())),
            subscribers: Arc::new(Mutex::new(Vec::new())),
            connected: AtomicBool::new(true),
            relocations: Arc::new(Mutex::new(Vec::new())),
            idle_resets: Arc::new(Mutex::new(Vec::new())),
            location_updates: Arc::new(Mutex::new(Vec::new())),
            info_fetches: Arc::new(Mutex::new(0)),
            fail_relocate: Arc::new(Mutex::new(false)),
            fail_store: Arc::new(Mutex::new(false)),
            fail_updates: Arc::new(Mutex::new(false)),
            fetch_delay: Arc::new(Mutex::new(None)),
            update_delay: Arc::new(Mutex::new(None)),
            relocate_delay: Arc::new(Mutex::new(None)),
            echo_moves: Arc::new(Mutex::new(false)),
        }
    }

    /// Put a participant in the session without emitting an event
    pub fn insert_participant(&self, id: ParticipantId, area: AreaId, idle: Duration) {
        self.participants
            .lock()
            .unwrap()
            .insert(id, MockParticipant { area, idle });
    }

    /// Remove a participant without emitting an event
    pub fn remove_participant(&self, id: ParticipantId) {
        self.participants.lock().unwrap().remove(&id);
    }

    /// Overwrite a participant's idle duration
    pub fn set_idle(&self, id: ParticipantId, idle: Duration) {
        if let Some(p) = self.participants.lock().unwrap().get_mut(&id) {
            p.idle = idle;
        }
    }

    /// Overwrite a participant's area without emitting an event
    pub fn set_area(&self, id: ParticipantId, area: AreaId) {
        if let Some(p) = self.participants.lock().unwrap().get_mut(&id) {
            p.area = area;
        }
    }

    /// Current state of one participant
    pub fn participant(&self, id: ParticipantId) -> Option<MockParticipant> {
        self.participants.lock().unwrap().get(&id).copied()
    }

    /// Participant joins: insert and emit an entered event
    pub fn simulate_enter(&self, id: ParticipantId, area: AreaId) {
        self.insert_participant(id, area, Duration::ZERO);
        self.emit(SessionEvent::ParticipantEntered { participant_id: id });
    }

    /// Participant leaves: remove and emit a left event
    pub fn simulate_leave(&self, id: ParticipantId) {
        self.remove_participant(id);
        self.emit(SessionEvent::ParticipantLeft {
            participant_id: id,
            reason: LeaveReason::new(8, "leaving"),
        });
    }

    /// Participant switches area on their own: counts as activity
    pub fn simulate_move(&self, id: ParticipantId, area: AreaId) {
        if let Some(p) = self.participants.lock().unwrap().get_mut(&id) {
            p.area = area;
            p.idle = Duration::ZERO;
        }
        self.emit(SessionEvent::ParticipantMoved {
            participant_id: id,
            destination_area: area,
        });
    }

    /// Deliver an event to every live subscriber
    pub fn emit(&self, event: SessionEvent) {
        self.subscribers
            .lock()
            .unwrap()
            .retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Simulate a dropped connection: sends fail and event streams end
    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
        self.subscribers.lock().unwrap().clear();
    }

    /// Number of live event subscriptions
    pub fn subscriber_count(&self) -> usize {
        let mut subscribers = self.subscribers.lock().unwrap();
        subscribers.retain(|tx| !tx.is_closed());
        subscribers.len()
    }

    /// Snapshot of relocation commands sent so far
    pub fn relocations(&self) -> Vec<(ParticipantId, AreaId)> {
        self.relocations.lock().unwrap().clone()
    }

    fn check_store(&self) -> HostResult<()> {
        if *self.fail_store.lock().unwrap() {
            return Err(HostError::StoreUnavailable("Mock store failure".into()));
        }
        Ok(())
    }

    async fn check_update(&self) -> HostResult<()> {
        self.check_store()?;

        let delay = *self.update_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if *self.fail_updates.lock().unwrap() {
            return Err(HostError::StoreUnavailable("Mock update failure".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl MembershipStore for MockSession {
    async fn fetch_roster(&self) -> HostResult<Vec<RosterEntry>> {
        self.check_store()?;

        Ok(self
            .participants
            .lock()
            .unwrap()
            .iter()
            .map(|(id, p)| RosterEntry::new(*id, p.area))
            .collect())
    }

    async fn fetch_participant_info(&self, id: ParticipantId) -> HostResult<ParticipantInfo> {
        self.check_store()?;
        *self.info_fetches.lock().unwrap() += 1;

        let delay = *self.fetch_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.participants
            .lock()
            .unwrap()
            .get(&id)
            .map(|p| ParticipantInfo::new(p.idle, p.area))
            .ok_or(HostError::NotFound(id))
    }

    async fn request_idle_duration_reset(&self, id: ParticipantId) -> HostResult<()> {
        self.check_update().await?;

        self.idle_resets.lock().unwrap().push(id);
        if let Some(p) = self.participants.lock().unwrap().get_mut(&id) {
            p.idle = Duration::ZERO;
        }
        Ok(())
    }

    async fn request_location_update(&self, id: ParticipantId, area: AreaId) -> HostResult<()> {
        self.check_update().await?;

        self.location_updates.lock().unwrap().push((id, area));
        if let Some(p) = self.participants.lock().unwrap().get_mut(&id) {
            p.area = area;
        }
        Ok(())
    }
}

#[async_trait]
impl SessionTransport for MockSession {
    fn self_id(&self) -> ParticipantId {
        self.self_id
    }

    async fn send_relocate(&self, id: ParticipantId, destination: AreaId) -> HostResult<()> {
        let delay = *self.relocate_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if !self.connected.load(Ordering::SeqCst) {
            return Err(HostError::Disconnected);
        }
        if *self.fail_relocate.lock().unwrap() {
            return Err(HostError::SendFailed("Mock relocate failure".into()));
        }

        self.relocations.lock().unwrap().push((id, destination));

        let moved = {
            let mut participants = self.participants.lock().unwrap();
            match participants.get_mut(&id) {
                Some(p) => {
                    p.area = destination;
                    true
                }
                None => false,
            }
        };

        if moved && *self.echo_moves.lock().unwrap() {
            self.emit(SessionEvent::ParticipantMoved {
                participant_id: id,
                destination_area: destination,
            });
        }

        Ok(())
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<SessionEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        if self.connected.load(Ordering::SeqCst) {
            self.subscribers.lock().unwrap().push(tx);
        }
        rx
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_relocate_moves_and_echoes() {
        let session = MockSession::new(ParticipantId::new(1));
        let mut events = session.subscribe();
        *session.echo_moves.lock().unwrap() = true;

        let id = ParticipantId::new(2);
        session.insert_participant(id, AreaId::new(5), Duration::from_secs(1000));

        session.send_relocate(id, AreaId::new(1)).await.unwrap();

        assert_eq!(session.relocations(), vec![(id, AreaId::new(1))]);
        assert_eq!(session.participant(id).unwrap().area, AreaId::new(1));
        assert_eq!(
            events.recv().await,
            Some(SessionEvent::ParticipantMoved {
                participant_id: id,
                destination_area: AreaId::new(1),
            })
        );
    }

    #[tokio::test]
    async fn mock_fetch_missing_is_not_found() {
        let session = MockSession::new(ParticipantId::new(1));
        let result = session.fetch_participant_info(ParticipantId::new(9)).await;
        assert!(matches!(result, Err(HostError::NotFound(_))));
    }

    #[tokio::test]
    async fn mock_disconnect_ends_stream_and_fails_sends() {
        let session = MockSession::new(ParticipantId::new(1));
        let mut events = session.subscribe();

        session.disconnect();

        assert_eq!(events.recv().await, None);
        let result = session.send_relocate(ParticipantId::new(2), AreaId::new(1)).await;
        assert!(matches!(result, Err(HostError::Disconnected)));
    }

    #[tokio::test]
    async fn mock_update_failure_leaves_fetch_working() {
        let session = MockSession::new(ParticipantId::new(1));
        let id = ParticipantId::new(2);
        session.insert_participant(id, AreaId::new(5), Duration::from_secs(1000));
        *session.fail_updates.lock().unwrap() = true;

        assert!(session.fetch_participant_info(id).await.is_ok());
        assert!(session.request_idle_duration_reset(id).await.is_err());
        assert!(session.request_location_update(id, AreaId::new(1)).await.is_err());
        assert!(session.idle_resets.lock().unwrap().is_empty());
        assert_eq!(session.participant(id).unwrap().area, AreaId::new(5));
    }
}
