//! Host collaborator traits

use async_trait::async_trait;
use idlecheck_api::{ParticipantInfo, RosterEntry, SessionEvent};
use idlecheck_util::{AreaId, IdleCheckError, ParticipantId};
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors from store and transport operations
#[derive(Debug, Error)]
pub enum HostError {
    #[error("Participant not found: {0}")]
    NotFound(ParticipantId),

    #[error("Transport disconnected")]
    Disconnected,

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Send failed: {0}")]
    SendFailed(String),
}

impl HostError {
    /// Whether the participant is simply gone rather than the host failing
    pub fn is_not_found(&self) -> bool {
        matches!(self, HostError::NotFound(_))
    }
}

impl From<HostError> for IdleCheckError {
    fn from(e: HostError) -> Self {
        match e {
            HostError::NotFound(id) => IdleCheckError::ParticipantNotFound(id),
            HostError::Disconnected | HostError::SendFailed(_) => {
                IdleCheckError::transport(e.to_string())
            }
            HostError::StoreUnavailable(_) => IdleCheckError::store(e.to_string()),
        }
    }
}

pub type HostResult<T> = Result<T, HostError>;

/// Membership/state store: source of truth for participant idle duration
/// and location
#[async_trait]
pub trait MembershipStore: Send + Sync {
    /// Fetch every participant currently in the session
    async fn fetch_roster(&self) -> HostResult<Vec<RosterEntry>>;

    /// Fetch live idle duration and area for one participant.
    ///
    /// Fails with [`HostError::NotFound`] once the participant has left.
    async fn fetch_participant_info(&self, id: ParticipantId) -> HostResult<ParticipantInfo>;

    /// Ask the store to reset the participant's tracked idle duration to zero
    async fn request_idle_duration_reset(&self, id: ParticipantId) -> HostResult<()>;

    /// Ask the store to record a new area for the participant ahead of the
    /// transport's own confirmation
    async fn request_location_update(&self, id: ParticipantId, area: AreaId) -> HostResult<()>;
}

/// Session transport: membership event stream and relocation commands
#[async_trait]
pub trait SessionTransport: Send + Sync {
    /// Identity this service is connected as
    fn self_id(&self) -> ParticipantId;

    /// Move a participant into another area
    async fn send_relocate(&self, id: ParticipantId, destination: AreaId) -> HostResult<()>;

    /// Subscribe to membership events.
    ///
    /// Dropping the receiver unsubscribes. The stream ends when the
    /// transport disconnects.
    fn subscribe(&self) -> mpsc::UnboundedReceiver<SessionEvent>;

    /// Optional: check if the transport is connected
    fn is_connected(&self) -> bool {
        true
    }
}
