//! The call session coordinator.
//!
//! Exactly one logical instance exists per session. It owns the outgoing and
//! incoming invitation slots, the in-call flag, the availability toggle, and
//! the armed timeout per active invitation. Every mutation goes through the
//! operations below under the single state lock, so a racing local timer and
//! a late remote event resolve to "first writer wins, second is a no-op".

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use duet_transport::{CallId, CallInvite, CallType, ClientCommand, ConversationId, Transport, UserId};

use crate::error::{CallError, CallResult};
use crate::events::{CallDirection, CallEvent};
use crate::token::{TokenProvider, TokenRole};
use crate::types::{CallConfig, CallInvitation, CallSessionSnapshot, CallStatus};

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Reason sent with an automatic rejection while another call is active.
pub const REASON_BUSY: &str = "busy";
/// Default reason for an explicit local rejection.
pub const REASON_USER_DECLINED: &str = "user_declined";

#[derive(Debug, Default)]
struct SessionState {
    outgoing: Option<CallInvitation>,
    incoming: Option<CallInvitation>,
    is_in_call: bool,
    is_available: bool,
    missed_calls: Vec<CallInvitation>,
}

impl SessionState {
    fn has_active_invitation(&self) -> bool {
        self.outgoing.as_ref().is_some_and(CallInvitation::is_active)
            || self.incoming.as_ref().is_some_and(CallInvitation::is_active)
    }
}

/// Owner of the per-session call-signaling state machine.
#[derive(Clone)]
pub struct CallCoordinator {
    transport: Arc<dyn Transport>,
    tokens: Arc<dyn TokenProvider>,
    local_user: UserId,
    config: CallConfig,
    state: Arc<RwLock<SessionState>>,
    timers: Arc<DashMap<CallId, JoinHandle<()>>>,
    event_tx: broadcast::Sender<CallEvent>,
}

impl CallCoordinator {
    pub fn new(
        transport: Arc<dyn Transport>,
        tokens: Arc<dyn TokenProvider>,
        local_user: UserId,
        config: CallConfig,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            transport,
            tokens,
            local_user,
            config,
            state: Arc::new(RwLock::new(SessionState {
                is_available: true,
                ..SessionState::default()
            })),
            timers: Arc::new(DashMap::new()),
            event_tx,
        }
    }

    /// Subscribe to the call event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<CallEvent> {
        self.event_tx.subscribe()
    }

    /// Start an outgoing call.
    ///
    /// Fails with [`CallError::Busy`] while a call or another invitation is
    /// active. Resolves a media token first - a provider failure aborts the
    /// operation before anything is put on the wire - then emits
    /// `send_call_invitation`, occupies the outgoing slot, and arms the local
    /// expiry timer. That timer is authoritative even if the remote peer
    /// never answers or the signaling event is lost.
    pub async fn send_invitation(
        &self,
        recipient_id: UserId,
        call_type: CallType,
        conversation_id: Option<ConversationId>,
        group_id: Option<String>,
        metadata: Option<serde_json::Value>,
    ) -> CallResult<CallInvitation> {
        let mut state = self.state.write().await;
        if state.is_in_call || state.has_active_invitation() {
            return Err(CallError::Busy);
        }

        let call_id = CallId::new();
        let channel_name = format!("media-{}", call_id.0);
        let token = self
            .tokens
            .get_token(&channel_name, TokenRole::Publisher)
            .await
            .map_err(|e| CallError::Token { reason: e.reason })?;

        let created_at = Utc::now();
        let expires_at = created_at
            + chrono::Duration::from_std(self.config.invite_timeout)
                .unwrap_or_else(|_| chrono::Duration::seconds(30));
        let invitation = CallInvitation {
            call_id: call_id.clone(),
            caller_id: self.local_user.clone(),
            recipient_id,
            call_type,
            status: CallStatus::Pending,
            conversation_id,
            group_id,
            channel_name,
            rtc_token: Some(token.token),
            metadata,
            created_at,
            expires_at,
        };

        self.transport
            .emit(ClientCommand::SendCallInvitation(invitation.to_invite()))
            .await?;

        state.outgoing = Some(invitation.clone());
        drop(state);

        self.arm_timeout(call_id.clone());
        info!(%call_id, "outgoing invitation sent");
        self.publish_state(&call_id, CallDirection::Outgoing, CallStatus::Pending, None);
        Ok(invitation)
    }

    /// Apply an inbound `call_invitation` event.
    ///
    /// The same invitation can arrive over more than one delivery channel
    /// (socket push and native call push); a re-delivery of the invitation
    /// already occupying the incoming slot is dropped, it is not a second
    /// call. While the presence gate is closed (unavailable or already in a
    /// call) a new invitation is auto-rejected with reason `busy` and nothing
    /// is published: a busy user must not be interrupted. Otherwise the
    /// invitation occupies the incoming slot, the expiry timer is armed, and
    /// subscribers are notified.
    pub async fn handle_invitation(&self, invite: CallInvite) {
        let call_id = invite.call_id.clone();
        let mut state = self.state.write().await;
        if state
            .incoming
            .as_ref()
            .is_some_and(|current| current.call_id == call_id)
        {
            drop(state);
            debug!(%call_id, "duplicate delivery of the current invitation, dropping");
            return;
        }
        if !state.is_available || state.is_in_call || state.has_active_invitation() {
            drop(state);
            debug!(%call_id, "busy, auto-rejecting inbound invitation");
            if let Err(error) = self
                .transport
                .emit(ClientCommand::RejectCall {
                    call_id: call_id.clone(),
                    reason: REASON_BUSY.to_string(),
                })
                .await
            {
                warn!(%call_id, %error, "failed to emit busy rejection");
            }
            return;
        }

        let invitation = CallInvitation::from_invite(invite);
        state.incoming = Some(invitation.clone());
        drop(state);

        self.arm_timeout(call_id.clone());
        info!(%call_id, caller = %invitation.caller_id, "incoming invitation ringing");
        let _ = self.event_tx.send(CallEvent::IncomingCall(invitation));
    }

    /// Accept the ringing incoming invitation.
    pub async fn accept(&self, call_id: &CallId) -> CallResult<()> {
        let mut state = self.state.write().await;
        let ringing = state
            .incoming
            .as_ref()
            .is_some_and(|invitation| &invitation.call_id == call_id && invitation.is_active());
        if !ringing {
            return Err(CallError::NoActiveInvitation {
                call_id: call_id.clone(),
            });
        }

        self.transport
            .emit(ClientCommand::AcceptCall {
                call_id: call_id.clone(),
            })
            .await?;

        if let Some(invitation) = state.incoming.as_mut() {
            invitation.status = CallStatus::Accepted;
        }
        state.is_in_call = true;
        drop(state);

        self.cancel_timer(call_id);
        info!(%call_id, "call accepted");
        self.publish_state(call_id, CallDirection::Incoming, CallStatus::Accepted, None);
        Ok(())
    }

    /// Reject the ringing incoming invitation.
    pub async fn reject(&self, call_id: &CallId, reason: Option<String>) -> CallResult<()> {
        let reason = reason.unwrap_or_else(|| REASON_USER_DECLINED.to_string());
        let mut state = self.state.write().await;
        let ringing = state
            .incoming
            .as_ref()
            .is_some_and(|invitation| &invitation.call_id == call_id && invitation.is_active());
        if !ringing {
            return Err(CallError::NoActiveInvitation {
                call_id: call_id.clone(),
            });
        }

        self.transport
            .emit(ClientCommand::RejectCall {
                call_id: call_id.clone(),
                reason: reason.clone(),
            })
            .await?;

        state.incoming = None;
        drop(state);

        self.cancel_timer(call_id);
        info!(%call_id, %reason, "call rejected locally");
        self.publish_state(
            call_id,
            CallDirection::Incoming,
            CallStatus::Rejected,
            Some(reason),
        );
        Ok(())
    }

    /// Cancel the pending outgoing invitation.
    pub async fn cancel(&self, call_id: &CallId) -> CallResult<()> {
        let mut state = self.state.write().await;
        let pending = state
            .outgoing
            .as_ref()
            .is_some_and(|invitation| &invitation.call_id == call_id && invitation.is_active());
        if !pending {
            return Err(CallError::NoActiveInvitation {
                call_id: call_id.clone(),
            });
        }

        self.transport
            .emit(ClientCommand::CancelCall {
                call_id: call_id.clone(),
            })
            .await?;

        state.outgoing = None;
        drop(state);

        self.cancel_timer(call_id);
        info!(%call_id, "outgoing invitation cancelled");
        self.publish_state(call_id, CallDirection::Outgoing, CallStatus::Cancelled, None);
        Ok(())
    }

    /// End the active call and clear both invitation slots.
    ///
    /// Hang-up signaling belongs to the media layer; no transport event is
    /// emitted here.
    pub async fn end_call(&self, call_id: &CallId) {
        let mut state = self.state.write().await;
        state.is_in_call = false;
        let outgoing = state.outgoing.take();
        let incoming = state.incoming.take();
        drop(state);

        for invitation in outgoing.iter().chain(incoming.iter()) {
            self.cancel_timer(&invitation.call_id);
        }
        info!(%call_id, "call ended");
        let _ = self.event_tx.send(CallEvent::CallEnded {
            call_id: call_id.clone(),
        });
    }

    /// Apply a remote `call_accepted` event for our outgoing invitation.
    pub async fn handle_remote_accepted(&self, call_id: CallId) {
        let mut state = self.state.write().await;
        let pending = state
            .outgoing
            .as_ref()
            .is_some_and(|invitation| invitation.call_id == call_id && invitation.is_active());
        if !pending {
            drop(state);
            debug!(%call_id, "stale call_accepted, dropping");
            return;
        }
        if let Some(invitation) = state.outgoing.as_mut() {
            invitation.status = CallStatus::Accepted;
        }
        state.is_in_call = true;
        drop(state);

        self.cancel_timer(&call_id);
        info!(%call_id, "remote accepted our call");
        self.publish_state(&call_id, CallDirection::Outgoing, CallStatus::Accepted, None);
    }

    /// Apply a remote `call_rejected` event for our outgoing invitation.
    pub async fn handle_remote_rejected(&self, call_id: CallId, reason: String) {
        let mut state = self.state.write().await;
        let pending = state
            .outgoing
            .as_ref()
            .is_some_and(|invitation| invitation.call_id == call_id && invitation.is_active());
        if !pending {
            drop(state);
            debug!(%call_id, "stale call_rejected, dropping");
            return;
        }
        state.outgoing = None;
        drop(state);

        self.cancel_timer(&call_id);
        info!(%call_id, %reason, "remote rejected our call");
        self.publish_state(
            &call_id,
            CallDirection::Outgoing,
            CallStatus::Rejected,
            Some(reason),
        );
    }

    /// Apply a remote `call_cancelled` event for our incoming invitation.
    pub async fn handle_remote_cancelled(&self, call_id: CallId) {
        let mut state = self.state.write().await;
        let ringing = state
            .incoming
            .as_ref()
            .is_some_and(|invitation| invitation.call_id == call_id && invitation.is_active());
        if !ringing {
            drop(state);
            debug!(%call_id, "stale call_cancelled, dropping");
            return;
        }
        state.incoming = None;
        drop(state);

        self.cancel_timer(&call_id);
        info!(%call_id, "caller cancelled the invitation");
        self.publish_state(&call_id, CallDirection::Incoming, CallStatus::Cancelled, None);
    }

    /// Apply a timeout, whether the local timer fired or the remote
    /// `call_timeout` event arrived first. Both paths converge here; the
    /// state lock makes the first writer win and the second a no-op.
    pub async fn apply_timeout(&self, call_id: CallId) {
        let mut state = self.state.write().await;
        let outgoing_pending = state
            .outgoing
            .as_ref()
            .is_some_and(|invitation| invitation.call_id == call_id && invitation.is_active());
        let incoming_ringing = state
            .incoming
            .as_ref()
            .is_some_and(|invitation| invitation.call_id == call_id && invitation.is_active());

        let (direction, missed) = if outgoing_pending {
            state.outgoing = None;
            (CallDirection::Outgoing, None)
        } else if incoming_ringing {
            let missed = state.incoming.take().map(|mut invitation| {
                invitation.status = CallStatus::Timeout;
                invitation
            });
            if let Some(invitation) = &missed {
                state.missed_calls.push(invitation.clone());
            }
            (CallDirection::Incoming, missed)
        } else {
            drop(state);
            debug!(%call_id, "timeout for an inactive invitation, dropping");
            return;
        };
        drop(state);

        self.cancel_timer(&call_id);
        info!(%call_id, ?direction, "invitation timed out");
        self.publish_state(&call_id, direction, CallStatus::Timeout, None);
        if let Some(invitation) = missed {
            let _ = self.event_tx.send(CallEvent::MissedCall(invitation));
        }
    }

    /// Toggle the local user's availability ("do not disturb").
    pub async fn set_availability(&self, available: bool) {
        self.state.write().await.is_available = available;
    }

    /// Whether a new inbound call would currently ring.
    pub async fn can_receive_calls(&self) -> bool {
        let state = self.state.read().await;
        state.is_available && !state.is_in_call
    }

    /// Read-only snapshot of the call session state.
    pub async fn snapshot(&self) -> CallSessionSnapshot {
        let state = self.state.read().await;
        CallSessionSnapshot {
            outgoing: state.outgoing.clone(),
            incoming: state.incoming.clone(),
            is_in_call: state.is_in_call,
            is_available: state.is_available,
            missed_calls: state.missed_calls.clone(),
        }
    }

    /// Inbound invitations that expired unanswered, oldest first.
    pub async fn missed_calls(&self) -> Vec<CallInvitation> {
        self.state.read().await.missed_calls.clone()
    }

    /// Abort every armed timer. Called on session teardown so no timer fires
    /// into disposed state.
    pub fn teardown(&self) {
        self.timers.retain(|call_id, handle| {
            debug!(%call_id, "sweeping invitation timer");
            handle.abort();
            false
        });
    }

    fn arm_timeout(&self, call_id: CallId) {
        let this = self.clone();
        let timer_id = call_id.clone();
        let timeout = self.config.invite_timeout;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            // Deregister before applying so the shared path does not abort
            // the very task it is running on.
            this.timers.remove(&timer_id);
            this.apply_timeout(timer_id).await;
        });
        if let Some(previous) = self.timers.insert(call_id, handle) {
            previous.abort();
        }
    }

    /// Best-effort idempotent: cancelling an already-fired or already
    /// cancelled timer is a no-op.
    fn cancel_timer(&self, call_id: &CallId) {
        if let Some((_, handle)) = self.timers.remove(call_id) {
            handle.abort();
        }
    }

    fn publish_state(
        &self,
        call_id: &CallId,
        direction: CallDirection,
        status: CallStatus,
        reason: Option<String>,
    ) {
        let _ = self.event_tx.send(CallEvent::StateChanged {
            call_id: call_id.clone(),
            direction,
            status,
            reason,
        });
    }
}

impl std::fmt::Debug for CallCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallCoordinator")
            .field("local_user", &self.local_user)
            .field("armed_timers", &self.timers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duet_transport::mock::MockTransport;
    use crate::token::StaticTokenProvider;

    fn coordinator() -> (CallCoordinator, Arc<MockTransport>) {
        let transport = Arc::new(MockTransport::new());
        let coordinator = CallCoordinator::new(
            transport.clone(),
            Arc::new(StaticTokenProvider::new("tok")),
            UserId::from("u1"),
            CallConfig::default(),
        );
        (coordinator, transport)
    }

    #[tokio::test]
    async fn presence_gate_combines_availability_and_in_call() {
        let (coordinator, _) = coordinator();
        assert!(coordinator.can_receive_calls().await);

        coordinator.set_availability(false).await;
        assert!(!coordinator.can_receive_calls().await);

        coordinator.set_availability(true).await;
        coordinator.state.write().await.is_in_call = true;
        assert!(!coordinator.can_receive_calls().await);
    }

    #[tokio::test]
    async fn accept_without_invitation_fails() {
        let (coordinator, transport) = coordinator();
        let err = coordinator.accept(&CallId::from("nope")).await.unwrap_err();
        assert!(matches!(err, CallError::NoActiveInvitation { .. }));
        assert!(transport.emitted().is_empty());
    }

    #[tokio::test]
    async fn end_call_clears_all_slots() {
        let (coordinator, _) = coordinator();
        let invitation = coordinator
            .send_invitation(UserId::from("u2"), CallType::Audio, None, None, None)
            .await
            .unwrap();
        coordinator.end_call(&invitation.call_id).await;

        let snapshot = coordinator.snapshot().await;
        assert!(snapshot.outgoing.is_none());
        assert!(snapshot.incoming.is_none());
        assert!(!snapshot.is_in_call);
        assert!(coordinator.timers.is_empty());
    }
}
