//! Session Orchestrator (C10): wires the signaling events (C5), the Peer
//! Connection Controller (C7), the send/receive pipelines (C8/C9), and the
//! [`Presenter`] into the one state machine an embedder drives end to end.
//!
//! Grounded on `haven-gateway/src/connection.rs::handle_connection`'s wiring
//! style (one value owning the pieces a connection needs, reacting to
//! inbound events). SDP creation itself is delegated to [`Controller`]
//! through a [`PeerConnection`] port the embedder supplies; this module owns
//! the *when* and *whether* and turns Controller output into outbound
//! [`ClientEvent`]s.

use std::sync::Arc;
use std::time::{Duration, Instant};

use filedrop_types::signaling::{Candidate, Sdp};
use filedrop_types::{Clock, ClientEvent, PeerHandle, RoomId};
use tokio::sync::mpsc;

use crate::controller::{Controller, Role};
use crate::error::TransferError;
use crate::ports::{PeerConnection, Presenter};

/// §4.10: delay between observing `peer-joined` and creating the offer, so
/// the receiver has time to install its peer connection after `room-joined`.
pub const OFFER_DELAY: Duration = Duration::from_millis(600);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    CreateOffer { room: RoomId },
    /// Reconnection reassertion (§4.10 last bullet).
    ReassertJoin { room: RoomId },
    ReassertCreate { room: RoomId },
}

pub struct Session {
    role: Option<Role>,
    room: Option<RoomId>,
    last_joined_peer: Option<PeerHandle>,
    offer_created_for_room: Option<RoomId>,
    offer_deadline: Option<Instant>,
    clock: Arc<dyn Clock>,
    controller: Controller,
    presenter: Arc<dyn Presenter>,
    outgoing: mpsc::UnboundedSender<ClientEvent>,
}

impl Session {
    pub fn new(clock: Arc<dyn Clock>, presenter: Arc<dyn Presenter>, outgoing: mpsc::UnboundedSender<ClientEvent>) -> Self {
        let controller = Controller::new(clock.clone());
        Self {
            role: None,
            room: None,
            last_joined_peer: None,
            offer_created_for_room: None,
            offer_deadline: None,
            clock,
            controller,
            presenter,
            outgoing,
        }
    }

    /// Sender on file selection (§4.10): generate a room, install the
    /// controller as initiator, emit `create-room`, and show the share link.
    pub fn start_as_sender(&mut self) -> RoomId {
        let room = RoomId::generate();
        self.role = Some(Role::Initiator);
        self.room = Some(room.clone());
        self.controller.setup(room.clone(), Role::Initiator);

        let _ = self.outgoing.send(ClientEvent::CreateRoom { room_id: room.clone() });
        self.presenter.status(&format!("share this link to start sending: ?room={room}"));
        room
    }

    /// Receiver on page load with `?room=...` (§4.10): install the
    /// controller as responder and emit `request-join`.
    pub fn start_as_receiver(&mut self, room: RoomId) {
        self.role = Some(Role::Responder);
        self.room = Some(room.clone());
        self.controller.setup(room.clone(), Role::Responder);

        let _ = self.outgoing.send(ClientEvent::RequestJoin { room_id: room });
        self.presenter.status("waiting for the sender to approve your join request");
    }

    pub fn role(&self) -> Option<Role> {
        self.role
    }

    pub fn room(&self) -> Option<&RoomId> {
        self.room.as_ref()
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    /// Sender on `peer-joined`: arms the offer-creation deadline, clearing
    /// the per-room guard first if this is a different receiver than last
    /// time (so a reconnecting receiver gets a fresh offer).
    pub fn on_peer_joined(&mut self, peer: PeerHandle, room: &RoomId) {
        if self.last_joined_peer != Some(peer) {
            self.offer_created_for_room = None;
        }
        self.last_joined_peer = Some(peer);

        if self.offer_created_for_room.as_ref() == Some(room) {
            return;
        }
        self.offer_deadline = Some(self.clock.now() + OFFER_DELAY);
    }

    /// Sender on `peer-join-request` (§4.10): surface the approval prompt.
    /// The caller relays the accept/reject decision back via
    /// [`Session::accept_peer`]/[`Session::reject_peer`].
    pub fn on_peer_join_request(&self, peer: PeerHandle, room: &RoomId) {
        self.presenter.approval_prompt(peer.to_string(), room.to_string());
    }

    pub fn accept_peer(&self, peer: PeerHandle, room: RoomId) {
        let _ = self.outgoing.send(ClientEvent::PeerAccepted { room_id: room, peer_id: peer });
    }

    pub fn reject_peer(&self, peer: PeerHandle, room: RoomId) {
        let _ = self.outgoing.send(ClientEvent::PeerRejected { room_id: room, peer_id: peer });
    }

    /// Drives the offer-creation deadline. Call on every timer tick.
    pub fn poll(&mut self, now: Instant) -> Option<SessionEvent> {
        let deadline = self.offer_deadline?;
        if now < deadline {
            return None;
        }
        self.offer_deadline = None;
        let room = self.room.clone()?;
        self.offer_created_for_room = Some(room.clone());
        Some(SessionEvent::CreateOffer { room })
    }

    /// §4.10 last bullet: on transport reconnect, reassert room membership.
    pub fn on_socket_reconnect(&self, room_still_exists: bool) -> Option<SessionEvent> {
        let room = self.room.clone()?;
        match self.role? {
            Role::Responder => Some(SessionEvent::ReassertJoin { room }),
            Role::Initiator if room_still_exists => Some(SessionEvent::ReassertJoin { room }),
            Role::Initiator => Some(SessionEvent::ReassertCreate { room }),
        }
    }

    /// §4.7.4 initiator path: create a local offer through the controller
    /// and emit it as an `offer` signaling event.
    pub async fn create_offer(&mut self, pc: &dyn PeerConnection) -> Result<(), TransferError> {
        let room = self.room.clone().ok_or_else(|| TransferError::Negotiation("no room installed".into()))?;
        let sdp = self.controller.create_offer(pc).await?;
        let _ = self.outgoing.send(ClientEvent::Offer { offer: sdp, room_id: room });
        Ok(())
    }

    /// §4.7.4 responder path: apply the incoming offer and emit the answer
    /// the controller produces.
    pub async fn on_offer(&mut self, sdp: Sdp, pc: &dyn PeerConnection) -> Result<(), TransferError> {
        let room = self.room.clone().ok_or_else(|| TransferError::Negotiation("no room installed".into()))?;
        let answer = self.controller.on_offer(sdp, pc).await?;
        let _ = self.outgoing.send(ClientEvent::Answer { answer, room_id: room });
        Ok(())
    }

    /// §4.7.4 initiator path: apply the incoming answer.
    pub async fn on_answer(&mut self, sdp: Sdp, pc: &dyn PeerConnection) -> Result<(), TransferError> {
        self.controller.on_answer(sdp, pc).await
    }

    pub async fn on_candidate(&mut self, candidate: Candidate, pc: &dyn PeerConnection) -> Result<(), TransferError> {
        self.controller.on_candidate(candidate, pc).await
    }

    /// C8/C9 wiring: the send/receive pipeline signals completion, which
    /// disarms the controller's peer-vanished auto-restart (§4.7.3).
    pub fn on_transfer_complete(&mut self) {
        self.controller.mark_transfer_complete();
    }

    /// On `beforeunload`/page hide (§4.10): mark the close as intentional and
    /// tear down the controller and any armed timers, so no reconnection or
    /// restart logic fires after the tab is gone.
    pub fn on_unload(&mut self) {
        self.controller.close(true);
        self.offer_deadline = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::NullPresenter;
    use filedrop_types::FakeClock;

    fn session() -> (Session, Arc<FakeClock>, mpsc::UnboundedReceiver<ClientEvent>) {
        let clock = Arc::new(FakeClock::new());
        let (tx, rx) = mpsc::unbounded_channel();
        (Session::new(clock.clone(), Arc::new(NullPresenter), tx), clock, rx)
    }

    #[test]
    fn peer_joined_schedules_offer_after_delay() {
        let (mut session, clock, mut outgoing) = session();
        let room = session.start_as_sender();
        assert!(matches!(outgoing.try_recv(), Ok(ClientEvent::CreateRoom { .. })));
        let peer = PeerHandle::new();

        session.on_peer_joined(peer, &room);
        assert_eq!(session.poll(clock.now()), None);

        clock.advance(OFFER_DELAY + Duration::from_millis(1));
        assert_eq!(session.poll(clock.now()), Some(SessionEvent::CreateOffer { room: room.clone() }));
        // Guard prevents re-firing for the same peer/room.
        assert_eq!(session.poll(clock.now()), None);
    }

    #[test]
    fn new_receiver_clears_guard_for_fresh_offer() {
        let (mut session, clock, _outgoing) = session();
        let room = session.start_as_sender();
        let first_peer = PeerHandle::new();
        let second_peer = PeerHandle::new();

        session.on_peer_joined(first_peer, &room);
        clock.advance(OFFER_DELAY + Duration::from_millis(1));
        session.poll(clock.now());

        session.on_peer_joined(second_peer, &room);
        clock.advance(OFFER_DELAY + Duration::from_millis(1));
        assert_eq!(session.poll(clock.now()), Some(SessionEvent::CreateOffer { room }));
    }

    #[test]
    fn reconnect_reasserts_per_role() {
        let (mut responder, _clock, mut rx) = session();
        let room = RoomId::parse("r1").unwrap();
        responder.start_as_receiver(room.clone());
        assert!(matches!(rx.try_recv(), Ok(ClientEvent::RequestJoin { .. })));
        assert_eq!(responder.on_socket_reconnect(true), Some(SessionEvent::ReassertJoin { room: room.clone() }));

        let (mut sender, _clock2, _tx) = session();
        sender.start_as_sender();
        let sender_room = sender.room().unwrap().clone();
        assert_eq!(
            sender.on_socket_reconnect(false),
            Some(SessionEvent::ReassertCreate { room: sender_room })
        );
    }

    #[test]
    fn peer_join_request_prompts_and_accept_reject_emit() {
        let (session, _clock, mut rx) = session();
        let room = RoomId::parse("r1").unwrap();
        let peer = PeerHandle::new();

        session.on_peer_join_request(peer, &room);
        session.accept_peer(peer, room.clone());
        assert!(matches!(rx.try_recv(), Ok(ClientEvent::PeerAccepted { .. })));

        session.reject_peer(peer, room);
        assert!(matches!(rx.try_recv(), Ok(ClientEvent::PeerRejected { .. })));
    }

    #[test]
    fn unload_marks_intentional_close() {
        let (mut session, _clock, _rx) = session();
        session.start_as_sender();
        session.on_unload();
        assert_eq!(session.controller().state(), crate::controller::ConnectionState::Closed);
    }
}
