//! Peer Connection Controller (C7): the transport state machine, negotiation
//! helper, and peer-vanished auto-restart.
//!
//! Grounded on `haven-gateway/src/connection.rs`'s callback-free, explicit-state
//! style and `haven-fast-transfer/src/sender.rs`'s `STATE_*` constants-as-enum
//! pattern. Timers (`disconnect_timer`, `restart_timer`) are modeled as
//! deadlines checked by [`Controller::poll`] rather than spawned tasks, so
//! the state machine is a pure function of `(state, now)` and can be driven
//! by a fake clock in tests; [`crate::session`] drives it from a real
//! `tokio::time::interval` in production.

use std::time::Duration;

use filedrop_types::signaling::{Candidate, Sdp};
use filedrop_types::{Clock, RoomId};

use crate::candidate_queue::CandidateQueue;
use crate::error::TransferError;
use crate::ports::PeerConnection;

/// Default low-water threshold for the data channel (§4.7.1).
pub const DEFAULT_LOW_WATER: u64 = 262_144;
/// §4.7.1: time after which a still-not-open data channel is a failure.
pub const OPEN_TIMEOUT: Duration = Duration::from_secs(30);
/// §4.7.2: grace period after a reported `disconnected` before surfacing
/// "peer went offline".
pub const DISCONNECT_GRACE: Duration = Duration::from_secs(4);
/// §4.7.3: delay before a sender recreates the connection after the peer
/// vanishes.
pub const RESTART_DELAY: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Initiator,
    Responder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    Negotiating,
    Connected,
    Disconnected,
    Recovering,
    Closed,
}

/// A connection-state report from the transport layer, fed in by the
/// embedder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportedState {
    Connected,
    Disconnected,
    Failed,
}

/// Emitted by [`Controller::poll`] or the `on_*` handlers when the
/// orchestrator needs to act (send an offer, surface an error, restart).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerEvent {
    PeerWentOffline,
    OpenTimedOut,
    RestartRequested { room: RoomId },
}

#[derive(Debug, Clone, Default)]
struct LifecycleFlags {
    intentional_close: bool,
    transfer_complete: bool,
    ever_connected: bool,
    restarting_for_peer: bool,
}

pub struct Controller {
    state: ConnectionState,
    role: Option<Role>,
    room: Option<RoomId>,
    flags: LifecycleFlags,
    clock: std::sync::Arc<dyn Clock>,
    negotiating_since: Option<std::time::Instant>,
    disconnect_deadline: Option<std::time::Instant>,
    restart_deadline: Option<std::time::Instant>,
    /// Bumped on every reset so a deadline computed before a reset never
    /// fires after it (`resetConnection` must unhook every callback, §4.7.2).
    generation: u64,
    /// C6: buffers candidates that arrive before the remote description is
    /// set, per §4.7.4.
    candidates: CandidateQueue,
}

impl Controller {
    pub fn new(clock: std::sync::Arc<dyn Clock>) -> Self {
        Self {
            state: ConnectionState::Idle,
            role: None,
            room: None,
            flags: LifecycleFlags::default(),
            clock,
            negotiating_since: None,
            disconnect_deadline: None,
            restart_deadline: None,
            generation: 0,
            candidates: CandidateQueue::new(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn setup(&mut self, room: RoomId, role: Role) {
        self.room = Some(room);
        self.role = Some(role);
        self.state = ConnectionState::Negotiating;
        self.negotiating_since = Some(self.clock.now());
        self.candidates.reset();
    }

    /// §4.7.4 initiator path: create a local offer, apply it as the local
    /// description, and hand it back to the caller to emit as an `offer`
    /// signaling event.
    pub async fn create_offer(&mut self, pc: &(dyn PeerConnection)) -> Result<Sdp, TransferError> {
        let offer = pc.create_offer().await?;
        pc.set_local_description(offer.clone()).await?;
        Ok(offer)
    }

    /// §4.7.4 responder path: apply the incoming offer as the remote
    /// description, drain any candidates buffered ahead of it, then create
    /// and apply a local answer for the caller to emit back.
    pub async fn on_offer(&mut self, sdp: Sdp, pc: &(dyn PeerConnection)) -> Result<Sdp, TransferError> {
        pc.set_remote_description(sdp).await?;
        self.drain_candidates(pc).await?;

        let answer = pc.create_answer().await?;
        pc.set_local_description(answer.clone()).await?;
        Ok(answer)
    }

    /// §4.7.4 initiator path: apply the incoming answer as the remote
    /// description and drain any candidates buffered ahead of it.
    pub async fn on_answer(&mut self, sdp: Sdp, pc: &(dyn PeerConnection)) -> Result<(), TransferError> {
        pc.set_remote_description(sdp).await?;
        self.drain_candidates(pc).await
    }

    /// C6: applies `candidate` immediately if the remote description is
    /// already set, otherwise buffers it for [`Controller::drain_candidates`].
    pub async fn on_candidate(&mut self, candidate: Candidate, pc: &(dyn PeerConnection)) -> Result<(), TransferError> {
        match self.candidates.offer(candidate) {
            Some(candidate) => pc.add_ice_candidate(candidate).await,
            None => Ok(()),
        }
    }

    async fn drain_candidates(&mut self, pc: &(dyn PeerConnection)) -> Result<(), TransferError> {
        for candidate in self.candidates.drain() {
            pc.add_ice_candidate(candidate).await?;
        }
        Ok(())
    }

    /// §4.7.2/§4.7.3: feed a transport-reported connection state in.
    pub fn on_connection_state(&mut self, reported: ReportedState, tab_visible: bool) -> Vec<ControllerEvent> {
        let now = self.clock.now();
        let mut events = Vec::new();
        match reported {
            ReportedState::Connected => {
                self.state = ConnectionState::Connected;
                self.flags.ever_connected = true;
                self.disconnect_deadline = None;
            }
            ReportedState::Disconnected => {
                if self.state == ConnectionState::Connected
                    && !self.flags.intentional_close
                    && !self.flags.transfer_complete
                    && tab_visible
                {
                    self.state = ConnectionState::Disconnected;
                    self.disconnect_deadline = Some(now + DISCONNECT_GRACE);
                }
            }
            ReportedState::Failed => {
                if self.should_auto_restart() {
                    events.extend(self.schedule_restart(now));
                }
            }
        }
        events
    }

    /// §4.7.3: also triggered by a data-channel `close` event, not just a
    /// `failed` connection state.
    pub fn on_data_channel_closed(&mut self) -> Vec<ControllerEvent> {
        if self.should_auto_restart() {
            self.schedule_restart(self.clock.now())
        } else {
            Vec::new()
        }
    }

    fn should_auto_restart(&self) -> bool {
        self.role == Some(Role::Initiator)
            && self.flags.ever_connected
            && !self.flags.transfer_complete
            && !self.flags.restarting_for_peer
    }

    fn schedule_restart(&mut self, now: std::time::Instant) -> Vec<ControllerEvent> {
        self.flags.restarting_for_peer = true;
        self.restart_deadline = Some(now + RESTART_DELAY);
        Vec::new()
    }

    /// Call on a timer tick (or before acting on a deadline) to collect
    /// events for deadlines that have elapsed.
    pub fn poll(&mut self, now: std::time::Instant) -> Vec<ControllerEvent> {
        let mut events = Vec::new();

        if let Some(deadline) = self.disconnect_deadline {
            if now >= deadline && self.state == ConnectionState::Disconnected {
                events.push(ControllerEvent::PeerWentOffline);
                self.disconnect_deadline = None;
            }
        }

        if self.state == ConnectionState::Negotiating {
            if let Some(since) = self.negotiating_since {
                let can_time_out = self.role == Some(Role::Responder) || self.flags.ever_connected;
                if can_time_out && now.saturating_duration_since(since) >= OPEN_TIMEOUT {
                    events.push(ControllerEvent::OpenTimedOut);
                    self.negotiating_since = None;
                }
            }
        }

        if let Some(deadline) = self.restart_deadline {
            if now >= deadline {
                self.restart_deadline = None;
                if let Some(room) = self.room.clone() {
                    self.reset_connection();
                    self.role = Some(Role::Initiator);
                    self.room = Some(room.clone());
                    self.state = ConnectionState::Negotiating;
                    self.negotiating_since = Some(now);
                    self.flags.restarting_for_peer = false;
                    events.push(ControllerEvent::RestartRequested { room });
                }
            }
        }

        events
    }

    /// §4.7.2: unhooks every callback before closing, suppressing benign
    /// close/error events during teardown. Modeled here by bumping
    /// `generation` and clearing every deadline.
    pub fn reset_connection(&mut self) {
        self.generation += 1;
        self.disconnect_deadline = None;
        self.negotiating_since = None;
        self.state = ConnectionState::Recovering;
        self.candidates.reset();
    }

    pub fn close(&mut self, intentional: bool) {
        self.flags.intentional_close = intentional;
        self.reset_connection();
        self.state = ConnectionState::Closed;
    }

    pub fn mark_transfer_complete(&mut self) {
        self.flags.transfer_complete = true;
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filedrop_types::FakeClock;
    use std::sync::{Arc, Mutex};

    fn room() -> RoomId {
        RoomId::parse("r1").unwrap()
    }

    /// Records calls and hands back canned SDP, for exercising the
    /// negotiation methods without a real `RTCPeerConnection`.
    #[derive(Default)]
    struct FakePeerConnection {
        local_descriptions: Mutex<Vec<Sdp>>,
        remote_descriptions: Mutex<Vec<Sdp>>,
        added_candidates: Mutex<Vec<Candidate>>,
    }

    #[async_trait::async_trait]
    impl PeerConnection for FakePeerConnection {
        async fn create_offer(&self) -> Result<Sdp, TransferError> {
            Ok(serde_json::json!({"type": "offer", "sdp": "offer-sdp"}))
        }

        async fn create_answer(&self) -> Result<Sdp, TransferError> {
            Ok(serde_json::json!({"type": "answer", "sdp": "answer-sdp"}))
        }

        async fn set_local_description(&self, sdp: Sdp) -> Result<(), TransferError> {
            self.local_descriptions.lock().unwrap().push(sdp);
            Ok(())
        }

        async fn set_remote_description(&self, sdp: Sdp) -> Result<(), TransferError> {
            self.remote_descriptions.lock().unwrap().push(sdp);
            Ok(())
        }

        async fn add_ice_candidate(&self, candidate: Candidate) -> Result<(), TransferError> {
            self.added_candidates.lock().unwrap().push(candidate);
            Ok(())
        }
    }

    #[tokio::test]
    async fn create_offer_sets_local_description_and_returns_it() {
        let clock = Arc::new(FakeClock::new());
        let mut c = Controller::new(clock.clone());
        c.setup(room(), Role::Initiator);
        let pc = FakePeerConnection::default();

        let offer = c.create_offer(&pc).await.unwrap();
        assert_eq!(offer, serde_json::json!({"type": "offer", "sdp": "offer-sdp"}));
        assert_eq!(pc.local_descriptions.lock().unwrap().as_slice(), &[offer]);
    }

    #[tokio::test]
    async fn on_offer_drains_queued_candidates_before_answering() {
        let clock = Arc::new(FakeClock::new());
        let mut c = Controller::new(clock.clone());
        c.setup(room(), Role::Responder);
        let pc = FakePeerConnection::default();

        let early = serde_json::json!({"candidate": "early"});
        c.on_candidate(early.clone(), &pc).await.unwrap();
        assert!(pc.added_candidates.lock().unwrap().is_empty(), "buffered, not applied yet");

        let offer = serde_json::json!({"type": "offer", "sdp": "x"});
        let answer = c.on_offer(offer.clone(), &pc).await.unwrap();

        assert_eq!(pc.remote_descriptions.lock().unwrap().as_slice(), &[offer]);
        assert_eq!(pc.added_candidates.lock().unwrap().as_slice(), &[early]);
        assert_eq!(answer, serde_json::json!({"type": "answer", "sdp": "answer-sdp"}));
        assert_eq!(pc.local_descriptions.lock().unwrap().as_slice(), &[answer]);
    }

    #[tokio::test]
    async fn candidate_after_remote_description_bypasses_the_queue() {
        let clock = Arc::new(FakeClock::new());
        let mut c = Controller::new(clock.clone());
        c.setup(room(), Role::Initiator);
        let pc = FakePeerConnection::default();

        let answer = serde_json::json!({"type": "answer", "sdp": "x"});
        c.on_answer(answer, &pc).await.unwrap();

        let late = serde_json::json!({"candidate": "late"});
        c.on_candidate(late.clone(), &pc).await.unwrap();
        assert_eq!(pc.added_candidates.lock().unwrap().as_slice(), &[late]);
    }

    #[test]
    fn connected_then_disconnect_arms_grace_timer() {
        let clock = Arc::new(FakeClock::new());
        let mut c = Controller::new(clock.clone());
        c.setup(room(), Role::Responder);
        c.on_connection_state(ReportedState::Connected, true);
        assert_eq!(c.state(), ConnectionState::Connected);

        c.on_connection_state(ReportedState::Disconnected, true);
        assert_eq!(c.state(), ConnectionState::Disconnected);

        assert!(c.poll(clock.now()).is_empty());
        clock.advance(DISCONNECT_GRACE + Duration::from_millis(1));
        let events = c.poll(clock.now());
        assert_eq!(events, vec![ControllerEvent::PeerWentOffline]);
    }

    #[test]
    fn disconnect_ignored_while_tab_hidden() {
        let clock = Arc::new(FakeClock::new());
        let mut c = Controller::new(clock.clone());
        c.setup(room(), Role::Responder);
        c.on_connection_state(ReportedState::Connected, true);
        c.on_connection_state(ReportedState::Disconnected, false);
        assert_eq!(c.state(), ConnectionState::Connected);
    }

    #[test]
    fn initiator_auto_restarts_after_failed_once_connected() {
        let clock = Arc::new(FakeClock::new());
        let mut c = Controller::new(clock.clone());
        c.setup(room(), Role::Initiator);
        c.on_connection_state(ReportedState::Connected, true);
        c.on_connection_state(ReportedState::Failed, true);

        clock.advance(RESTART_DELAY + Duration::from_millis(1));
        let events = c.poll(clock.now());
        assert_eq!(events, vec![ControllerEvent::RestartRequested { room: room() }]);
        assert_eq!(c.state(), ConnectionState::Negotiating);
    }

    #[test]
    fn no_restart_if_never_connected() {
        let clock = Arc::new(FakeClock::new());
        let mut c = Controller::new(clock.clone());
        c.setup(room(), Role::Initiator);
        c.on_connection_state(ReportedState::Failed, true);
        clock.advance(RESTART_DELAY + Duration::from_millis(1));
        assert!(c.poll(clock.now()).is_empty());
    }

    #[test]
    fn responder_open_timeout_fires_without_ever_connected() {
        let clock = Arc::new(FakeClock::new());
        let mut c = Controller::new(clock.clone());
        c.setup(room(), Role::Responder);
        clock.advance(OPEN_TIMEOUT + Duration::from_millis(1));
        let events = c.poll(clock.now());
        assert_eq!(events, vec![ControllerEvent::OpenTimedOut]);
    }
}
