//! Signaling Server (C5): per-connection WebSocket handling and the
//! `create-room`/`request-join`/`join-room`/`peer-accepted`/`peer-rejected`/
//! `offer`/`answer`/`candidate` operation handlers.
//!
//! Grounded on `haven-gateway/src/connection.rs`'s split-socket
//! send/receive task pair torn down with `tokio::select!`, and
//! `haven-server/src/main.rs::ws_upgrade`'s `max_frame_size`/`max_message_size`
//! hardening (reused by `filedrop-server`'s route wiring).

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tracing::{info, warn};

use filedrop_types::{ClientEvent, PeerHandle, RoomId, ServerEvent};

use crate::dispatcher::Dispatcher;
use crate::pending::PendingJoins;
use crate::rate_limit::{PayloadGuard, RateLimiter};
use crate::registry::{CreateOutcome, JoinOutcome, RoomRegistry};

#[derive(Clone)]
pub struct GatewayState {
    pub registry: RoomRegistry,
    pub pending: PendingJoins,
    pub dispatcher: Dispatcher,
    pub rate_limiter: RateLimiter,
    pub payload_guard: PayloadGuard,
}

/// Drives one signaling WebSocket end to end: assigns a [`PeerHandle`],
/// relays dispatcher events out, dispatches client events in, and cleans up
/// on disconnect.
pub async fn handle_connection(socket: WebSocket, state: GatewayState) {
    let peer = PeerHandle::new();
    let (mut ws_tx, mut ws_rx) = socket.split();
    let mut outbound = state.dispatcher.register(peer).await;

    let mut send_task = tokio::spawn(async move {
        while let Some(event) = outbound.recv().await {
            let Ok(text) = serde_json::to_string(&event) else { continue };
            if ws_tx.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    let recv_state = state.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = ws_rx.next().await {
            match msg {
                Message::Text(text) => {
                    handle_text_message(&recv_state, peer, &text).await;
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    disconnect(&state, peer).await;
    info!(%peer, "signaling connection closed");
}

async fn handle_text_message(state: &GatewayState, peer: PeerHandle, text: &str) {
    let event: ClientEvent = match serde_json::from_str(text) {
        Ok(event) => event,
        Err(err) => {
            warn!(%peer, %err, "malformed signaling event");
            state.dispatcher.send_to(peer, ServerEvent::error("malformed event")).await;
            return;
        }
    };

    if let Some(envelope) = event.as_envelope() {
        if !state.payload_guard.check(text.len()) {
            state.dispatcher.send_to(peer, ServerEvent::error("payload too large")).await;
            return;
        }
        if !envelope.rate_limit_exempt() && !state.rate_limiter.check(peer).await {
            state.dispatcher.send_to(peer, ServerEvent::error("rate limit exceeded")).await;
            return;
        }
        relay_envelope(state, peer, envelope).await;
        return;
    }

    if !state.rate_limiter.check(peer).await {
        state.dispatcher.send_to(peer, ServerEvent::error("rate limit exceeded")).await;
        return;
    }

    match event {
        ClientEvent::CreateRoom { room_id } => create_room(state, peer, room_id).await,
        ClientEvent::RequestJoin { room_id } => request_join(state, peer, room_id).await,
        ClientEvent::JoinRoom { room_id } => join_room(state, peer, room_id).await,
        ClientEvent::PeerAccepted { room_id, peer_id } => peer_accepted(state, peer, room_id, peer_id).await,
        ClientEvent::PeerRejected { room_id, peer_id } => peer_rejected(state, peer, room_id, peer_id).await,
        ClientEvent::Offer { .. } | ClientEvent::Answer { .. } | ClientEvent::Candidate { .. } => unreachable!(
            "relayable variants are handled via as_envelope above"
        ),
    }
}

async fn create_room(state: &GatewayState, peer: PeerHandle, room_id: RoomId) {
    match state.registry.create(&room_id, peer).await {
        CreateOutcome::Created => {
            state.dispatcher.send_to(peer, ServerEvent::RoomCreated { room_id }).await;
        }
        CreateOutcome::Exists => {
            state.dispatcher.send_to(peer, ServerEvent::error("room already exists")).await;
        }
    }
}

async fn request_join(state: &GatewayState, peer: PeerHandle, room_id: RoomId) {
    let Some(members) = state.registry.members_of(&room_id).await else {
        state.dispatcher.send_to(peer, ServerEvent::RoomNotFound { room_id }).await;
        return;
    };
    if members.contains(&peer) {
        state.dispatcher.send_to(peer, ServerEvent::RoomJoined { room_id }).await;
        return;
    }
    state.pending.insert(peer, room_id.clone()).await;
    state
        .dispatcher
        .send_to_many(&members, ServerEvent::PeerJoinRequest { peer_id: peer, room_id: room_id.clone() })
        .await;
    state.dispatcher.send_to(peer, ServerEvent::JoinRequested { room_id }).await;
}

async fn join_room(state: &GatewayState, peer: PeerHandle, room_id: RoomId) {
    let Some(members) = state.registry.members_of(&room_id).await else {
        state.dispatcher.send_to(peer, ServerEvent::RoomNotFound { room_id }).await;
        return;
    };
    if members.contains(&peer) {
        state.dispatcher.send_to(peer, ServerEvent::RoomJoined { room_id }).await;
        return;
    }
    match state.registry.join(&room_id, peer).await {
        JoinOutcome::Joined => {
            state.pending.take_matching(peer, &room_id).await;
            state
                .dispatcher
                .send_to_many(&members, ServerEvent::PeerJoined { peer_id: peer, room_id: room_id.clone() })
                .await;
            state.dispatcher.send_to(peer, ServerEvent::RoomJoined { room_id }).await;
        }
        JoinOutcome::Full => {
            state.dispatcher.send_to(peer, ServerEvent::error("room is full")).await;
        }
        JoinOutcome::NotFound => {
            state.dispatcher.send_to(peer, ServerEvent::RoomNotFound { room_id }).await;
        }
        JoinOutcome::AlreadyMember => {
            state.dispatcher.send_to(peer, ServerEvent::RoomJoined { room_id }).await;
        }
    }
}

async fn peer_accepted(state: &GatewayState, accepter: PeerHandle, room_id: RoomId, target: PeerHandle) {
    if !state.registry.is_member(&room_id, accepter).await {
        state.dispatcher.send_to(accepter, ServerEvent::error("not a member of room")).await;
        return;
    }
    if state.pending.get(target).await.as_ref() != Some(&room_id) {
        state.dispatcher.send_to(accepter, ServerEvent::error("no pending join for peer")).await;
        return;
    }
    match state.registry.join(&room_id, target).await {
        JoinOutcome::Joined | JoinOutcome::AlreadyMember => {
            state.pending.take_matching(target, &room_id).await;
            let Some(members) = state.registry.members_of(&room_id).await else { return };
            let others: Vec<PeerHandle> = members.into_iter().filter(|p| *p != target).collect();
            state
                .dispatcher
                .send_to_many(&others, ServerEvent::PeerJoined { peer_id: target, room_id: room_id.clone() })
                .await;
            state.dispatcher.send_to(target, ServerEvent::RoomJoined { room_id }).await;
        }
        JoinOutcome::Full => {
            state.dispatcher.send_to(accepter, ServerEvent::error("room is full")).await;
        }
        JoinOutcome::NotFound => {
            state.dispatcher.send_to(accepter, ServerEvent::RoomNotFound { room_id }).await;
        }
    }
}

async fn peer_rejected(state: &GatewayState, rejecter: PeerHandle, room_id: RoomId, target: PeerHandle) {
    if !state.registry.is_member(&room_id, rejecter).await {
        state.dispatcher.send_to(rejecter, ServerEvent::error("not a member of room")).await;
        return;
    }
    if state.pending.take_matching(target, &room_id).await {
        state.dispatcher.send_to(target, ServerEvent::PeerRejected { peer_id: target, room_id }).await;
    }
}

async fn relay_envelope(state: &GatewayState, sender: PeerHandle, envelope: filedrop_types::SignalEnvelope) {
    let room = envelope.room().clone();
    let Some(members) = state.registry.members_of(&room).await else {
        state.dispatcher.send_to(sender, ServerEvent::RoomNotFound { room_id: room }).await;
        return;
    };
    if !members.contains(&sender) {
        state.dispatcher.send_to(sender, ServerEvent::error("not a member of room")).await;
        return;
    }
    let event = ServerEvent::relay(envelope, sender);
    for member in members.into_iter().filter(|p| *p != sender) {
        state.dispatcher.send_to(member, event.clone()).await;
    }
}

async fn disconnect(state: &GatewayState, peer: PeerHandle) {
    state.registry.leave(peer).await;
    state.pending.remove(peer).await;
    state.rate_limiter.forget(peer).await;
    state.dispatcher.unregister(peer).await;
}
