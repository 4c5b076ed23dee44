//! Per-peer outbound channels.
//!
//! Grounded on `haven-gateway/src/dispatcher.rs`'s `user_channels:
//! RwLock<HashMap<Uuid, mpsc::UnboundedSender<GatewayEvent>>>` pattern, minus
//! the broadcast/voice/presence machinery the chat app layers on top — the
//! signaling protocol never broadcasts outside a room, so every send here is
//! targeted.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};

use filedrop_types::{PeerHandle, ServerEvent};

#[derive(Clone, Default)]
pub struct Dispatcher {
    channels: Arc<RwLock<HashMap<PeerHandle, mpsc::UnboundedSender<ServerEvent>>>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, peer: PeerHandle) -> mpsc::UnboundedReceiver<ServerEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.channels.write().await.insert(peer, tx);
        rx
    }

    pub async fn unregister(&self, peer: PeerHandle) {
        self.channels.write().await.remove(&peer);
    }

    /// Sends to a single peer. Silently drops if the peer has disconnected —
    /// the signaling layer never treats a dead outbound channel as an error.
    pub async fn send_to(&self, peer: PeerHandle, event: ServerEvent) {
        let channels = self.channels.read().await;
        if let Some(tx) = channels.get(&peer) {
            let _ = tx.send(event);
        }
    }

    pub async fn send_to_many(&self, peers: &[PeerHandle], event: ServerEvent) {
        let channels = self.channels.read().await;
        for peer in peers {
            if let Some(tx) = channels.get(peer) {
                let _ = tx.send(event.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_to_unregistered_peer_is_silent() {
        let dispatcher = Dispatcher::new();
        dispatcher.send_to(PeerHandle::new(), ServerEvent::error("unreachable")).await;
    }

    #[tokio::test]
    async fn registered_peer_receives_event() {
        let dispatcher = Dispatcher::new();
        let peer = PeerHandle::new();
        let mut rx = dispatcher.register(peer).await;
        dispatcher.send_to(peer, ServerEvent::error("hi")).await;
        let got = rx.recv().await.unwrap();
        assert!(matches!(got, ServerEvent::AppError { .. }), "expected AppError, got {got:?}");
    }
}
