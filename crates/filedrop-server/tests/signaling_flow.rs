//! End-to-end signaling-protocol test: two real WebSocket clients talk to a
//! loopback-bound instance of the router built by [`filedrop_server::build_router`],
//! driving the full create-room/request-join/peer-accepted/offer/answer/candidate
//! sequence the way a sender and receiver tab would.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use filedrop_gateway::dispatcher::Dispatcher;
use filedrop_gateway::pending::PendingJoins;
use filedrop_gateway::{GatewayState, PayloadGuard, RateLimiter, RoomRegistry};
use filedrop_server::build_router;
use filedrop_types::{ClientEvent, RoomId, RuntimeConfig, ServerEvent, SystemClock};

async fn spawn_server() -> String {
    let clock: Arc<dyn filedrop_types::Clock> = Arc::new(SystemClock);
    let registry = RoomRegistry::new(2, Duration::from_secs(1800), clock.clone());
    let gateway = GatewayState {
        registry,
        pending: PendingJoins::new(),
        dispatcher: Dispatcher::new(),
        rate_limiter: RateLimiter::new(Duration::from_secs(1), 100, clock),
        payload_guard: PayloadGuard::new(65_536),
    };
    let app = build_router(gateway, Arc::new(RuntimeConfig::default()), &[]);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app.into_make_service()).await.unwrap();
    });
    format!("ws://{addr}/ws")
}

async fn recv_event(ws: &mut (impl StreamExt<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin)) -> ServerEvent {
    loop {
        match ws.next().await.expect("socket closed before event").unwrap() {
            Message::Text(text) => return serde_json::from_str(&text).unwrap(),
            _ => continue,
        }
    }
}

async fn send_event(
    ws: &mut (impl SinkExt<Message, Error = tokio_tungstenite::tungstenite::Error> + Unpin),
    event: &ClientEvent,
) {
    let text = serde_json::to_string(event).unwrap();
    ws.send(Message::Text(text.into())).await.unwrap();
}

#[tokio::test]
async fn full_room_and_negotiation_round_trip() {
    let url = spawn_server().await;

    let (mut sender_ws, _) = connect_async(&url).await.unwrap();
    let (mut receiver_ws, _) = connect_async(&url).await.unwrap();

    let room = RoomId::parse("e2e-room").unwrap();

    send_event(&mut sender_ws, &ClientEvent::CreateRoom { room_id: room.clone() }).await;
    assert!(matches!(
        recv_event(&mut sender_ws).await,
        ServerEvent::RoomCreated { room_id } if room_id == room
    ));

    send_event(&mut receiver_ws, &ClientEvent::RequestJoin { room_id: room.clone() }).await;
    let peer_id = match recv_event(&mut sender_ws).await {
        ServerEvent::PeerJoinRequest { peer_id, room_id } => {
            assert_eq!(room_id, room);
            peer_id
        }
        other => panic!("expected PeerJoinRequest, got {other:?}"),
    };
    assert!(matches!(recv_event(&mut receiver_ws).await, ServerEvent::JoinRequested { .. }));

    send_event(&mut sender_ws, &ClientEvent::PeerAccepted { room_id: room.clone(), peer_id }).await;
    assert!(matches!(recv_event(&mut receiver_ws).await, ServerEvent::PeerJoined { .. }));
    assert!(matches!(recv_event(&mut receiver_ws).await, ServerEvent::RoomJoined { .. }));

    let sdp = serde_json::json!({"type": "offer", "sdp": "v=0"});
    send_event(&mut sender_ws, &ClientEvent::Offer { offer: sdp.clone(), room_id: room.clone() }).await;
    match recv_event(&mut receiver_ws).await {
        ServerEvent::Offer { offer, room_id, .. } => {
            assert_eq!(offer, sdp);
            assert_eq!(room_id, room);
        }
        other => panic!("expected Offer, got {other:?}"),
    }

    let answer_sdp = serde_json::json!({"type": "answer", "sdp": "v=0"});
    send_event(&mut receiver_ws, &ClientEvent::Answer { answer: answer_sdp.clone(), room_id: room.clone() }).await;
    assert!(matches!(recv_event(&mut sender_ws).await, ServerEvent::Answer { .. }));

    let candidate = serde_json::json!({"candidate": "foo"});
    send_event(&mut sender_ws, &ClientEvent::Candidate { candidate, room_id: room.clone() }).await;
    assert!(matches!(recv_event(&mut receiver_ws).await, ServerEvent::Candidate { .. }));
}

#[tokio::test]
async fn rejecting_a_join_request_notifies_only_the_requester() {
    let url = spawn_server().await;

    let (mut sender_ws, _) = connect_async(&url).await.unwrap();
    let (mut receiver_ws, _) = connect_async(&url).await.unwrap();
    let room = RoomId::parse("e2e-reject").unwrap();

    send_event(&mut sender_ws, &ClientEvent::CreateRoom { room_id: room.clone() }).await;
    recv_event(&mut sender_ws).await;

    send_event(&mut receiver_ws, &ClientEvent::RequestJoin { room_id: room.clone() }).await;
    let peer_id = match recv_event(&mut sender_ws).await {
        ServerEvent::PeerJoinRequest { peer_id, .. } => peer_id,
        other => panic!("expected PeerJoinRequest, got {other:?}"),
    };
    recv_event(&mut receiver_ws).await;

    send_event(&mut sender_ws, &ClientEvent::PeerRejected { room_id: room.clone(), peer_id }).await;
    assert!(matches!(recv_event(&mut receiver_ws).await, ServerEvent::PeerRejected { .. }));
}
