//! WebSocket control channel
//!
//! This module provides a WebSocket endpoint at `/api/ws` that:
//! - Greets clients with a `connected` message
//! - Dispatches control messages (offer, processing, view mode, teardown)
//! - Forwards state changes of the sessions a socket negotiated
//! - Tears those sessions down when the socket closes

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::control::{ControlConnection, ServerMessage};
use crate::error::AppError;
use crate::state::AppState;

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Serialize and send one message; false when the socket is gone
async fn send<S>(sender: &mut S, msg: &ServerMessage) -> bool
where
    S: SinkExt<Message> + Unpin,
{
    match msg.to_json() {
        Ok(json) => sender.send(Message::Text(json)).await.is_ok(),
        Err(e) => {
            warn!("Failed to serialize control message: {}", e);
            true
        }
    }
}

/// Handle WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let mut event_rx = state.events.subscribe();
    let mut shutdown_rx = state.shutdown_signal();
    let mut conn = ControlConnection::new();

    info!("Control client {} connected", conn.id());

    if !send(&mut sender, &ServerMessage::connected()).await {
        state.control.disconnect(conn);
        return;
    }

    // Heartbeat interval (30 seconds)
    let mut heartbeat_interval = tokio::time::interval(tokio::time::Duration::from_secs(30));

    loop {
        tokio::select! {
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(reply) = state.control.handle_text(&mut conn, &text).await {
                            if !send(&mut sender, &reply).await {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Binary(_))) => {
                        let err = AppError::BadRequest("binary frames are not supported".to_string());
                        if !send(&mut sender, &ServerMessage::error(&err)).await {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        break;
                    }
                    Some(Err(e)) => {
                        warn!("WebSocket receive error: {}", e);
                        break;
                    }
                    // WebSocket automatically handles ping/pong
                    Some(Ok(_)) => {}
                }
            }

            event = event_rx.recv() => {
                match event {
                    Ok(event) => {
                        if let Some(msg) = state.control.forward_event(&mut conn, &event) {
                            if !send(&mut sender, &msg).await {
                                break;
                            }
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("Control client {} lagged by {} events", conn.id(), n);
                    }
                    Err(_) => {
                        warn!("Event bus closed");
                        break;
                    }
                }
            }

            _ = shutdown_rx.recv() => {
                debug!("Closing control client {} for shutdown", conn.id());
                let _ = sender.send(Message::Close(None)).await;
                break;
            }

            _ = heartbeat_interval.tick() => {
                if sender.send(Message::Ping(vec![])).await.is_err() {
                    break;
                }
            }
        }
    }

    info!("Control client {} disconnected", conn.id());
    state.control.disconnect(conn);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AppConfig, ConfigStore};
    use crate::error::Result;
    use crate::landmark::backends::NoneDetectorFactory;
    use crate::landmark::DetectorOptions;
    use crate::pipeline::{ChannelFrameSource, FramePipeline};
    use crate::session::SessionBinder;
    use crate::webrtc::{Negotiator, SdpAnswer, SdpOffer};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::Value;
    use std::time::Duration;
    use tokio::net::TcpListener;
    use tokio_tungstenite::tungstenite::Message as WsMessage;

    #[derive(Default)]
    struct BindingNegotiator {
        pipelines: Mutex<Vec<FramePipeline>>,
    }

    #[async_trait]
    impl Negotiator for BindingNegotiator {
        async fn negotiate(&self, _offer: SdpOffer, binder: SessionBinder) -> Result<SdpAnswer> {
            let (_tx, source) = ChannelFrameSource::channel(1);
            if let Some(pipeline) = binder.bind(Box::new(source)) {
                self.pipelines.lock().push(pipeline);
            }
            Ok(SdpAnswer::new("v=0 test-answer"))
        }
    }

    async fn serve() -> (Arc<AppState>, String) {
        let (shutdown_tx, _) = broadcast::channel(1);
        let state = AppState::new(
            ConfigStore::in_memory(AppConfig::default()),
            Arc::new(NoneDetectorFactory::new(DetectorOptions::default())),
            Arc::new(BindingNegotiator::default()),
            shutdown_tx,
        );
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = crate::web::create_router(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (state, format!("ws://{}/api/ws", addr))
    }

    async fn next_json<S>(stream: &mut S) -> Value
    where
        S: futures::Stream<Item = std::result::Result<WsMessage, tokio_tungstenite::tungstenite::Error>> + Unpin,
    {
        loop {
            let msg = tokio::time::timeout(Duration::from_secs(5), stream.next())
                .await
                .expect("timed out waiting for message")
                .expect("stream ended")
                .unwrap();
            if let WsMessage::Text(text) = msg {
                return serde_json::from_str(&text).unwrap();
            }
        }
    }

    #[tokio::test]
    async fn test_control_session_over_websocket() {
        let (state, url) = serve().await;
        let (mut ws, _) = tokio_tungstenite::connect_async(&url).await.unwrap();

        let hello = next_json(&mut ws).await;
        assert_eq!(hello["event"], "connected");
        assert_eq!(hello["data"]["data"], "Connected to server");

        // malformed input keeps the socket open
        ws.send(WsMessage::Text("{not json".into())).await.unwrap();
        let err = next_json(&mut ws).await;
        assert_eq!(err["event"], "error");

        ws.send(WsMessage::Text(
            r#"{"event": "offer", "data": {"sdp": "v=0", "type": "offer"}}"#.into(),
        ))
        .await
        .unwrap();

        // the session is published during negotiation, so its state
        // notification may arrive before or after the answer
        let mut id = None;
        let mut saw_state = false;
        while id.is_none() || !saw_state {
            let msg = next_json(&mut ws).await;
            match msg["event"].as_str() {
                Some("answer") => {
                    assert_eq!(msg["data"]["type"], "answer");
                    id = Some(msg["data"]["connection_id"].as_str().unwrap().to_string());
                }
                Some("session_state") => saw_state = true,
                other => panic!("unexpected event {:?}", other),
            }
        }
        let id = id.unwrap();
        assert!(state.registry.lookup(&id).is_some());

        ws.send(WsMessage::Text(format!(
            r#"{{"event": "stop_processing", "data": {{"session_id": "{}"}}}}"#,
            id
        )))
        .await
        .unwrap();
        let update = next_json(&mut ws).await;
        assert_eq!(update["event"], "session_state");
        assert_eq!(update["data"]["connection_id"], id.as_str());
        assert_eq!(update["data"]["enabled"], false);

        ws.close(None).await.unwrap();
        for _ in 0..50 {
            if state.registry.lookup(&id).is_none() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("session {} outlived its socket", id);
    }
}
