//! WebSocket handler for the voice pipeline

use std::sync::Arc;

use axum::{
    Router,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::IntoResponse,
    routing::get,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use super::ApiState;
use crate::session::{Inbound, Outbound, Session};

/// Build WebSocket router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new().route("/speak", get(ws_upgrade)).with_state(state)
}

/// Handle WebSocket upgrade request
async fn ws_upgrade(State(state): State<Arc<ApiState>>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Bridge one socket to a session: split, forward, run, clean up
async fn handle_socket(socket: WebSocket, state: Arc<ApiState>) {
    let client_id = uuid::Uuid::new_v4().to_string();
    let (mut sender, mut receiver) = socket.split();

    tracing::info!(client_id = %client_id, "voice WebSocket connected");

    let (outbound_tx, mut outbound_rx) = mpsc::channel::<Outbound>(32);
    let (inbound_tx, inbound_rx) = mpsc::channel::<Inbound>(32);

    state.connections.register(&client_id, outbound_tx.clone()).await;

    // Forward outbound frames from the session to the socket
    let mut send_task = tokio::spawn(async move {
        while let Some(frame) = outbound_rx.recv().await {
            let message = match frame {
                Outbound::Text(text) => Message::Text(text.into()),
                Outbound::Binary(data) => Message::Binary(data.into()),
                Outbound::Close => break,
            };
            if sender.send(message).await.is_err() {
                break;
            }
        }
        let _ = sender.close().await;
    });

    // Feed socket frames into the session
    let recv_client_id = client_id.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => {
                    if inbound_tx.send(Inbound::Text(text.to_string())).await.is_err() {
                        break;
                    }
                }
                Message::Binary(data) => {
                    if inbound_tx.send(Inbound::Binary(data.to_vec())).await.is_err() {
                        break;
                    }
                }
                Message::Close(_) => {
                    tracing::info!(client_id = %recv_client_id, "WebSocket closed by client");
                    break;
                }
                _ => {}
            }
        }
    });

    let session = Session::new(
        client_id.clone(),
        state.config.clone(),
        Arc::clone(&state.engines),
        Arc::clone(&state.llm),
        outbound_tx,
    );
    let mut session_task = tokio::spawn(Arc::clone(&session).run(inbound_rx));

    // First task to finish wins; the rest are cancelled
    tokio::select! {
        _ = &mut send_task => {}
        _ = &mut recv_task => {}
        _ = &mut session_task => {}
    }
    send_task.abort();
    recv_task.abort();
    session_task.abort();

    session.teardown().await;
    state.connections.remove(&client_id).await;
    tracing::info!(client_id = %client_id, "voice WebSocket disconnected");
}
