//! Registry of live WebSocket connections

use std::collections::HashMap;

use tokio::sync::{RwLock, mpsc};

use crate::session::Outbound;
use crate::{Error, Result};

/// Live connections keyed by client id
///
/// Holds the outbound sender for each connection so out-of-band code can
/// reach a client. Sessions own their sockets; the registry only borrows
/// the send side and is cleaned up on disconnect.
#[derive(Default)]
pub struct ConnectionRegistry {
    senders: RwLock<HashMap<String, mpsc::Sender<Outbound>>>,
}

impl ConnectionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, client_id: impl Into<String>, sender: mpsc::Sender<Outbound>) {
        let client_id = client_id.into();
        tracing::debug!(client_id = %client_id, "connection registered");
        self.senders.write().await.insert(client_id, sender);
    }

    pub async fn remove(&self, client_id: &str) {
        if self.senders.write().await.remove(client_id).is_some() {
            tracing::debug!(client_id, "connection removed");
        }
    }

    pub async fn count(&self) -> usize {
        self.senders.read().await.len()
    }

    /// Send a text frame to one client
    ///
    /// # Errors
    ///
    /// Returns error if the client is unknown or its channel is closed
    pub async fn send_text(&self, client_id: &str, text: impl Into<String>) -> Result<()> {
        let sender = {
            let senders = self.senders.read().await;
            senders
                .get(client_id)
                .cloned()
                .ok_or_else(|| Error::Registry(format!("unknown client: {client_id}")))?
        };
        sender
            .send(Outbound::Text(text.into()))
            .await
            .map_err(|_| Error::Registry(format!("client gone: {client_id}")))
    }

    /// Send a binary frame to one client
    ///
    /// # Errors
    ///
    /// Returns error if the client is unknown or its channel is closed
    pub async fn send_bytes(&self, client_id: &str, data: Vec<u8>) -> Result<()> {
        let sender = {
            let senders = self.senders.read().await;
            senders
                .get(client_id)
                .cloned()
                .ok_or_else(|| Error::Registry(format!("unknown client: {client_id}")))?
        };
        sender
            .send(Outbound::Binary(data))
            .await
            .map_err(|_| Error::Registry(format!("client gone: {client_id}")))
    }

    /// Send a text frame to every connected client, best effort
    pub async fn broadcast(&self, text: &str) {
        let senders: Vec<_> = {
            let map = self.senders.read().await;
            map.values().cloned().collect()
        };
        for sender in senders {
            let _ = sender.send(Outbound::Text(text.to_string())).await;
        }
    }
}
