//! WebSocket feed of seat availability changes per trip

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, RwLock};
use uuid::Uuid;

use crate::trips::TripEvent;

const CHANNEL_CAPACITY: usize = 256;

/// Shared feed state: broadcast channel plus per-client trip filters
#[derive(Clone)]
pub struct WsState {
    tx: broadcast::Sender<TripEvent>,
    clients: Arc<RwLock<HashMap<Uuid, HashSet<Uuid>>>>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ClientMessage {
    #[serde(rename_all = "camelCase")]
    Subscribe { trip_ids: Vec<Uuid> },
    #[serde(rename_all = "camelCase")]
    Unsubscribe { trip_ids: Vec<Uuid> },
    Ping,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
enum ServerMessage {
    Event { event: TripEvent },
    #[serde(rename_all = "camelCase")]
    Subscribed { trip_ids: Vec<Uuid> },
    #[serde(rename_all = "camelCase")]
    Unsubscribed { trip_ids: Vec<Uuid> },
    Pong,
    Error { message: String },
}

/// Clients without a filter receive every trip
fn wants(filter: &HashSet<Uuid>, event: &TripEvent) -> bool {
    filter.is_empty() || filter.contains(&event.trip_id())
}

impl Default for WsState {
    fn default() -> Self {
        Self::new()
    }
}

impl WsState {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            tx,
            clients: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Publish an event; a feed with no listeners drops it silently
    pub fn publish(&self, event: TripEvent) {
        if self.tx.receiver_count() == 0 {
            return;
        }
        if let Err(e) = self.tx.send(event) {
            tracing::warn!("Failed to publish trip event: {}", e);
        }
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<TripEvent> {
        self.tx.subscribe()
    }

    pub async fn connected_clients(&self) -> usize {
        self.clients.read().await.len()
    }

    async fn subscribe(&self, client_id: Uuid, trip_ids: &[Uuid]) {
        if let Some(filter) = self.clients.write().await.get_mut(&client_id) {
            filter.extend(trip_ids.iter().copied());
        }
    }

    async fn unsubscribe(&self, client_id: Uuid, trip_ids: &[Uuid]) {
        if let Some(filter) = self.clients.write().await.get_mut(&client_id) {
            for id in trip_ids {
                filter.remove(id);
            }
        }
    }

    async fn should_deliver(&self, client_id: Uuid, event: &TripEvent) -> bool {
        self.clients
            .read()
            .await
            .get(&client_id)
            .map(|filter| wants(filter, event))
            .unwrap_or(false)
    }
}

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<WsState>) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: WsState) {
    let client_id = Uuid::new_v4();
    state.clients.write().await.insert(client_id, HashSet::new());
    tracing::debug!(%client_id, "Trip feed client connected");

    let (mut sender, mut receiver) = socket.split();
    let (reply_tx, mut reply_rx) = mpsc::channel::<ServerMessage>(32);
    let mut events = state.subscribe_events();

    let send_state = state.clone();
    let mut send_task = tokio::spawn(async move {
        loop {
            let outgoing = tokio::select! {
                received = events.recv() => match received {
                    Ok(event) => {
                        if !send_state.should_deliver(client_id, &event).await {
                            continue;
                        }
                        ServerMessage::Event { event }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(%client_id, skipped, "Trip feed client lagging");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                Some(reply) = reply_rx.recv() => reply,
                else => break,
            };

            let Ok(text) = serde_json::to_string(&outgoing) else {
                continue;
            };
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    let recv_state = state.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            let text = match msg {
                Message::Text(text) => text,
                Message::Close(_) => break,
                _ => continue,
            };

            let reply = match serde_json::from_str::<ClientMessage>(&text) {
                Ok(ClientMessage::Subscribe { trip_ids }) => {
                    recv_state.subscribe(client_id, &trip_ids).await;
                    ServerMessage::Subscribed { trip_ids }
                }
                Ok(ClientMessage::Unsubscribe { trip_ids }) => {
                    recv_state.unsubscribe(client_id, &trip_ids).await;
                    ServerMessage::Unsubscribed { trip_ids }
                }
                Ok(ClientMessage::Ping) => ServerMessage::Pong,
                Err(e) => ServerMessage::Error {
                    message: format!("Unrecognized message: {}", e),
                },
            };

            if reply_tx.send(reply).await.is_err() {
                break;
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    }

    state.clients.write().await.remove(&client_id);
    tracing::debug!(%client_id, "Trip feed client disconnected");
}
